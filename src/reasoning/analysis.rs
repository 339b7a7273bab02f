//! Causal analysis: which turn drove the outcome of a call.

use super::Generator;
use crate::config::Prompts;
use crate::corpus::{Corpus, Turn};
use crate::error::{CallscopeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

static TURN_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bturn\s+#?(\d+)").expect("Invalid regex"));

/// The turn judged responsible for a call's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CausalAnalysis {
    pub transcript_id: String,
    pub causal_turn_index: usize,
    /// Text of the causal turn.
    pub evidence: String,
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    causal_turn_index: usize,
    #[serde(default)]
    reasoning: String,
}

/// Format turns as `Turn {i}: {speaker}: {text}` lines.
pub fn format_conversation(turns: &[Turn]) -> String {
    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| format!("Turn {}: {}: {}", i, turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Asks a generator to locate the causal turn of a transcript.
pub struct CausalAnalyzer {
    corpus: Arc<Corpus>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
}

impl CausalAnalyzer {
    pub fn new(corpus: Arc<Corpus>, generator: Arc<dyn Generator>) -> Self {
        Self {
            corpus,
            generator,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    #[instrument(skip(self), fields(transcript_id = %transcript_id))]
    pub async fn analyze(&self, transcript_id: &str) -> Result<CausalAnalysis> {
        let record = self
            .corpus
            .transcript(transcript_id)
            .ok_or_else(|| CallscopeError::TranscriptNotFound(transcript_id.to_string()))?;

        let conversation = self.corpus.conversation(record);
        if conversation.is_empty() {
            return Err(CallscopeError::Analysis(format!(
                "Transcript {} has no conversation",
                transcript_id
            )));
        }

        let mut vars = HashMap::new();
        vars.insert("transcript_id".to_string(), record.transcript_id.clone());
        vars.insert("intent".to_string(), record.intent.clone());
        vars.insert("reason_for_call".to_string(), record.reason_for_call.clone());
        vars.insert("conversation".to_string(), format_conversation(conversation));
        let prompt = self.prompts.render_with_custom(&self.prompts.analysis.user, &vars);

        info!("Analyzing {} turns", conversation.len());
        let response = self.generator.generate(&prompt, &[]).await?;
        debug!("Analysis response: {}", preview(&response, 500));

        let verdict = parse_verdict(&response)?;
        let turn = conversation.get(verdict.causal_turn_index).ok_or_else(|| {
            CallscopeError::Analysis(format!(
                "Model pointed at turn {} but the transcript has {} turns",
                verdict.causal_turn_index,
                conversation.len()
            ))
        })?;

        Ok(CausalAnalysis {
            transcript_id: record.transcript_id.clone(),
            causal_turn_index: verdict.causal_turn_index,
            evidence: turn.text.clone(),
            reasoning: verdict.reasoning,
        })
    }
}

/// Read the model's verdict, preferring JSON and falling back to a
/// "Turn N" reference in prose.
fn parse_verdict(response: &str) -> Result<Verdict> {
    let json_start = response.find('{');
    let json_end = response.rfind('}');

    if let (Some(start), Some(end)) = (json_start, json_end) {
        if end > start {
            match serde_json::from_str::<Verdict>(&response[start..=end]) {
                Ok(verdict) => return Ok(verdict),
                Err(e) => warn!("Analysis response is not a verdict object: {}", e),
            }
        }
    }

    TURN_REFERENCE
        .captures(response)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .map(|causal_turn_index| Verdict {
            causal_turn_index,
            reasoning: response.trim().to_string(),
        })
        .ok_or_else(|| {
            CallscopeError::Analysis(format!(
                "Could not find a turn index in the response: {}",
                preview(response, 200)
            ))
        })
}

/// At most `max` bytes of `text`, cut on a character boundary.
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let end = (0..=max).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::testing::FakeGenerator;

    fn corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_json_str(
                r#"{"transcripts": [
                    {"transcript_id": "empty", "intent": "x", "conversation": []},
                    {
                        "transcript_id": "T-1",
                        "intent": "refund",
                        "reason_for_call": "Refund denied",
                        "conversation": [
                            {"speaker": "Customer", "text": "I want a refund"},
                            {"speaker": "Agent", "text": "That is not possible"},
                            {"speaker": "Customer", "text": "I am cancelling then"}
                        ]
                    }
                ]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_format_conversation() {
        let turns = vec![Turn::new("Customer", "hi"), Turn::new("Agent", "hello")];
        assert_eq!(format_conversation(&turns), "Turn 0: Customer: hi\nTurn 1: Agent: hello");
    }

    #[test]
    fn test_parse_verdict_json_in_markdown() {
        let verdict = parse_verdict(
            "```json\n{\"causal_turn_index\": 1, \"reasoning\": \"refused\"}\n```",
        )
        .unwrap();
        assert_eq!(verdict.causal_turn_index, 1);
        assert_eq!(verdict.reasoning, "refused");
    }

    #[test]
    fn test_parse_verdict_prose_fallback() {
        let verdict = parse_verdict("In Turn 2, the customer gave up.").unwrap();
        assert_eq!(verdict.causal_turn_index, 2);
        assert!(verdict.reasoning.contains("gave up"));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "h");
        assert_eq!(preview("short", 50), "short");
    }

    #[test]
    fn test_parse_verdict_without_index() {
        assert!(parse_verdict("I cannot tell.").is_err());
    }

    #[tokio::test]
    async fn test_analyze_returns_evidence() {
        let generator = Arc::new(FakeGenerator::replying(
            r#"{"causal_turn_index": 1, "reasoning": "The agent refused the refund."}"#,
        ));
        let analyzer = CausalAnalyzer::new(corpus(), generator.clone());

        let analysis = analyzer.analyze("T-1").await.unwrap();
        assert_eq!(analysis.causal_turn_index, 1);
        assert_eq!(analysis.evidence, "That is not possible");
        assert_eq!(analysis.transcript_id, "T-1");

        let calls = generator.calls.lock().unwrap();
        assert!(calls[0].0.contains("Turn 1: Agent: That is not possible"));
        assert!(calls[0].0.contains("refund"));
        assert!(calls[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_rejects_out_of_range_index() {
        let generator = Arc::new(FakeGenerator::replying(r#"{"causal_turn_index": 7}"#));
        let analyzer = CausalAnalyzer::new(corpus(), generator);
        let err = analyzer.analyze("T-1").await.unwrap_err();
        assert!(matches!(err, CallscopeError::Analysis(_)));
    }

    #[tokio::test]
    async fn test_analyze_empty_and_missing_transcripts() {
        let analyzer = CausalAnalyzer::new(corpus(), Arc::new(FakeGenerator::replying("unused")));
        assert!(matches!(
            analyzer.analyze("empty").await,
            Err(CallscopeError::Analysis(_))
        ));
        assert!(matches!(
            analyzer.analyze("missing").await,
            Err(CallscopeError::TranscriptNotFound(_))
        ));
    }
}
