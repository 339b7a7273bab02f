//! Grounded question answering about a single transcript.

use super::{trim_history, ChatMessage, Generator};
use crate::config::Prompts;
use crate::corpus::{Corpus, TranscriptRecord};
use crate::error::{CallscopeError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Default number of history messages kept.
const DEFAULT_MAX_HISTORY: usize = 20;

/// An answer plus the history to send with the next question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub history: Vec<ChatMessage>,
}

/// Answers questions using a transcript's call summary as context.
pub struct GroundedChat {
    corpus: Arc<Corpus>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    max_history: usize,
}

impl GroundedChat {
    pub fn new(corpus: Arc<Corpus>, generator: Arc<dyn Generator>) -> Self {
        Self {
            corpus,
            generator,
            prompts: Prompts::default(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Render the grounding prompt for one question.
    pub fn build_prompt(&self, record: &TranscriptRecord, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("transcript_id".to_string(), record.transcript_id.clone());
        vars.insert("intent".to_string(), record.intent.clone());
        vars.insert("reason_for_call".to_string(), record.reason_for_call.clone());
        vars.insert("query".to_string(), query.to_string());

        self.prompts.render_with_custom(&self.prompts.reasoning.user, &vars)
    }

    /// Answer `query` about `transcript_id`, continuing `history`.
    #[instrument(skip(self, history), fields(transcript_id = %transcript_id, history = history.len()))]
    pub async fn answer(
        &self,
        transcript_id: &str,
        query: &str,
        mut history: Vec<ChatMessage>,
    ) -> Result<GroundedAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CallscopeError::InvalidInput("query must not be empty".to_string()));
        }

        let record = self
            .corpus
            .transcript(transcript_id)
            .ok_or_else(|| CallscopeError::TranscriptNotFound(transcript_id.to_string()))?;

        let prompt = self.build_prompt(record, query);
        trim_history(&mut history, self.max_history);

        info!("Asking model about transcript {}", transcript_id);
        let answer = self.generator.generate(&prompt, &history).await?;

        history.push(ChatMessage::user(query));
        history.push(ChatMessage::assistant(answer.clone()));
        trim_history(&mut history, self.max_history);

        Ok(GroundedAnswer { answer, history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::testing::FakeGenerator;

    fn corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_json_str(
                r#"{"transcripts": [{
                    "transcript_id": "T-9",
                    "intent": "refund",
                    "reason_for_call": "Customer was charged for a cancelled order",
                    "conversation": [{"speaker": "Customer", "text": "I want a refund"}]
                }]}"#,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_answer_embeds_context_and_extends_history() {
        let generator = Arc::new(FakeGenerator::replying("They were double charged."));
        let chat = GroundedChat::new(corpus(), generator.clone());

        let prior = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let result = chat.answer("T-9", "What went wrong?", prior.clone()).await.unwrap();

        assert_eq!(result.answer, "They were double charged.");
        assert_eq!(result.history.len(), 4);
        assert_eq!(result.history[2], ChatMessage::user("What went wrong?"));
        assert_eq!(result.history[3], ChatMessage::assistant("They were double charged."));

        let calls = generator.calls.lock().unwrap();
        let (prompt, sent_history) = &calls[0];
        assert!(prompt.contains("Customer was charged for a cancelled order"));
        assert!(prompt.contains("What went wrong?"));
        assert_eq!(sent_history, &prior);
    }

    #[tokio::test]
    async fn test_history_is_trimmed() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let chat = GroundedChat::new(corpus(), generator.clone()).with_max_history(2);

        let prior: Vec<ChatMessage> = (0..6).map(|i| ChatMessage::user(i.to_string())).collect();
        let result = chat.answer("T-9", "again", prior).await.unwrap();

        assert_eq!(
            result.history,
            vec![ChatMessage::user("again"), ChatMessage::assistant("ok")]
        );
        assert_eq!(generator.calls.lock().unwrap()[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_query_placeholders_are_not_expanded() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let chat = GroundedChat::new(corpus(), generator.clone());
        chat.answer("T-9", "what is {{intent}}?", Vec::new()).await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert!(calls[0].0.contains("what is {{intent}}?"));
    }

    #[tokio::test]
    async fn test_unknown_transcript() {
        let chat = GroundedChat::new(corpus(), Arc::new(FakeGenerator::replying("unused")));
        let err = chat.answer("nope", "why?", Vec::new()).await.unwrap_err();
        assert!(matches!(err, CallscopeError::TranscriptNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let chat = GroundedChat::new(corpus(), Arc::new(FakeGenerator::replying("unused")));
        let err = chat.answer("T-9", "  ", Vec::new()).await.unwrap_err();
        assert!(matches!(err, CallscopeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_distinctly() {
        let generator = Arc::new(FakeGenerator::failing(CallscopeError::UpstreamTimeout(
            std::time::Duration::from_secs(30),
        )));
        let chat = GroundedChat::new(corpus(), generator);
        let err = chat.answer("T-9", "why?", Vec::new()).await.unwrap_err();
        assert!(matches!(err, CallscopeError::UpstreamTimeout(d) if d.as_secs() == 30));
        assert!(err.is_upstream());
    }
}
