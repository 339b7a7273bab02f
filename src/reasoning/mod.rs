//! Language-model backed answers about transcripts.
//!
//! The services here only depend on the [`Generator`] trait, so the matching
//! core and the HTTP layer never see a vendor SDK.

mod analysis;
mod grounded;
mod openai;

pub use analysis::{format_conversation, CausalAnalysis, CausalAnalyzer};
pub use grounded::{GroundedAnswer, GroundedChat};
pub use openai::OpenAIGenerator;

use crate::error::{CallscopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Who said a history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "model")]
    Assistant,
}

/// One message of chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Text generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to `prompt`, given the earlier conversation.
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String>;
}

/// Run an upstream call, failing with [`CallscopeError::UpstreamTimeout`]
/// when it takes longer than `timeout`.
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| CallscopeError::UpstreamTimeout(timeout))?
}

/// Keep only the newest `max` messages.
pub(crate) fn trim_history(history: &mut Vec<ChatMessage>, max: usize) {
    if history.len() > max {
        history.drain(..history.len() - max);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Generator returning canned replies and recording its inputs.
    pub struct FakeGenerator {
        reply: Result<String>,
        pub calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    }

    impl FakeGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: CallscopeError) -> Self {
            Self {
                reply: Err(error),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), history.to_vec()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(CallscopeError::UpstreamTimeout(after)) => Err(CallscopeError::UpstreamTimeout(*after)),
                Err(e) => Err(CallscopeError::Upstream(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_fast_calls() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, CallscopeError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out_slow_calls() {
        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CallscopeError>(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, CallscopeError::UpstreamTimeout(d) if d == Duration::from_millis(10)));
        assert!(err.to_string().contains("10ms"));
    }

    #[test]
    fn test_trim_history_keeps_newest() {
        let mut history: Vec<ChatMessage> = (0..5).map(|i| ChatMessage::user(i.to_string())).collect();
        trim_history(&mut history, 2);
        assert_eq!(history, vec![ChatMessage::user("3"), ChatMessage::user("4")]);
    }

    #[test]
    fn test_history_accepts_model_role() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role": "model", "text": "hi"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
    }
}
