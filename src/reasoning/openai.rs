//! OpenAI chat-completions generator.

use super::{bounded, ChatMessage, Generator, Role};
use crate::config::LlmSettings;
use crate::error::{CallscopeError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Generator backed by the OpenAI chat API.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    system: String,
    timeout: Duration,
}

impl OpenAIGenerator {
    /// Create a generator for `model` with a request timeout.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature: 0.3,
            system: String::new(),
            timeout,
        })
    }

    /// Create a generator from the `[llm]` settings.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Ok(Self::new(&settings.model, Duration::from_secs(settings.timeout_secs))?
            .with_temperature(settings.temperature))
    }

    /// Set the system prompt sent before the history.
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = system.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn build_messages(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() + 2);

        if !self.system.is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(self.system.clone())
                    .build()
                    .map_err(request_error)?
                    .into(),
            );
        }

        for message in history {
            let built: ChatCompletionRequestMessage = match message.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.text.clone())
                    .build()
                    .map_err(request_error)?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.text.clone())
                    .build()
                    .map_err(request_error)?
                    .into(),
            };
            messages.push(built);
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(request_error)?
                .into(),
        );

        Ok(messages)
    }
}

/// Classify a failed API call. Client-side timeouts keep their own variant.
fn upstream_error(e: OpenAIError, timeout: Duration) -> CallscopeError {
    match e {
        OpenAIError::Reqwest(ref inner) if inner.is_timeout() => CallscopeError::UpstreamTimeout(timeout),
        other => CallscopeError::Upstream(format!("Failed to generate response: {}", other)),
    }
}

fn request_error(e: OpenAIError) -> CallscopeError {
    CallscopeError::Upstream(format!("Failed to build request: {}", e))
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt, history), fields(model = %self.model, history = history.len()))]
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String> {
        let messages = self.build_messages(prompt, history)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(request_error)?;

        let response = bounded(self.timeout, async {
            self.client
                .chat()
                .create(request)
                .await
                .map_err(|e| upstream_error(e, self.timeout))
        })
        .await
        .inspect_err(|e| warn!("Upstream call failed: {}", e))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| CallscopeError::Upstream("Empty response from LLM".to_string()))?
            .clone();

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_system_history_and_prompt() {
        let generator = OpenAIGenerator::new("gpt-4o-mini", Duration::from_secs(5))
            .unwrap()
            .with_system("be brief");

        let history = vec![ChatMessage::user("first"), ChatMessage::assistant("answer")];
        let messages = generator.build_messages("second", &history).unwrap();

        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_no_system_message_when_unset() {
        let generator = OpenAIGenerator::new("gpt-4o-mini", Duration::from_secs(5)).unwrap();
        let messages = generator.build_messages("hello", &[]).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_http_timeout_maps_to_upstream_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(50);
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap();
        let err = client
            .get(format!("http://{}/v1/chat/completions", addr))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let mapped = upstream_error(OpenAIError::Reqwest(err), timeout);
        assert!(matches!(mapped, CallscopeError::UpstreamTimeout(d) if d == timeout));
    }

    #[test]
    fn test_other_api_errors_map_to_upstream() {
        let mapped = upstream_error(
            OpenAIError::InvalidArgument("bad".to_string()),
            Duration::from_secs(1),
        );
        assert!(matches!(mapped, CallscopeError::Upstream(_)));
    }

    #[test]
    fn test_from_settings() {
        let settings = LlmSettings {
            model: "gpt-4.1".to_string(),
            temperature: 0.0,
            timeout_secs: 12,
            max_history: 4,
        };
        let generator = OpenAIGenerator::from_settings(&settings).unwrap();
        assert_eq!(generator.model, "gpt-4.1");
        assert_eq!(generator.timeout, Duration::from_secs(12));
    }
}
