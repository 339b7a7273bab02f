//! Error types for Callscope.

use thiserror::Error;

/// Library-level error type for Callscope operations.
#[derive(Error, Debug)]
pub enum CallscopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Transcript not found: {0}")]
    TranscriptNotFound(String),

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Upstream model did not respond within {0:?}")]
    UpstreamTimeout(std::time::Duration),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CallscopeError {
    /// Whether the error came from the language-model service rather than from us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CallscopeError::Upstream(_) | CallscopeError::UpstreamTimeout(_) | CallscopeError::Http(_)
        )
    }
}

/// Result type alias for Callscope operations.
pub type Result<T> = std::result::Result<T, CallscopeError>;
