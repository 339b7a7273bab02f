//! Configuration module for Callscope.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts, ReasoningPrompts};
pub use settings::{
    CorpusSettings, GeneralSettings, LlmSettings, MatcherSettings, PromptSettings,
    ServerSettings, Settings,
};
