//! Ask command implementation.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::reasoning::{GroundedChat, OpenAIGenerator};
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    transcript_id: &str,
    question: &str,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    if !crate::openai::is_api_key_configured() {
        Output::error("OPENAI_API_KEY is not set.");
        anyhow::bail!("Missing OPENAI_API_KEY");
    }

    let corpus = super::open_corpus(&settings);
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let mut generator =
        OpenAIGenerator::from_settings(&settings.llm)?.with_system(&prompts.reasoning.system);
    if let Some(model) = model {
        generator = generator.with_model(&model);
    }

    let chat = GroundedChat::new(corpus, Arc::new(generator))
        .with_prompts(prompts)
        .with_max_history(settings.llm.max_history);

    let spinner = Output::spinner("Asking about the call...");

    match chat.answer(transcript_id, question, Vec::new()).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}\n", response.answer);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
