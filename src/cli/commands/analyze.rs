//! Analyze command implementation.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::reasoning::{CausalAnalyzer, OpenAIGenerator};
use anyhow::Result;
use std::sync::Arc;

/// Run the analyze command.
pub async fn run_analyze(transcript_id: &str, model: Option<String>, settings: Settings) -> Result<()> {
    if !crate::openai::is_api_key_configured() {
        Output::error("OPENAI_API_KEY is not set.");
        anyhow::bail!("Missing OPENAI_API_KEY");
    }

    let corpus = super::open_corpus(&settings);
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let mut generator = OpenAIGenerator::from_settings(&settings.llm)?
        .with_system(&prompts.analysis.system)
        .with_temperature(0.0);
    if let Some(model) = model {
        generator = generator.with_model(&model);
    }

    let analyzer = CausalAnalyzer::new(corpus, Arc::new(generator)).with_prompts(prompts);
    let spinner = Output::spinner("Analyzing conversation...");

    let analysis = match analyzer.analyze(transcript_id).await {
        Ok(analysis) => {
            spinner.finish_and_clear();
            analysis
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Analysis failed: {}", e));
            return Err(e.into());
        }
    };

    Output::header(&format!("Transcript {}", analysis.transcript_id));
    Output::kv("Causal turn", &analysis.causal_turn_index.to_string());
    Output::kv("Evidence", &analysis.evidence);
    if !analysis.reasoning.is_empty() {
        println!("\n{}\n", analysis.reasoning);
    }

    Ok(())
}
