//! Status command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the status command.
pub fn run_status(settings: &Settings) -> Result<()> {
    let corpus = super::open_corpus(settings);
    let report = corpus.report();

    Output::header("Corpus");
    Output::kv("Path", &settings.corpus_path().display().to_string());
    Output::kv("Turns", &report.turns.to_string());
    Output::kv("Transcripts", &report.transcripts.to_string());
    Output::kv("Loaded at", &report.loaded_at.to_rfc3339());

    Output::header("Language model");
    Output::kv("Model", &settings.llm.model);
    Output::kv(
        "API key",
        if crate::openai::is_api_key_configured() {
            "configured"
        } else {
            "missing"
        },
    );
    println!();

    match &report.error {
        Some(error) => {
            Output::error(error);
            Output::info("Run 'callscope validate' to locate syntax errors.");
        }
        None if report.is_ready() => Output::success("Ready"),
        None => Output::warning("Corpus loaded but contains no turns."),
    }

    Ok(())
}
