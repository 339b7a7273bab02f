//! Validate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::validate::{check_file, ValidationReport};
use anyhow::Result;

/// Run the validate command.
pub fn run_validate(path: Option<&str>, settings: &Settings) -> Result<()> {
    let path = match path {
        Some(p) => Settings::expand_path(p),
        None => settings.corpus_path(),
    };

    match check_file(&path)? {
        ValidationReport::Valid { lines } => {
            Output::success(&format!("{} is valid JSON ({} lines)", path.display(), lines));
        }
        ValidationReport::Invalid {
            line,
            column,
            message,
            excerpt,
            hint,
        } => {
            Output::error(&format!(
                "{}: line {}, column {}: {}",
                path.display(),
                line,
                column,
                message
            ));
            println!();
            for excerpt_line in &excerpt {
                Output::excerpt_line(excerpt_line.number, &excerpt_line.text, excerpt_line.is_error);
            }
            println!();
            if let Some(hint) = hint {
                Output::info(&hint);
            }
            anyhow::bail!("{} is not valid JSON", path.display());
        }
    }

    Ok(())
}
