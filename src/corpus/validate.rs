//! Syntax diagnostics for corpus files.
//!
//! Large hand-edited JSON files tend to break on a single comma. This module
//! pinpoints the failing line and shows the text around it.

use crate::error::Result;
use serde::Serialize;
use std::path::Path;

/// Lines shown before the failing line.
const CONTEXT_BEFORE: usize = 2;
/// Lines shown after the failing line.
const CONTEXT_AFTER: usize = 2;

/// Result of checking a corpus file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationReport {
    Valid {
        lines: usize,
    },
    Invalid {
        line: usize,
        column: usize,
        message: String,
        excerpt: Vec<ExcerptLine>,
        hint: Option<String>,
    },
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationReport::Valid { .. })
    }
}

/// One line of source text near a syntax error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcerptLine {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
    pub is_error: bool,
}

/// Check a file on disk. Only I/O failures are errors.
pub fn check_file(path: &Path) -> Result<ValidationReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(check_str(&content))
}

/// Check JSON text.
pub fn check_str(content: &str) -> ValidationReport {
    let lines: Vec<&str> = content.lines().collect();

    let err = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(_) => return ValidationReport::Valid { lines: lines.len() },
        Err(e) => e,
    };

    let line = err.line();
    let column = err.column();
    let full = err.to_string();
    let message = full
        .strip_suffix(&format!(" at line {} column {}", line, column))
        .unwrap_or(&full)
        .to_string();

    let error_index = line.saturating_sub(1);
    let start = error_index.saturating_sub(CONTEXT_BEFORE);
    let end = (error_index + CONTEXT_AFTER + 1).min(lines.len());
    let excerpt = (start..end)
        .map(|i| ExcerptLine {
            number: i + 1,
            text: lines[i].trim_end().to_string(),
            is_error: i == error_index,
        })
        .collect();

    ValidationReport::Invalid {
        line,
        column,
        hint: hint_for(&message).map(str::to_string),
        message,
        excerpt,
    }
}

/// Map a serde_json message to a fix suggestion.
fn hint_for(message: &str) -> Option<&'static str> {
    if message.starts_with("expected `,`") {
        Some("A comma (,) is likely missing at the end of the previous value.")
    } else if message.starts_with("trailing comma") {
        Some("Remove the comma (,) after the last element of the list or object.")
    } else if message.contains("while parsing a string") {
        Some("A string is not closed; look for a missing quote (\").")
    } else if message.starts_with("expected value") {
        Some("A value is missing; check for an extra comma or an unquoted word.")
    } else if message.starts_with("key must be a string") {
        Some("Object keys must be wrapped in double quotes.")
    } else if message.starts_with("expected `:`") {
        Some("A colon (:) is missing between a key and its value.")
    } else {
        None
    }
}
