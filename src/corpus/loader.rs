//! Reading corpus documents from disk.

use super::{Corpus, TranscriptRecord, Turn};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// Load a corpus file.
///
/// A missing or unparsable file never fails the caller: the result is an
/// empty [`Corpus`] whose load report carries the reason.
#[instrument(fields(path = %path.display()))]
pub fn load_corpus(path: &Path) -> Corpus {
    info!("Loading corpus from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            let reason = format!("Could not read {}: {}", path.display(), e);
            error!("{}", reason);
            return Corpus::failed(Some(path.to_path_buf()), reason);
        }
    };

    let document: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let reason = format!("Malformed JSON in {}: {}", path.display(), e);
            error!("{}", reason);
            return Corpus::failed(Some(path.to_path_buf()), reason);
        }
    };

    let (turns, transcripts) = flatten_document(document);
    info!(
        "Indexed {} conversation turns from {} transcripts",
        turns.len(),
        transcripts.len()
    );

    Corpus::assemble(turns, transcripts, Some(path.to_path_buf()), None)
}

/// Flatten either document shape into turns plus transcript records.
pub(super) fn flatten_document(document: Value) -> (Vec<Turn>, Vec<TranscriptRecord>) {
    match document {
        Value::Object(mut map) => match map.remove("transcripts") {
            Some(Value::Array(items)) => flatten_transcripts(items),
            Some(_) => {
                warn!("\"transcripts\" is not an array, corpus is empty");
                (Vec::new(), Vec::new())
            }
            None => {
                warn!("Document has no \"transcripts\" key, corpus is empty");
                (Vec::new(), Vec::new())
            }
        },
        Value::Array(items) => (parse_turns(items), Vec::new()),
        _ => {
            warn!("Document is neither an object nor an array, corpus is empty");
            (Vec::new(), Vec::new())
        }
    }
}

fn flatten_transcripts(items: Vec<Value>) -> (Vec<Turn>, Vec<TranscriptRecord>) {
    let mut turns = Vec::new();
    let mut records = Vec::with_capacity(items.len());

    for (position, item) in items.into_iter().enumerate() {
        let Value::Object(mut map) = item else {
            warn!("Skipping transcript #{}: not an object", position);
            continue;
        };

        let start = turns.len();
        if let Some(Value::Array(conversation)) = map.remove("conversation") {
            turns.extend(parse_turns(conversation));
        }

        records.push(TranscriptRecord {
            transcript_id: string_field(&map, "transcript_id"),
            intent: string_field(&map, "intent"),
            reason_for_call: string_field(&map, "reason_for_call"),
            turns: start..turns.len(),
        });
    }

    (turns, records)
}

fn parse_turns(items: Vec<Value>) -> Vec<Turn> {
    let total = items.len();
    let turns: Vec<Turn> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if turns.len() < total {
        warn!("Skipped {} entries that are not turn objects", total - turns.len());
    }
    turns
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
