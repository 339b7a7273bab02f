//! Transcript corpus: loading, flattening and lookup.
//!
//! The corpus is loaded once and never mutated. Every transcript's
//! conversation is concatenated, in file order, into a single
//! [`TurnSequence`] so that conversational adjacency is preserved across the
//! whole dataset. Indices into that sequence are only meaningful for the
//! [`Corpus`] value that produced them.

mod loader;
pub mod validate;

pub use loader::load_corpus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Speaker label used when a turn carries none.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// A single utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role label, e.g. "Agent" or "Customer".
    #[serde(default = "default_speaker", deserialize_with = "lenient_string")]
    pub speaker: String,
    /// What was said.
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
}

impl Turn {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

fn default_speaker() -> String {
    UNKNOWN_SPEAKER.to_string()
}

/// Accept any scalar where a string is expected; `null` becomes "".
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Ordered, index-addressable sequence of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSequence {
    turns: Vec<Turn>,
}

impl TurnSequence {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }
}

impl From<Vec<Turn>> for TurnSequence {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a TurnSequence {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

/// Metadata for one transcript, plus where its turns live in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptRecord {
    pub transcript_id: String,
    pub intent: String,
    pub reason_for_call: String,
    /// Half-open range of indices into the corpus [`TurnSequence`].
    #[serde(skip)]
    pub turns: Range<usize>,
}

/// Outcome of a corpus load, kept for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// File the corpus came from, if any.
    pub source: Option<PathBuf>,
    /// Number of flattened turns.
    pub turns: usize,
    /// Number of transcript records.
    pub transcripts: usize,
    /// When the load finished.
    pub loaded_at: DateTime<Utc>,
    /// Why the load failed, when it did.
    pub error: Option<String>,
}

impl LoadReport {
    /// True when there is data to match against.
    pub fn is_ready(&self) -> bool {
        self.error.is_none() && self.turns > 0
    }
}

/// An immutable, loaded transcript corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    turns: TurnSequence,
    transcripts: Vec<TranscriptRecord>,
    report: LoadReport,
}

impl Corpus {
    /// Build a corpus from parts. The report counts are derived here.
    pub(crate) fn assemble(
        turns: Vec<Turn>,
        transcripts: Vec<TranscriptRecord>,
        source: Option<PathBuf>,
        error: Option<String>,
    ) -> Self {
        let report = LoadReport {
            source,
            turns: turns.len(),
            transcripts: transcripts.len(),
            loaded_at: Utc::now(),
            error,
        };
        Self {
            turns: TurnSequence::from(turns),
            transcripts,
            report,
        }
    }

    /// An empty corpus that remembers why loading failed.
    pub fn failed(source: Option<PathBuf>, error: impl Into<String>) -> Self {
        Self::assemble(Vec::new(), Vec::new(), source, Some(error.into()))
    }

    /// A corpus made of a bare list of turns, with no transcript records.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self::assemble(turns, Vec::new(), None, None)
    }

    /// Parse a corpus document held in memory.
    ///
    /// Unlike [`load_corpus`], malformed JSON is returned as an error.
    pub fn from_json_str(content: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| crate::CallscopeError::Corpus(format!("Malformed JSON: {}", e)))?;
        let (turns, transcripts) = loader::flatten_document(value);
        Ok(Self::assemble(turns, transcripts, None, None))
    }

    pub fn turns(&self) -> &TurnSequence {
        &self.turns
    }

    pub fn transcripts(&self) -> &[TranscriptRecord] {
        &self.transcripts
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Find a transcript by id. The first record wins on duplicates.
    pub fn transcript(&self, transcript_id: &str) -> Option<&TranscriptRecord> {
        self.transcripts
            .iter()
            .find(|t| t.transcript_id == transcript_id)
    }

    /// The turns belonging to a transcript.
    pub fn conversation(&self, record: &TranscriptRecord) -> &[Turn] {
        self.turns
            .as_slice()
            .get(record.turns.clone())
            .unwrap_or(&[])
    }

    /// The transcript that owns the turn at `index`.
    pub fn transcript_of(&self, index: usize) -> Option<&TranscriptRecord> {
        self.transcripts.iter().find(|t| t.turns.contains(&index))
    }
}
