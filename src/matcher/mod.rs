//! Transcript line matching and reply selection.
//!
//! Matching runs in two tiers. The exact tier returns the *first* turn whose
//! lowercased text contains the lowercased query. Only when nothing contains
//! it does the fuzzy tier run: every turn is scored with
//! [`similarity::ratio`] and the best score above the threshold wins, with
//! ties going to the earliest turn.
//!
//! Reply lookup scans a fixed window after the matched turn for the first
//! turn spoken by the reply role. Replies further away than the window are
//! deliberately not found.
//!
//! An empty query is a substring of every text and therefore matches the
//! first turn. Callers that treat empty input as an error must check for it
//! before matching.

pub mod similarity;

use crate::config::MatcherSettings;
use crate::corpus::{Corpus, Turn};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default minimum fuzzy score (exclusive).
pub const DEFAULT_THRESHOLD: f64 = 0.6;
/// Default number of turns inspected after a match.
pub const DEFAULT_LOOKAHEAD: usize = 3;
/// Default role whose turns count as replies.
pub const DEFAULT_REPLY_SPEAKER: &str = "Agent";

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Fuzzy,
}

/// Best turn for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// Matched turn index, `None` when nothing matched.
    pub index: Option<usize>,
    /// Confidence in `[0, 1]`; `0.0` when nothing matched.
    pub score: f64,
    pub tier: Option<MatchTier>,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            index: None,
            score: 0.0,
            tier: None,
        }
    }

    fn exact(index: usize) -> Self {
        Self {
            index: Some(index),
            score: 1.0,
            tier: Some(MatchTier::Exact),
        }
    }

    fn fuzzy(index: usize, score: f64) -> Self {
        Self {
            index: Some(index),
            score,
            tier: Some(MatchTier::Fuzzy),
        }
    }

    pub fn is_match(&self) -> bool {
        self.index.is_some()
    }
}

/// Result of scanning the window after a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLookup {
    Found { index: usize, text: String },
    NotInWindow,
}

/// Everything a query can end in.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A line matched and a reply followed it.
    Reply {
        matched: MatchResult,
        reply_index: usize,
        text: String,
    },
    /// A line matched but no reply turn is inside the window.
    NoReplyInWindow { matched: MatchResult },
    /// No turn matched the query.
    NoMatch,
    /// There is no data to search.
    NotReady,
}

/// Tunables for matching and reply lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    pub threshold: f64,
    pub lookahead: usize,
    pub reply_speaker: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            lookahead: DEFAULT_LOOKAHEAD,
            reply_speaker: DEFAULT_REPLY_SPEAKER.to_string(),
        }
    }
}

impl From<&MatcherSettings> for MatcherConfig {
    fn from(settings: &MatcherSettings) -> Self {
        Self {
            threshold: settings.threshold,
            lookahead: settings.lookahead,
            reply_speaker: settings.reply_speaker.clone(),
        }
    }
}

/// Find the best turn for `query`.
pub fn find_match(turns: &[Turn], query: &str, threshold: f64) -> MatchResult {
    let query = query.trim().to_lowercase();

    let exact = turns
        .iter()
        .position(|turn| turn.text.to_lowercase().contains(&query));
    if let Some(index) = exact {
        debug!("Exact match at index {}", index);
        return MatchResult::exact(index);
    }

    debug!("No exact match, scoring {} turns", turns.len());
    let mut best = MatchResult::none();
    for (index, turn) in turns.iter().enumerate() {
        let score = similarity::ratio(&query, &turn.text.to_lowercase());
        if score > threshold && score > best.score {
            best = MatchResult::fuzzy(index, score);
        }
    }

    if let Some(index) = best.index {
        debug!("Fuzzy match at index {} (score {:.3})", index, best.score);
    }
    best
}

/// Find the first `speaker` turn within `lookahead` turns after `index`.
pub fn find_reply(turns: &[Turn], index: usize, speaker: &str, lookahead: usize) -> ReplyLookup {
    turns
        .iter()
        .enumerate()
        .skip(index.saturating_add(1))
        .take(lookahead)
        .find(|(_, turn)| turn.speaker == speaker)
        .map(|(i, turn)| ReplyLookup::Found {
            index: i,
            text: turn.text.clone(),
        })
        .unwrap_or(ReplyLookup::NotInWindow)
}

/// Matcher bound to one loaded corpus.
#[derive(Debug, Clone)]
pub struct Matcher {
    corpus: Arc<Corpus>,
    config: MatcherConfig,
}

impl Matcher {
    /// Create a matcher with default settings.
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self {
            corpus,
            config: MatcherConfig::default(),
        }
    }

    /// Replace the matcher settings.
    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    pub fn find_match(&self, query: &str) -> MatchResult {
        find_match(self.corpus.turns().as_slice(), query, self.config.threshold)
    }

    pub fn find_reply(&self, index: usize) -> ReplyLookup {
        find_reply(
            self.corpus.turns().as_slice(),
            index,
            &self.config.reply_speaker,
            self.config.lookahead,
        )
    }

    /// Match a query and look up the reply that follows it.
    #[instrument(skip(self), fields(query = %query))]
    pub fn respond(&self, query: &str) -> MatchOutcome {
        if self.corpus.is_empty() {
            return MatchOutcome::NotReady;
        }

        let matched = self.find_match(query);
        let Some(index) = matched.index else {
            info!("No matching line");
            return MatchOutcome::NoMatch;
        };

        match self.find_reply(index) {
            ReplyLookup::Found {
                index: reply_index,
                text,
            } => {
                info!("Matched turn {}, reply at {}", index, reply_index);
                MatchOutcome::Reply {
                    matched,
                    reply_index,
                    text,
                }
            }
            ReplyLookup::NotInWindow => {
                info!(
                    "Matched turn {}, no {} reply within {} turns",
                    index, self.config.reply_speaker, self.config.lookahead
                );
                MatchOutcome::NoReplyInWindow { matched }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(spec: &[(&str, &str)]) -> Vec<Turn> {
        spec.iter().map(|(s, t)| Turn::new(*s, *t)).collect()
    }

    fn refund_corpus() -> Arc<Corpus> {
        Arc::new(Corpus::from_turns(turns(&[
            ("Customer", "I want a refund"),
            ("Agent", "Let me check your order"),
        ])))
    }

    #[test]
    fn test_exact_match_and_reply() {
        let matcher = Matcher::new(refund_corpus());

        let matched = matcher.find_match("refund");
        assert_eq!(matched.index, Some(0));
        assert_eq!(matched.score, 1.0);
        assert_eq!(matched.tier, Some(MatchTier::Exact));

        match matcher.respond("refund") {
            MatchOutcome::Reply {
                reply_index, text, ..
            } => {
                assert_eq!(reply_index, 1);
                assert_eq!(text, "Let me check your order");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_is_case_insensitive_and_trims_query() {
        let matcher = Matcher::new(refund_corpus());
        assert_eq!(matcher.find_match("  I WANT A  ").index, Some(0));
    }

    #[test]
    fn test_first_exact_match_wins_over_better_one() {
        let t = turns(&[
            ("Customer", "my order is late and the order number is wrong"),
            ("Customer", "order"),
        ]);
        let matched = find_match(&t, "order", DEFAULT_THRESHOLD);
        assert_eq!(matched.index, Some(0));
        assert_eq!(matched.score, 1.0);
    }

    #[test]
    fn test_typo_below_threshold_is_no_match() {
        let matcher = Matcher::new(refund_corpus());
        // ratio("refnd", "i want a refund") is exactly 0.5.
        assert_eq!(matcher.find_match("refnd"), MatchResult::none());
        assert_eq!(matcher.respond("refnd"), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_typo_above_threshold_matches_fuzzily() {
        let matcher = Matcher::new(refund_corpus());
        let matched = matcher.find_match("i want a refnd");
        assert_eq!(matched.index, Some(0));
        assert_eq!(matched.tier, Some(MatchTier::Fuzzy));
        assert!((matched.score - 28.0 / 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_prefers_highest_score() {
        let t = turns(&[
            ("Customer", "cancel my plan"),
            ("Customer", "cancel my subscriptio"),
            ("Customer", "cancel my subscription!"),
        ]);
        // Neither "cancel my subscriptoin" substring exists; the last line is closest.
        let matched = find_match(&t, "cancel my subscriptoin!", DEFAULT_THRESHOLD);
        assert_eq!(matched.index, Some(2));
    }

    #[test]
    fn test_fuzzy_tie_keeps_earliest() {
        let t = turns(&[("Customer", "abcx"), ("Customer", "abcy"), ("Customer", "abcx")]);
        let matched = find_match(&t, "abcz", DEFAULT_THRESHOLD);
        assert_eq!(matched.index, Some(0));
        assert!((matched.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_score_equal_to_threshold_is_rejected() {
        let t = turns(&[("Customer", "abcd")]);
        // ratio("abcz", "abcd") = 0.75.
        assert!(!find_match(&t, "abcz", 0.75).is_match());
        assert!(find_match(&t, "abcz", 0.74).is_match());
    }

    #[test]
    fn test_empty_query_matches_first_turn() {
        let matcher = Matcher::new(refund_corpus());
        assert_eq!(matcher.find_match("").index, Some(0));
        assert_eq!(matcher.find_match("   ").index, Some(0));
    }

    #[test]
    fn test_reply_window_is_bounded() {
        let t = turns(&[
            ("Customer", "hello"),
            ("Customer", "one"),
            ("Customer", "two"),
            ("Customer", "three"),
            ("Agent", "too late"),
        ]);
        assert_eq!(find_reply(&t, 0, "Agent", 3), ReplyLookup::NotInWindow);
        assert_eq!(
            find_reply(&t, 0, "Agent", 4),
            ReplyLookup::Found {
                index: 4,
                text: "too late".to_string()
            }
        );
        assert_eq!(
            find_reply(&t, 1, "Agent", 3),
            ReplyLookup::Found {
                index: 4,
                text: "too late".to_string()
            }
        );
    }

    #[test]
    fn test_reply_speaker_is_case_sensitive() {
        let t = turns(&[("Customer", "hello"), ("agent", "hi"), ("AGENT", "hi")]);
        assert_eq!(find_reply(&t, 0, "Agent", 3), ReplyLookup::NotInWindow);
    }

    #[test]
    fn test_reply_skips_non_agent_turns() {
        let t = turns(&[
            ("Customer", "hello"),
            ("Customer", "are you there"),
            ("Agent", "yes"),
        ]);
        assert_eq!(
            find_reply(&t, 0, "Agent", 3),
            ReplyLookup::Found {
                index: 2,
                text: "yes".to_string()
            }
        );
    }

    #[test]
    fn test_match_on_last_turn_has_no_reply() {
        let corpus = Arc::new(Corpus::from_turns(turns(&[
            ("Agent", "How can I help?"),
            ("Customer", "Goodbye then"),
        ])));
        let matcher = Matcher::new(corpus);

        match matcher.respond("goodbye") {
            MatchOutcome::NoReplyInWindow { matched } => assert_eq!(matched.index, Some(1)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_reply_index_past_end() {
        let t = turns(&[("Customer", "hello")]);
        assert_eq!(find_reply(&t, 0, "Agent", 3), ReplyLookup::NotInWindow);
        assert_eq!(find_reply(&t, usize::MAX, "Agent", 3), ReplyLookup::NotInWindow);
    }

    #[test]
    fn test_empty_corpus_is_not_ready() {
        let matcher = Matcher::new(Arc::new(Corpus::failed(None, "missing")));
        assert_eq!(matcher.respond("refund"), MatchOutcome::NotReady);
        assert!(!matcher.find_match("refund").is_match());
    }

    #[test]
    fn test_custom_reply_speaker_and_window() {
        let matcher = Matcher::new(Arc::new(Corpus::from_turns(turns(&[
            ("Caller", "where is my parcel"),
            ("Caller", "hello?"),
            ("Rep", "checking now"),
        ]))))
        .with_config(MatcherConfig {
            threshold: DEFAULT_THRESHOLD,
            lookahead: 1,
            reply_speaker: "Rep".to_string(),
        });

        assert_eq!(
            matcher.respond("parcel"),
            MatchOutcome::NoReplyInWindow {
                matched: MatchResult {
                    index: Some(0),
                    score: 1.0,
                    tier: Some(MatchTier::Exact)
                }
            }
        );
        assert!(matches!(matcher.respond("hello?"), MatchOutcome::Reply { reply_index: 2, .. }));
    }
}
