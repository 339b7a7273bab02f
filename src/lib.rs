//! Callscope - call-center transcript lookup and reasoning
//!
//! Loads a corpus of call transcripts and answers two kinds of questions:
//!
//! - Given a line quoted from a call, what did the agent say next?
//! - Given a transcript, what does a language model make of it, grounded
//!   in that call's summary?
//!
//! # Architecture
//!
//! - `corpus` - Loading, flattening and syntax diagnostics for transcript files
//! - `matcher` - Exact and fuzzy line matching plus reply lookup
//! - `reasoning` - Grounded chat and causal analysis over a language model
//! - `config` - Settings and prompt templates
//! - `cli` - Command-line interface and the HTTP API server
//!
//! # Example
//!
//! ```rust,no_run
//! use callscope::corpus::load_corpus;
//! use callscope::matcher::{MatchOutcome, Matcher};
//! use std::sync::Arc;
//!
//! let corpus = Arc::new(load_corpus("data/transcript.json".as_ref()));
//! let matcher = Matcher::new(corpus);
//!
//! if let MatchOutcome::Reply { text, .. } = matcher.respond("I want a refund") {
//!     println!("Agent: {}", text);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod matcher;
pub mod openai;
pub mod reasoning;

pub use error::{CallscopeError, Result};
