//! CLI module for Callscope.

pub mod commands;
mod output;

pub use output::Output;

use crate::config::Settings;
use clap::{Parser, Subcommand};

/// Callscope - answers about call-center transcripts
///
/// Finds the line a user quotes in a transcript corpus and returns the agent's
/// reply, or asks a language model grounded questions about one transcript.
#[derive(Parser, Debug)]
#[command(name = "callscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to the transcript corpus (overrides corpus.path)
    #[arg(long, global = true, env = "CALLSCOPE_CORPUS")]
    pub corpus: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line overrides to the loaded settings.
    ///
    /// `config` commands see the file as written, so a one-off `--corpus`
    /// never ends up saved.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if matches!(self.command, Commands::Config { .. }) {
            return;
        }
        if let Some(corpus) = &self.corpus {
            settings.corpus.path = corpus.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Find a transcript line and print the agent's reply
    Query {
        /// Line to look for
        text: String,

        /// Number of turns searched for a reply (defaults to matcher.lookahead)
        #[arg(short, long)]
        lookahead: Option<usize>,
    },

    /// Ask a grounded question about one transcript
    Ask {
        /// Transcript identifier
        transcript_id: String,

        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Find the turn that drove the outcome of a call
    Analyze {
        /// Transcript identifier
        transcript_id: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check the corpus file for JSON syntax errors
    Validate {
        /// File to check (defaults to the configured corpus)
        path: Option<String>,
    },

    /// Load the corpus and report what was indexed
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
