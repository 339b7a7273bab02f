//! CLI command implementations.

mod analyze;
mod ask;
mod config;
mod query;
mod serve;
mod status;
mod validate;

pub use analyze::run_analyze;
pub use ask::run_ask;
pub use config::run_config;
pub use query::run_query;
pub use serve::{router, run_serve, AppState};
pub use status::run_status;
pub use validate::run_validate;

use crate::config::Settings;
use crate::corpus::{load_corpus, Corpus};
use std::sync::Arc;

/// Load the configured corpus once for a command.
fn open_corpus(settings: &Settings) -> Arc<Corpus> {
    Arc::new(load_corpus(&settings.corpus_path()))
}
