//! Query command implementation.

use super::serve::{no_reply_message, EMPTY_QUERY_MESSAGE, NOT_READY_MESSAGE, NO_MATCH_MESSAGE};
use crate::cli::Output;
use crate::config::Settings;
use crate::matcher::{MatchOutcome, MatchResult, Matcher, MatcherConfig};
use anyhow::Result;

/// Run the query command.
pub fn run_query(text: &str, lookahead: Option<usize>, settings: Settings) -> Result<()> {
    if text.trim().is_empty() {
        Output::warning(EMPTY_QUERY_MESSAGE);
        return Ok(());
    }

    let corpus = super::open_corpus(&settings);
    let mut config = MatcherConfig::from(&settings.matcher);
    if let Some(lookahead) = lookahead {
        config.lookahead = lookahead;
    }
    let matcher = Matcher::new(corpus.clone()).with_config(config);

    match matcher.respond(text) {
        MatchOutcome::Reply {
            matched,
            reply_index,
            text,
        } => {
            print_match(&matcher, &matched);
            let speaker = &matcher.config().reply_speaker;
            Output::turn(reply_index, speaker, &text);
        }
        MatchOutcome::NoReplyInWindow { matched } => {
            print_match(&matcher, &matched);
            Output::warning(&no_reply_message(&matcher.config().reply_speaker));
        }
        MatchOutcome::NoMatch => Output::warning(NO_MATCH_MESSAGE),
        MatchOutcome::NotReady => {
            Output::error(NOT_READY_MESSAGE);
            if let Some(reason) = &corpus.report().error {
                Output::info(reason);
            }
            anyhow::bail!("No transcript data loaded");
        }
    }

    Ok(())
}

fn print_match(matcher: &Matcher, matched: &MatchResult) {
    let Some(index) = matched.index else {
        return;
    };
    let corpus = matcher.corpus();

    let mut label = format!("score {:.2}", matched.score);
    if let Some(record) = corpus.transcript_of(index) {
        label = format!("{}, transcript {}", label, record.transcript_id);
    }
    Output::info(&format!("Matched line ({})", label));

    if let Some(turn) = corpus.turns().get(index) {
        Output::turn(index, &turn.speaker, &turn.text);
    }
}
