//! HTTP API server.
//!
//! Serves line matching, grounded chat and causal analysis over one corpus
//! loaded at startup.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::corpus::{Corpus, Turn};
use crate::error::CallscopeError;
use crate::matcher::{MatchOutcome, Matcher, MatcherConfig};
use crate::reasoning::{
    CausalAnalyzer, ChatMessage, GroundedChat, Generator, OpenAIGenerator,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Reply used when the corpus has no turns.
pub const NOT_READY_MESSAGE: &str = "System Error: Dataset not loaded. Check server logs.";
/// Reply used when no line matches the query.
pub const NO_MATCH_MESSAGE: &str =
    "I couldn't find that line in the script. Please copy-paste a specific Customer line from your file.";
/// Reply used for blank queries.
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a line from the transcript to search for.";

/// Reply used when a line matched but `speaker` did not answer within the window.
pub fn no_reply_message(speaker: &str) -> String {
    format!("[End of conversation or no {} reply found next]", speaker)
}

/// Shared application state.
pub struct AppState {
    corpus: Arc<Corpus>,
    matcher: Matcher,
    chat: GroundedChat,
    analyzer: CausalAnalyzer,
}

impl AppState {
    /// Wire every service to one corpus.
    pub fn new(
        corpus: Arc<Corpus>,
        matcher_config: MatcherConfig,
        chat_generator: Arc<dyn Generator>,
        analysis_generator: Arc<dyn Generator>,
        prompts: Prompts,
        max_history: usize,
    ) -> Self {
        Self {
            matcher: Matcher::new(corpus.clone()).with_config(matcher_config),
            chat: GroundedChat::new(corpus.clone(), chat_generator)
                .with_prompts(prompts.clone())
                .with_max_history(max_history),
            analyzer: CausalAnalyzer::new(corpus.clone(), analysis_generator).with_prompts(prompts),
            corpus,
        }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    // Any origin is accepted; restrict before exposing beyond a prototype.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/reason", post(reason))
        .route("/api/transcripts/{transcript_id}", get(get_transcript))
        .route("/api/transcripts/{transcript_id}/analysis", get(analyze))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let corpus = super::open_corpus(&settings);
    if !corpus.report().is_ready() {
        warn!("Serving without data; every chat request will report the dataset as not loaded");
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    if !crate::openai::is_api_key_configured() {
        warn!("OPENAI_API_KEY is not set; /api/reason and analysis requests will fail");
    }
    let chat_generator = Arc::new(
        OpenAIGenerator::from_settings(&settings.llm)?.with_system(&prompts.reasoning.system),
    );
    let analysis_generator = Arc::new(
        OpenAIGenerator::from_settings(&settings.llm)?
            .with_system(&prompts.analysis.system)
            .with_temperature(0.0),
    );

    let state = Arc::new(AppState::new(
        corpus,
        MatcherConfig::from(&settings.matcher),
        chat_generator,
        analysis_generator,
        prompts,
        settings.llm.max_history,
    ));

    let app = router(state.clone());

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Callscope API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Indexed turns", &state.corpus.len().to_string());
    println!();
    println!("Endpoints:");
    Output::kv("Status", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /api/chat");
    Output::kv("Reason", "POST /api/reason");
    Output::kv("Transcript", "GET  /api/transcripts/{id}");
    Output::kv("Analysis", "GET  /api/transcripts/{id}/analysis");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// === Request/Response Types ===

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// How a chat query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOutcome {
    Reply,
    NoReply,
    NoMatch,
    NotReady,
    EmptyQuery,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub outcome: ChatOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
}

impl ChatResponse {
    fn message(outcome: ChatOutcome, response: &str) -> Self {
        Self {
            response: response.to_string(),
            outcome,
            matched_index: None,
            score: None,
            reply_index: None,
            transcript_id: None,
        }
    }

    /// Describe a matcher outcome for the caller.
    pub fn from_outcome(outcome: MatchOutcome, corpus: &Corpus, reply_speaker: &str) -> Self {
        let transcript_of = |index: Option<usize>| {
            index
                .and_then(|i| corpus.transcript_of(i))
                .map(|t| t.transcript_id.clone())
        };

        match outcome {
            MatchOutcome::Reply {
                matched,
                reply_index,
                text,
            } => Self {
                response: text,
                outcome: ChatOutcome::Reply,
                matched_index: matched.index,
                score: Some(matched.score),
                reply_index: Some(reply_index),
                transcript_id: transcript_of(matched.index),
            },
            MatchOutcome::NoReplyInWindow { matched } => Self {
                response: no_reply_message(reply_speaker),
                outcome: ChatOutcome::NoReply,
                matched_index: matched.index,
                score: Some(matched.score),
                reply_index: None,
                transcript_id: transcript_of(matched.index),
            },
            MatchOutcome::NoMatch => Self::message(ChatOutcome::NoMatch, NO_MATCH_MESSAGE),
            MatchOutcome::NotReady => Self::message(ChatOutcome::NotReady, NOT_READY_MESSAGE),
        }
    }
}

#[derive(Deserialize)]
pub struct ReasonRequest {
    pub query: String,
    pub transcript_id: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    loaded_turns: usize,
    transcripts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    loaded_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct TranscriptResponse<'a> {
    transcript_id: &'a str,
    intent: &'a str,
    reason_for_call: &'a str,
    conversation: &'a [Turn],
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: CallscopeError) -> Response {
    let status = match &e {
        CallscopeError::TranscriptNotFound(_) => StatusCode::NOT_FOUND,
        CallscopeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CallscopeError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.corpus.report();
    Json(StatusResponse {
        status: if report.is_ready() { "System Online" } else { "Degraded" },
        loaded_turns: report.turns,
        transcripts: report.transcripts,
        source: report.source.as_ref().map(|p| p.display().to_string()),
        loaded_at: report.loaded_at,
        error: report.error.clone(),
    })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    if state.corpus.is_empty() {
        return Json(ChatResponse::message(ChatOutcome::NotReady, NOT_READY_MESSAGE)).into_response();
    }
    if req.message.trim().is_empty() {
        return Json(ChatResponse::message(ChatOutcome::EmptyQuery, EMPTY_QUERY_MESSAGE))
            .into_response();
    }

    // The fuzzy pass scans the whole corpus; keep it off the async workers.
    let matcher = state.matcher.clone();
    let outcome = match tokio::task::spawn_blocking(move || matcher.respond(&req.message)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Matching task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Matching task failed".to_string(),
                }),
            )
                .into_response();
        }
    };

    Json(ChatResponse::from_outcome(
        outcome,
        &state.corpus,
        &state.matcher.config().reply_speaker,
    ))
    .into_response()
}

async fn reason(State(state): State<Arc<AppState>>, Json(req): Json<ReasonRequest>) -> Response {
    match state
        .chat
        .answer(&req.transcript_id, &req.query, req.history)
        .await
    {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(transcript_id): Path<String>,
) -> Response {
    match state.corpus.transcript(&transcript_id) {
        Some(record) => Json(TranscriptResponse {
            transcript_id: &record.transcript_id,
            intent: &record.intent,
            reason_for_call: &record.reason_for_call,
            conversation: state.corpus.conversation(record),
        })
        .into_response(),
        None => error_response(CallscopeError::TranscriptNotFound(transcript_id)),
    }
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(transcript_id): Path<String>,
) -> Response {
    match state.analyzer.analyze(&transcript_id).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => error_response(e),
    }
}
