use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::chat::dispatch::{dispatch, ChatOutcome, ChatRequest};
use crate::errors::AppError;
use crate::models::match_record::MatchSummary;
use crate::session::state::ContextSnapshot;
use crate::state::AppState;

/// One chat turn: the session it belongs to plus the routed request.
#[derive(Debug, Deserialize)]
pub struct ChatEnvelope {
    pub session_id: String,
    #[serde(flatten)]
    pub request: ChatRequest,
}

/// POST /api/v1/chat
///
/// Acquires the session for the whole turn; a concurrent turn for the
/// same session gets `SessionBusy` rather than interleaving state.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(envelope): Json<ChatEnvelope>,
) -> Result<Json<ChatOutcome>, AppError> {
    if envelope.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id cannot be empty".to_string()));
    }
    debug!("Chat turn for session {}", envelope.session_id);

    let mut session = state.sessions.acquire(&envelope.session_id)?;
    let outcome = dispatch(&state.deps, &mut session, envelope.request).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

/// POST /api/v1/chat/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<Value>, AppError> {
    let mut session = state.sessions.acquire(&req.session_id)?;
    session.reset();
    Ok(Json(json!({ "status": "reset" })))
}

/// GET /api/v1/sessions/:id/context
pub async fn handle_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ContextSnapshot>, AppError> {
    let session = state.sessions.acquire(&session_id)?;
    Ok(Json(session.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// GET /api/v1/matches/:resume_id
pub async fn handle_saved_matches(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
    Query(params): Query<MatchesQuery>,
) -> Result<Json<Vec<MatchSummary>>, AppError> {
    let limit = params.limit.clamp(1, 100);
    let matches = state.deps.store.top_matches(resume_id, limit).await?;
    Ok(Json(matches))
}
