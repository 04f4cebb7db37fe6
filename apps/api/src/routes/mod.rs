pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/chat", post(handlers::handle_chat))
        .route("/api/v1/chat/reset", post(handlers::handle_reset))
        .route(
            "/api/v1/sessions/:id/context",
            get(handlers::handle_context),
        )
        .route(
            "/api/v1/matches/:resume_id",
            get(handlers::handle_saved_matches),
        )
        .with_state(state)
}
