use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::session::cache::ResultKind;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// None of these variants are fatal; every one maps to a structured JSON
/// error the caller can act on (re-list, reprompt, retry, rephrase).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Ordinal {ordinal} is out of range (1..={len})")]
    OutOfRange { ordinal: usize, len: usize },

    #[error("No {0} results in this session yet")]
    NoResults(ResultKind),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Scoring failed: {0}")]
    ScoringFailed(String),

    #[error("Another request is in flight for this session")]
    SessionBusy,

    #[error("Scoring oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::OutOfRange { .. } => {
                (StatusCode::BAD_REQUEST, "OUT_OF_RANGE", self.to_string())
            }
            AppError::NoResults(_) => (StatusCode::NOT_FOUND, "NO_RESULTS", self.to_string()),
            AppError::InvalidSelection(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_SELECTION", msg.clone())
            }
            AppError::Rejected(msg) => (StatusCode::BAD_REQUEST, "QUERY_REJECTED", msg.clone()),
            AppError::ScoringFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SCORING_FAILED",
                msg.clone(),
            ),
            AppError::SessionBusy => (StatusCode::CONFLICT, "SESSION_BUSY", self.to_string()),
            AppError::OracleUnavailable(msg) => {
                tracing::warn!("Oracle unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ORACLE_UNAVAILABLE",
                    "The scoring service is temporarily unavailable".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
