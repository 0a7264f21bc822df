use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::interview::conversation::ConversationError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Generation backend rejected credentials: {0}")]
    UpstreamUnauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unauthorized(msg) => AppError::UpstreamUnauthorized(msg),
            LlmError::RateLimited(msg) => AppError::RateLimited(msg),
            other => AppError::Llm(other.to_string()),
        }
    }
}

impl From<ConversationError> for AppError {
    fn from(err: ConversationError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Extraction(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                format!("{msg}. Please re-upload the document."),
            ),
            AppError::UpstreamUnauthorized(msg) => {
                tracing::error!("Generation backend unauthorized: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAUTHORIZED",
                    "The question generator rejected the configured API key. \
                     Check ANTHROPIC_API_KEY and restart the service."
                        .to_string(),
                )
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("Rate limit surfaced to client: {msg}");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "The question generator is rate limited. Please wait a few minutes and try again."
                        .to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
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
