pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers as evaluation;
use crate::interview::handlers as interview;
use crate::state::AppState;

/// Two PDFs per start request.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview API
        .route("/api/v1/sessions", post(interview::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(interview::handle_get_session).delete(interview::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/start",
            post(interview::handle_start_session),
        )
        .route(
            "/api/v1/sessions/:id/answers",
            post(interview::handle_submit_answer),
        )
        .route(
            "/api/v1/sessions/:id/next",
            post(interview::handle_next_question),
        )
        .route(
            "/api/v1/sessions/:id/reset",
            post(interview::handle_reset_session),
        )
        // Evaluation API
        .route(
            "/api/v1/evaluation/score",
            post(evaluation::handle_score_question),
        )
        .route(
            "/api/v1/evaluation/run",
            post(evaluation::handle_run_evaluation),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
