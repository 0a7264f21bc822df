//! Axum route handlers for offline question evaluation.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::evaluation::scorer::AssessmentResult;
use crate::evaluation::skills::identify_current_skill;
use crate::evaluation::tuning::{evaluate, EvaluationReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub question: String,
    #[serde(default)]
    pub previous_questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub topic: Option<String>,
    pub assessment: AssessmentResult,
    pub score: f64,
    pub passes: bool,
}

/// POST /api/v1/evaluation/score
///
/// Scores a single question against the given history.
pub async fn handle_score_question(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }

    let topic = identify_current_skill(&request.question, &request.previous_questions);
    let assessment = state
        .scorer
        .score(&request.question, &request.previous_questions, topic)
        .await?;

    Ok(Json(ScoreResponse {
        topic: topic.map(str::to_string),
        score: assessment.score(),
        passes: assessment.passes(),
        assessment,
    }))
}

/// POST /api/v1/evaluation/run
///
/// Runs the live proposer over the built-in training set and scores every question.
pub async fn handle_run_evaluation(
    State(state): State<AppState>,
) -> Result<Json<EvaluationReport>, AppError> {
    let report = evaluate(
        state.generator.proposer().as_ref(),
        &state.scorer,
        &state.trainset,
    )
    .await?;
    Ok(Json(report))
}
