//! Tuning — bootstraps few-shot demonstrations for the proposer and evaluates it.
//!
//! The compiled demonstrations persist as a JSON artifact at a fixed path. The
//! artifact is an opaque cache: present and non-empty means use it, otherwise
//! compile and write it back. There is no versioning or invalidation.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::evaluation::dataset::TrainingExample;
use crate::evaluation::scorer::QualityScorer;
use crate::interview::proposer::{join_history, Candidate, Demonstration, QuestionProposer};
use crate::llm_client::{FailureKind, LlmError};

pub const MAX_BOOTSTRAPPED_DEMOS: usize = 5;
pub const MAX_LABELED_DEMOS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningArtifact {
    pub demonstrations: Vec<Demonstration>,
    pub compiled_at: DateTime<Utc>,
}

impl TuningArtifact {
    /// Returns `None` when the file is missing or empty.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let artifact = serde_json::from_slice(&bytes)
            .with_context(|| format!("Tuning artifact {} is not valid JSON", path.display()))?;
        Ok(Some(artifact))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Credential and rate-limit failures abort a tuning run; anything else only skips
/// the example at hand.
fn aborts_run(err: &LlmError) -> bool {
    matches!(
        err.kind(),
        FailureKind::Unauthorized | FailureKind::RateLimited
    )
}

async fn propose_and_score(
    proposer: &dyn QuestionProposer,
    scorer: &QualityScorer,
    example: &TrainingExample,
) -> Result<(Candidate, f64, bool), LlmError> {
    let candidate = proposer.propose(&example.to_request()).await?;
    let result = scorer
        .evaluate(&candidate.question, &example.previous_questions)
        .await?;
    Ok((candidate, result.score(), result.passes()))
}

/// Runs the proposer over the training set and keeps passing predictions as
/// demonstrations, then tops up with labelled examples.
pub async fn compile(
    proposer: &dyn QuestionProposer,
    scorer: &QualityScorer,
    trainset: &[TrainingExample],
) -> Result<TuningArtifact, LlmError> {
    let mut demonstrations = Vec::new();
    let mut bootstrapped = vec![false; trainset.len()];

    for (i, example) in trainset.iter().enumerate() {
        if demonstrations.len() >= MAX_BOOTSTRAPPED_DEMOS {
            break;
        }
        match propose_and_score(proposer, scorer, example).await {
            Ok((candidate, _, true)) => {
                demonstrations.push(Demonstration {
                    previous_questions: join_history(&example.previous_questions),
                    previous_answers: join_history(&example.previous_answers),
                    question: candidate.question,
                    rationale: Some(candidate.rationale),
                });
                bootstrapped[i] = true;
            }
            Ok((candidate, score, false)) => {
                info!(
                    "Example {} not bootstrapped (score {score:.2}): {:?}",
                    i + 1,
                    candidate.question
                );
            }
            Err(e) if aborts_run(&e) => return Err(e),
            Err(e) => warn!("Skipping example {} during tuning: {e}", i + 1),
        }
    }

    let bootstrapped_count = demonstrations.len();
    for (example, _) in trainset
        .iter()
        .zip(&bootstrapped)
        .filter(|(_, used)| !**used)
    {
        if demonstrations.len() >= MAX_LABELED_DEMOS {
            break;
        }
        demonstrations.push(Demonstration {
            previous_questions: join_history(&example.previous_questions),
            previous_answers: join_history(&example.previous_answers),
            question: example.question.clone(),
            rationale: None,
        });
    }

    info!(
        "Compiled {} demonstrations ({} bootstrapped, {} labelled)",
        demonstrations.len(),
        bootstrapped_count,
        demonstrations.len() - bootstrapped_count
    );

    Ok(TuningArtifact {
        demonstrations,
        compiled_at: Utc::now(),
    })
}

/// Loads the artifact at `path`, or compiles one and writes it there.
pub async fn load_or_compile(
    path: &Path,
    proposer: &dyn QuestionProposer,
    scorer: &QualityScorer,
    trainset: &[TrainingExample],
) -> Result<TuningArtifact> {
    match TuningArtifact::load(path).await {
        Ok(Some(artifact)) => {
            info!(
                "Loaded {} demonstrations from {}",
                artifact.demonstrations.len(),
                path.display()
            );
            return Ok(artifact);
        }
        Ok(None) => info!("No tuning artifact at {}, compiling", path.display()),
        Err(e) => warn!("Ignoring unreadable tuning artifact: {e:#}"),
    }

    let artifact = compile(proposer, scorer, trainset)
        .await
        .context("Tuning compilation failed")?;
    artifact.save(path).await?;
    info!("Saved tuning artifact to {}", path.display());
    Ok(artifact)
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleScore {
    pub gold_question: String,
    pub proposed_question: Option<String>,
    pub score: f64,
    pub passes: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub average_score: f64,
    pub passed: usize,
    pub total: usize,
    pub examples: Vec<ExampleScore>,
}

/// Scores the proposer on every example. Skipped examples count as zero.
pub async fn evaluate(
    proposer: &dyn QuestionProposer,
    scorer: &QualityScorer,
    devset: &[TrainingExample],
) -> Result<EvaluationReport, LlmError> {
    let mut examples = Vec::with_capacity(devset.len());

    for example in devset {
        let entry = match propose_and_score(proposer, scorer, example).await {
            Ok((candidate, score, passes)) => ExampleScore {
                gold_question: example.question.clone(),
                proposed_question: Some(candidate.question),
                score,
                passes,
                error: None,
            },
            Err(e) if aborts_run(&e) => return Err(e),
            Err(e) => {
                warn!("Evaluation example failed: {e}");
                ExampleScore {
                    gold_question: example.question.clone(),
                    proposed_question: None,
                    score: 0.0,
                    passes: false,
                    error: Some(e.to_string()),
                }
            }
        };
        examples.push(entry);
    }

    let total = examples.len();
    let passed = examples.iter().filter(|e| e.passes).count();
    let average_score = if total == 0 {
        0.0
    } else {
        examples.iter().map(|e| e.score).sum::<f64>() / total as f64
    };
    info!("Evaluation: average {average_score:.3}, {passed}/{total} passing");

    Ok(EvaluationReport {
        average_score,
        passed,
        total,
        examples,
    })
}
