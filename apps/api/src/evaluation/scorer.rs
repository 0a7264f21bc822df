//! Quality scoring — three independent yes/no assessments of a proposed question.
//!
//! Used to tune and evaluate the proposer offline. Never gates live questions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluation::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM};
use crate::evaluation::skills::identify_current_skill;
use crate::interview::proposer::join_history;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{LlmClient, LlmError};

/// A skill counts as covered once this many questions were asked about it.
pub const REDUNDANT_QUESTION_THRESHOLD: usize = 3;

/// Answers a yes/no question about a piece of text.
#[async_trait]
pub trait Assessor: Send + Sync {
    async fn assess(&self, assessed_text: &str, assessment_question: &str)
        -> Result<bool, LlmError>;
}

#[derive(Clone)]
pub struct LlmAssessor {
    llm: LlmClient,
}

impl LlmAssessor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct AssessmentAnswer {
    assessment_answer: String,
}

#[async_trait]
impl Assessor for LlmAssessor {
    async fn assess(
        &self,
        assessed_text: &str,
        assessment_question: &str,
    ) -> Result<bool, LlmError> {
        let prompt = fill_template(
            ASSESSMENT_PROMPT_TEMPLATE,
            &[
                ("assessment_question", assessment_question),
                ("assessed_text", assessed_text),
            ],
        );
        let answer: AssessmentAnswer = self.llm.call_json(&prompt, ASSESSMENT_SYSTEM).await?;
        Ok(is_yes(&answer.assessment_answer))
    }
}

fn is_yes(answer: &str) -> bool {
    answer.trim().trim_end_matches('.').eq_ignore_ascii_case("yes")
}

/// Outcome of the three assessments for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub redundant: bool,
    pub relevant: bool,
    pub appropriate_difficulty: bool,
}

impl AssessmentResult {
    /// Number of criteria met: not redundant, relevant, appropriately difficult.
    pub fn passed_count(&self) -> u8 {
        u8::from(!self.redundant) + u8::from(self.relevant) + u8::from(self.appropriate_difficulty)
    }

    /// Normalized score in thirds: 0, 1/3, 2/3 or 1.
    pub fn score(&self) -> f64 {
        f64::from(self.passed_count()) / 3.0
    }

    /// Pass/fail view: at least two of three criteria met.
    pub fn passes(&self) -> bool {
        self.score() > 0.5
    }
}

pub struct QualityScorer {
    assessor: Arc<dyn Assessor>,
    seniority: String,
}

impl QualityScorer {
    pub fn new(assessor: Arc<dyn Assessor>, seniority: impl Into<String>) -> Self {
        Self {
            assessor,
            seniority: seniority.into(),
        }
    }

    /// Detects the skill topic from the question and history, then scores.
    pub async fn evaluate(
        &self,
        question: &str,
        previous_questions: &[String],
    ) -> Result<AssessmentResult, LlmError> {
        let topic = identify_current_skill(question, previous_questions);
        self.score(question, previous_questions, topic).await
    }

    pub async fn score(
        &self,
        question: &str,
        previous_questions: &[String],
        topic: Option<&str>,
    ) -> Result<AssessmentResult, LlmError> {
        let redundancy_question = format!(
            "Have there already been {REDUNDANT_QUESTION_THRESHOLD} questions asked about {}?",
            topic.unwrap_or("the same skill")
        );
        let redundant = self
            .assessor
            .assess(&join_history(previous_questions), &redundancy_question)
            .await?;

        let relevant = self
            .assessor
            .assess(
                question,
                "Is this question relevant to the job description?",
            )
            .await?;

        let difficulty_question = format!(
            "Is this question appropriately challenging for a {} role?",
            self.seniority
        );
        let appropriate_difficulty = self.assessor.assess(question, &difficulty_question).await?;

        let result = AssessmentResult {
            redundant,
            relevant,
            appropriate_difficulty,
        };
        debug!(
            "Scored question (topic {:?}): {:?} -> {:.2}",
            topic,
            result,
            result.score()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::test_support::FixedAssessor;

    #[test]
    fn test_score_is_passed_count_in_thirds() {
        for redundant in [false, true] {
            for relevant in [false, true] {
                for appropriate_difficulty in [false, true] {
                    let result = AssessmentResult {
                        redundant,
                        relevant,
                        appropriate_difficulty,
                    };
                    let k = u8::from(!redundant)
                        + u8::from(relevant)
                        + u8::from(appropriate_difficulty);
                    assert_eq!(result.passed_count(), k);
                    assert!((result.score() - f64::from(k) / 3.0).abs() < f64::EPSILON);
                    assert_eq!(result.passes(), k >= 2, "{result:?}");
                }
            }
        }
    }

    #[test]
    fn test_is_yes_is_lenient_on_case_and_whitespace() {
        assert!(is_yes("Yes"));
        assert!(is_yes(" yes. "));
        assert!(is_yes("YES"));
        assert!(!is_yes("No"));
        assert!(!is_yes("yes, but"));
    }

    #[tokio::test]
    async fn test_scorer_issues_three_assessments() {
        let assessor = Arc::new(FixedAssessor::new(false, true, false));
        let scorer = QualityScorer::new(assessor.clone(), "senior developer");
        let previous = vec!["Do you know SQL?".to_string(), "Which SQL engines?".to_string()];

        let result = scorer
            .evaluate("How do you index a SQL table?", &previous)
            .await
            .unwrap();

        assert_eq!(result.passed_count(), 2);
        assert!(result.passes());

        let calls = assessor.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "Do you know SQL?\nWhich SQL engines?");
        assert_eq!(
            calls[0].1,
            "Have there already been 3 questions asked about sql?"
        );
        assert_eq!(calls[1].0, "How do you index a SQL table?");
        assert!(calls[2].1.contains("senior developer role"));
    }

    #[tokio::test]
    async fn test_missing_topic_uses_generic_wording() {
        let assessor = Arc::new(FixedAssessor::new(true, false, false));
        let scorer = QualityScorer::new(assessor.clone(), "staff engineer");

        let result = scorer.score("Why this company?", &[], None).await.unwrap();

        assert_eq!(result.score(), 0.0);
        assert!(!result.passes());
        let calls = assessor.calls.lock().unwrap();
        assert!(calls[0].1.ends_with("about the same skill?"));
        assert!(calls[2].1.contains("staff engineer role"));
    }
}
