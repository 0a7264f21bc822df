//! Question proposer — one generation call from documents plus dialogue history.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interview::prompts::{
    DEMONSTRATIONS_HEADER, QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM,
};
use crate::llm_client::prompts::{fill_template, GROUNDING_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};

/// Everything the proposer sees for one call. Also the memo cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub resume_text: String,
    pub job_text: String,
    pub previous_questions: Vec<String>,
    pub previous_answers: Vec<String>,
}

/// A proposed question and why it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub question: String,
    pub rationale: String,
}

/// A worked example shown to the model ahead of the real request.
///
/// Bootstrapped demonstrations carry the rationale the model produced; demonstrations
/// taken straight from labelled training data have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demonstration {
    pub previous_questions: String,
    pub previous_answers: String,
    pub question: String,
    pub rationale: Option<String>,
}

#[async_trait]
pub trait QuestionProposer: Send + Sync {
    async fn propose(&self, request: &ProposalRequest) -> Result<Candidate, LlmError>;
}

/// Newline-joins a history sequence. An empty sequence becomes an empty string.
pub fn join_history(items: &[String]) -> String {
    items.join("\n")
}

/// Inverse of `join_history` for items without line breaks.
#[cfg(test)]
pub fn split_history(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split('\n').map(str::to_string).collect()
}

/// Proposer backed by the LLM client, optionally primed with tuned demonstrations.
#[derive(Clone)]
pub struct LlmQuestionProposer {
    llm: LlmClient,
    demonstrations: Vec<Demonstration>,
}

impl LlmQuestionProposer {
    pub fn new(llm: LlmClient, demonstrations: Vec<Demonstration>) -> Self {
        Self {
            llm,
            demonstrations,
        }
    }
}

#[async_trait]
impl QuestionProposer for LlmQuestionProposer {
    async fn propose(&self, request: &ProposalRequest) -> Result<Candidate, LlmError> {
        let prompt = build_question_prompt(request, &self.demonstrations);
        let candidate: Candidate = self.llm.call_json(&prompt, QUESTION_SYSTEM).await?;

        if candidate.question.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(
            "Proposed question after {} previous: {:?}",
            request.previous_questions.len(),
            candidate.question
        );
        Ok(candidate)
    }
}

pub(crate) fn build_question_prompt(
    request: &ProposalRequest,
    demonstrations: &[Demonstration],
) -> String {
    let demonstrations = render_demonstrations(demonstrations);
    let previous_questions = join_history(&request.previous_questions);
    let previous_answers = join_history(&request.previous_answers);

    fill_template(
        QUESTION_PROMPT_TEMPLATE,
        &[
            ("grounding_instruction", GROUNDING_INSTRUCTION),
            ("demonstrations", demonstrations.as_str()),
            ("resume_text", request.resume_text.as_str()),
            ("job_text", request.job_text.as_str()),
            ("previous_questions", previous_questions.as_str()),
            ("previous_answers", previous_answers.as_str()),
        ],
    )
}

fn render_demonstrations(demonstrations: &[Demonstration]) -> String {
    if demonstrations.is_empty() {
        return String::new();
    }

    let mut out = format!("{DEMONSTRATIONS_HEADER}\n\n");
    for (i, demo) in demonstrations.iter().enumerate() {
        out.push_str(&format!("Example {}:\n", i + 1));
        out.push_str(&format!(
            "Previous questions:\n{}\n",
            demo.previous_questions
        ));
        out.push_str(&format!("Previous answers:\n{}\n", demo.previous_answers));
        out.push_str(&format!("Question: {}\n", demo.question));
        if let Some(rationale) = &demo.rationale {
            out.push_str(&format!("Rationale: {rationale}\n"));
        }
        out.push('\n');
    }
    out
}
