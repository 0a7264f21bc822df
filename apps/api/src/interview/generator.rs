//! Question generation — memo cache in front of the retrying proposer.
//!
//! Flow: cache lookup → propose_with_retry → cache store (real questions only).

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::interview::proposer::{Candidate, ProposalRequest, QuestionProposer};
use crate::interview::retry::{propose_with_retry, RetryPolicy};
use crate::llm_client::LlmError;

/// Memo of generated questions, keyed by the full proposal request.
/// Only real questions are stored; the sentinel and errors always reach the backend.
pub type QuestionCache = TtlCache<ProposalRequest, Candidate>;

pub struct QuestionGenerator {
    proposer: Arc<dyn QuestionProposer>,
    policy: RetryPolicy,
    cache: QuestionCache,
}

impl QuestionGenerator {
    pub fn new(proposer: Arc<dyn QuestionProposer>, policy: RetryPolicy, cache: QuestionCache) -> Self {
        Self {
            proposer,
            policy,
            cache,
        }
    }

    pub fn proposer(&self) -> &Arc<dyn QuestionProposer> {
        &self.proposer
    }

    /// Returns the next question, or `None` when the interview should end.
    pub async fn next_question(
        &self,
        request: &ProposalRequest,
    ) -> Result<Option<Candidate>, LlmError> {
        if let Some(hit) = self.cache.get(request) {
            debug!(
                "Question cache hit after {} previous questions",
                request.previous_questions.len()
            );
            return Ok(Some(hit));
        }

        let result = propose_with_retry(self.proposer.as_ref(), request, &self.policy).await?;

        match &result {
            Some(candidate) => {
                self.cache.insert(request.clone(), candidate.clone());
                info!(
                    "Generated question {}",
                    request.previous_questions.len() + 1
                );
            }
            None => info!("No further question available"),
        }

        Ok(result)
    }
}
