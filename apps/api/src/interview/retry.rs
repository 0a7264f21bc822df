//! Retry wrapper — drives proposer calls through an explicit state machine.
//!
//! ```text
//! Attempting(n) --ok----------------------------> Succeeded(Some(candidate))
//! Attempting(n) --rate limited, n < max--wait---> Attempting(n + 1)
//! Attempting(n) --rate limited, n == max--------> FailedTerminal
//! Attempting(n) --unauthorized------------------> FailedTerminal
//! Attempting(n) --bad request-------------------> Succeeded(None)
//! Attempting(n) --anything else-----------------> FailedTerminal
//! ```
//!
//! The wait before attempt `n + 1` is `base_delay × n`. Nothing carries over between
//! invocations: every call to `propose_with_retry` starts at `Attempting(1)`.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::interview::proposer::{Candidate, ProposalRequest, QuestionProposer};
use crate::llm_client::{FailureKind, LlmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(70),
        }
    }
}

impl RetryPolicy {
    /// Wait scheduled after attempt `attempt` was rate limited.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug)]
pub enum RetryState {
    Attempting(u32),
    /// `None` is the "no question available" sentinel.
    Succeeded(Option<Candidate>),
    FailedTerminal(LlmError),
}

/// Per-invocation bookkeeping: current attempt and the waits scheduled so far.
#[derive(Debug)]
pub struct RetryContext {
    policy: RetryPolicy,
    attempt: u32,
    waits: Vec<Duration>,
}

impl RetryContext {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 1,
            waits: Vec::new(),
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[cfg(test)]
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Applies a failed attempt. Returns the next state and, when another attempt
    /// follows, the wait that must elapse first.
    pub fn on_failure(&mut self, err: LlmError) -> (RetryState, Option<Duration>) {
        match err.kind() {
            FailureKind::RateLimited if self.attempt < self.policy.max_attempts => {
                let delay = self.policy.delay_after(self.attempt);
                self.waits.push(delay);
                self.attempt += 1;
                (RetryState::Attempting(self.attempt), Some(delay))
            }
            FailureKind::RateLimited => {
                let waited: Duration = self.waits.iter().sum();
                error!(
                    "Rate limit persisted after {} attempts ({}s spent waiting): {err}",
                    self.attempt,
                    waited.as_secs()
                );
                (RetryState::FailedTerminal(err), None)
            }
            FailureKind::Unauthorized => {
                error!("Generation backend rejected credentials: {err}");
                (RetryState::FailedTerminal(err), None)
            }
            FailureKind::BadRequest => {
                error!("Generation backend rejected the request, ending interview: {err}");
                (RetryState::Succeeded(None), None)
            }
            FailureKind::Unexpected => {
                error!("Unexpected error while generating a question: {err}");
                (RetryState::FailedTerminal(err), None)
            }
        }
    }
}

/// Calls the proposer under `policy`. `Ok(None)` means no further question is available.
pub async fn propose_with_retry(
    proposer: &dyn QuestionProposer,
    request: &ProposalRequest,
    policy: &RetryPolicy,
) -> Result<Option<Candidate>, LlmError> {
    let mut ctx = RetryContext::new(*policy);
    let mut state = RetryState::Attempting(ctx.attempt());

    loop {
        state = match state {
            RetryState::Attempting(attempt) => {
                debug!("Proposing question, attempt {attempt}/{}", policy.max_attempts);
                match proposer.propose(request).await {
                    Ok(candidate) => RetryState::Succeeded(Some(candidate)),
                    Err(err) => {
                        let (next, wait) = ctx.on_failure(err);
                        if let Some(delay) = wait {
                            warn!(
                                "Rate limit reached. Waiting {}s before attempt {}/{}",
                                delay.as_secs(),
                                ctx.attempt(),
                                policy.max_attempts
                            );
                            tokio::time::sleep(delay).await;
                        }
                        next
                    }
                }
            }
            RetryState::Succeeded(result) => return Ok(result),
            RetryState::FailedTerminal(err) => return Err(err),
        };
    }
}
