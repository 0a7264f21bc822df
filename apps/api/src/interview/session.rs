//! Interview sessions — explicit per-session state plus the greeting/question/answer loop.
//!
//! Each session sits behind its own async mutex. A handler holds the lock for its whole
//! chain of backend calls, so one session never sees two chains at once.

use std::num::NonZeroUsize;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::DocumentKind;
use crate::interview::conversation::{ConversationState, Turn};
use crate::interview::generator::QuestionGenerator;
use crate::interview::proposer::{Candidate, ProposalRequest};

pub const GREETING: &str =
    "Hello! I'm your AI interviewer today. Let's begin with the first question.";
pub const CLOSING: &str =
    "Thank you for completing the interview. Let me know if you have any questions!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    /// Started, but the next question has not been generated yet (or generation failed).
    AwaitingQuestion,
    AwaitingAnswer,
    Completed,
}

#[derive(Debug)]
pub struct InterviewSession {
    id: Uuid,
    status: SessionStatus,
    conversation: ConversationState,
    resume_text: String,
    job_text: String,
    current_question: Option<Candidate>,
    created_at: DateTime<Utc>,
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub status: SessionStatus,
    pub turns: Vec<Turn>,
    pub current_question: Option<Candidate>,
    pub resume_words: usize,
    pub job_description_words: usize,
    pub created_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: SessionStatus::NotStarted,
            conversation: ConversationState::new(),
            resume_text: String::new(),
            job_text: String::new(),
            current_question: None,
            created_at: Utc::now(),
        }
    }

    /// Clears everything except the id.
    pub fn reset(&mut self) {
        info!("Resetting session {}", self.id);
        self.status = SessionStatus::NotStarted;
        self.conversation.clear();
        self.resume_text.clear();
        self.job_text.clear();
        self.current_question = None;
    }

    /// Stores the documents, greets, and asks the first question.
    ///
    /// Empty documents mean extraction failed upstream; the session stays untouched.
    pub async fn start(
        &mut self,
        resume_text: String,
        job_text: String,
        generator: &QuestionGenerator,
    ) -> Result<(), AppError> {
        if self.status != SessionStatus::NotStarted {
            return Err(AppError::Conflict(
                "session already started; reset it first".to_string(),
            ));
        }

        let missing: Vec<&str> = [
            (DocumentKind::Resume, &resume_text),
            (DocumentKind::JobDescription, &job_text),
        ]
        .iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(kind, _)| kind.as_str())
        .collect();
        if !missing.is_empty() {
            return Err(AppError::Extraction(format!(
                "could not read text from: {}",
                missing.join(", ")
            )));
        }

        self.resume_text = resume_text;
        self.job_text = job_text;
        self.conversation.push_greeting(GREETING)?;
        self.status = SessionStatus::AwaitingQuestion;
        info!("Session {} started", self.id);

        self.advance(generator).await
    }

    /// Generates the next question. On the end-of-interview sentinel, closes the session.
    /// On error nothing is appended and the session stays in `AwaitingQuestion`.
    pub async fn advance(&mut self, generator: &QuestionGenerator) -> Result<(), AppError> {
        if self.status != SessionStatus::AwaitingQuestion {
            return Err(AppError::Conflict(format!(
                "cannot generate a question while {:?}",
                self.status
            )));
        }

        let request = ProposalRequest {
            resume_text: self.resume_text.clone(),
            job_text: self.job_text.clone(),
            previous_questions: self.conversation.previous_questions(),
            previous_answers: self.conversation.previous_answers(),
        };

        match generator.next_question(&request).await? {
            Some(candidate) => {
                self.conversation.push_question(&candidate.question)?;
                self.current_question = Some(candidate);
                self.status = SessionStatus::AwaitingAnswer;
            }
            None => {
                self.conversation.push_assistant(CLOSING.to_string())?;
                self.current_question = None;
                self.status = SessionStatus::Completed;
                info!("Session {} completed", self.id);
            }
        }
        Ok(())
    }

    /// Records the answer to the pending question, then asks the next one.
    pub async fn submit_answer(
        &mut self,
        answer: &str,
        generator: &QuestionGenerator,
    ) -> Result<(), AppError> {
        if self.status != SessionStatus::AwaitingAnswer {
            return Err(AppError::Conflict(format!(
                "no question is waiting for an answer (status {:?})",
                self.status
            )));
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::Validation("answer cannot be empty".to_string()));
        }

        self.conversation.push_answer(answer)?;
        self.current_question = None;
        self.status = SessionStatus::AwaitingQuestion;

        self.advance(generator).await
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            status: self.status,
            turns: self.conversation.turns().to_vec(),
            current_question: self.current_question.clone(),
            resume_words: self.resume_text.split_whitespace().count(),
            job_description_words: self.job_text.split_whitespace().count(),
            created_at: self.created_at,
        }
    }
}

pub type SessionHandle = Arc<Mutex<InterviewSession>>;

struct StoredSession {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Live sessions, by id. Bounded: the least recently used session is dropped when
/// the store is full, and sessions untouched for `idle_ttl` expire.
///
/// A handler that already holds a handle keeps working on it after eviction;
/// later lookups of that id are `NotFound`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<std::sync::Mutex<LruCache<Uuid, StoredSession>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    /// A capacity of zero is treated as one.
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(std::sync::Mutex::new(LruCache::new(capacity))),
            idle_ttl,
        }
    }

    pub fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(InterviewSession::new(id)));
        let stored = StoredSession {
            handle: handle.clone(),
            last_seen: Instant::now(),
        };
        if let Some((evicted, _)) = self.lock().push(id, stored) {
            info!("Session store full, dropped least recently used session {evicted}");
        }
        info!("Created session {id}");
        handle
    }

    /// Looks a session up and marks it as recently used.
    pub fn get(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        let mut sessions = self.lock();
        let idle = sessions
            .peek(&id)
            .map(|s| s.last_seen.elapsed() >= self.idle_ttl)
            .ok_or_else(|| not_found(id))?;
        if idle {
            sessions.pop(&id);
            info!("Session {id} expired after being idle");
            return Err(not_found(id));
        }

        let stored = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        stored.last_seen = Instant::now();
        Ok(stored.handle.clone())
    }

    pub fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.lock()
            .pop(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    /// Drops every session idle for at least `idle_ttl`. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        let mut sessions = self.lock();
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| s.last_seen.elapsed() >= self.idle_ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in &idle {
            sessions.pop(id);
        }
        idle.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Uuid, StoredSession>> {
        // Never held across an await, so a poisoned lock still guards a consistent map.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
