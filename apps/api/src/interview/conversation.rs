//! Conversation state — the append-only turn log of one interview session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix that marks an assistant turn as an interview question.
pub const QUESTION_PREFIX: &str = "Q: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    Human,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("the interview has not started yet")]
    NotStarted,

    #[error("expected a {expected:?} turn next")]
    OutOfOrder { expected: Role },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The opening assistant turn. Only valid on an empty conversation.
    pub fn push_greeting(&mut self, text: &str) -> Result<(), ConversationError> {
        if !self.turns.is_empty() {
            return Err(ConversationError::OutOfOrder {
                expected: self.expected_role(),
            });
        }
        self.append(Role::Assistant, text.to_string());
        Ok(())
    }

    /// Appends an assistant question, stored on one line with `QUESTION_PREFIX`.
    pub fn push_question(&mut self, question: &str) -> Result<(), ConversationError> {
        self.push_assistant(format!("{QUESTION_PREFIX}{}", single_line(question)))
    }

    /// Appends a non-question assistant message, such as the closing line.
    pub fn push_assistant(&mut self, text: String) -> Result<(), ConversationError> {
        self.check_next(Role::Assistant)?;
        self.append(Role::Assistant, text);
        Ok(())
    }

    /// Appends a candidate answer, stored on one line.
    pub fn push_answer(&mut self, answer: &str) -> Result<(), ConversationError> {
        self.check_next(Role::Human)?;
        self.append(Role::Human, single_line(answer));
        Ok(())
    }

    /// Questions asked so far, in order, with the prefix removed.
    pub fn previous_questions(&self) -> Vec<String> {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .filter_map(|t| t.text.strip_prefix(QUESTION_PREFIX))
            .map(str::to_string)
            .collect()
    }

    /// Answers given so far, in order.
    pub fn previous_answers(&self) -> Vec<String> {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Human)
            .map(|t| t.text.clone())
            .collect()
    }

    /// Drops every turn. Used when a session is reset.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn expected_role(&self) -> Role {
        match self.turns.last() {
            Some(t) if t.role == Role::Assistant && self.turns.len() > 1 => Role::Human,
            Some(t) if t.role == Role::Human => Role::Assistant,
            // Right after the greeting either an assistant turn or nothing fits.
            _ => Role::Assistant,
        }
    }

    fn check_next(&self, role: Role) -> Result<(), ConversationError> {
        if self.turns.is_empty() {
            return Err(ConversationError::NotStarted);
        }
        let expected = self.expected_role();
        if expected != role {
            return Err(ConversationError::OutOfOrder { expected });
        }
        Ok(())
    }

    fn append(&mut self, role: Role, text: String) {
        self.turns.push(Turn {
            role,
            text,
            at: Utc::now(),
        });
    }
}

/// Collapses line breaks so each question and answer is one line of the
/// newline-joined history the proposer sees.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::proposer::{join_history, split_history};

    fn started() -> ConversationState {
        let mut state = ConversationState::new();
        state.push_greeting("Hello!").unwrap();
        state
    }

    #[test]
    fn test_projections_follow_turn_order() {
        let mut state = started();
        state.push_question("Tell me about Spring Boot.").unwrap();
        state.push_answer("I built microservices.").unwrap();
        state.push_question("How did you test them?").unwrap();
        state.push_answer("With JUnit.").unwrap();

        assert_eq!(
            state.previous_questions(),
            vec!["Tell me about Spring Boot.", "How did you test them?"]
        );
        assert_eq!(
            state.previous_answers(),
            vec!["I built microservices.", "With JUnit."]
        );
    }

    #[test]
    fn test_greeting_is_not_a_question_or_answer() {
        let state = started();
        assert!(state.previous_questions().is_empty());
        assert!(state.previous_answers().is_empty());
    }

    #[test]
    fn test_answer_before_question_is_rejected() {
        let mut state = started();
        assert_eq!(
            state.push_answer("too early"),
            Err(ConversationError::OutOfOrder {
                expected: Role::Assistant
            })
        );
    }

    #[test]
    fn test_two_questions_in_a_row_are_rejected() {
        let mut state = started();
        state.push_question("First?").unwrap();
        assert_eq!(
            state.push_question("Second?"),
            Err(ConversationError::OutOfOrder {
                expected: Role::Human
            })
        );
        assert_eq!(state.turns().len(), 2);
    }

    #[test]
    fn test_turns_require_greeting() {
        let mut state = ConversationState::new();
        assert_eq!(
            state.push_question("Hi?"),
            Err(ConversationError::NotStarted)
        );
        assert_eq!(state.push_answer("Hi"), Err(ConversationError::NotStarted));
    }

    #[test]
    fn test_second_greeting_is_rejected() {
        let mut state = started();
        assert!(state.push_greeting("Hello again").is_err());
    }

    #[test]
    fn test_closing_message_after_greeting_is_allowed() {
        let mut state = started();
        state.push_assistant("Thanks!".to_string()).unwrap();
        assert_eq!(state.turns().len(), 2);
        assert!(state.previous_questions().is_empty());
    }

    #[test]
    fn test_clear_empties_the_log() {
        let mut state = started();
        state.push_question("Q?").unwrap();
        state.clear();
        assert!(state.turns().is_empty());
    }

    #[test]
    fn test_multi_line_turns_keep_history_reversible() {
        let mut state = started();
        state
            .push_question("Walk me through the design.\nThen the rollout.")
            .unwrap();
        state
            .push_answer("First we split the monolith.\r\n\n  Then we moved billing.  ")
            .unwrap();

        assert_eq!(
            state.turns()[1].text,
            "Q: Walk me through the design. Then the rollout."
        );
        let answers = state.previous_answers();
        assert_eq!(answers, vec!["First we split the monolith. Then we moved billing."]);
        assert_eq!(split_history(&join_history(&answers)), answers);
        let questions = state.previous_questions();
        assert_eq!(split_history(&join_history(&questions)), questions);
    }
}
