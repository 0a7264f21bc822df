// Live interview loop: conversation state, question proposal, retry, memoization, sessions.
// All generation calls go through llm_client; nothing here talks HTTP to the backend itself.

pub mod conversation;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod proposer;
pub mod retry;
pub mod session;
