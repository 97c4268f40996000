//! The SQL Agent (C10): a bounded retry-driven state machine that composes
//! a prompt, invokes the LLM, validates and executes the resulting SQL,
//! and performs error-directed repair on failure.

mod agent;
mod model;
mod retry;
mod validate;

pub use agent::{AgentContext, ask};
pub use model::{AskOptions, AskOutcome, AttemptRecord, ConversationEntry};
pub use validate::ValidationFailure;
