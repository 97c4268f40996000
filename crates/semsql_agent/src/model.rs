//! State machine vocabulary and request/response shapes (`spec.md` §4.10).

use semsql_diagnostics::ErrorReport;
use std::time::Duration;

/// One turn of prior conversation, passed in by the caller.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub role: String,
    pub content: String,
}

/// `ask()` options (`spec.md` §6, operation 5).
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub max_retries: u32,
    pub row_limit: u32,
    pub timeout_s: f64,
    pub schema_name: Option<String>,
    pub allow_write: bool,
    pub return_rows: bool,
    pub conversation_context: Vec<ConversationEntry>,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            row_limit: 200,
            timeout_s: 30.0,
            schema_name: None,
            allow_write: false,
            return_rows: true,
            conversation_context: Vec::new(),
        }
    }
}

impl AskOptions {
    /// Clamps `max_retries` into the `1..=10` range the spec allows.
    pub fn normalized_max_retries(&self) -> u32 {
        self.max_retries.clamp(1, 10)
    }
}

/// Outcome of a single `GENERATE -> VALIDATE -> EXECUTE` cycle.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub sql: String,
    pub rationale: String,
    pub error: Option<ErrorReport>,
    pub duration: Duration,
}

/// `ask()` result (`spec.md` §6, operation 5).
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub success: bool,
    pub sql: String,
    pub explanation: String,
    pub result: Option<semsql_core::QueryResult>,
    pub attempts: Vec<AttemptRecord>,
    pub diagnostics: Option<ErrorReport>,
}
