//! The LLM provider seam (`spec.md` §9, "LLM as an external oracle").
//!
//! Two narrow operations only: `generate_sql` (freeform text -> SQL +
//! rationale) and `generate_structured` (messages -> JSON). `embed` backs
//! the RAG Example Store (C6). No provider-specific response wrapper ever
//! leaks past this trait.

use async_trait::async_trait;
use semsql_core::CoreError;
use thiserror::Error;

mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider};

/// One turn in a chat-style prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Result of `generate_sql`: a candidate statement plus the model's stated
/// reasoning, kept separate so the Agent's VALIDATE step never has to parse
/// prose out of the SQL itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlGeneration {
    pub sql: String,
    pub rationale: String,
}

/// Metadata describing a concrete provider (name, model, free-form info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub name: String,
    pub model: String,
    pub info: Option<String>,
}

impl ProviderMetadata {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self { name: name.into(), model: model.into(), info: None }
    }
}

/// Errors a provider can surface. Distinguishes budget/rate-limit
/// conditions (which the Agent retries with a shrunk prompt, per
/// `spec.md` §7) from hard failures.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("context budget exceeded: {0}")]
    ContextBudgetExceeded(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ContextBudgetExceeded(_) => CoreError::LLMBudgetExceeded,
            LlmError::Authentication(m)
            | LlmError::ProviderUnavailable(m)
            | LlmError::RateLimited(m) => CoreError::LLMUnavailable(m),
            LlmError::Timeout => CoreError::Timeout,
            LlmError::Cancelled => CoreError::Internal("LLM request cancelled".to_string()),
            LlmError::InvalidResponse(m) | LlmError::Other(m) => CoreError::Internal(m),
        }
    }
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Factory/provider boundary. Implement this to plug in a concrete backend
/// (OpenAI, Anthropic, a local model runner, ...). Every component upstream
/// of this trait (C4, C6, C8, C10) depends only on it, never on a provider
/// SDK type.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Freeform generation: a rendered prompt in, a SQL statement plus
    /// rationale out.
    async fn generate_sql(&self, prompt: &str) -> LlmResult<SqlGeneration>;

    /// Structured generation: a chat transcript in, a JSON value out. Used
    /// by the Ontology Builder (C4) to request a JSON array of concept
    /// candidates. `schema_hint` is a human-readable description of the
    /// expected shape (providers without native JSON mode fold it into the
    /// prompt).
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema_hint: &str,
    ) -> LlmResult<serde_json::Value>;

    /// Embeds `text` into a fixed-dimension vector for the RAG Example
    /// Store (C6). Returns `ProviderUnavailable` if this provider has no
    /// embedding model configured.
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;

    /// Best-effort cancellation of any in-flight request this provider is
    /// tracking.
    fn cancel(&self) {}

    fn metadata(&self) -> ProviderMetadata;

    fn is_available(&self) -> bool;
}
