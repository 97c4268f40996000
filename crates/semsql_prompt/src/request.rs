//! Inputs to the Prompt Composer.

use semsql_core::DbKind;
use semsql_rag::RagEntry;
use semsql_resolver::ResolverReport;

/// One prior question/SQL pair in the active session, newest last.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub question: String,
    pub sql: String,
}

/// The error-analysis facts the Composer needs to build a focused retry
/// prompt. Deliberately independent of the Error Analyzer's own
/// `ErrorReport` type — the Composer only needs presentation-ready facts,
/// not the regex/edit-distance machinery that produced them. C10 adapts
/// one into the other.
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    pub offending_identifiers: Vec<String>,
    pub focus_tables: Vec<String>,
    pub human_hint: String,
}

/// Everything the Composer needs to render one prompt.
pub struct PromptRequest<'a> {
    pub dialect: DbKind,
    pub snapshot: &'a semsql_core::SchemaSnapshot,
    pub resolver_report: Option<&'a ResolverReport>,
    pub rag_examples: &'a [RagEntry],
    pub conversation: &'a [ConversationTurn],
    pub question: &'a str,
    /// 1-based: 1 is the initial generation, 2+ are retries.
    pub attempt: u32,
    pub retry_context: Option<&'a RetryContext>,
    pub token_budget: usize,
}
