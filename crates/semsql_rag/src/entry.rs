//! `RAGEntry` (`spec.md` §3): an immutable record of one past
//! question/SQL pair, used by the RAG Example Store (C6).

use semsql_core::DbKind;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RagEntry {
    pub question: String,
    pub sql: String,
    pub dialect: DbKind,
    pub schema_name: Option<String>,
    pub success: bool,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl RagEntry {
    /// The identity used to coalesce duplicate imports: same question, SQL
    /// and dialect. Schema name and metadata are not part of the identity —
    /// a re-import of the same pair simply refreshes those fields in place.
    pub fn identity_key(&self) -> (&str, &str, DbKind) {
        (self.question.as_str(), self.sql.as_str(), self.dialect)
    }
}
