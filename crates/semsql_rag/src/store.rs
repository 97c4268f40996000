//! RAG Example Store (C6, `spec.md` §4.6): vector-indexed history of
//! `(question, sql)` pairs, retrieved by cosine similarity.

use crate::entry::RagEntry;
use semsql_core::DbKind;
use semsql_llm::LlmProvider;
use std::collections::HashMap;
use std::sync::RwLock;

/// Plain in-process vector store — no vector-database dependency. The
/// table this is meant to scale to (past successful queries for one
/// connection) is small enough that a linear cosine-similarity scan is the
/// right tool, matching the store's "optional, can be disabled" framing in
/// the spec rather than standing up real ANN infrastructure.
pub struct RagStore {
    enabled: bool,
    entries: RwLock<Vec<RagEntry>>,
}

impl RagStore {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, entries: RwLock::new(Vec::new()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Inserts `entry`, coalescing with any existing entry sharing the same
    /// `(question, sql, dialect)` identity rather than storing a duplicate.
    pub fn import(&self, entry: RagEntry) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.identity_key() == entry.identity_key())
        {
            *existing = entry;
        } else {
            entries.push(entry);
        }
    }

    /// Embeds `question` via `llm` and imports the resulting entry. Called
    /// by C10 after a successful execution.
    pub async fn record(
        &self,
        llm: &dyn LlmProvider,
        question: impl Into<String>,
        sql: impl Into<String>,
        dialect: DbKind,
        schema_name: Option<String>,
        success: bool,
        metadata: HashMap<String, String>,
    ) -> Result<(), semsql_core::CoreError> {
        if !self.enabled {
            return Ok(());
        }
        let question = question.into();
        let embedding = llm.embed(&question).await.map_err(semsql_core::CoreError::from)?;
        self.import(RagEntry {
            question,
            sql: sql.into(),
            dialect,
            schema_name,
            success,
            embedding,
            metadata,
        });
        Ok(())
    }

    /// Returns up to `top_k` entries above `threshold` cosine similarity to
    /// `question`, filtered by dialect and (when given) schema name, ranked
    /// by similarity descending. Only `success == true` entries are
    /// eligible, per the store's default retrieval policy. Returns an empty
    /// list without calling the LLM when the store is disabled.
    pub async fn search(
        &self,
        llm: &dyn LlmProvider,
        question: &str,
        dialect: DbKind,
        schema_name: Option<&str>,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<RagEntry>, semsql_core::CoreError> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let query_embedding = llm.embed(question).await.map_err(semsql_core::CoreError::from)?;

        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(f64, RagEntry)> = entries
            .iter()
            .filter(|e| e.success && e.dialect == dialect)
            .filter(|e| match (schema_name, &e.schema_name) {
                (Some(wanted), Some(actual)) => wanted == actual,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|e| (cosine_similarity(&query_embedding, &e.embedding), e.clone()))
            .filter(|(score, _)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, entry)| entry).collect())
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::FakeLlmProvider;

    fn entry(question: &str, sql: &str, success: bool) -> RagEntry {
        RagEntry {
            question: question.to_string(),
            sql: sql.to_string(),
            dialect: DbKind::Postgres,
            schema_name: None,
            success,
            embedding: semsql_test_support::deterministic_embedding(question),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn duplicate_import_coalesces() {
        let store = RagStore::new(true);
        store.import(entry("how many vendors", "SELECT count(*) FROM vendors", true));
        store.import(entry("how many vendors", "SELECT count(*) FROM vendors", true));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn disabled_store_ignores_imports() {
        let store = RagStore::new(false);
        store.import(entry("q", "SELECT 1", true));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn search_excludes_failed_entries() {
        let store = RagStore::new(true);
        store.import(entry("vendor count", "SELECT count(*) FROM vendors", false));
        let llm = FakeLlmProvider::new();
        let results = store.search(&llm, "vendor count", DbKind::Postgres, None, 5, -1.0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_above_threshold() {
        let store = RagStore::new(true);
        store.import(entry("how many vendors are there", "SELECT count(*) FROM vendors", true));
        store.import(entry("list all orders this month", "SELECT * FROM orders", true));

        let llm = FakeLlmProvider::new();
        let results = store
            .search(&llm, "how many vendors are there", DbKind::Postgres, None, 5, 0.99)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sql, "SELECT count(*) FROM vendors");
    }
}
