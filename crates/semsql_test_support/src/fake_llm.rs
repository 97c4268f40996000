use async_trait::async_trait;
use semsql_llm::{ChatMessage, LlmError, LlmProvider, LlmResult, ProviderMetadata, SqlGeneration};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct FakeLlmState {
    sql_queue: Mutex<VecDeque<LlmResult<SqlGeneration>>>,
    structured_queue: Mutex<VecDeque<LlmResult<serde_json::Value>>>,
    embed_fn_calls: Mutex<usize>,
}

/// Deterministic stand-in for `LlmProvider`, used by `semsql_ontology`,
/// `semsql_rag` and `semsql_agent` tests. Responses are queued up front via
/// `with_sql_response`/`with_structured_response`; `embed` is a
/// deterministic hash of the input text rather than a real embedding model,
/// so cosine-similarity tests stay reproducible without network calls.
#[derive(Clone, Default)]
pub struct FakeLlmProvider {
    state: Arc<FakeLlmState>,
}

impl FakeLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sql_response(self, sql: impl Into<String>, rationale: impl Into<String>) -> Self {
        mutex_lock(&self.state.sql_queue).push_back(Ok(SqlGeneration {
            sql: sql.into(),
            rationale: rationale.into(),
        }));
        self
    }

    pub fn with_sql_error(self, error: LlmError) -> Self {
        mutex_lock(&self.state.sql_queue).push_back(Err(error));
        self
    }

    pub fn with_structured_response(self, value: serde_json::Value) -> Self {
        mutex_lock(&self.state.structured_queue).push_back(Ok(value));
        self
    }

    pub fn with_structured_error(self, error: LlmError) -> Self {
        mutex_lock(&self.state.structured_queue).push_back(Err(error));
        self
    }

    pub fn embed_call_count(&self) -> usize {
        *mutex_lock(&self.state.embed_fn_calls)
    }
}

/// Deterministic 16-dimensional hash embedding: stable across runs, good
/// enough to exercise cosine-similarity ranking without a real model.
pub fn deterministic_embedding(text: &str) -> Vec<f32> {
    const DIMS: usize = 16;
    let mut buckets = [0f32; DIMS];

    for (i, byte) in text.bytes().enumerate() {
        let bucket = (byte as usize + i) % DIMS;
        buckets[bucket] += 1.0;
    }

    let norm: f32 = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in buckets.iter_mut() {
            *v /= norm;
        }
    }
    buckets.to_vec()
}

#[async_trait]
impl LlmProvider for FakeLlmProvider {
    async fn generate_sql(&self, _prompt: &str) -> LlmResult<SqlGeneration> {
        mutex_lock(&self.state.sql_queue)
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Other("no queued FakeLlmProvider SQL response".to_string()))
            })
    }

    async fn generate_structured(
        &self,
        _messages: &[ChatMessage],
        _schema_hint: &str,
    ) -> LlmResult<serde_json::Value> {
        mutex_lock(&self.state.structured_queue)
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Other(
                    "no queued FakeLlmProvider structured response".to_string(),
                ))
            })
    }

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        *mutex_lock(&self.state.embed_fn_calls) += 1;
        Ok(deterministic_embedding(text))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("fake", "fake-model")
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_sql_response_is_returned_once() {
        let provider = FakeLlmProvider::new().with_sql_response("SELECT 1", "trivial");
        let first = provider.generate_sql("prompt").await.unwrap();
        assert_eq!(first.sql, "SELECT 1");

        let second = provider.generate_sql("prompt").await;
        assert!(second.is_err());
    }

    #[test]
    fn deterministic_embedding_is_stable_and_normalized() {
        let a = deterministic_embedding("vendor name");
        let b = deterministic_embedding("vendor name");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5 || norm == 0.0);
    }
}
