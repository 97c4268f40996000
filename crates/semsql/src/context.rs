//! `CoreContext`: the single aggregate a host surface constructs once at
//! startup and tears down once at shutdown (`spec.md` §4 "no hidden
//! singletons"). Owns the pool, the session map, the snapshot cache, the
//! secret store, the loaded config, the shutdown coordinator, the shared
//! RAG store and an LLM provider, plus a cache of built `Ontology`/graph
//! pairs keyed by snapshot content hash.

use semsql_core::{
    CancelToken, ConnectionProfile, CoreConfig, CoreConfigStore, CoreError, DbDriver, DbKind,
    SchemaSnapshot, SecretStore, ShutdownCoordinator, create_secret_store,
};
use semsql_graph::InMemoryGraphBackend;
use semsql_llm::LlmProvider;
use semsql_ontology::{Ontology, to_yaml_document};
use semsql_rag::RagStore;
use semsql_session::{ConnectionPool, PoolKey, SessionManager, SnapshotKey, SnapshotStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One ontology build, cached so a second `build_ontology` call against an
/// unchanged snapshot is a cache hit rather than another LLM round-trip
/// (Testable Property 5's idempotence requirement).
struct OntologyCacheEntry {
    ontology: Ontology,
    graph: InMemoryGraphBackend,
}

/// Result of `CoreContext::connect`.
pub struct ConnectOutcome {
    pub session_id: Uuid,
    pub info: String,
    pub dialect: DbKind,
}

/// One row of `CoreContext::list_schemas`.
pub struct SchemaSummary {
    pub schema_name: Option<String>,
    pub table_count: usize,
    pub view_count: usize,
}

const RAG_MANUAL_SEARCH_TOP_K: usize = 5;
/// Deliberately looser than the Agent's own internal retrieval threshold
/// (`0.75`) — this path answers an explicit user search, not an automatic
/// few-shot injection, so a few marginal matches are better than none.
const RAG_MANUAL_SEARCH_THRESHOLD: f64 = 0.6;

pub struct CoreContext {
    pool: ConnectionPool,
    sessions: SessionManager,
    snapshots: SnapshotStore,
    secrets: Box<dyn SecretStore>,
    config: CoreConfig,
    shutdown: ShutdownCoordinator,
    llm: Arc<dyn LlmProvider>,
    rag: RagStore,
    ontology_cache: RwLock<HashMap<String, Arc<OntologyCacheEntry>>>,
    ontology_export_dir: PathBuf,
}

impl CoreContext {
    /// Loads `CoreConfig` from disk (or defaults), registers every dialect
    /// driver, and wires up the secret store, RAG store and ontology export
    /// directory. Called once at process startup.
    pub fn new(llm: Arc<dyn LlmProvider>, rag_enabled: bool) -> Result<Self, CoreError> {
        let mut drivers: HashMap<DbKind, Arc<dyn DbDriver>> = HashMap::new();
        drivers.insert(DbKind::Postgres, Arc::new(semsql_driver_postgres::PostgresDriver::new()));
        drivers.insert(DbKind::SQLite, Arc::new(semsql_driver_sqlite::SqliteDriver::new()));
        drivers.insert(DbKind::MySQL, Arc::new(semsql_driver_mysql::MysqlDriver::new(DbKind::MySQL)));
        drivers.insert(DbKind::MariaDB, Arc::new(semsql_driver_mysql::MysqlDriver::new(DbKind::MariaDB)));
        drivers.insert(DbKind::Oracle, Arc::new(semsql_driver_oracle::OracleDriver::new()));
        Self::with_drivers(drivers, llm, rag_enabled)
    }

    /// Shared by `new` (real dialect drivers) and the test suite (fake
    /// drivers), so registering a dialect never drifts between the two.
    fn with_drivers(
        drivers: HashMap<DbKind, Arc<dyn DbDriver>>,
        llm: Arc<dyn LlmProvider>,
        rag_enabled: bool,
    ) -> Result<Self, CoreError> {
        let config = CoreConfigStore::new()
            .and_then(|store| store.load())
            .unwrap_or_else(|e| {
                log::warn!("failed to load persisted config, using defaults: {e}");
                CoreConfig::default()
            });

        let ontology_export_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("semsql")
            .join("ontologies");

        Ok(Self {
            pool: ConnectionPool::new(drivers, config.clone()),
            sessions: SessionManager::new(&config),
            snapshots: SnapshotStore::new(&config),
            secrets: create_secret_store(),
            config,
            shutdown: ShutdownCoordinator::new(),
            llm,
            rag: RagStore::new(rag_enabled),
            ontology_cache: RwLock::new(HashMap::new()),
            ontology_export_dir,
        })
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Closes every pooled connection. Called during
    /// `ShutdownPhase::ClosingConnections`.
    pub fn close_all_connections(&self) {
        self.pool.close_all();
    }

    /// `connect(dialect, connection_params) -> {session_id, info}`. Proves
    /// connectivity by acquiring and immediately releasing a pooled
    /// connection, persists the password in the secret store if the
    /// profile asks for it, then opens a session.
    pub async fn connect(
        &self,
        profile: ConnectionProfile,
        password: Option<String>,
    ) -> Result<ConnectOutcome, CoreError> {
        let dialect = profile.kind();
        let pool = self.pool.clone();
        let probe_profile = profile.clone();
        let probe_password = password.clone();

        let info = tokio::task::spawn_blocking(move || -> Result<String, CoreError> {
            let conn = pool.acquire(&probe_profile, probe_password.as_deref())?;
            Ok(conn.as_connection().metadata().display_name.to_string())
        })
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))??;

        if let (true, Some(pw)) = (profile.save_password, &password) {
            self.secrets.set(&profile.secret_ref(), pw)?;
        }

        let session_id = self.sessions.create(profile);
        Ok(ConnectOutcome { session_id, info, dialect })
    }

    /// `list_schemas(session_id) -> [{schema_name, table_count, view_count}]`.
    /// Groups the session's default-scope snapshot's tables/views by
    /// `TableInfo::schema`/`ViewInfo::schema`.
    pub async fn list_schemas(&self, session_id: Uuid) -> Result<Vec<SchemaSummary>, CoreError> {
        let snapshot = self.snapshot(session_id, None).await?;

        let mut by_schema: HashMap<Option<String>, (usize, usize)> = HashMap::new();
        for table in &snapshot.tables {
            by_schema.entry(table.schema.clone()).or_default().0 += 1;
        }
        for view in &snapshot.views {
            by_schema.entry(view.schema.clone()).or_default().1 += 1;
        }

        let mut summaries: Vec<SchemaSummary> = by_schema
            .into_iter()
            .map(|(schema_name, (table_count, view_count))| SchemaSummary {
                schema_name,
                table_count,
                view_count,
            })
            .collect();
        summaries.sort_by(|a, b| a.schema_name.cmp(&b.schema_name));
        Ok(summaries)
    }

    /// `snapshot(session_id, schema_name) -> SchemaSnapshot`. Serves from
    /// the `SnapshotStore` cache when fresh, otherwise sets the connection's
    /// active schema (a no-op for dialects without one) and reloads.
    pub async fn snapshot(
        &self,
        session_id: Uuid,
        schema_name: Option<String>,
    ) -> Result<Arc<SchemaSnapshot>, CoreError> {
        let session = self.sessions.touch(session_id)?;
        let key = SnapshotKey::new(session_id, schema_name.clone());
        if let Some(cached) = self.snapshots.fresh(&key) {
            return Ok(cached);
        }

        let pool = self.pool.clone();
        let profile = session.profile.clone();

        let snapshot = tokio::task::spawn_blocking(move || -> Result<SchemaSnapshot, CoreError> {
            let conn = pool.acquire(&profile, None)?;
            if let Err(e) = conn.as_connection().set_active_database(schema_name.as_deref()) {
                log::debug!("set_active_database not applicable for this dialect: {e}");
            }
            Ok(conn.as_connection().schema()?)
        })
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))??;

        Ok(self.snapshots.insert(key, snapshot))
    }

    /// `select_tables(session_id, table_names[])`: scopes later `ask` calls
    /// to the focused subset of the snapshot.
    pub fn select_tables(&self, session_id: Uuid, table_names: Vec<String>) -> Result<(), CoreError> {
        self.sessions.select_tables(session_id, table_names)
    }

    /// `ask(session_id, question, options) -> {sql, explanation, result?,
    /// attempts, diagnostics}`. Builds the `Ontology`/graph pair for the
    /// session's current snapshot (cached by content hash) and delegates
    /// the retry-driven state machine to `semsql_agent::ask`.
    pub async fn ask(
        &self,
        session_id: Uuid,
        question: &str,
        options: semsql_agent::AskOptions,
    ) -> Result<semsql_agent::AskOutcome, CoreError> {
        let session = self.sessions.touch(session_id)?;
        let snapshot = self.snapshot(session_id, options.schema_name.clone()).await?;
        let focused = match &session.selected_tables {
            Some(tables) => snapshot.focused(tables),
            None => (*snapshot).clone(),
        };

        let entry = self.ontology_for(&focused).await?;

        let cancel = CancelToken::new();
        let ctx = semsql_agent::AgentContext {
            pool: &self.pool,
            profile: &session.profile,
            password: None,
            dialect: session.profile.kind(),
            llm: self.llm.as_ref(),
            rag: &self.rag,
            graph: &entry.graph,
            ontology: &entry.ontology,
            config: &self.config,
            cancel,
        };

        Ok(semsql_agent::ask(&ctx, question, &focused, options).await)
    }

    /// `build_ontology(session_id) -> Ontology`, idempotent per snapshot
    /// content hash.
    pub async fn build_ontology(&self, session_id: Uuid) -> Result<Ontology, CoreError> {
        let session = self.sessions.touch(session_id)?;
        let snapshot = self.snapshot(session_id, None).await?;
        let entry = self.ontology_for(&snapshot).await?;

        let connection_key = connection_key_for(&session.profile);
        let path = self
            .ontology_export_dir
            .join(format!("{connection_key}_{}.yml", entry.ontology.source_hash));
        if !path.exists() {
            if let Err(e) = self.export_ontology(&entry.ontology, snapshot.tables.len(), &path) {
                log::warn!("failed to export ontology document to {}: {e}", path.display());
            }
        }

        Ok(entry.ontology.clone())
    }

    async fn ontology_for(&self, snapshot: &SchemaSnapshot) -> Result<Arc<OntologyCacheEntry>, CoreError> {
        let hash = semsql_session::content_hash(snapshot);
        if let Some(entry) = self.ontology_cache.read().expect("ontology cache poisoned").get(&hash) {
            return Ok(entry.clone());
        }

        let ontology = semsql_ontology::build_ontology(snapshot, &self.config, self.llm.as_ref()).await?;
        let graph = InMemoryGraphBackend::from_ontology(ontology.clone());
        let entry = Arc::new(OntologyCacheEntry { ontology, graph });

        self.ontology_cache
            .write()
            .expect("ontology cache poisoned")
            .insert(hash, entry.clone());
        Ok(entry)
    }

    fn export_ontology(&self, ontology: &Ontology, table_count: usize, path: &std::path::Path) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.ontology_export_dir).map_err(|e| CoreError::Internal(e.to_string()))?;
        let document = to_yaml_document(ontology, table_count)?;
        std::fs::write(path, document).map_err(|e| CoreError::Internal(e.to_string()))
    }

    /// `rag.import(csv)`: one row per line, `question,sql,dialect,success`
    /// with an optional trailing `schema_name`. Each row is embedded and
    /// imported through the same path a successful `ask()` attempt uses.
    pub async fn rag_import(&self, csv: &str) -> Result<usize, CoreError> {
        let mut imported = 0usize;
        for (line_no, line) in csv.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line_no == 0 && line.to_ascii_lowercase().starts_with("question,") {
                continue;
            }
            let fields: Vec<&str> = line.splitn(5, ',').collect();
            if fields.len() < 4 {
                log::warn!("skipping malformed RAG import row {}: {line}", line_no + 1);
                continue;
            }
            let (question, sql, dialect_str, success_str) = (fields[0], fields[1], fields[2], fields[3]);
            let dialect = parse_dialect(dialect_str)
                .ok_or_else(|| CoreError::UnsupportedDialect(dialect_str.to_string()))?;
            let success = success_str.trim().eq_ignore_ascii_case("true");
            let schema_name = fields.get(4).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

            self.rag
                .record(
                    self.llm.as_ref(),
                    question.trim().to_string(),
                    sql.trim().to_string(),
                    dialect,
                    schema_name,
                    success,
                    HashMap::new(),
                )
                .await?;
            imported += 1;
        }
        Ok(imported)
    }

    /// `rag.search(question)`.
    pub async fn rag_search(
        &self,
        question: &str,
        dialect: DbKind,
        schema_name: Option<&str>,
    ) -> Result<Vec<semsql_rag::RagEntry>, CoreError> {
        self.rag
            .search(
                self.llm.as_ref(),
                question,
                dialect,
                schema_name,
                RAG_MANUAL_SEARCH_TOP_K,
                RAG_MANUAL_SEARCH_THRESHOLD,
            )
            .await
    }

    /// `rag.clear()`.
    pub fn rag_clear(&self) {
        self.rag.clear();
    }

    /// `disconnect(session_id)`: tears down the session and its default-scope
    /// snapshot cache entry. The pool entry is shared across sessions keyed
    /// by connection identity, so it is never forced closed here — only
    /// swept for genuinely idle connections.
    pub fn disconnect(&self, session_id: Uuid) -> Result<(), CoreError> {
        self.sessions.remove(session_id).ok_or(CoreError::SessionNotFound)?;
        self.snapshots.invalidate(&SnapshotKey::new(session_id, None));
        self.pool.sweep_idle();
        Ok(())
    }
}

fn connection_key_for(profile: &ConnectionProfile) -> String {
    let key = PoolKey::from_profile(profile);
    format!("{}_{}_{}", key.dialect.dialect_name(), key.host, key.database)
        .replace(['/', '\\', ':'], "_")
}

fn parse_dialect(s: &str) -> Option<DbKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Some(DbKind::Postgres),
        "sqlite" => Some(DbKind::SQLite),
        "mysql" => Some(DbKind::MySQL),
        "mariadb" => Some(DbKind::MariaDB),
        "oracle" => Some(DbKind::Oracle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_core::DbConfig;
    use semsql_test_support::fixtures::schema_with_table;
    use semsql_test_support::{FakeDriver, FakeLlmProvider};

    fn test_context(llm: FakeLlmProvider, driver: FakeDriver) -> CoreContext {
        let mut drivers: HashMap<DbKind, Arc<dyn DbDriver>> = HashMap::new();
        drivers.insert(DbKind::SQLite, Arc::new(driver));
        CoreContext::with_drivers(drivers, Arc::new(llm), true).unwrap()
    }

    fn sqlite_profile() -> ConnectionProfile {
        ConnectionProfile::new_with_kind(
            "test",
            DbKind::SQLite,
            DbConfig::SQLite { path: "/tmp/test.db".into() },
        )
    }

    #[tokio::test]
    async fn connect_opens_a_session() {
        let schema = schema_with_table("db", "main", "vendors");
        let driver = FakeDriver::new(DbKind::SQLite).with_schema(schema);
        let ctx = test_context(FakeLlmProvider::new(), driver);

        let outcome = ctx.connect(sqlite_profile(), None).await.unwrap();
        assert_eq!(outcome.dialect, DbKind::SQLite);

        let schemas = ctx.list_schemas(outcome.session_id).await.unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].table_count, 1);

        ctx.disconnect(outcome.session_id).unwrap();
    }

    #[tokio::test]
    async fn disconnect_on_unknown_session_fails() {
        let driver = FakeDriver::new(DbKind::SQLite).with_schema(schema_with_table("db", "main", "t"));
        let ctx = test_context(FakeLlmProvider::new(), driver);
        let err = ctx.disconnect(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound));
    }

    #[tokio::test]
    async fn build_ontology_is_cached_across_calls() {
        let schema = schema_with_table("db", "main", "vendors");
        let driver = FakeDriver::new(DbKind::SQLite).with_schema(schema);
        let concept_json = serde_json::json!([{
            "name": "Vendor",
            "description": "A supplier",
            "confidence": 0.9,
            "tables": ["vendors"],
            "synonyms": [],
            "properties": []
        }]);
        let llm = FakeLlmProvider::new()
            .with_structured_response(concept_json)
            .with_structured_response(serde_json::json!([]));
        let ctx = test_context(llm, driver);

        let outcome = ctx.connect(sqlite_profile(), None).await.unwrap();
        let first = ctx.build_ontology(outcome.session_id).await.unwrap();
        // A second call must hit the cache rather than draining the fake
        // LLM's response queue a second time.
        let second = ctx.build_ontology(outcome.session_id).await.unwrap();
        assert_eq!(first.source_hash, second.source_hash);
        assert_eq!(first.concept_count(), 1);
    }

    #[tokio::test]
    async fn rag_import_parses_csv_rows_and_skips_malformed_ones() {
        let driver = FakeDriver::new(DbKind::SQLite).with_schema(schema_with_table("db", "main", "t"));
        let llm = FakeLlmProvider::new();
        let ctx = test_context(llm, driver);

        let csv = "question,sql,dialect,success\n\
                    how many vendors,SELECT count(*) FROM vendors,sqlite,true\n\
                    broken row with no commas\n\
                    list vendors,SELECT * FROM vendors,sqlite,false,public\n";
        let imported = ctx.rag_import(csv).await.unwrap();
        assert_eq!(imported, 2);
    }

    #[tokio::test]
    async fn rag_import_rejects_unknown_dialect() {
        let driver = FakeDriver::new(DbKind::SQLite).with_schema(schema_with_table("db", "main", "t"));
        let ctx = test_context(FakeLlmProvider::new(), driver);
        let csv = "q,s,notareal dialect,true\n";
        let err = ctx.rag_import(csv).await.unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedDialect(_)));
    }
}
