use semsql_core::{
    Connection, ConnectionProfile, DbConfig, DbDriver, DbError, DbKind, DriverCapabilities,
    DriverMetadata, MySqlDialect, OracleDialect, PostgresDialect, QueryHandle, QueryRequest,
    QueryResult, SchemaLoadingStrategy, SchemaSnapshot, SqlDialect, SqliteDialect,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub enum FakeQueryOutcome {
    Success(QueryResult),
    Error(String),
    Timeout,
}

impl FakeQueryOutcome {
    fn into_result(&self) -> Result<QueryResult, DbError> {
        match self {
            Self::Success(result) => Ok(result.clone()),
            Self::Error(message) => Err(DbError::query_failed(message.clone())),
            Self::Timeout => Err(DbError::Timeout),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriverStats {
    pub executed_requests: Vec<QueryRequest>,
    pub cancelled_handle_count: usize,
    pub close_calls: usize,
}

#[derive(Default)]
struct FakeDriverState {
    schema: RwLock<SchemaSnapshot>,
    query_outcomes: RwLock<HashMap<String, FakeQueryOutcome>>,
    default_outcome: RwLock<Option<FakeQueryOutcome>>,
    executed_requests: Mutex<Vec<QueryRequest>>,
    cancelled_handles: Mutex<Vec<QueryHandle>>,
    close_calls: AtomicUsize,
    ping_error: RwLock<Option<String>>,
    connect_error: RwLock<Option<String>>,
}

/// Deterministic stand-in for a real dialect adapter, used by `semsql_session`
/// and `semsql_agent` tests so they don't need a live database.
#[derive(Clone)]
pub struct FakeDriver {
    kind: DbKind,
    state: Arc<FakeDriverState>,
}

impl FakeDriver {
    pub fn new(kind: DbKind) -> Self {
        Self {
            kind,
            state: Arc::new(FakeDriverState::default()),
        }
    }

    pub fn with_schema(self, schema: SchemaSnapshot) -> Self {
        *rwlock_write(&self.state.schema) = schema;
        self
    }

    pub fn with_query_result(self, sql: impl Into<String>, result: QueryResult) -> Self {
        rwlock_write(&self.state.query_outcomes)
            .insert(sql.into(), FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_query_error(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        rwlock_write(&self.state.query_outcomes)
            .insert(sql.into(), FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_default_result(self, result: QueryResult) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_default_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_ping_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.ping_error) = Some(message.into());
        self
    }

    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.connect_error) = Some(message.into());
        self
    }

    pub fn set_query_outcome(&self, sql: impl Into<String>, outcome: FakeQueryOutcome) {
        rwlock_write(&self.state.query_outcomes).insert(sql.into(), outcome);
    }

    pub fn stats(&self) -> FakeDriverStats {
        FakeDriverStats {
            executed_requests: mutex_lock(&self.state.executed_requests).clone(),
            cancelled_handle_count: mutex_lock(&self.state.cancelled_handles).len(),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
        }
    }

    pub fn as_driver_arc(self) -> Arc<dyn DbDriver> {
        Arc::new(self)
    }
}

impl DbDriver for FakeDriver {
    fn kind(&self) -> DbKind {
        self.kind
    }

    fn metadata(&self) -> &'static DriverMetadata {
        metadata_for_kind(self.kind)
    }

    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        _password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError> {
        if let Some(message) = rwlock_read(&self.state.connect_error).clone() {
            return Err(DbError::connection_failed(message));
        }

        Ok(Box::new(FakeConnection::new(
            self.kind,
            profile,
            self.state.clone(),
        )))
    }

    fn test_connection(&self, _profile: &ConnectionProfile) -> Result<String, DbError> {
        if let Some(message) = rwlock_read(&self.state.connect_error).clone() {
            return Err(DbError::connection_failed(message));
        }

        Ok(format!("{} (fake)", self.kind.display_name()))
    }
}

struct FakeConnection {
    kind: DbKind,
    state: Arc<FakeDriverState>,
    active_database: RwLock<Option<String>>,
}

impl FakeConnection {
    fn new(kind: DbKind, profile: &ConnectionProfile, state: Arc<FakeDriverState>) -> Self {
        Self {
            kind,
            state,
            active_database: RwLock::new(active_database_from_profile(profile)),
        }
    }

    fn execute_internal(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        mutex_lock(&self.state.executed_requests).push(req.clone());

        if let Some(outcome) = rwlock_read(&self.state.query_outcomes)
            .get(&req.sql)
            .cloned()
        {
            return outcome.into_result();
        }

        if let Some(outcome) = rwlock_read(&self.state.default_outcome).clone() {
            return outcome.into_result();
        }

        Ok(QueryResult::empty())
    }
}

impl Connection for FakeConnection {
    fn metadata(&self) -> &'static DriverMetadata {
        metadata_for_kind(self.kind)
    }

    fn ping(&self) -> Result<(), DbError> {
        if let Some(message) = rwlock_read(&self.state.ping_error).clone() {
            return Err(DbError::connection_failed(message));
        }

        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        self.execute_internal(req)
    }

    fn execute_with_handle(
        &self,
        req: &QueryRequest,
    ) -> Result<(QueryHandle, QueryResult), DbError> {
        let handle = QueryHandle::new();
        let result = self.execute_internal(req)?;
        Ok((handle, result))
    }

    fn cancel(&self, handle: &QueryHandle) -> Result<(), DbError> {
        mutex_lock(&self.state.cancelled_handles).push(handle.clone());
        Ok(())
    }

    fn schema(&self) -> Result<SchemaSnapshot, DbError> {
        Ok(rwlock_read(&self.state.schema).clone())
    }

    fn set_active_database(&self, database: Option<&str>) -> Result<(), DbError> {
        *rwlock_write(&self.active_database) = database.map(str::to_string);
        Ok(())
    }

    fn active_database(&self) -> Option<String> {
        rwlock_read(&self.active_database).clone()
    }

    fn kind(&self) -> DbKind {
        self.kind
    }

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy {
        match self.kind {
            DbKind::MySQL | DbKind::MariaDB => SchemaLoadingStrategy::LazyPerDatabase,
            DbKind::Postgres | DbKind::Oracle => SchemaLoadingStrategy::ConnectionPerDatabase,
            DbKind::SQLite => SchemaLoadingStrategy::SingleDatabase,
        }
    }

    fn dialect(&self) -> &dyn SqlDialect {
        dialect_for_kind(self.kind)
    }
}

fn active_database_from_profile(profile: &ConnectionProfile) -> Option<String> {
    match &profile.config {
        DbConfig::Postgres { database, .. } => Some(database.clone()),
        DbConfig::SQLite { path } => Some(path.display().to_string()),
        DbConfig::MySQL { database, .. } => database.clone(),
        DbConfig::Oracle { service_name, .. } => Some(service_name.clone()),
    }
}

fn metadata_for_kind(kind: DbKind) -> &'static DriverMetadata {
    match kind {
        DbKind::Postgres => &FAKE_POSTGRES_METADATA,
        DbKind::SQLite => &FAKE_SQLITE_METADATA,
        DbKind::MySQL | DbKind::MariaDB => &FAKE_MYSQL_METADATA,
        DbKind::Oracle => &FAKE_ORACLE_METADATA,
    }
}

fn dialect_for_kind(kind: DbKind) -> &'static dyn SqlDialect {
    match kind {
        DbKind::Postgres => &PostgresDialect,
        DbKind::SQLite => &SqliteDialect,
        DbKind::MySQL | DbKind::MariaDB => &MySqlDialect,
        DbKind::Oracle => &OracleDialect,
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

static FAKE_POSTGRES_METADATA: DriverMetadata = DriverMetadata {
    id: "fake-postgresql",
    display_name: "Fake PostgreSQL",
    capabilities: DriverCapabilities::RELATIONAL_BASE,
    default_port: Some(5432),
    uri_scheme: "postgresql",
};

static FAKE_SQLITE_METADATA: DriverMetadata = DriverMetadata {
    id: "fake-sqlite",
    display_name: "Fake SQLite",
    capabilities: DriverCapabilities::RELATIONAL_BASE,
    default_port: None,
    uri_scheme: "sqlite",
};

static FAKE_MYSQL_METADATA: DriverMetadata = DriverMetadata {
    id: "fake-mysql",
    display_name: "Fake MySQL",
    capabilities: DriverCapabilities::RELATIONAL_BASE,
    default_port: Some(3306),
    uri_scheme: "mysql",
};

static FAKE_ORACLE_METADATA: DriverMetadata = DriverMetadata {
    id: "fake-oracle",
    display_name: "Fake Oracle",
    capabilities: DriverCapabilities::RELATIONAL_BASE,
    default_port: Some(1521),
    uri_scheme: "oracle",
};

#[cfg(test)]
mod tests {
    use super::{FakeDriver, FakeQueryOutcome};
    use crate::fixtures;
    use semsql_core::{ConnectionProfile, DbConfig, DbDriver, DbError, DbKind, QueryRequest};

    #[test]
    fn execute_uses_configured_outcome_and_records_stats() {
        let driver = FakeDriver::new(DbKind::Postgres)
            .with_query_error("SELECT boom", "boom")
            .with_default_result(fixtures::table_result(vec![], vec![]));

        driver.set_query_outcome(
            "SELECT 1",
            FakeQueryOutcome::Success(fixtures::table_result(vec![], vec![])),
        );

        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let connection = driver
            .connect(&profile)
            .expect("fake connection should work");

        let query_ok = connection.execute(&QueryRequest::new("SELECT 1"));
        assert!(query_ok.is_ok());

        let query_err = connection.execute(&QueryRequest::new("SELECT boom"));
        assert!(matches!(query_err, Err(DbError::QueryFailed(_))));

        let stats = driver.stats();
        assert_eq!(stats.executed_requests.len(), 2);
    }

    #[test]
    fn cancel_updates_stats() {
        let driver = FakeDriver::new(DbKind::Postgres);
        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let connection = driver
            .connect(&profile)
            .expect("fake connection should work");

        let (handle, _) = connection
            .execute_with_handle(&QueryRequest::new("SELECT 1"))
            .expect("query should execute with handle");

        connection.cancel(&handle).expect("cancel should succeed");

        let stats = driver.stats();
        assert_eq!(stats.cancelled_handle_count, 1);
    }

    #[test]
    fn schema_uses_configured_snapshot() {
        let driver = FakeDriver::new(DbKind::Postgres)
            .with_schema(fixtures::schema_with_table("app", "public", "users"));
        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let connection = driver
            .connect(&profile)
            .expect("fake connection should work");

        let schema = connection.schema().expect("schema should be available");
        assert_eq!(schema.database_name, "app");
        assert!(schema.table("users").is_some());
    }
}
