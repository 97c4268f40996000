use bitflags::bitflags;
use std::sync::Arc;

use crate::{
    ConnectionProfile, CustomTypeInfo, DatabaseInfo, DbError, DbKind, DbSchemaInfo,
    DriverMetadata, QueryHandle, QueryRequest, QueryResult, SchemaForeignKeyInfo,
    SchemaIndexInfo, SchemaSnapshot, SqlDialect, TableInfo, ViewInfo,
};

bitflags! {
    /// Schema features a dialect adapter actually surfaces.
    ///
    /// Callers in the resolver/ontology layers use this instead of matching on
    /// `DbKind` directly, so a new dialect only needs to flip the right bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SchemaFeatures: u32 {
        const FOREIGN_KEYS = 1 << 0;
        const CHECK_CONSTRAINTS = 1 << 1;
        const UNIQUE_CONSTRAINTS = 1 << 2;
        const CUSTOM_TYPES = 1 << 3;
        const TRIGGERS = 1 << 4;
        const SEQUENCES = 1 << 5;
        const FUNCTIONS = 1 << 6;
    }
}

/// Describes how a dialect adapter handles schema loading across multiple
/// databases on the same server.
///
/// - MySQL/MariaDB: a single connection can switch databases with `USE`
/// - PostgreSQL/Oracle: each database (or schema) is enumerated up front
/// - SQLite: a single database per file, no switching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaLoadingStrategy {
    LazyPerDatabase,
    ConnectionPerDatabase,
    SingleDatabase,
}

/// Handle for cancelling a running query.
///
/// Each dialect adapter implements this to provide database-specific
/// cancellation logic. Returned when starting a query; usable from another
/// thread to cancel it.
pub trait QueryCancelHandle: Send + Sync {
    /// Best-effort cancel request. The query may have already completed.
    fn cancel(&self) -> Result<(), DbError>;

    fn is_cancelled(&self) -> bool;
}

/// A no-op cancel handle for dialects that don't support cancellation.
#[derive(Clone)]
pub struct NoopCancelHandle;

impl QueryCancelHandle for NoopCancelHandle {
    fn cancel(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Factory for creating connections for one SQL dialect.
///
/// Implementations are registered by `DbKind` at startup. Each dialect
/// (PostgreSQL, MySQL, Oracle, SQLite) provides its own driver.
pub trait DbDriver: Send + Sync {
    fn kind(&self) -> DbKind;

    /// Driver metadata: capabilities, default port, URI scheme.
    fn metadata(&self) -> &'static DriverMetadata;

    fn display_name(&self) -> &'static str {
        self.metadata().display_name
    }

    /// Create a connection without a password.
    fn connect(&self, profile: &ConnectionProfile) -> Result<Box<dyn Connection>, DbError> {
        self.connect_with_password(profile, None)
    }

    /// Create a connection with an optional password resolved from a
    /// `SecretStore` rather than the profile itself.
    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError>;

    /// Probe connectivity without keeping the connection open. Returns a
    /// short server-provided info string (version, catalog) on success.
    fn test_connection(&self, profile: &ConnectionProfile) -> Result<String, DbError>;
}

/// An active database connection.
///
/// Callers interact exclusively through this trait, never through
/// driver-specific types. Implementations must be `Send + Sync` so a
/// connection can be driven from a `spawn_blocking` worker.
pub trait Connection: Send + Sync {
    fn metadata(&self) -> &'static DriverMetadata;

    /// Lightweight liveness check (typically `SELECT 1`).
    fn ping(&self) -> Result<(), DbError>;

    fn close(&mut self) -> Result<(), DbError>;

    /// Execute a SQL statement. The read-only policy is enforced by the
    /// caller via `query_safety::is_safe_read_query`, not by this trait.
    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError>;

    /// Execute and return a cancellation handle alongside the result.
    fn execute_with_handle(
        &self,
        req: &QueryRequest,
    ) -> Result<(QueryHandle, QueryResult), DbError> {
        let result = self.execute(req)?;
        Ok((QueryHandle::new(), result))
    }

    fn cancel(&self, _handle: &QueryHandle) -> Result<(), DbError> {
        Err(DbError::NotSupported("query cancellation not supported".to_string()))
    }

    fn cancel_handle(&self) -> Arc<dyn QueryCancelHandle> {
        Arc::new(NoopCancelHandle)
    }

    /// Retrieve the full schema snapshot (tables, views, columns, indexes,
    /// foreign keys) for the connection's current database/schema.
    fn schema(&self) -> Result<SchemaSnapshot, DbError>;

    /// List databases visible on the server. Empty for file-based SQLite.
    fn list_databases(&self) -> Result<Vec<DatabaseInfo>, DbError> {
        Ok(Vec::new())
    }

    /// Tables and views for a database, without column detail.
    fn schema_for_database(&self, _database: &str) -> Result<DbSchemaInfo, DbError> {
        Err(DbError::NotSupported("schema_for_database not supported".to_string()))
    }

    /// Columns and indexes for one table.
    fn table_details(
        &self,
        _database: &str,
        _schema: Option<&str>,
        _table: &str,
    ) -> Result<TableInfo, DbError> {
        Err(DbError::NotSupported("table_details not supported".to_string()))
    }

    fn view_details(
        &self,
        _database: &str,
        _schema: Option<&str>,
        _view: &str,
    ) -> Result<ViewInfo, DbError> {
        Err(DbError::NotSupported("view_details not supported".to_string()))
    }

    /// Set the active database for subsequent queries (MySQL/MariaDB `USE`).
    /// No-op for PostgreSQL/Oracle/SQLite.
    fn set_active_database(&self, _database: Option<&str>) -> Result<(), DbError> {
        Ok(())
    }

    fn active_database(&self) -> Option<String> {
        None
    }

    fn kind(&self) -> DbKind;

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy;

    fn schema_features(&self) -> SchemaFeatures {
        SchemaFeatures::empty()
    }

    fn schema_types(
        &self,
        _database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<CustomTypeInfo>, DbError> {
        Ok(Vec::new())
    }

    fn schema_indexes(
        &self,
        _database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaIndexInfo>, DbError> {
        Ok(Vec::new())
    }

    fn schema_foreign_keys(
        &self,
        _database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaForeignKeyInfo>, DbError> {
        Ok(Vec::new())
    }

    /// SQL dialect used to render generated statements for this connection.
    fn dialect(&self) -> &dyn SqlDialect;
}
