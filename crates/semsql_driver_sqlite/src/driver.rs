use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use semsql_core::{
    ColumnInfo, ColumnMeta, Connection, ConnectionProfile, DbConfig, DbDriver, DbError, DbKind,
    DbSchemaInfo, DriverCapabilities, DriverMetadata, ForeignKeyInfo, FormattedError, IndexInfo,
    QueryCancelHandle, QueryErrorFormatter, QueryHandle, QueryRequest, QueryResult, Row,
    SchemaFeatures, SchemaForeignKeyInfo, SchemaIndexInfo, SchemaLoadingStrategy, SchemaSnapshot,
    SqlDialect, SqliteDialect, TableInfo, Value, ViewInfo,
};
use rusqlite::{Connection as RusqliteConnection, InterruptHandle};

pub static METADATA: DriverMetadata = DriverMetadata {
    id: "sqlite",
    display_name: "SQLite",
    capabilities: DriverCapabilities::RELATIONAL_BASE,
    default_port: None,
    uri_scheme: "sqlite",
};

pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDriver for SqliteDriver {
    fn kind(&self) -> DbKind {
        DbKind::SQLite
    }

    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        _password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError> {
        let path = match &profile.config {
            DbConfig::SQLite { path } => path.clone(),
            _ => {
                return Err(DbError::InvalidProfile(
                    "Expected SQLite configuration".to_string(),
                ));
            }
        };

        log::info!("Opening SQLite database at {}", path.display());

        let conn = RusqliteConnection::open(&path)
            .map_err(|e| DbError::connection_failed(format!("Failed to open {}: {}", path.display(), e)))?;

        let interrupt_handle = conn.get_interrupt_handle();

        Ok(Box::new(SqliteConnection {
            conn: Mutex::new(conn),
            interrupt_handle,
            cancelled: Arc::new(AtomicBool::new(false)),
            path,
        }))
    }

    fn test_connection(&self, profile: &ConnectionProfile) -> Result<String, DbError> {
        let path = match &profile.config {
            DbConfig::SQLite { path } => path.clone(),
            _ => {
                return Err(DbError::InvalidProfile(
                    "Expected SQLite configuration".to_string(),
                ));
            }
        };

        let conn = RusqliteConnection::open(&path)
            .map_err(|e| DbError::connection_failed(format!("Failed to open {}: {}", path.display(), e)))?;

        conn.execute_batch("SELECT 1")
            .map_err(|e| DbError::connection_failed(e.to_string()))?;

        let version: String = conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .unwrap_or_else(|_| "SQLite".to_string());

        Ok(version)
    }
}

pub struct SqliteConnection {
    conn: Mutex<RusqliteConnection>,
    interrupt_handle: InterruptHandle,
    cancelled: Arc<AtomicBool>,
    path: PathBuf,
}

struct SqliteCancelHandle {
    cancelled: Arc<AtomicBool>,
    interrupt_handle: InterruptHandle,
}

impl QueryCancelHandle for SqliteCancelHandle {
    fn cancel(&self) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.interrupt_handle.interrupt();
        log::info!("[CANCEL] SQLite interrupt signal sent via handle");
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Connection for SqliteConnection {
    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn ping(&self) -> Result<(), DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;
        conn.execute_batch("SELECT 1")
            .map_err(|e| format_sqlite_query_error(&e))
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        self.cancelled.store(false, Ordering::SeqCst);

        let start = Instant::now();
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let mut stmt = match conn.prepare(&req.sql) {
            Ok(s) => s,
            Err(e) => {
                if self.cancelled.load(Ordering::SeqCst) {
                    return Err(DbError::Cancelled);
                }
                return Err(format_sqlite_query_error(&e));
            }
        };

        let column_count = stmt.column_count();
        let columns: Vec<ColumnMeta> = stmt
            .column_names()
            .iter()
            .map(|name| ColumnMeta {
                name: name.to_string(),
                type_name: "TEXT".to_string(),
                nullable: true,
            })
            .collect();

        let mut rows: Vec<Row> = Vec::new();

        let mut result_rows = match stmt.query([]) {
            Ok(r) => r,
            Err(e) => {
                if self.cancelled.load(Ordering::SeqCst) {
                    return Err(DbError::Cancelled);
                }
                return Err(format_sqlite_query_error(&e));
            }
        };

        loop {
            match result_rows.next() {
                Ok(Some(row)) => {
                    let values: Vec<Value> =
                        (0..column_count).map(|i| sqlite_value_to_value(row, i)).collect();
                    rows.push(values);

                    if let Some(limit) = req.limit
                        && rows.len() >= limit as usize
                    {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        return Err(DbError::Cancelled);
                    }
                    return Err(format_sqlite_query_error(&e));
                }
            }
        }

        let affected_rows = if rows.is_empty() {
            let sql_upper = req.sql.trim().to_uppercase();
            if sql_upper.starts_with("SELECT") || sql_upper.starts_with("PRAGMA") {
                None
            } else {
                Some(conn.changes())
            }
        } else {
            None
        };

        Ok(QueryResult {
            columns,
            rows,
            affected_rows,
            execution_time: start.elapsed(),
        })
    }

    fn cancel(&self, _handle: &QueryHandle) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.interrupt_handle.interrupt();
        log::info!("[CANCEL] SQLite interrupt signal sent");
        Ok(())
    }

    fn cancel_handle(&self) -> Arc<dyn QueryCancelHandle> {
        Arc::new(SqliteCancelHandle {
            cancelled: self.cancelled.clone(),
            interrupt_handle: self
                .conn
                .lock()
                .map(|c| c.get_interrupt_handle())
                .expect("connection mutex poisoned"),
        })
    }

    fn schema(&self) -> Result<SchemaSnapshot, DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let table_names = get_table_names(&conn)?;
        let views = get_views(&conn)?;

        let tables = table_names
            .into_iter()
            .map(|name| {
                let columns = get_columns(&conn, &name).unwrap_or_default();
                let primary_keys = columns
                    .iter()
                    .filter(|c| c.is_primary_key)
                    .map(|c| c.name.clone())
                    .collect();
                let foreign_keys = get_foreign_keys(&conn, &name).unwrap_or_default();
                TableInfo {
                    qualified_name: name.clone(),
                    name,
                    schema: None,
                    columns,
                    primary_keys,
                    foreign_keys,
                    approx_row_count: None,
                    sample_rows: Vec::new(),
                }
            })
            .collect();

        Ok(SchemaSnapshot {
            database_name: self.path.to_string_lossy().to_string(),
            schema_name: None,
            tables,
            views,
            captured_at: chrono::Utc::now(),
        })
    }

    fn schema_for_database(&self, database: &str) -> Result<DbSchemaInfo, DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let table_count = get_table_names(&conn)?.len();
        let view_count = get_views(&conn)?.len();

        Ok(DbSchemaInfo {
            name: database.to_string(),
            table_count,
            view_count,
        })
    }

    fn table_details(
        &self,
        _database: &str,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<TableInfo, DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let columns = get_columns(&conn, table)?;
        let primary_keys = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let foreign_keys = get_foreign_keys(&conn, table)?;

        Ok(TableInfo {
            name: table.to_string(),
            qualified_name: table.to_string(),
            schema: None,
            columns,
            primary_keys,
            foreign_keys,
            approx_row_count: None,
            sample_rows: Vec::new(),
        })
    }

    fn view_details(
        &self,
        _database: &str,
        _schema: Option<&str>,
        view: &str,
    ) -> Result<ViewInfo, DbError> {
        Ok(ViewInfo {
            name: view.to_string(),
            schema: None,
        })
    }

    fn kind(&self) -> DbKind {
        DbKind::SQLite
    }

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy {
        SchemaLoadingStrategy::SingleDatabase
    }

    fn schema_features(&self) -> SchemaFeatures {
        SchemaFeatures::FOREIGN_KEYS | SchemaFeatures::UNIQUE_CONSTRAINTS | SchemaFeatures::TRIGGERS
    }

    fn schema_indexes(
        &self,
        _database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaIndexInfo>, DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let table_names = get_table_names(&conn)?;
        let mut result = Vec::new();
        for table in table_names {
            for index in get_indexes(&conn, &table)? {
                result.push(SchemaIndexInfo {
                    table: table.clone(),
                    index,
                });
            }
        }
        Ok(result)
    }

    fn schema_foreign_keys(
        &self,
        _database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaForeignKeyInfo>, DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let table_names = get_table_names(&conn)?;
        let mut result = Vec::new();
        for table in table_names {
            for fk in get_foreign_keys(&conn, &table)? {
                result.push(SchemaForeignKeyInfo {
                    table: table.clone(),
                    foreign_key: fk,
                });
            }
        }
        Ok(result)
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &SqliteDialect
    }
}

fn get_table_names(conn: &RusqliteConnection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .map_err(|e| format_sqlite_query_error(&e))?;

    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(names)
}

fn get_views(conn: &RusqliteConnection) -> Result<Vec<ViewInfo>, DbError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='view' ORDER BY name")
        .map_err(|e| format_sqlite_query_error(&e))?;

    let views = stmt
        .query_map([], |row| {
            Ok(ViewInfo {
                name: row.get(0)?,
                schema: None,
            })
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(views)
}

fn get_columns(conn: &RusqliteConnection, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info('{}')", table))
        .map_err(|e| format_sqlite_query_error(&e))?;

    let foreign_keys = get_foreign_keys(conn, table)?;
    let fk_by_column: HashMap<String, ForeignKeyInfo> = foreign_keys
        .into_iter()
        .map(|fk| (fk.from_column.clone(), fk))
        .collect();

    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            Ok((
                name,
                row.get::<_, String>(2).unwrap_or_default(),
                row.get::<_, i32>(3).unwrap_or(0) == 0,
                row.get::<_, Option<String>>(4).unwrap_or(None),
                row.get::<_, i32>(5).unwrap_or(0) == 1,
            ))
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .map(|(name, data_type, nullable, default_value, is_primary_key)| {
            let references = fk_by_column.get(&name).cloned();
            ColumnInfo {
                is_foreign_key: references.is_some(),
                references,
                name,
                data_type,
                nullable,
                default_value,
                is_primary_key,
            }
        })
        .collect();

    Ok(columns)
}

fn get_indexes(conn: &RusqliteConnection, table: &str) -> Result<Vec<IndexInfo>, DbError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA index_list('{}')", table))
        .map_err(|e| format_sqlite_query_error(&e))?;

    let index_list: Vec<(String, bool, String)> = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)? == 1,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    let mut indexes = Vec::new();
    for (index_name, is_unique, origin) in index_list {
        let mut col_stmt = conn
            .prepare(&format!("PRAGMA index_info('{}')", index_name))
            .map_err(|e| format_sqlite_query_error(&e))?;

        let columns: Vec<String> = col_stmt
            .query_map([], |row| row.get(2))
            .map_err(|e| format_sqlite_query_error(&e))?
            .filter_map(|r| r.ok())
            .collect();

        indexes.push(IndexInfo {
            name: index_name,
            columns,
            is_unique,
            is_primary: origin == "pk",
        });
    }

    Ok(indexes)
}

fn get_foreign_keys(conn: &RusqliteConnection, table: &str) -> Result<Vec<ForeignKeyInfo>, DbError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA foreign_key_list('{}')", table))
        .map_err(|e| format_sqlite_query_error(&e))?;

    let fks = stmt
        .query_map([], |row| {
            Ok(ForeignKeyInfo {
                from_column: row.get::<_, String>(3)?,
                to_table: row.get::<_, String>(2)?,
                to_column: row.get::<_, String>(4)?,
            })
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(fks)
}

fn sqlite_value_to_value(row: &rusqlite::Row, idx: usize) -> Value {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => Value::Int(i),
        Ok(ValueRef::Real(f)) => Value::Float(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).to_string()),
        Ok(ValueRef::Blob(b)) => Value::Bytes(b.to_vec()),
        Err(_) => Value::Null,
    }
}

pub struct SqliteErrorFormatter;

impl SqliteErrorFormatter {
    fn format_sqlite_error(e: &rusqlite::Error) -> FormattedError {
        match e {
            rusqlite::Error::SqliteFailure(err, msg) => {
                let message = msg.clone().unwrap_or_else(|| format!("{:?}", err.code));

                FormattedError::new(message)
                    .with_code(format!("{:?} ({})", err.code, err.extended_code))
            }
            _ => FormattedError::new(e.to_string()),
        }
    }
}

impl QueryErrorFormatter for SqliteErrorFormatter {
    fn format_query_error(&self, error: &(dyn std::error::Error + 'static)) -> FormattedError {
        if let Some(sqlite_err) = error.downcast_ref::<rusqlite::Error>() {
            Self::format_sqlite_error(sqlite_err)
        } else {
            FormattedError::new(error.to_string())
        }
    }
}

fn format_sqlite_query_error(e: &rusqlite::Error) -> DbError {
    let formatted = SqliteErrorFormatter::format_sqlite_error(e);
    let message = formatted.to_display_string();
    log::error!("SQLite query failed: {}", message);
    formatted.into_query_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_has_no_network_port() {
        assert_eq!(METADATA.default_port, None);
    }
}
