use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use semsql_core::{
    ColumnInfo, ColumnMeta, Connection, ConnectionProfile, DatabaseInfo, DbConfig, DbDriver,
    DbError, DbKind, DbSchemaInfo, DriverCapabilities, DriverMetadata, ForeignKeyInfo,
    FormattedError, IndexInfo, OracleDialect, QueryCancelHandle, QueryErrorFormatter, QueryHandle,
    QueryRequest, QueryResult, Row, SchemaFeatures, SchemaForeignKeyInfo, SchemaIndexInfo,
    SchemaLoadingStrategy, SchemaSnapshot, SqlDialect, TableInfo, Value, ViewInfo,
};
use oracle::sql_type::OracleType;
use oracle::Connection as OracleConn;

pub static METADATA: DriverMetadata = DriverMetadata {
    id: "oracle",
    display_name: "Oracle",
    capabilities: DriverCapabilities::RELATIONAL_BASE
        .union(DriverCapabilities::SCHEMAS)
        .union(DriverCapabilities::CUSTOM_TYPES),
    default_port: Some(1521),
    uri_scheme: "oracle",
};

pub struct OracleDriver;

impl OracleDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OracleDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDriver for OracleDriver {
    fn kind(&self) -> DbKind {
        DbKind::Oracle
    }

    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError> {
        let (host, port, user, service_name) = match &profile.config {
            DbConfig::Oracle {
                host,
                port,
                user,
                service_name,
            } => (host.clone(), *port, user.clone(), service_name.clone()),
            _ => {
                return Err(DbError::InvalidProfile(
                    "Expected Oracle configuration".to_string(),
                ));
            }
        };

        let connect_string = format!("{}:{}/{}", host, port, service_name);
        log::info!(
            "Connecting to Oracle at {} as {}",
            connect_string,
            user
        );

        let conn = OracleConn::connect(&user, password.unwrap_or(""), &connect_string)
            .map_err(|e| format_oracle_connect_error(&e, &host, port))?;

        Ok(Box::new(OracleConnection {
            conn: Mutex::new(conn),
            cancelled: Arc::new(AtomicBool::new(false)),
            schema: user.to_uppercase(),
        }))
    }

    fn test_connection(&self, profile: &ConnectionProfile) -> Result<String, DbError> {
        let conn = self.connect_with_password(profile, None)?;
        conn.ping()?;
        Ok("Oracle".to_string())
    }
}

pub struct OracleConnection {
    conn: Mutex<OracleConn>,
    cancelled: Arc<AtomicBool>,
    /// Oracle has no separate "database" concept; the connecting user's
    /// schema is the unit `schema()`/`table_details()` operate over.
    schema: String,
}

struct OracleCancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl QueryCancelHandle for OracleCancelHandle {
    fn cancel(&self) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Connection for OracleConnection {
    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn ping(&self) -> Result<(), DbError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        conn.query("SELECT 1 FROM DUAL", &[])
            .map_err(|e| format_oracle_query_error(&e))?;
        Ok(())
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

        let sql_upper = req.sql.trim().to_uppercase();
        let is_query = sql_upper.starts_with("SELECT") || sql_upper.starts_with("WITH");

        if !is_query {
            let result = conn.execute(&req.sql, &[]);
            return match result {
                Ok(stmt) => {
                    conn.commit().map_err(|e| format_oracle_query_error(&e))?;
                    Ok(QueryResult {
                        columns: Vec::new(),
                        rows: Vec::new(),
                        affected_rows: Some(stmt.row_count().unwrap_or(0)),
                        execution_time: start.elapsed(),
                    })
                }
                Err(e) => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        Err(DbError::Cancelled)
                    } else {
                        Err(format_oracle_query_error(&e))
                    }
                }
            };
        }

        let result_set = conn
            .query(&req.sql, &[])
            .map_err(|e| format_oracle_query_error(&e))?;

        let columns: Vec<ColumnMeta> = result_set
            .column_info()
            .iter()
            .map(|c| ColumnMeta {
                name: c.name().to_string(),
                type_name: oracle_type_name(c.oracle_type()),
                nullable: c.nullable(),
            })
            .collect();

        let mut rows: Vec<Row> = Vec::new();
        let limit = req.limit.unwrap_or(u32::MAX) as usize;

        for row_result in result_set {
            let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
            let values: Vec<Value> = (0..columns.len())
                .map(|i| oracle_row_value_to_value(&row, i))
                .collect();
            rows.push(values);

            if rows.len() >= limit {
                break;
            }
        }

        Ok(QueryResult {
            columns,
            rows,
            affected_rows: None,
            execution_time: start.elapsed(),
        })
    }

    fn cancel(&self, _handle: &QueryHandle) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;
        conn.break_execution()
            .map_err(|e| format_oracle_query_error(&e))
    }

    fn cancel_handle(&self) -> Arc<dyn QueryCancelHandle> {
        Arc::new(OracleCancelHandle {
            cancelled: self.cancelled.clone(),
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
                let foreign_keys = columns.iter().filter_map(|c| c.references.clone()).collect();
                TableInfo {
                    qualified_name: format!("{}.{}", self.schema, name),
                    name,
                    schema: Some(self.schema.clone()),
                    columns,
                    primary_keys,
                    foreign_keys,
                    approx_row_count: None,
                    sample_rows: Vec::new(),
                }
            })
            .collect();

        Ok(SchemaSnapshot {
            database_name: self.schema.clone(),
            schema_name: Some(self.schema.clone()),
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

        Ok(DbSchemaInfo {
            name: database.to_string(),
            table_count: get_table_names(&conn)?.len(),
            view_count: get_views(&conn)?.len(),
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

        let table_upper = table.to_uppercase();
        let columns = get_columns(&conn, &table_upper)?;
        let primary_keys = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let foreign_keys = columns.iter().filter_map(|c| c.references.clone()).collect();

        Ok(TableInfo {
            name: table_upper.clone(),
            qualified_name: format!("{}.{}", self.schema, table_upper),
            schema: Some(self.schema.clone()),
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
            name: view.to_uppercase(),
            schema: Some(self.schema.clone()),
        })
    }

    fn list_databases(&self) -> Result<Vec<DatabaseInfo>, DbError> {
        Ok(vec![DatabaseInfo {
            name: self.schema.clone(),
            is_current: true,
        }])
    }

    fn kind(&self) -> DbKind {
        DbKind::Oracle
    }

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy {
        SchemaLoadingStrategy::SingleDatabase
    }

    fn schema_features(&self) -> SchemaFeatures {
        SchemaFeatures::FOREIGN_KEYS
            | SchemaFeatures::CHECK_CONSTRAINTS
            | SchemaFeatures::UNIQUE_CONSTRAINTS
            | SchemaFeatures::SEQUENCES
            | SchemaFeatures::TRIGGERS
            | SchemaFeatures::FUNCTIONS
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
            let columns = get_columns(&conn, &table)?;
            for fk in columns.into_iter().filter_map(|c| c.references) {
                result.push(SchemaForeignKeyInfo {
                    table: table.clone(),
                    foreign_key: fk,
                });
            }
        }
        Ok(result)
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &OracleDialect
    }
}

fn get_table_names(conn: &OracleConn) -> Result<Vec<String>, DbError> {
    let rows = conn
        .query("SELECT table_name FROM user_tables ORDER BY table_name", &[])
        .map_err(|e| format_oracle_query_error(&e))?;

    let mut names = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let name: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        names.push(name);
    }
    Ok(names)
}

fn get_views(conn: &OracleConn) -> Result<Vec<ViewInfo>, DbError> {
    let rows = conn
        .query("SELECT view_name FROM user_views ORDER BY view_name", &[])
        .map_err(|e| format_oracle_query_error(&e))?;

    let mut views = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let name: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        views.push(ViewInfo { name, schema: None });
    }
    Ok(views)
}

fn get_columns(conn: &OracleConn, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
    let rows = conn
        .query(
            "SELECT column_name, data_type, nullable, data_default \
             FROM user_tab_columns WHERE table_name = :1 ORDER BY column_id",
            &[&table],
        )
        .map_err(|e| format_oracle_query_error(&e))?;

    let primary_keys = get_primary_key_columns(conn, table)?;
    let foreign_keys = get_foreign_keys(conn, table)?;
    let fk_by_column: HashMap<String, ForeignKeyInfo> = foreign_keys
        .into_iter()
        .map(|fk| (fk.from_column.clone(), fk))
        .collect();

    let mut columns = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let name: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        let data_type: String = row.get(1).map_err(|e| format_oracle_query_error(&e))?;
        let nullable_flag: String = row.get(2).map_err(|e| format_oracle_query_error(&e))?;
        let default_value: Option<String> = row.get(3).ok();

        let references = fk_by_column.get(&name).cloned();
        columns.push(ColumnInfo {
            is_primary_key: primary_keys.contains(&name),
            is_foreign_key: references.is_some(),
            nullable: nullable_flag == "Y",
            data_type,
            default_value,
            references,
            name,
        });
    }

    Ok(columns)
}

fn get_primary_key_columns(conn: &OracleConn, table: &str) -> Result<Vec<String>, DbError> {
    let rows = conn
        .query(
            "SELECT cols.column_name \
             FROM user_constraints cons \
             JOIN user_cons_columns cols ON cons.constraint_name = cols.constraint_name \
             WHERE cons.constraint_type = 'P' AND cons.table_name = :1",
            &[&table],
        )
        .map_err(|e| format_oracle_query_error(&e))?;

    let mut names = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let name: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        names.push(name);
    }
    Ok(names)
}

fn get_foreign_keys(conn: &OracleConn, table: &str) -> Result<Vec<ForeignKeyInfo>, DbError> {
    let rows = conn
        .query(
            "SELECT a.column_name, c_pk.table_name, b.column_name \
             FROM user_constraints c \
             JOIN user_cons_columns a ON c.constraint_name = a.constraint_name \
             JOIN user_constraints c_pk ON c.r_constraint_name = c_pk.constraint_name \
             JOIN user_cons_columns b ON c_pk.constraint_name = b.constraint_name AND a.position = b.position \
             WHERE c.constraint_type = 'R' AND c.table_name = :1",
            &[&table],
        )
        .map_err(|e| format_oracle_query_error(&e))?;

    let mut fks = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let from_column: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        let to_table: String = row.get(1).map_err(|e| format_oracle_query_error(&e))?;
        let to_column: String = row.get(2).map_err(|e| format_oracle_query_error(&e))?;
        fks.push(ForeignKeyInfo {
            from_column,
            to_table,
            to_column,
        });
    }
    Ok(fks)
}

fn get_indexes(conn: &OracleConn, table: &str) -> Result<Vec<IndexInfo>, DbError> {
    let rows = conn
        .query(
            "SELECT i.index_name, i.uniqueness, c.column_name \
             FROM user_indexes i \
             JOIN user_ind_columns c ON i.index_name = c.index_name \
             WHERE i.table_name = :1 ORDER BY i.index_name, c.column_position",
            &[&table],
        )
        .map_err(|e| format_oracle_query_error(&e))?;

    let mut indexes_map: indexmap::IndexMap<String, IndexInfo> = indexmap::IndexMap::new();
    for row_result in rows {
        let row = row_result.map_err(|e| format_oracle_query_error(&e))?;
        let index_name: String = row.get(0).map_err(|e| format_oracle_query_error(&e))?;
        let uniqueness: String = row.get(1).map_err(|e| format_oracle_query_error(&e))?;
        let column_name: String = row.get(2).map_err(|e| format_oracle_query_error(&e))?;

        let entry = indexes_map
            .entry(index_name.clone())
            .or_insert_with(|| IndexInfo {
                name: index_name.clone(),
                columns: Vec::new(),
                is_unique: uniqueness == "UNIQUE",
                is_primary: index_name.starts_with("SYS_"),
            });
        entry.columns.push(column_name);
    }

    Ok(indexes_map.into_values().collect())
}

fn oracle_type_name(oracle_type: &OracleType) -> String {
    format!("{:?}", oracle_type)
}

fn oracle_row_value_to_value(row: &oracle::Row, idx: usize) -> Value {
    if let Ok(v) = row.get::<_, Option<i64>>(idx)
        && let Some(v) = v
    {
        return Value::Int(v);
    }
    if let Ok(v) = row.get::<_, Option<f64>>(idx)
        && let Some(v) = v
    {
        return Value::Float(v);
    }
    if let Ok(v) = row.get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
        && let Some(v) = v
    {
        return Value::DateTime(v);
    }
    match row.get::<_, Option<String>>(idx) {
        Ok(Some(v)) => Value::Text(v),
        Ok(None) => Value::Null,
        Err(_) => Value::Null,
    }
}

fn format_oracle_query_error(e: &oracle::Error) -> DbError {
    let formatted = FormattedError::new(e.to_string());
    log::error!("Oracle query failed: {}", formatted.to_display_string());
    formatted.into_query_error()
}

fn format_oracle_connect_error(e: &oracle::Error, host: &str, port: u16) -> DbError {
    DbError::connection_failed(format!("Failed to connect to {}:{}: {}", host, port, e))
}

pub struct OracleErrorFormatter;

impl QueryErrorFormatter for OracleErrorFormatter {
    fn format_query_error(&self, error: &(dyn std::error::Error + 'static)) -> FormattedError {
        if let Some(oracle_err) = error.downcast_ref::<oracle::Error>() {
            FormattedError::new(oracle_err.to_string())
        } else {
            FormattedError::new(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_advertises_schemas_and_custom_types() {
        assert!(METADATA.supports(DriverCapabilities::SCHEMAS));
        assert!(METADATA.supports(DriverCapabilities::CUSTOM_TYPES));
    }
}
