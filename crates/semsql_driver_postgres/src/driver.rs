use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use semsql_core::{
    ColumnInfo, ColumnMeta, Connection, ConnectionProfile, CustomTypeInfo, CustomTypeKind,
    DatabaseInfo, DbConfig, DbDriver, DbError, DbKind, DbSchemaInfo, DriverMetadata,
    ForeignKeyInfo, IndexInfo, PostgresDialect, QueryCancelHandle, QueryHandle, QueryRequest,
    QueryResult, Row, SchemaForeignKeyInfo, SchemaIndexInfo, SchemaLoadingStrategy,
    SchemaSnapshot, SqlDialect, SslMode, TableInfo, Value, ViewInfo,
};
use native_tls::TlsConnector;
use postgres::{CancelToken as PgCancelToken, Client, NoTls};
use postgres_native_tls::MakeTlsConnector;
use uuid::Uuid;

static METADATA: DriverMetadata = DriverMetadata {
    id: "postgresql",
    display_name: "PostgreSQL",
    capabilities: semsql_core::DriverCapabilities::RELATIONAL_BASE
        .union(semsql_core::DriverCapabilities::MULTIPLE_DATABASES)
        .union(semsql_core::DriverCapabilities::SCHEMAS)
        .union(semsql_core::DriverCapabilities::SSL)
        .union(semsql_core::DriverCapabilities::CUSTOM_TYPES)
        .union(semsql_core::DriverCapabilities::QUERY_TIMEOUT)
        .union(semsql_core::DriverCapabilities::RETURNING),
    default_port: Some(5432),
    uri_scheme: "postgresql",
};

pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDriver for PostgresDriver {
    fn kind(&self) -> DbKind {
        DbKind::Postgres
    }

    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError> {
        let config = extract_postgres_config(&profile.config)?;

        log::info!(
            "Connecting to PostgreSQL at {}:{} as {} (database: {})",
            config.host,
            config.port,
            config.user,
            config.database
        );

        let client = connect_postgres(&PostgresConnectParams {
            host: &config.host,
            port: config.port,
            user: &config.user,
            password: password.unwrap_or(""),
            database: &config.database,
            ssl_mode: config.ssl_mode,
        })?;

        let cancel_token = client.cancel_token();

        Ok(Box::new(PostgresConnection {
            client: Mutex::new(client),
            cancel_token,
            active_query: RwLock::new(None),
            cancelled: Arc::new(AtomicBool::new(false)),
        }))
    }

    fn test_connection(&self, profile: &ConnectionProfile) -> Result<String, DbError> {
        let config = extract_postgres_config(&profile.config)?;
        let mut client = connect_postgres(&PostgresConnectParams {
            host: &config.host,
            port: config.port,
            user: &config.user,
            password: "",
            database: &config.database,
            ssl_mode: config.ssl_mode,
        })?;

        let rows = client
            .query("SELECT version()", &[])
            .map_err(|e| DbError::query_failed(e.to_string()))?;

        Ok(rows
            .first()
            .map(|row| row.get::<_, String>(0))
            .unwrap_or_else(|| "PostgreSQL".to_string()))
    }
}

struct ExtractedPostgresConfig {
    host: String,
    port: u16,
    user: String,
    database: String,
    ssl_mode: SslMode,
}

fn extract_postgres_config(config: &DbConfig) -> Result<ExtractedPostgresConfig, DbError> {
    match config {
        DbConfig::Postgres {
            host,
            port,
            user,
            database,
            ssl_mode,
        } => Ok(ExtractedPostgresConfig {
            host: host.clone(),
            port: *port,
            user: user.clone(),
            database: database.clone(),
            ssl_mode: *ssl_mode,
        }),
        _ => Err(DbError::InvalidProfile(
            "Expected PostgreSQL configuration".to_string(),
        )),
    }
}

struct PostgresConnectParams<'a> {
    host: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
    database: &'a str,
    ssl_mode: SslMode,
}

fn connect_postgres(params: &PostgresConnectParams) -> Result<Client, DbError> {
    let conn_string = format!(
        "host={} port={} user={} password={} dbname={} connect_timeout=30",
        params.host, params.port, params.user, params.password, params.database
    );

    match params.ssl_mode {
        SslMode::Disable => Client::connect(&conn_string, NoTls)
            .map_err(|e| format_pg_error(&e, params.host, params.port)),

        SslMode::Prefer | SslMode::Require => {
            let connector = TlsConnector::builder()
                .danger_accept_invalid_certs(params.ssl_mode == SslMode::Prefer)
                .build()
                .map_err(|e| DbError::connection_failed(format!("TLS setup failed: {}", e)))?;

            let tls = MakeTlsConnector::new(connector);

            match Client::connect(&conn_string, tls) {
                Ok(client) => Ok(client),
                Err(_) if params.ssl_mode == SslMode::Prefer => {
                    Client::connect(&conn_string, NoTls)
                        .map_err(|e| format_pg_error(&e, params.host, params.port))
                }
                Err(e) => Err(format_pg_error(&e, params.host, params.port)),
            }
        }
    }
}

pub struct PostgresConnection {
    client: Mutex<Client>,
    cancel_token: PgCancelToken,
    active_query: RwLock<Option<Uuid>>,
    cancelled: Arc<AtomicBool>,
}

struct PostgresCancelHandle {
    cancel_token: PgCancelToken,
    cancelled: Arc<AtomicBool>,
}

impl QueryCancelHandle for PostgresCancelHandle {
    fn cancel(&self) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);

        self.cancel_token.cancel_query(NoTls).map_err(|e| {
            log::error!("[CANCEL] Failed to cancel query: {}", e);
            DbError::query_failed(format!("Failed to cancel query: {}", e))
        })?;

        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl PostgresConnection {
    fn execute_inner(&self, req: &QueryRequest, query_id: Uuid) -> Result<QueryResult, DbError> {
        self.cancelled.store(false, Ordering::SeqCst);

        let start = Instant::now();

        {
            let mut active = self
                .active_query
                .write()
                .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;
            *active = Some(query_id);
        }

        let query_result = {
            let mut client = self
                .client
                .lock()
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            client.query(&req.sql, &[])
        };

        {
            let mut active = self
                .active_query
                .write()
                .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;
            *active = None;
        }

        let rows = query_result.map_err(|e| {
            if e.code() == Some(&postgres::error::SqlState::QUERY_CANCELED) {
                DbError::Cancelled
            } else {
                DbError::query_failed(e.to_string())
            }
        })?;

        let execution_time = start.elapsed();

        if rows.is_empty() {
            return Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                affected_rows: None,
                execution_time,
            });
        }

        let columns: Vec<ColumnMeta> = rows[0]
            .columns()
            .iter()
            .map(|col| ColumnMeta {
                name: col.name().to_string(),
                type_name: col.type_().name().to_string(),
                nullable: true,
            })
            .collect();

        let result_rows: Vec<Row> = rows
            .iter()
            .take(req.limit.unwrap_or(u32::MAX) as usize)
            .map(|row| {
                (0..columns.len())
                    .map(|i| postgres_value_to_value(row, i))
                    .collect()
            })
            .collect();

        Ok(QueryResult {
            columns,
            rows: result_rows,
            affected_rows: None,
            execution_time,
        })
    }
}

impl Connection for PostgresConnection {
    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn ping(&self) -> Result<(), DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        self.execute_inner(req, Uuid::new_v4())
    }

    fn execute_with_handle(
        &self,
        req: &QueryRequest,
    ) -> Result<(QueryHandle, QueryResult), DbError> {
        let handle = QueryHandle::new();
        let result = self.execute_inner(req, handle.id)?;
        Ok((handle, result))
    }

    fn cancel(&self, handle: &QueryHandle) -> Result<(), DbError> {
        let active = self
            .active_query
            .read()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        if *active != Some(handle.id) {
            return Err(DbError::query_failed(
                "No matching active query to cancel".to_string(),
            ));
        }
        drop(active);

        self.cancel_token
            .cancel_query(NoTls)
            .map_err(|e| DbError::query_failed(format!("Failed to cancel query: {}", e)))?;

        Ok(())
    }

    fn cancel_handle(&self) -> Arc<dyn QueryCancelHandle> {
        Arc::new(PostgresCancelHandle {
            cancel_token: self.cancel_token.clone(),
            cancelled: self.cancelled.clone(),
        })
    }

    fn schema(&self) -> Result<SchemaSnapshot, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;

        let database_name = get_current_database(&mut client)?.unwrap_or_default();
        let schema_name = get_current_schema(&mut client)?;
        let tables = get_tables_for_schema(&mut client, &schema_name)?;
        let views = get_views_for_schema(&mut client, &schema_name)?;

        Ok(SchemaSnapshot {
            database_name,
            schema_name: Some(schema_name),
            tables,
            views,
            captured_at: chrono::Utc::now(),
        })
    }

    fn list_databases(&self) -> Result<Vec<DatabaseInfo>, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        get_databases(&mut client)
    }

    fn schema_for_database(&self, database: &str) -> Result<DbSchemaInfo, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        let schema_name = get_current_schema(&mut client)?;
        let tables = get_tables_for_schema(&mut client, &schema_name)?;
        let views = get_views_for_schema(&mut client, &schema_name)?;

        Ok(DbSchemaInfo {
            name: database.to_string(),
            table_count: tables.len(),
            view_count: views.len(),
        })
    }

    fn table_details(
        &self,
        _database: &str,
        schema: Option<&str>,
        table: &str,
    ) -> Result<TableInfo, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        let schema_name = match schema {
            Some(s) => s.to_string(),
            None => get_current_schema(&mut client)?,
        };

        let columns_map = get_all_columns_for_schema(&mut client, &schema_name)?;
        let columns = columns_map.get(table).cloned().unwrap_or_default();
        let primary_keys = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let foreign_keys = columns.iter().filter_map(|c| c.references.clone()).collect();

        Ok(TableInfo {
            name: table.to_string(),
            qualified_name: format!("{}.{}", schema_name, table),
            schema: Some(schema_name),
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
        schema: Option<&str>,
        view: &str,
    ) -> Result<ViewInfo, DbError> {
        Ok(ViewInfo {
            name: view.to_string(),
            schema: schema.map(str::to_string),
        })
    }

    fn kind(&self) -> DbKind {
        DbKind::Postgres
    }

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy {
        SchemaLoadingStrategy::ConnectionPerDatabase
    }

    fn schema_features(&self) -> semsql_core::SchemaFeatures {
        semsql_core::SchemaFeatures::FOREIGN_KEYS
            | semsql_core::SchemaFeatures::CHECK_CONSTRAINTS
            | semsql_core::SchemaFeatures::UNIQUE_CONSTRAINTS
            | semsql_core::SchemaFeatures::CUSTOM_TYPES
            | semsql_core::SchemaFeatures::SEQUENCES
            | semsql_core::SchemaFeatures::FUNCTIONS
    }

    fn schema_types(
        &self,
        _database: &str,
        schema: Option<&str>,
    ) -> Result<Vec<CustomTypeInfo>, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        let schema_name = match schema {
            Some(s) => s.to_string(),
            None => get_current_schema(&mut client)?,
        };

        let rows = client
            .query(
                r#"
                SELECT t.typname, string_agg(e.enumlabel, ',' ORDER BY e.enumsortorder)
                FROM pg_type t
                JOIN pg_enum e ON e.enumtypid = t.oid
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1
                GROUP BY t.typname
                ORDER BY t.typname
                "#,
                &[&schema_name],
            )
            .map_err(|e| DbError::query_failed(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| CustomTypeInfo {
                name: row.get(0),
                kind: CustomTypeKind::Enum,
                definition: row.get(1),
            })
            .collect())
    }

    fn schema_indexes(
        &self,
        _database: &str,
        schema: Option<&str>,
    ) -> Result<Vec<SchemaIndexInfo>, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        let schema_name = match schema {
            Some(s) => s.to_string(),
            None => get_current_schema(&mut client)?,
        };

        let indexes_map = get_all_indexes_for_schema(&mut client, &schema_name)?;
        Ok(indexes_map
            .into_iter()
            .flat_map(|(table, indexes)| {
                indexes
                    .into_iter()
                    .map(move |index| SchemaIndexInfo {
                        table: table.clone(),
                        index,
                    })
            })
            .collect())
    }

    fn schema_foreign_keys(
        &self,
        _database: &str,
        schema: Option<&str>,
    ) -> Result<Vec<SchemaForeignKeyInfo>, DbError> {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::query_failed(e.to_string()))?;
        let schema_name = match schema {
            Some(s) => s.to_string(),
            None => get_current_schema(&mut client)?,
        };

        let columns_map = get_all_columns_for_schema(&mut client, &schema_name)?;
        Ok(columns_map
            .into_iter()
            .flat_map(|(table, columns)| {
                columns.into_iter().filter_map(move |c| {
                    c.references.clone().map(|fk| SchemaForeignKeyInfo {
                        table: table.clone(),
                        foreign_key: fk,
                    })
                })
            })
            .collect())
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &PostgresDialect
    }
}

fn get_databases(client: &mut Client) -> Result<Vec<DatabaseInfo>, DbError> {
    let current = get_current_database(client)?;

    let rows = client
        .query(
            "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
            &[],
        )
        .map_err(|e| DbError::query_failed(e.to_string()))?;

    Ok(rows
        .iter()
        .map(|row| {
            let name: String = row.get(0);
            let is_current = current.as_ref() == Some(&name);
            DatabaseInfo { name, is_current }
        })
        .collect())
}

fn get_current_database(client: &mut Client) -> Result<Option<String>, DbError> {
    let rows = client
        .query("SELECT current_database()", &[])
        .map_err(|e| DbError::query_failed(e.to_string()))?;
    Ok(rows.first().map(|row| row.get(0)))
}

fn get_current_schema(client: &mut Client) -> Result<String, DbError> {
    let rows = client
        .query("SELECT current_schema()", &[])
        .map_err(|e| DbError::query_failed(e.to_string()))?;
    Ok(rows
        .first()
        .map(|row| row.get(0))
        .unwrap_or_else(|| "public".to_string()))
}

fn get_tables_for_schema(client: &mut Client, schema: &str) -> Result<Vec<TableInfo>, DbError> {
    let rows = client
        .query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE' AND table_schema = $1
            ORDER BY table_name
            "#,
            &[&schema],
        )
        .map_err(|e| DbError::query_failed(e.to_string()))?;

    let table_names: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
    if table_names.is_empty() {
        return Ok(Vec::new());
    }

    let columns_map = get_all_columns_for_schema(client, schema)?;

    Ok(table_names
        .into_iter()
        .map(|name| {
            let columns = columns_map.get(&name).cloned().unwrap_or_default();
            let primary_keys = columns
                .iter()
                .filter(|c| c.is_primary_key)
                .map(|c| c.name.clone())
                .collect();
            let foreign_keys = columns.iter().filter_map(|c| c.references.clone()).collect();
            TableInfo {
                qualified_name: format!("{}.{}", schema, name),
                name,
                schema: Some(schema.to_string()),
                columns,
                primary_keys,
                foreign_keys,
                approx_row_count: None,
                sample_rows: Vec::new(),
            }
        })
        .collect())
}

fn get_views_for_schema(client: &mut Client, schema: &str) -> Result<Vec<ViewInfo>, DbError> {
    let rows = client
        .query(
            "SELECT table_name FROM information_schema.views WHERE table_schema = $1 ORDER BY table_name",
            &[&schema],
        )
        .map_err(|e| DbError::query_failed(e.to_string()))?;

    Ok(rows
        .iter()
        .map(|row| ViewInfo {
            name: row.get(0),
            schema: Some(schema.to_string()),
        })
        .collect())
}

fn get_all_columns_for_schema(
    client: &mut Client,
    schema: &str,
) -> Result<HashMap<String, Vec<ColumnInfo>>, DbError> {
    let rows = client
        .query(
            r#"
            SELECT
                c.table_name,
                c.column_name,
                c.data_type,
                c.is_nullable = 'YES' as nullable,
                c.column_default,
                COALESCE(
                    (SELECT true FROM information_schema.table_constraints tc
                     JOIN information_schema.key_column_usage kcu
                       ON tc.constraint_name = kcu.constraint_name
                      AND tc.table_schema = kcu.table_schema
                     WHERE tc.constraint_type = 'PRIMARY KEY'
                       AND tc.table_schema = c.table_schema
                       AND tc.table_name = c.table_name
                       AND kcu.column_name = c.column_name),
                    false
                ) as is_pk,
                fk.foreign_table_name,
                fk.foreign_column_name
            FROM information_schema.columns c
            JOIN information_schema.tables t
              ON c.table_schema = t.table_schema AND c.table_name = t.table_name
            LEFT JOIN (
                SELECT
                    kcu.table_name, kcu.column_name,
                    ccu.table_name AS foreign_table_name,
                    ccu.column_name AS foreign_column_name
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                  ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
                JOIN information_schema.constraint_column_usage ccu
                  ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
                WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
            ) fk ON fk.table_name = c.table_name AND fk.column_name = c.column_name
            WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#,
            &[&schema],
        )
        .map_err(|e| DbError::query_failed(e.to_string()))?;

    let mut result: HashMap<String, Vec<ColumnInfo>> = HashMap::new();

    for row in rows {
        let table_name: String = row.get(0);
        let column_name: String = row.get(1);
        let foreign_table: Option<String> = row.get(6);
        let foreign_column: Option<String> = row.get(7);
        let references = foreign_table.map(|to_table| ForeignKeyInfo {
            from_column: column_name.clone(),
            to_table,
            to_column: foreign_column.unwrap_or_default(),
        });

        let column = ColumnInfo {
            name: column_name,
            data_type: row.get(2),
            nullable: row.get(3),
            default_value: row.get(4),
            is_primary_key: row.get(5),
            is_foreign_key: references.is_some(),
            references,
        };
        result.entry(table_name).or_default().push(column);
    }

    Ok(result)
}

fn get_all_indexes_for_schema(
    client: &mut Client,
    schema: &str,
) -> Result<HashMap<String, Vec<IndexInfo>>, DbError> {
    let rows = client
        .query(
            r#"
            SELECT
                t.relname as table_name,
                i.relname as index_name,
                array_agg(a.attname ORDER BY k.n) as columns,
                ix.indisunique as is_unique,
                ix.indisprimary as is_primary
            FROM pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, n) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1
            GROUP BY t.relname, i.relname, ix.indisunique, ix.indisprimary
            ORDER BY t.relname, i.relname
            "#,
            &[&schema],
        )
        .map_err(|e| DbError::query_failed(e.to_string()))?;

    let mut result: HashMap<String, Vec<IndexInfo>> = HashMap::new();

    for row in rows {
        let table_name: String = row.get(0);
        let columns: Vec<String> = row.get(2);
        let index = IndexInfo {
            name: row.get(1),
            columns,
            is_unique: row.get(3),
            is_primary: row.get(4),
        };
        result.entry(table_name).or_default().push(index);
    }

    Ok(result)
}

fn postgres_value_to_value(row: &postgres::Row, idx: usize) -> Value {
    let col_type = row.columns()[idx].type_();

    match col_type.name() {
        "bool" => row.try_get::<_, bool>(idx).map(Value::Bool).unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, i16>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, i32>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int8" => row.try_get::<_, i64>(idx).map(Value::Int).unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, f32>(idx)
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "float8" | "numeric" => row.try_get::<_, f64>(idx).map(Value::Float).unwrap_or(Value::Null),
        "bytea" => row.try_get::<_, Vec<u8>>(idx).map(Value::Bytes).unwrap_or(Value::Null),
        _ => row.try_get::<_, String>(idx).map(Value::Text).unwrap_or(Value::Null),
    }
}

fn format_pg_error(e: &postgres::Error, host: &str, port: u16) -> DbError {
    let source = e.to_string();

    let message = if source.contains("timed out") {
        format!(
            "Connection to {}:{} timed out. Check that the host is reachable and the port is open.",
            host, port
        )
    } else if source.contains("Connection refused") {
        format!(
            "Connection refused at {}:{}. Verify PostgreSQL is running and accepting connections.",
            host, port
        )
    } else if source.contains("password authentication failed") {
        "Authentication failed. Check your username and password.".to_string()
    } else if source.contains("does not exist") {
        format!("Database or user does not exist: {}", source)
    } else if source.contains("error connecting to server") || source.contains("could not connect")
    {
        format!(
            "Could not connect to {}:{}. The server may be unreachable or behind a firewall.",
            host, port
        )
    } else if source.contains("Name or service not known") || source.contains("nodename nor servname")
    {
        format!("Could not resolve hostname: {}", host)
    } else {
        format!("Connection error: {}", source)
    };

    DbError::connection_failed(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_advertises_schemas_and_returning() {
        assert!(METADATA.supports(semsql_core::DriverCapabilities::SCHEMAS));
        assert!(METADATA.supports(semsql_core::DriverCapabilities::RETURNING));
    }
}
