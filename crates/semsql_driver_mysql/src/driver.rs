use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use semsql_core::{
    ColumnInfo, ColumnMeta, Connection, ConnectionErrorFormatter, ConnectionProfile, DatabaseInfo,
    DbConfig, DbDriver, DbError, DbKind, DbSchemaInfo, DriverCapabilities, DriverMetadata,
    ForeignKeyInfo, FormattedError, IndexInfo, MySqlDialect, QueryCancelHandle,
    QueryErrorFormatter, QueryHandle, QueryRequest, QueryResult, Row, SchemaFeatures,
    SchemaForeignKeyInfo, SchemaIndexInfo, SchemaLoadingStrategy, SchemaSnapshot, SqlDialect,
    SslMode, TableInfo, Value, ViewInfo,
};
use mysql::prelude::*;
use mysql::{Conn, Opts, OptsBuilder, SslOpts};

pub static MYSQL_METADATA: DriverMetadata = DriverMetadata {
    id: "mysql",
    display_name: "MySQL",
    capabilities: DriverCapabilities::RELATIONAL_BASE
        .union(DriverCapabilities::MULTIPLE_DATABASES)
        .union(DriverCapabilities::SSL),
    default_port: Some(3306),
    uri_scheme: "mysql",
};

pub static MARIADB_METADATA: DriverMetadata = DriverMetadata {
    id: "mariadb",
    display_name: "MariaDB",
    capabilities: DriverCapabilities::RELATIONAL_BASE
        .union(DriverCapabilities::MULTIPLE_DATABASES)
        .union(DriverCapabilities::SSL),
    default_port: Some(3306),
    uri_scheme: "mariadb",
};

pub struct MysqlDriver {
    kind: DbKind,
}

impl MysqlDriver {
    pub fn new(kind: DbKind) -> Self {
        Self { kind }
    }
}

impl DbDriver for MysqlDriver {
    fn kind(&self) -> DbKind {
        self.kind
    }

    fn metadata(&self) -> &'static DriverMetadata {
        match self.kind {
            DbKind::MariaDB => &MARIADB_METADATA,
            _ => &MYSQL_METADATA,
        }
    }

    fn connect_with_password(
        &self,
        profile: &ConnectionProfile,
        password: Option<&str>,
    ) -> Result<Box<dyn Connection>, DbError> {
        let config = extract_mysql_config(&profile.config)?;

        log::info!(
            "Connecting to MySQL at {}:{} as {} (database: {:?}, ssl: {:?})",
            config.host,
            config.port,
            config.user,
            config.database,
            config.ssl_mode
        );

        self.connect_direct(
            &config.host,
            config.port,
            &config.user,
            config.database.as_deref(),
            password,
            config.ssl_mode,
        )
    }

    fn test_connection(&self, profile: &ConnectionProfile) -> Result<String, DbError> {
        let conn = self.connect_with_password(profile, None)?;
        conn.ping()?;
        Ok(self.metadata().display_name.to_string())
    }
}

struct ExtractedMysqlConfig {
    host: String,
    port: u16,
    user: String,
    database: Option<String>,
    ssl_mode: SslMode,
}

fn extract_mysql_config(config: &DbConfig) -> Result<ExtractedMysqlConfig, DbError> {
    match config {
        DbConfig::MySQL {
            host,
            port,
            user,
            database,
            ssl_mode,
        } => Ok(ExtractedMysqlConfig {
            host: host.clone(),
            port: *port,
            user: user.clone(),
            database: database.clone(),
            ssl_mode: *ssl_mode,
        }),
        _ => Err(DbError::InvalidProfile(
            "Expected MySQL configuration".to_string(),
        )),
    }
}

fn build_mysql_opts(
    host: &str,
    port: u16,
    user: &str,
    database: Option<&str>,
    password: Option<&str>,
    ssl_mode: SslMode,
) -> Opts {
    let mut builder = OptsBuilder::new()
        .ip_or_hostname(Some(host))
        .tcp_port(port)
        .user(Some(user))
        .pass(password);

    if let Some(db) = database {
        builder = builder.db_name(Some(db));
    }

    match ssl_mode {
        SslMode::Disable => {}
        SslMode::Prefer => {
            let ssl_opts = SslOpts::default().with_danger_accept_invalid_certs(true);
            builder = builder.ssl_opts(ssl_opts);
        }
        SslMode::Require => {
            let ssl_opts = SslOpts::default();
            builder = builder.ssl_opts(ssl_opts);
        }
    }

    builder.into()
}

impl MysqlDriver {
    fn connect_direct(
        &self,
        host: &str,
        port: u16,
        user: &str,
        database: Option<&str>,
        password: Option<&str>,
        ssl_mode: SslMode,
    ) -> Result<Box<dyn Connection>, DbError> {
        let (opts, catalog_conn) = if ssl_mode == SslMode::Prefer {
            let ssl_opts = build_mysql_opts(host, port, user, database, password, SslMode::Prefer);
            match Conn::new(ssl_opts.clone()) {
                Ok(c) => (ssl_opts, c),
                Err(ssl_err) => {
                    log::info!(
                        "[SSL] SSL connection failed ({}), falling back to non-SSL",
                        ssl_err
                    );
                    let no_ssl_opts =
                        build_mysql_opts(host, port, user, database, password, SslMode::Disable);
                    let c = Conn::new(no_ssl_opts.clone())
                        .map_err(|e| format_mysql_error(&e, host, port))?;
                    (no_ssl_opts, c)
                }
            }
        } else {
            let opts = build_mysql_opts(host, port, user, database, password, ssl_mode);
            let c = Conn::new(opts.clone()).map_err(|e| format_mysql_error(&e, host, port))?;
            (opts, c)
        };

        log::info!("[CONNECT] Catalog connection established");

        let mut query_conn =
            Conn::new(opts.clone()).map_err(|e| format_mysql_error(&e, host, port))?;

        let query_connection_id: u64 = query_conn
            .query_first("SELECT CONNECTION_ID()")
            .map_err(|e| format_mysql_query_error(&e))?
            .unwrap_or(0);

        log::info!(
            "[CONNECT] Query connection established (id: {})",
            query_connection_id
        );

        Ok(Box::new(MysqlConnection {
            catalog_conn: Mutex::new(catalog_conn),
            query_conn: Mutex::new(QueryConnState {
                conn: query_conn,
                current_database: database.map(str::to_string),
            }),
            query_connection_id,
            kill_opts: opts,
            cancelled: Arc::new(AtomicBool::new(false)),
            kind: self.kind,
        }))
    }
}

pub struct MysqlErrorFormatter;

impl MysqlErrorFormatter {
    fn format_mysql_error(e: &mysql::Error) -> FormattedError {
        match e {
            mysql::Error::MySqlError(mysql_err) => {
                FormattedError::new(&mysql_err.message).with_code(mysql_err.code.to_string())
            }
            _ => FormattedError::new(e.to_string()),
        }
    }

    fn format_connection_message(source: &str, host: &str, port: u16) -> String {
        if source.contains("Connection refused") {
            format!("Connection refused at {}:{}. Is MySQL running?", host, port)
        } else if source.contains("Access denied") {
            "Access denied for user. Check username and password.".to_string()
        } else if source.contains("Unknown database") {
            "Database does not exist.".to_string()
        } else if source.contains("caching_sha2_password")
            || source.contains("Authentication requires secure connection")
        {
            "Authentication failed. MySQL 8+ requires SSL for initial authentication \
             with caching_sha2_password. Try changing SSL mode to 'Require' or 'Prefer'."
                .to_string()
        } else {
            source.to_string()
        }
    }
}

impl QueryErrorFormatter for MysqlErrorFormatter {
    fn format_query_error(&self, error: &(dyn std::error::Error + 'static)) -> FormattedError {
        if let Some(mysql_err) = error.downcast_ref::<mysql::Error>() {
            Self::format_mysql_error(mysql_err)
        } else {
            FormattedError::new(error.to_string())
        }
    }
}

impl ConnectionErrorFormatter for MysqlErrorFormatter {
    fn format_connection_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        host: &str,
        port: u16,
    ) -> FormattedError {
        let source = error.to_string();
        let message = Self::format_connection_message(&source, host, port);
        FormattedError::new(message)
    }

    fn format_uri_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        sanitized_uri: &str,
    ) -> FormattedError {
        let source = error.to_string();

        let message = if source.contains("Access denied") {
            "Authentication failed. Check your username and password in the URI.".to_string()
        } else if source.contains("Unknown database") {
            format!("Database does not exist: {}", source)
        } else {
            format!("Connection error with URI {}: {}", sanitized_uri, source)
        };

        FormattedError::new(message)
    }
}

static MYSQL_ERROR_FORMATTER: MysqlErrorFormatter = MysqlErrorFormatter;

fn format_mysql_error(e: &mysql::Error, host: &str, port: u16) -> DbError {
    let formatted = MYSQL_ERROR_FORMATTER.format_connection_error(e, host, port);
    formatted.into_connection_error()
}

fn format_mysql_query_error(e: &mysql::Error) -> DbError {
    let formatted = MysqlErrorFormatter::format_mysql_error(e);
    let message = formatted.to_display_string();
    log::error!("MySQL query failed: {}", message);
    formatted.into_query_error()
}

struct QueryConnState {
    conn: Conn,
    current_database: Option<String>,
}

pub struct MysqlConnection {
    catalog_conn: Mutex<Conn>,
    query_conn: Mutex<QueryConnState>,
    query_connection_id: u64,
    kill_opts: Opts,
    cancelled: Arc<AtomicBool>,
    kind: DbKind,
}

struct MysqlCancelHandle {
    kill_opts: Opts,
    query_connection_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl QueryCancelHandle for MysqlCancelHandle {
    fn cancel(&self) -> Result<(), DbError> {
        self.cancelled.store(true, Ordering::SeqCst);

        let mut kill_conn = Conn::new(self.kill_opts.clone())
            .map_err(|e| DbError::query_failed(format!("Failed to open kill connection: {}", e)))?;

        let kill_query = format!("KILL QUERY {}", self.query_connection_id);
        match kill_conn.query_drop(&kill_query) {
            Ok(_) => {
                log::info!(
                    "[CANCEL] KILL QUERY {} sent successfully",
                    self.query_connection_id
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("[CANCEL] KILL QUERY failed ({}), trying KILL...", e);
                let kill_conn_cmd = format!("KILL {}", self.query_connection_id);
                kill_conn.query_drop(&kill_conn_cmd).map_err(|e2| {
                    DbError::query_failed(format!(
                        "Permission denied to cancel query. KILL QUERY: {}, KILL: {}",
                        e, e2
                    ))
                })
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Connection for MysqlConnection {
    fn metadata(&self) -> &'static DriverMetadata {
        match self.kind {
            DbKind::MariaDB => &MARIADB_METADATA,
            _ => &MYSQL_METADATA,
        }
    }

    fn ping(&self) -> Result<(), DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        conn.query_drop("SELECT 1")
            .map_err(|e| format_mysql_query_error(&e))
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        self.cancelled.store(false, Ordering::SeqCst);

        let start = Instant::now();

        let mut state = match self.query_conn.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                log::warn!("[CLEANUP] Recovering from poisoned mutex");
                poison_err.into_inner()
            }
        };

        let stmt = state
            .conn
            .prep(&req.sql)
            .map_err(|e| format_mysql_query_error(&e))?;

        let columns: Vec<ColumnMeta> = stmt
            .columns()
            .iter()
            .map(|col| ColumnMeta {
                name: col.name_str().to_string(),
                type_name: format!("{:?}", col.column_type()),
                nullable: true,
            })
            .collect();

        let result: Result<Vec<mysql::Row>, mysql::Error> = state.conn.exec(&stmt, ());

        let execution_time = start.elapsed();

        match result {
            Ok(rows) => {
                if rows.is_empty() {
                    let sql_upper = req.sql.trim().to_uppercase();
                    let affected = if sql_upper.starts_with("SELECT")
                        || sql_upper.starts_with("SHOW")
                        || sql_upper.starts_with("DESCRIBE")
                    {
                        None
                    } else {
                        Some(state.conn.affected_rows())
                    };

                    return Ok(QueryResult {
                        columns,
                        rows: Vec::new(),
                        affected_rows: affected,
                        execution_time,
                    });
                }

                let result_rows: Vec<Row> = rows
                    .iter()
                    .take(req.limit.unwrap_or(u32::MAX) as usize)
                    .map(|row| {
                        let row_cols = row.columns_ref();
                        (0..columns.len())
                            .map(|i| mysql_value_to_value(row, i, &row_cols[i]))
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
            Err(e) => {
                if self.cancelled.load(Ordering::SeqCst) {
                    Err(DbError::Cancelled)
                } else {
                    Err(format_mysql_query_error(&e))
                }
            }
        }
    }

    fn cancel(&self, _handle: &QueryHandle) -> Result<(), DbError> {
        self.cancel_handle().cancel()
    }

    fn cancel_handle(&self) -> Arc<dyn QueryCancelHandle> {
        Arc::new(MysqlCancelHandle {
            kill_opts: self.kill_opts.clone(),
            query_connection_id: self.query_connection_id,
            cancelled: self.cancelled.clone(),
        })
    }

    fn schema(&self) -> Result<SchemaSnapshot, DbError> {
        let active = self.active_database();
        let database_name = active.unwrap_or_default();

        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let tables = fetch_tables_shallow(&mut conn, &database_name)?;
        let views = fetch_views(&mut conn, &database_name)?;

        let tables = tables
            .into_iter()
            .map(|t| {
                let columns = fetch_columns(&mut conn, &database_name, &t.name)
                    .unwrap_or_default();
                let primary_keys = columns
                    .iter()
                    .filter(|c| c.is_primary_key)
                    .map(|c| c.name.clone())
                    .collect();
                let foreign_keys = columns.iter().filter_map(|c| c.references.clone()).collect();
                TableInfo {
                    columns,
                    primary_keys,
                    foreign_keys,
                    ..t
                }
            })
            .collect();

        Ok(SchemaSnapshot {
            database_name,
            schema_name: None,
            tables,
            views,
            captured_at: chrono::Utc::now(),
        })
    }

    fn schema_for_database(&self, database: &str) -> Result<DbSchemaInfo, DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let tables = fetch_tables_shallow(&mut conn, database)?;
        let views = fetch_views(&mut conn, database)?;

        Ok(DbSchemaInfo {
            name: database.to_string(),
            table_count: tables.len(),
            view_count: views.len(),
        })
    }

    fn table_details(
        &self,
        database: &str,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<TableInfo, DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let columns = fetch_columns(&mut conn, database, table)?;
        let indexes = fetch_indexes(&mut conn, database, table)?;
        let primary_keys = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let foreign_keys = fetch_foreign_keys(&mut conn, database, table)?;

        let _ = indexes;

        Ok(TableInfo {
            name: table.to_string(),
            qualified_name: format!("{}.{}", database, table),
            schema: Some(database.to_string()),
            columns,
            primary_keys,
            foreign_keys,
            approx_row_count: None,
            sample_rows: Vec::new(),
        })
    }

    fn view_details(
        &self,
        database: &str,
        _schema: Option<&str>,
        view: &str,
    ) -> Result<ViewInfo, DbError> {
        Ok(ViewInfo {
            name: view.to_string(),
            schema: Some(database.to_string()),
        })
    }

    fn list_databases(&self) -> Result<Vec<DatabaseInfo>, DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let databases: Vec<String> = conn
            .query("SHOW DATABASES")
            .map_err(|e| format_mysql_query_error(&e))?;

        let active = self.active_database();

        Ok(databases
            .into_iter()
            .filter(|db| {
                db != "information_schema"
                    && db != "mysql"
                    && db != "performance_schema"
                    && db != "sys"
            })
            .map(|name| {
                let is_current = active.as_deref() == Some(name.as_str());
                DatabaseInfo { name, is_current }
            })
            .collect())
    }

    fn kind(&self) -> DbKind {
        self.kind
    }

    fn schema_loading_strategy(&self) -> SchemaLoadingStrategy {
        SchemaLoadingStrategy::LazyPerDatabase
    }

    fn schema_features(&self) -> SchemaFeatures {
        SchemaFeatures::FOREIGN_KEYS | SchemaFeatures::TRIGGERS
    }

    fn set_active_database(&self, database: Option<&str>) -> Result<(), DbError> {
        let mut state = self
            .query_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        if state.current_database.as_deref() == database {
            return Ok(());
        }

        if let Some(db) = database {
            log::info!("[USE] Switching to database: {}", db);
            state
                .conn
                .query_drop(format!("USE {}", mysql_quote_ident(db)))
                .map_err(|e| DbError::query_failed(format!("USE database failed: {}", e)))?;
        }

        state.current_database = database.map(str::to_string);
        Ok(())
    }

    fn active_database(&self) -> Option<String> {
        self.query_conn
            .lock()
            .ok()
            .and_then(|state| state.current_database.clone())
    }

    fn schema_indexes(
        &self,
        database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaIndexInfo>, DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let tables = fetch_tables_shallow(&mut conn, database)?;
        let mut result = Vec::new();
        for table in tables {
            let indexes = fetch_indexes(&mut conn, database, &table.name)?;
            for index in indexes {
                result.push(SchemaIndexInfo {
                    table: table.name.clone(),
                    index,
                });
            }
        }
        Ok(result)
    }

    fn schema_foreign_keys(
        &self,
        database: &str,
        _schema: Option<&str>,
    ) -> Result<Vec<SchemaForeignKeyInfo>, DbError> {
        let mut conn = self
            .catalog_conn
            .lock()
            .map_err(|e| DbError::query_failed(format!("Lock error: {}", e)))?;

        let tables = fetch_tables_shallow(&mut conn, database)?;
        let mut result = Vec::new();
        for table in tables {
            let fks = fetch_foreign_keys(&mut conn, database, &table.name)?;
            for fk in fks {
                result.push(SchemaForeignKeyInfo {
                    table: table.name.clone(),
                    foreign_key: fk,
                });
            }
        }
        Ok(result)
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &MySqlDialect
    }
}

fn mysql_value_to_value(row: &mysql::Row, idx: usize, col: &mysql::Column) -> Value {
    use mysql::consts::{ColumnFlags, ColumnType};

    let col_type = col.column_type();

    if col_type == ColumnType::MYSQL_TYPE_TINY
        && col.column_length() == 1
        && let Some(Ok(val)) = row.get_opt::<Option<i8>, _>(idx)
    {
        return match val {
            Some(v) => Value::Bool(v != 0),
            None => Value::Null,
        };
    }

    if col_type == ColumnType::MYSQL_TYPE_LONGLONG
        && col.flags().contains(ColumnFlags::UNSIGNED_FLAG)
        && let Some(Ok(val)) = row.get_opt::<Option<u64>, _>(idx)
    {
        return match val {
            Some(v) if v <= i64::MAX as u64 => Value::Int(v as i64),
            Some(v) => Value::Text(v.to_string()),
            None => Value::Null,
        };
    }

    if matches!(
        col_type,
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP
    ) && let Some(mysql_val) = row.as_ref(idx)
    {
        match mysql_val {
            mysql::Value::Date(year, month, day, hour, min, sec, micro) => {
                if let Some(naive_date) =
                    chrono::NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    && let Some(naive_time) = chrono::NaiveTime::from_hms_micro_opt(
                        *hour as u32,
                        *min as u32,
                        *sec as u32,
                        *micro,
                    )
                {
                    let naive_dt = chrono::NaiveDateTime::new(naive_date, naive_time);
                    let utc = chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(
                        naive_dt,
                        chrono::Utc,
                    );
                    return Value::DateTime(utc);
                }
                return Value::Text(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, min, sec
                ));
            }
            mysql::Value::NULL => return Value::Null,
            _ => {}
        }
    }

    if col_type == ColumnType::MYSQL_TYPE_DATE
        && let Some(mysql_val) = row.as_ref(idx)
    {
        match mysql_val {
            mysql::Value::Date(year, month, day, _, _, _, _) => {
                if let Some(date) =
                    chrono::NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                {
                    return Value::Date(date);
                }
                return Value::Text(format!("{:04}-{:02}-{:02}", year, month, day));
            }
            mysql::Value::NULL => return Value::Null,
            _ => {}
        }
    }

    if col_type == ColumnType::MYSQL_TYPE_TIME
        && let Some(mysql_val) = row.as_ref(idx)
    {
        match mysql_val {
            mysql::Value::Time(_is_neg, _days, hours, mins, secs, micros) => {
                if let Some(time) =
                    chrono::NaiveTime::from_hms_micro_opt(*hours as u32, *mins as u32, *secs as u32, *micros)
                {
                    return Value::Time(time);
                }
                return Value::Text(format!("{:02}:{:02}:{:02}", hours, mins, secs));
            }
            mysql::Value::NULL => return Value::Null,
            _ => {}
        }
    }

    if let Some(Ok(val)) = row.get_opt::<Option<i64>, _>(idx) {
        return val.map(Value::Int).unwrap_or(Value::Null);
    }

    if let Some(Ok(val)) = row.get_opt::<Option<f64>, _>(idx) {
        return val.map(Value::Float).unwrap_or(Value::Null);
    }

    if let Some(Ok(val)) = row.get_opt::<Option<String>, _>(idx) {
        return val.map(Value::Text).unwrap_or(Value::Null);
    }

    match row.get_opt::<Option<Vec<u8>>, _>(idx) {
        Some(Ok(Some(v))) => Value::Bytes(v),
        Some(Ok(None)) => Value::Null,
        _ => Value::Null,
    }
}

fn fetch_tables_shallow(conn: &mut Conn, database: &str) -> Result<Vec<TableInfo>, DbError> {
    let rows: Vec<String> = conn
        .exec(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name",
            (database,),
        )
        .map_err(|e| format_mysql_query_error(&e))?;

    Ok(rows
        .into_iter()
        .map(|name| TableInfo {
            qualified_name: format!("{}.{}", database, name),
            name,
            schema: Some(database.to_string()),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            approx_row_count: None,
            sample_rows: Vec::new(),
        })
        .collect())
}

fn fetch_views(conn: &mut Conn, database: &str) -> Result<Vec<ViewInfo>, DbError> {
    let rows: Vec<String> = conn
        .exec(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'VIEW' ORDER BY table_name",
            (database,),
        )
        .map_err(|e| format_mysql_query_error(&e))?;

    Ok(rows
        .into_iter()
        .map(|name| ViewInfo {
            name,
            schema: Some(database.to_string()),
        })
        .collect())
}

fn fetch_columns(conn: &mut Conn, database: &str, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
    let rows: Vec<(String, String, String, Option<String>, String)> = conn
        .exec(
            "SELECT column_name, column_type, is_nullable, column_default, column_key \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
            (database, table),
        )
        .map_err(|e| format_mysql_query_error(&e))?;

    let foreign_keys = fetch_foreign_keys(conn, database, table)?;
    let fk_by_column: HashMap<String, ForeignKeyInfo> = foreign_keys
        .into_iter()
        .map(|fk| (fk.from_column.clone(), fk))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(name, type_name, nullable, default, key)| {
            let references = fk_by_column.get(&name).cloned();
            ColumnInfo {
                is_primary_key: key == "PRI",
                is_foreign_key: references.is_some(),
                nullable: nullable == "YES",
                data_type: type_name,
                default_value: default,
                references,
                name,
            }
        })
        .collect())
}

fn fetch_foreign_keys(
    conn: &mut Conn,
    database: &str,
    table: &str,
) -> Result<Vec<ForeignKeyInfo>, DbError> {
    let rows: Vec<(String, String, String)> = conn
        .exec(
            "SELECT column_name, referenced_table_name, referenced_column_name \
             FROM information_schema.key_column_usage \
             WHERE table_schema = ? AND table_name = ? AND referenced_table_name IS NOT NULL",
            (database, table),
        )
        .map_err(|e| format_mysql_query_error(&e))?;

    Ok(rows
        .into_iter()
        .map(|(from_column, to_table, to_column)| ForeignKeyInfo {
            from_column,
            to_table,
            to_column,
        })
        .collect())
}

fn fetch_indexes(conn: &mut Conn, database: &str, table: &str) -> Result<Vec<IndexInfo>, DbError> {
    let query = format!(
        "SHOW INDEX FROM {}.{}",
        mysql_quote_ident(database),
        mysql_quote_ident(table)
    );

    let rows: Vec<mysql::Row> = conn
        .query(&query)
        .map_err(|e| format_mysql_query_error(&e))?;

    let mut indexes_map: indexmap::IndexMap<String, IndexInfo> = indexmap::IndexMap::new();

    for row in rows {
        let key_name: String = row.get("Key_name").unwrap_or_default();
        let column_name: String = row.get("Column_name").unwrap_or_default();
        let non_unique: i64 = row.get("Non_unique").unwrap_or(1);

        let entry = indexes_map
            .entry(key_name.clone())
            .or_insert_with(|| IndexInfo {
                name: key_name.clone(),
                columns: Vec::new(),
                is_unique: non_unique == 0,
                is_primary: key_name == "PRIMARY",
            });

        entry.columns.push(column_name);
    }

    Ok(indexes_map.into_values().collect())
}

/// Quote an identifier for MySQL using backticks.
fn mysql_quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}
