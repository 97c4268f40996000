use semsql_core::{ConnectionProfile, DbConfig, DbDriver, DbError, QueryRequest, SchemaLoadingStrategy};
use semsql_driver_sqlite::SqliteDriver;

fn connect_sqlite() -> Result<Box<dyn semsql_core::Connection>, DbError> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.sqlite");

    let driver = SqliteDriver::new();
    let profile = ConnectionProfile::new("live-sqlite", DbConfig::SQLite { path: db_path });

    let connection = driver.connect(&profile)?;
    connection.ping()?;

    // Leak the tempdir so it isn't removed while the connection is alive.
    // The OS reclaims it when the process exits.
    std::mem::forget(temp_dir);

    Ok(connection)
}

#[test]
fn sqlite_file_connect_ping_query_and_schema() -> Result<(), DbError> {
    let connection = connect_sqlite()?;

    connection.execute(&QueryRequest::new(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    ))?;
    connection.execute(&QueryRequest::new(
        "INSERT INTO users (name) VALUES ('alice')",
    ))?;

    let result = connection.execute(&QueryRequest::new("SELECT id, name FROM users"))?;
    assert_eq!(result.rows.len(), 1);

    assert_eq!(
        connection.schema_loading_strategy(),
        SchemaLoadingStrategy::SingleDatabase
    );

    let databases = connection.list_databases()?;
    assert!(databases.is_empty());

    let schema = connection.schema()?;
    assert!(schema.tables.iter().any(|t| t.name == "users"));

    Ok(())
}

#[test]
fn sqlite_schema_introspection() -> Result<(), DbError> {
    let connection = connect_sqlite()?;

    connection.execute(&QueryRequest::new(
        "CREATE TABLE test_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            age INTEGER DEFAULT 0
        )",
    ))?;

    connection.execute(&QueryRequest::new(
        "CREATE TABLE test_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES test_users(id),
            amount REAL NOT NULL
        )",
    ))?;

    connection.execute(&QueryRequest::new(
        "CREATE INDEX idx_orders_user_id ON test_orders(user_id)",
    ))?;

    connection.execute(&QueryRequest::new(
        "CREATE VIEW test_user_view AS SELECT id, name FROM test_users",
    ))?;

    let schema = connection.schema()?;
    assert!(schema.views.iter().any(|v| v.name == "test_user_view"));

    let table = connection.table_details("main", None, "test_users")?;
    assert_eq!(table.name, "test_users");
    assert!(table.columns.len() >= 4);

    let id_col = table.columns.iter().find(|c| c.name == "id").expect("id column");
    assert!(id_col.is_primary_key);

    let name_col = table
        .columns
        .iter()
        .find(|c| c.name == "name")
        .expect("name column");
    assert!(!name_col.nullable);

    let indexes = connection.schema_indexes("main", None)?;
    assert!(indexes.iter().any(|i| i.table == "test_orders"));

    let orders_table = connection.table_details("main", None, "test_orders")?;
    assert!(!orders_table.foreign_keys.is_empty());
    let fk = &orders_table.foreign_keys[0];
    assert_eq!(fk.to_table, "test_users");
    assert_eq!(fk.from_column, "user_id");
    assert_eq!(fk.to_column, "id");

    Ok(())
}

#[test]
fn sqlite_row_limit_is_respected() -> Result<(), DbError> {
    let connection = connect_sqlite()?;

    connection.execute(&QueryRequest::new(
        "CREATE TABLE limit_test (id INTEGER PRIMARY KEY, name TEXT)",
    ))?;

    for i in 1..=25 {
        connection.execute(&QueryRequest::new(format!(
            "INSERT INTO limit_test (name) VALUES ('item_{}')",
            i
        )))?;
    }

    let result =
        connection.execute(&QueryRequest::new("SELECT * FROM limit_test").with_limit(10))?;
    assert_eq!(result.rows.len(), 10);

    Ok(())
}

#[test]
fn sqlite_cancel_handle() -> Result<(), DbError> {
    let connection = connect_sqlite()?;

    let cancel_handle = connection.cancel_handle();
    assert!(cancel_handle.cancel().is_ok());

    Ok(())
}
