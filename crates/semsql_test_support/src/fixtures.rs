use semsql_core::{ColumnInfo, ColumnMeta, QueryResult, Row, SchemaSnapshot, TableInfo, Value};
use std::time::Duration;

pub fn table_result(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> QueryResult {
    QueryResult {
        columns,
        rows,
        affected_rows: None,
        execution_time: Duration::ZERO,
    }
}

pub fn column(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> ColumnMeta {
    ColumnMeta {
        name: name.into(),
        type_name: type_name.into(),
        nullable,
    }
}

pub fn int_cell(value: i64) -> Value {
    Value::Int(value)
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub fn empty_schema() -> SchemaSnapshot {
    SchemaSnapshot::default()
}

/// A one-table snapshot with a single `id` primary key column, used across
/// resolver/prompt/agent tests that only need a minimal but realistic
/// schema to resolve identifiers against.
pub fn schema_with_table(
    database: impl Into<String>,
    schema_name: impl Into<String>,
    table_name: impl Into<String>,
) -> SchemaSnapshot {
    let database = database.into();
    let schema_name = schema_name.into();
    let table_name = table_name.into();

    let table = TableInfo {
        name: table_name.clone(),
        qualified_name: format!("{}.{}", schema_name, table_name),
        schema: Some(schema_name.clone()),
        columns: vec![ColumnInfo {
            name: "id".to_string(),
            data_type: "integer".to_string(),
            nullable: false,
            default_value: None,
            is_primary_key: true,
            is_foreign_key: false,
            references: None,
        }],
        primary_keys: vec!["id".to_string()],
        foreign_keys: Vec::new(),
        approx_row_count: None,
        sample_rows: Vec::new(),
    };

    SchemaSnapshot {
        database_name: database,
        schema_name: Some(schema_name),
        tables: vec![table],
        views: Vec::new(),
        captured_at: chrono::Utc::now(),
    }
}
