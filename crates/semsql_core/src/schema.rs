use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub is_current: bool,
}

/// Tables and views for one database, without column detail. Returned by
/// `Connection::schema_for_database` before a full snapshot is captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbSchemaInfo {
    pub name: String,
    pub table_count: usize,
    pub view_count: usize,
}

/// Cached, versioned description of one database+schema's tables, views,
/// columns and keys. The unit the Snapshot Store caches and the Ontology
/// Builder consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub database_name: String,
    pub schema_name: Option<String>,
    pub tables: Vec<TableInfo>,
    pub views: Vec<ViewInfo>,
    pub captured_at: DateTime<Utc>,
}

impl Default for SchemaSnapshot {
    fn default() -> Self {
        Self {
            database_name: String::new(),
            schema_name: None,
            tables: Vec::new(),
            views: Vec::new(),
            captured_at: Utc::now(),
        }
    }
}

impl SchemaSnapshot {
    /// A snapshot containing only the named tables and their views, used
    /// under retry conditions to scope the prompt to error-relevant tables.
    pub fn focused(&self, table_names: &[String]) -> Self {
        let wanted: std::collections::HashSet<&str> =
            table_names.iter().map(String::as_str).collect();
        Self {
            database_name: self.database_name.clone(),
            schema_name: self.schema_name.clone(),
            tables: self
                .tables
                .iter()
                .filter(|t| wanted.contains(t.name.as_str()))
                .cloned()
                .collect(),
            views: self
                .views
                .iter()
                .filter(|v| wanted.contains(v.name.as_str()))
                .cloned()
                .collect(),
            captured_at: self.captured_at,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Case-insensitive containment check used by the identifier-containment
    /// invariant: does any table or column in this snapshot match `ident`?
    pub fn contains_identifier(&self, ident: &str) -> bool {
        let ident = ident.to_ascii_lowercase();
        self.tables.iter().any(|t| {
            t.name.to_ascii_lowercase() == ident
                || t.columns.iter().any(|c| c.name.to_ascii_lowercase() == ident)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub qualified_name: String,
    pub schema: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub approx_row_count: Option<u64>,
    #[serde(default)]
    pub sample_rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewInfo {
    pub name: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub references: Option<ForeignKeyInfo>,
}

/// `{from_column, to_table, to_column}` as defined by the data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Index belonging to a whole schema, returned by `Connection::schema_indexes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaIndexInfo {
    pub table: String,
    pub index: IndexInfo,
}

/// Foreign key belonging to a whole schema, returned by
/// `Connection::schema_foreign_keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaForeignKeyInfo {
    pub table: String,
    pub foreign_key: ForeignKeyInfo,
}

/// A custom/composite/enum type declared in a schema (PostgreSQL domains and
/// enums, Oracle object types). Dialects without custom types return none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTypeInfo {
    pub name: String,
    pub kind: CustomTypeKind,
    pub definition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomTypeKind {
    Enum,
    Composite,
    Domain,
}
