#![allow(clippy::result_large_err)]

mod app_config;
mod driver_capabilities;
mod error;
mod error_formatter;
mod profile;
mod query;
mod query_safety;
mod schema;
mod secrets;
mod shutdown;
mod sql_dialect;
mod task;
mod traits;
mod value;

pub use app_config::{CoreConfig, CoreConfigStore};
pub use driver_capabilities::{DriverCapabilities, DriverMetadata};
pub use error::{CoreError, DbError, ErrorClass};
pub use error_formatter::{
    ConnectionErrorFormatter, DefaultErrorFormatter, ErrorLocation, FormattedError,
    QueryErrorFormatter, sanitize_uri,
};
pub use profile::{ConnectionProfile, DbConfig, DbKind, SslMode};
pub use query::{ColumnMeta, QueryHandle, QueryRequest, QueryResult, Row};
pub use query_safety::is_safe_read_query;
pub use schema::{
    ColumnInfo, CustomTypeInfo, CustomTypeKind, DatabaseInfo, DbSchemaInfo, ForeignKeyInfo,
    IndexInfo, SchemaForeignKeyInfo, SchemaIndexInfo, SchemaSnapshot, TableInfo, ViewInfo,
};
pub use secrets::{KeyringSecretStore, NoopSecretStore, SecretStore, connection_secret_ref, create_secret_store};
pub use shutdown::{ShutdownCoordinator, ShutdownPhase};
pub use sql_dialect::{
    MySqlDialect, OracleDialect, PlaceholderStyle, PostgresDialect, SqlDialect, SqliteDialect,
};
pub use task::CancelToken;
pub use traits::{
    Connection, DbDriver, NoopCancelHandle, QueryCancelHandle, SchemaFeatures,
    SchemaLoadingStrategy,
};
pub use value::Value;

pub use chrono;

/// Safely truncate a string at a character boundary, appending "..." if truncated.
pub fn truncate_string_safe(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let truncate_at = max_len.saturating_sub(3);
    let safe_end = s
        .char_indices()
        .take_while(|(idx, _)| *idx <= truncate_at)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    format!("{}...", &s[..safe_end])
}
