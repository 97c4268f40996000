use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbKind {
    Postgres,
    SQLite,
    MySQL,
    MariaDB,
    Oracle,
}

impl DbKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DbKind::Postgres => "PostgreSQL",
            DbKind::SQLite => "SQLite",
            DbKind::MySQL => "MySQL",
            DbKind::MariaDB => "MariaDB",
            DbKind::Oracle => "Oracle",
        }
    }

    /// The `dialect_name()` value the Prompt Composer and Error Analyzer key
    /// off of: one of `postgresql`, `mysql`, `oracle`, `sqlite`.
    pub fn dialect_name(&self) -> &'static str {
        match self {
            DbKind::Postgres => "postgresql",
            DbKind::SQLite => "sqlite",
            DbKind::MySQL | DbKind::MariaDB => "mysql",
            DbKind::Oracle => "oracle",
        }
    }
}

/// SSL/TLS mode for network connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SslMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

/// Database-specific connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DbConfig {
    Postgres {
        host: String,
        port: u16,
        user: String,
        database: String,
        ssl_mode: SslMode,
    },
    SQLite {
        path: PathBuf,
    },
    MySQL {
        host: String,
        port: u16,
        user: String,
        database: Option<String>,
        ssl_mode: SslMode,
    },
    Oracle {
        host: String,
        port: u16,
        user: String,
        service_name: String,
    },
}

impl DbConfig {
    pub fn kind(&self) -> DbKind {
        match self {
            DbConfig::Postgres { .. } => DbKind::Postgres,
            DbConfig::SQLite { .. } => DbKind::SQLite,
            DbConfig::MySQL { .. } => DbKind::MySQL,
            DbConfig::Oracle { .. } => DbKind::Oracle,
        }
    }

    pub fn default_postgres() -> Self {
        DbConfig::Postgres {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            database: "postgres".to_string(),
            ssl_mode: SslMode::default(),
        }
    }

    pub fn default_sqlite() -> Self {
        DbConfig::SQLite {
            path: PathBuf::new(),
        }
    }

    pub fn default_mysql() -> Self {
        DbConfig::MySQL {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            database: None,
            ssl_mode: SslMode::default(),
        }
    }

    pub fn default_oracle() -> Self {
        DbConfig::Oracle {
            host: "localhost".to_string(),
            port: 1521,
            user: "system".to_string(),
            service_name: "ORCLPDB1".to_string(),
        }
    }
}

/// Saved connection profile.
///
/// Passwords are never stored here; they live in the system keyring (or a
/// no-op in-memory store for tests) and are referenced via `secret_ref()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    kind: Option<DbKind>,

    pub config: DbConfig,

    #[serde(default)]
    pub save_password: bool,
}

impl ConnectionProfile {
    pub fn new(name: impl Into<String>, config: DbConfig) -> Self {
        let kind = config.kind();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: Some(kind),
            config,
            save_password: true,
        }
    }

    pub fn new_with_kind(name: impl Into<String>, kind: DbKind, config: DbConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: Some(kind),
            config,
            save_password: true,
        }
    }

    /// Authoritative database kind, distinguishing MySQL from MariaDB even
    /// though both use `DbConfig::MySQL`.
    pub fn kind(&self) -> DbKind {
        self.kind.unwrap_or_else(|| self.config.kind())
    }

    pub fn set_kind(&mut self, kind: DbKind) {
        self.kind = Some(kind);
    }

    pub fn secret_ref(&self) -> String {
        crate::secrets::connection_secret_ref(&self.id)
    }
}
