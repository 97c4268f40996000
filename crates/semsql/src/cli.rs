//! CLI argument parsing using clap. Every subcommand is a single-shot
//! operation: it connects, performs one `CoreContext` operation, and
//! disconnects, rather than keeping a session alive across invocations.

use clap::{Args, Parser, Subcommand, ValueEnum};
use semsql_core::{ConnectionProfile, DbConfig, DbKind, SslMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "semsql")]
#[command(about = "Semantic SQL generation: connect, ask questions in natural language, and manage the ontology/RAG stores")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify connectivity to a database.
    Connect(ConnectionArgs),
    /// List schemas/databases visible on the connection, with table/view counts.
    ListSchemas(ConnectionArgs),
    /// Capture and print the schema snapshot for one schema.
    Snapshot {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Schema/database name to scope the snapshot to.
        #[arg(long)]
        schema: Option<String>,
    },
    /// Ask a natural-language question and get back generated SQL, optionally executed.
    Ask {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// The question to ask.
        question: String,
        /// Restrict the Agent to these tables (repeatable).
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,
        #[arg(long)]
        schema: Option<String>,
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
        #[arg(long, default_value_t = 200)]
        row_limit: u32,
        #[arg(long, default_value_t = 30.0)]
        timeout_s: f64,
        /// Allow the generated statement to write (INSERT/UPDATE/DELETE/DDL).
        #[arg(long)]
        allow_write: bool,
        /// Generate and validate SQL but never execute it.
        #[arg(long)]
        no_execute: bool,
    },
    /// Build (or fetch the cached) ontology for the connection's current schema.
    BuildOntology(ConnectionArgs),
    /// Manage the RAG example store.
    Rag {
        #[command(subcommand)]
        action: RagAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum RagAction {
    /// Import example question/SQL pairs from a CSV file (or stdin if omitted).
    /// Each row: `question,sql,dialect,success[,schema_name]`.
    Import {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Search for similar prior examples.
    Search {
        question: String,
        #[arg(long, value_enum)]
        dialect: DialectArg,
        #[arg(long)]
        schema: Option<String>,
    },
    /// Drop every stored example.
    Clear,
}

/// Connection parameters shared by every subcommand that needs a live
/// database. Which fields are consulted depends on `dialect`.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    #[arg(long, value_enum)]
    pub dialect: DialectArg,
    #[arg(long, default_value = "cli-session")]
    pub name: String,
    #[arg(long, default_value = "localhost")]
    pub host: String,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub user: Option<String>,
    /// Database (Postgres/MySQL) or service name (Oracle).
    #[arg(long)]
    pub database: Option<String>,
    /// File path, SQLite only.
    #[arg(long)]
    pub path: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "disable")]
    pub ssl_mode: SslModeArg,
    /// Read from the `SEMSQL_DB_PASSWORD` environment variable so a
    /// password never appears in shell history or `ps` output.
    #[arg(long, env = "SEMSQL_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Persist the password in the OS keyring on successful connect.
    #[arg(long)]
    pub save_password: bool,
}

impl ConnectionArgs {
    pub fn into_profile(self) -> anyhow::Result<ConnectionProfile> {
        let ssl_mode: SslMode = self.ssl_mode.into();
        let kind: DbKind = self.dialect.into();

        let config = match kind {
            DbKind::Postgres => DbConfig::Postgres {
                host: self.host,
                port: self.port.unwrap_or(5432),
                user: self.user.unwrap_or_else(|| "postgres".to_string()),
                database: self.database.unwrap_or_else(|| "postgres".to_string()),
                ssl_mode,
            },
            DbKind::MySQL | DbKind::MariaDB => DbConfig::MySQL {
                host: self.host,
                port: self.port.unwrap_or(3306),
                user: self.user.unwrap_or_else(|| "root".to_string()),
                database: self.database,
                ssl_mode,
            },
            DbKind::Oracle => DbConfig::Oracle {
                host: self.host,
                port: self.port.unwrap_or(1521),
                user: self.user.unwrap_or_else(|| "system".to_string()),
                service_name: self
                    .database
                    .ok_or_else(|| anyhow::anyhow!("--database (service name) is required for Oracle"))?,
            },
            DbKind::SQLite => DbConfig::SQLite {
                path: self.path.ok_or_else(|| anyhow::anyhow!("--path is required for SQLite"))?,
            },
        };

        let mut profile = ConnectionProfile::new_with_kind(self.name, kind, config);
        profile.save_password = self.save_password;
        Ok(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Postgres,
    Mysql,
    Mariadb,
    Oracle,
    Sqlite,
}

impl From<DialectArg> for DbKind {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Postgres => DbKind::Postgres,
            DialectArg::Mysql => DbKind::MySQL,
            DialectArg::Mariadb => DbKind::MariaDB,
            DialectArg::Oracle => DbKind::Oracle,
            DialectArg::Sqlite => DbKind::SQLite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SslModeArg {
    Disable,
    Prefer,
    Require,
}

impl From<SslModeArg> for SslMode {
    fn from(m: SslModeArg) -> Self {
        match m {
            SslModeArg::Disable => SslMode::Disable,
            SslModeArg::Prefer => SslMode::Prefer,
            SslModeArg::Require => SslMode::Require,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ask_invocation() {
        let cli = Cli::parse_from([
            "semsql",
            "ask",
            "--dialect",
            "sqlite",
            "--path",
            "/tmp/app.db",
            "how many vendors are there",
        ]);
        match cli.command {
            Command::Ask { conn, question, .. } => {
                assert_eq!(conn.dialect, DialectArg::Sqlite);
                assert_eq!(question, "how many vendors are there");
            }
            other => panic!("expected Ask, got {other:?}"),
        }
    }

    #[test]
    fn sqlite_profile_requires_path() {
        let conn = ConnectionArgs {
            dialect: DialectArg::Sqlite,
            name: "x".to_string(),
            host: "localhost".to_string(),
            port: None,
            user: None,
            database: None,
            path: None,
            ssl_mode: SslModeArg::Disable,
            password: None,
            save_password: false,
        };
        assert!(conn.into_profile().is_err());
    }

    #[test]
    fn postgres_profile_fills_defaults() {
        let conn = ConnectionArgs {
            dialect: DialectArg::Postgres,
            name: "x".to_string(),
            host: "db.internal".to_string(),
            port: None,
            user: None,
            database: None,
            path: None,
            ssl_mode: SslModeArg::Prefer,
            password: None,
            save_password: false,
        };
        let profile = conn.into_profile().unwrap();
        match profile.config {
            DbConfig::Postgres { port, user, database, .. } => {
                assert_eq!(port, 5432);
                assert_eq!(user, "postgres");
                assert_eq!(database, "postgres");
            }
            other => panic!("expected Postgres config, got {other:?}"),
        }
    }
}
