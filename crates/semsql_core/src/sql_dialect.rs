use crate::Value;

/// Placeholder style for parameterized queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` placeholders (SQLite, MySQL).
    QuestionMark,
    /// `$1`, `$2`, etc. (PostgreSQL).
    DollarNumber,
    /// `:1`, `:2`, etc. (Oracle).
    ColonNumber,
}

/// Database-specific SQL syntax: quoting, escaping, literals, and the
/// row-limiting/ordering differences the Prompt Composer and the dialect
/// adapters must honor (`spec.md` §4.1 "Dialect differences to honor").
pub trait SqlDialect: Send + Sync {
    /// `dialect_name()`: one of `postgresql`, `mysql`, `oracle`, `sqlite`.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table/column name).
    fn quote_identifier(&self, name: &str) -> String;

    /// Build a qualified table reference, e.g. `"schema"."table"`.
    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String;

    fn value_to_literal(&self, value: &Value) -> String;

    /// Escape a string for use inside a single-quoted literal.
    fn escape_string(&self, s: &str) -> String {
        s.replace('\'', "''")
    }

    fn placeholder_style(&self) -> PlaceholderStyle;

    fn placeholder(&self, index: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::DollarNumber => format!("${}", index + 1),
            PlaceholderStyle::ColonNumber => format!(":{}", index + 1),
        }
    }

    fn supports_returning(&self) -> bool {
        false
    }

    /// Whether this dialect supports `NULLS FIRST`/`NULLS LAST` in `ORDER BY`.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Render a row-limiting clause to append after `ORDER BY` (or after the
    /// `WHERE` clause when there is none). Oracle has no `LIMIT`; it uses
    /// `FETCH FIRST n ROWS ONLY`.
    fn limit_clause(&self, limit: u32, offset: Option<u32>) -> String {
        match offset {
            Some(o) => format!("LIMIT {} OFFSET {}", limit, o),
            None => format!("LIMIT {}", limit),
        }
    }

    /// The dialect's boolean literal rendering, used by the Ontology Builder
    /// when summarizing column types for the LLM (Oracle models booleans as
    /// `NUMBER(1)`, never a native `BOOLEAN`).
    fn boolean_type_name(&self) -> &'static str {
        "BOOLEAN"
    }
}

fn value_to_literal_common(dialect: &dyn SqlDialect, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() {
                "'NaN'".to_string()
            } else if f.is_infinite() {
                if *f > 0.0 { "'Infinity'".to_string() } else { "'-Infinity'".to_string() }
            } else {
                f.to_string()
            }
        }
        Value::Text(s) => format!("'{}'", dialect.escape_string(s)),
        Value::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            format!("X'{}'", hex)
        }
        Value::Json(s) => format!("'{}'", dialect.escape_string(s)),
        Value::Decimal(s) => s.clone(),
        Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
    }
}

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
            None => self.quote_identifier(table),
        }
    }

    fn value_to_literal(&self, value: &Value) -> String {
        value_to_literal_common(self, value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::DollarNumber
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
            None => self.quote_identifier(table),
        }
    }

    fn value_to_literal(&self, value: &Value) -> String {
        value_to_literal_common(self, value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    /// MySQL only supports `NULLS FIRST/LAST` from 8.0.13 onward via an
    /// `IS NULL` trick elsewhere in practice; the Composer treats it as
    /// unsupported to stay correct across the 5.7/MariaDB install base.
    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn boolean_type_name(&self) -> &'static str {
        "TINYINT(1)"
    }
}

pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualified_table(&self, _schema: Option<&str>, table: &str) -> String {
        // SQLite has no schemas within a single database file.
        self.quote_identifier(table)
    }

    fn value_to_literal(&self, value: &Value) -> String {
        value_to_literal_common(self, value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn boolean_type_name(&self) -> &'static str {
        "INTEGER"
    }
}

pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
            None => self.quote_identifier(table),
        }
    }

    fn value_to_literal(&self, value: &Value) -> String {
        value_to_literal_common(self, value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::ColonNumber
    }

    fn limit_clause(&self, limit: u32, offset: Option<u32>) -> String {
        match offset {
            Some(o) => format!("OFFSET {} ROWS FETCH FIRST {} ROWS ONLY", o, limit),
            None => format!("FETCH FIRST {} ROWS ONLY", limit),
        }
    }

    fn boolean_type_name(&self) -> &'static str {
        "NUMBER(1)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_uses_fetch_first_not_limit() {
        let clause = OracleDialect.limit_clause(10, None);
        assert_eq!(clause, "FETCH FIRST 10 ROWS ONLY");
    }

    #[test]
    fn mysql_uses_backtick_quoting() {
        assert_eq!(MySqlDialect.quote_identifier("order"), "`order`");
    }

    #[test]
    fn postgres_uses_dollar_placeholders() {
        assert_eq!(PostgresDialect.placeholder(0), "$1");
        assert_eq!(PostgresDialect.placeholder(1), "$2");
    }

    #[test]
    fn mysql_does_not_support_nulls_ordering() {
        assert!(!MySqlDialect.supports_nulls_ordering());
        assert!(PostgresDialect.supports_nulls_ordering());
    }
}
