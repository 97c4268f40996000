//! Dialect-specific identifier extraction from a raw driver error string
//! (`spec.md` §4.9). Patterns are regex-based and intentionally permissive:
//! a miss falls back to [`ErrorKind::Other`] with no identifier rather than
//! a hard failure, since the Analyzer must never error on malformed input.

use crate::model::ErrorKind;
use regex::Regex;
use std::sync::LazyLock;

static UNKNOWN_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        column\s+"([^"]+)"\s+does\s+not\s+exist |   # postgres
        unknown\s+column\s+'([^']+)' |              # mysql
        no\s+such\s+column:\s*([A-Za-z0-9_.]+) |     # sqlite
        ORA-00904:\s*"?([A-Za-z0-9_.]+)"?            # oracle
        "#,
    )
    .expect("valid pattern")
});

static UNKNOWN_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        relation\s+"([^"]+)"\s+does\s+not\s+exist |        # postgres
        table\s+'[^']*\.?([^'.]+)'\s+doesn't\s+exist |     # mysql
        no\s+such\s+table:\s*([A-Za-z0-9_.]+) |            # sqlite
        ORA-00942:.*?(?:table\s+or\s+view)                 # oracle (no identifier captured)
        "#,
    )
    .expect("valid pattern")
});

static SYNTAX_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)syntax\s+error|ORA-00900|ORA-00923"#).expect("valid pattern"));

static PERMISSION_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)permission\s+denied|access\s+denied|insufficient\s+privileges|ORA-00942:.*?no\s+privileges"#)
        .expect("valid pattern")
});

static TIMEOUT_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)timeout|timed\s+out|cancelling\s+statement"#).expect("valid pattern"));

static TYPE_MISMATCH_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)invalid\s+input\s+syntax\s+for|incorrect\s+(?:integer|string)\s+value|datatype\s+mismatch|ORA-01722"#)
        .expect("valid pattern")
});

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    let captures = regex.captures(text)?;
    captures.iter().skip(1).flatten().map(|m| m.as_str().to_string()).next()
}

/// Classifies `raw_error` and extracts the offending identifier when the
/// message format makes one available.
pub fn classify(raw_error: &str) -> (ErrorKind, Option<String>) {
    if let Some(identifier) = first_capture(&UNKNOWN_COLUMN, raw_error) {
        return (ErrorKind::UnknownColumn, Some(normalize_identifier(&identifier)));
    }
    if let Some(identifier) = first_capture(&UNKNOWN_TABLE, raw_error) {
        let identifier = if identifier.is_empty() { None } else { Some(normalize_identifier(&identifier)) };
        return (ErrorKind::UnknownTable, identifier);
    }
    if TYPE_MISMATCH_ERROR.is_match(raw_error) {
        return (ErrorKind::TypeMismatch, None);
    }
    if PERMISSION_ERROR.is_match(raw_error) {
        return (ErrorKind::Permission, None);
    }
    if TIMEOUT_ERROR.is_match(raw_error) {
        return (ErrorKind::Timeout, None);
    }
    if SYNTAX_ERROR.is_match(raw_error) {
        return (ErrorKind::Syntax, None);
    }
    (ErrorKind::Other, None)
}

/// Strips a leading table/alias qualifier (`t.name` -> `name`) and trims
/// surrounding quotes, so later lookups compare against bare identifiers.
fn normalize_identifier(identifier: &str) -> String {
    let unquoted = identifier.trim_matches('"').trim_matches('\'');
    unquoted.rsplit('.').next().unwrap_or(unquoted).to_string()
}

/// The qualifier (`t` in `t.name`), when the raw identifier was dotted.
pub fn qualifier(identifier: &str) -> Option<String> {
    let unquoted = identifier.trim_matches('"').trim_matches('\'');
    let mut parts = unquoted.split('.');
    let first = parts.next()?;
    parts.next()?;
    Some(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_unknown_column() {
        let (kind, ident) = classify(r#"ERROR: column "vendor_name" does not exist"#);
        assert_eq!(kind, ErrorKind::UnknownColumn);
        assert_eq!(ident, Some("vendor_name".to_string()));
    }

    #[test]
    fn mysql_unknown_column() {
        let (kind, ident) = classify("Unknown column 'v.vendor_name' in 'field list'");
        assert_eq!(kind, ErrorKind::UnknownColumn);
        assert_eq!(ident, Some("vendor_name".to_string()));
    }

    #[test]
    fn sqlite_unknown_table() {
        let (kind, ident) = classify("no such table: vendorz");
        assert_eq!(kind, ErrorKind::UnknownTable);
        assert_eq!(ident, Some("vendorz".to_string()));
    }

    #[test]
    fn oracle_invalid_identifier() {
        let (kind, ident) = classify(r#"ORA-00904: "VENDOR_NAME": invalid identifier"#);
        assert_eq!(kind, ErrorKind::UnknownColumn);
        assert_eq!(ident, Some("VENDOR_NAME".to_string()));
    }

    #[test]
    fn qualifier_extracts_alias() {
        assert_eq!(qualifier("v.vendor_name"), Some("v".to_string()));
        assert_eq!(qualifier("vendor_name"), None);
    }

    #[test]
    fn unrecognized_message_falls_back_to_other() {
        let (kind, ident) = classify("connection reset by peer");
        assert_eq!(kind, ErrorKind::Other);
        assert_eq!(ident, None);
    }
}
