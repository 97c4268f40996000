//! The Error Analyzer entry point (`spec.md` §4.9): a pure function of the
//! raw driver error, the generated SQL and the active snapshot. No
//! execution, no LLM calls.

use crate::alias;
use crate::edit_distance::closest_matches;
use crate::extract;
use crate::model::{ErrorKind, ErrorReport};
use semsql_core::SchemaSnapshot;

const MAX_CANDIDATES: usize = 5;

/// Produces a complete [`ErrorReport`] from a failed execution attempt.
pub fn analyze(raw_error: &str, sql: &str, snapshot: &SchemaSnapshot) -> ErrorReport {
    let (kind, identifier) = extract::classify(raw_error);

    let affected_table = identifier.as_deref().and_then(|ident| affected_table_for(ident, kind, sql, snapshot));

    let candidates = match (kind, &identifier) {
        (ErrorKind::UnknownColumn, Some(ident)) => {
            let catalog = candidate_catalog(affected_table.as_deref(), snapshot);
            closest_matches(ident, &catalog, MAX_CANDIDATES)
        }
        (ErrorKind::UnknownTable, Some(ident)) => {
            let catalog: Vec<String> = snapshot.tables.iter().map(|t| t.name.clone()).collect();
            closest_matches(ident, &catalog, MAX_CANDIDATES)
        }
        _ => Vec::new(),
    };

    let human_hint = human_hint(kind, identifier.as_deref(), affected_table.as_deref(), &candidates);

    ErrorReport { kind, offending_identifier: identifier, affected_table, candidates, human_hint }
}

fn affected_table_for(ident: &str, kind: ErrorKind, sql: &str, snapshot: &SchemaSnapshot) -> Option<String> {
    if kind == ErrorKind::UnknownTable {
        return Some(ident.to_string());
    }

    if let Some(qualifier) = extract::qualifier(ident) {
        if let Some(table) = snapshot.table(&qualifier) {
            return Some(table.name.clone());
        }
        if let Some(table) = alias::resolve_alias(&qualifier, sql, snapshot) {
            return Some(table);
        }
    }

    snapshot.tables.iter().find(|t| t.columns.iter().any(|c| c.name.eq_ignore_ascii_case(ident))).map(|t| t.name.clone())
}

fn candidate_catalog(affected_table: Option<&str>, snapshot: &SchemaSnapshot) -> Vec<String> {
    match affected_table.and_then(|name| snapshot.table(name)) {
        Some(table) => table.columns.iter().map(|c| c.name.clone()).collect(),
        None => snapshot.tables.iter().flat_map(|t| t.columns.iter().map(|c| c.name.clone())).collect(),
    }
}

fn human_hint(kind: ErrorKind, identifier: Option<&str>, table: Option<&str>, candidates: &[String]) -> String {
    match kind {
        ErrorKind::UnknownColumn => match (identifier, table, candidates.first()) {
            (Some(ident), Some(table), Some(best)) => {
                format!("Column \"{ident}\" does not exist on \"{table}\". Did you mean \"{best}\"?")
            }
            (Some(ident), None, Some(best)) => format!("Column \"{ident}\" does not exist. Did you mean \"{best}\"?"),
            (Some(ident), _, None) => format!("Column \"{ident}\" does not exist and no close match was found."),
            _ => "Referenced an unknown column.".to_string(),
        },
        ErrorKind::UnknownTable => match (identifier, candidates.first()) {
            (Some(ident), Some(best)) => format!("Table \"{ident}\" does not exist. Did you mean \"{best}\"?"),
            (Some(ident), None) => format!("Table \"{ident}\" does not exist and no close match was found."),
            _ => "Referenced an unknown table.".to_string(),
        },
        ErrorKind::TypeMismatch => "A value's type does not match the column it was compared or assigned to.".to_string(),
        ErrorKind::Syntax => "The generated statement is not valid SQL for this dialect.".to_string(),
        ErrorKind::Permission => "The active connection lacks permission to run this statement.".to_string(),
        ErrorKind::Timeout => "The statement did not complete before the configured timeout.".to_string(),
        ErrorKind::Other => "The statement failed for a reason the Analyzer does not recognize.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn unknown_column_suggests_closest_match_on_affected_table() {
        let mut snapshot = schema_with_table("db", "public", "vendors");
        snapshot.tables[0].columns[0].name = "vendor_name".to_string();
        let report = analyze(
            r#"ERROR: column "vendor_nme" does not exist"#,
            "SELECT vendor_nme FROM vendors",
            &snapshot,
        );
        assert_eq!(report.kind, ErrorKind::UnknownColumn);
        assert_eq!(report.affected_table, Some("vendors".to_string()));
        assert_eq!(report.candidates.first(), Some(&"vendor_name".to_string()));
    }

    #[test]
    fn unknown_column_resolves_affected_table_via_alias() {
        let mut snapshot = schema_with_table("db", "public", "vendors");
        snapshot.tables[0].columns[0].name = "vendor_name".to_string();
        let report = analyze(
            "Unknown column 'v.vendor_nme' in 'field list'",
            "SELECT v.vendor_nme FROM vendors v",
            &snapshot,
        );
        assert_eq!(report.affected_table, Some("vendors".to_string()));
    }

    #[test]
    fn unknown_table_lists_close_table_names() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let report = analyze("no such table: vendorz", "SELECT * FROM vendorz", &snapshot);
        assert_eq!(report.kind, ErrorKind::UnknownTable);
        assert_eq!(report.candidates.first(), Some(&"vendors".to_string()));
    }

    #[test]
    fn unrecognized_error_has_no_candidates() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let report = analyze("connection reset by peer", "SELECT 1", &snapshot);
        assert_eq!(report.kind, ErrorKind::Other);
        assert!(report.candidates.is_empty());
        assert!(report.offending_identifier.is_none());
    }
}
