//! `VALIDATE` step (`spec.md` §4.10): rejects empty responses, prose
//! without SQL keywords, write statements under the default read-only
//! policy, and (when enabled) identifiers absent from the snapshot.

use semsql_core::{SchemaSnapshot, is_safe_read_query};

const SQL_KEYWORDS: &[&str] =
    &["SELECT", "WITH", "SHOW", "EXPLAIN", "DESC", "DESCRIBE", "INSERT", "UPDATE", "DELETE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    Empty,
    NotSql,
    WriteNotAllowed,
    UnknownIdentifier(String),
}

impl ValidationFailure {
    pub fn human_hint(&self) -> String {
        match self {
            ValidationFailure::Empty => "The model returned an empty response.".to_string(),
            ValidationFailure::NotSql => {
                "The model's response did not contain a recognizable SQL statement.".to_string()
            }
            ValidationFailure::WriteNotAllowed => {
                "The generated statement modifies data, which is not permitted for this request.".to_string()
            }
            ValidationFailure::UnknownIdentifier(ident) => {
                format!("The generated statement references \"{ident}\", which is not in the active schema.")
            }
        }
    }
}

fn contains_sql_keyword(sql: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    SQL_KEYWORDS.iter().any(|kw| upper.split_whitespace().any(|word| word.trim_matches(|c: char| !c.is_ascii_alphabetic()) == *kw))
}

/// Extracts bare identifiers (dotted or not) referenced in `sql`, skipping
/// SQL keywords and string/number literals. Deliberately coarse: false
/// positives only make containment enforcement stricter than necessary.
fn referenced_identifiers(sql: &str) -> Vec<String> {
    sql.split(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
        .filter(|token| !token.is_empty())
        .filter(|token| token.chars().next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false))
        .filter(|token| !SQL_KEYWORDS.contains(&token.to_ascii_uppercase().as_str()))
        .map(|token| token.rsplit('.').next().unwrap_or(token).to_string())
        .collect()
}

/// Runs the `VALIDATE` checks in order, short-circuiting at the first
/// failure. `enforce_containment` implements `CoreConfig`'s
/// `strict_containment_on_first_attempt` open question: retries always
/// pass `true` regardless of that flag.
pub fn validate(
    sql: &str,
    snapshot: &SchemaSnapshot,
    allow_write: bool,
    enforce_containment: bool,
) -> Result<(), ValidationFailure> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::Empty);
    }

    if !contains_sql_keyword(trimmed) {
        return Err(ValidationFailure::NotSql);
    }

    if !allow_write && !is_safe_read_query(trimmed) {
        return Err(ValidationFailure::WriteNotAllowed);
    }

    if enforce_containment {
        for ident in referenced_identifiers(trimmed) {
            if !snapshot.contains_identifier(&ident) {
                return Err(ValidationFailure::UnknownIdentifier(ident));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn empty_response_is_rejected() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(validate("   ", &snapshot, false, false), Err(ValidationFailure::Empty));
    }

    #[test]
    fn prose_without_sql_keywords_is_rejected() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(
            validate("I cannot answer that question.", &snapshot, false, false),
            Err(ValidationFailure::NotSql)
        );
    }

    #[test]
    fn write_statement_rejected_by_default() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(
            validate("DELETE FROM vendors", &snapshot, false, false),
            Err(ValidationFailure::WriteNotAllowed)
        );
    }

    #[test]
    fn write_statement_allowed_when_opted_in() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(validate("DELETE FROM vendors", &snapshot, true, false), Ok(()));
    }

    #[test]
    fn unknown_identifier_rejected_when_enforced() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(
            validate("SELECT ghost_col FROM vendors", &snapshot, false, true),
            Err(ValidationFailure::UnknownIdentifier("ghost_col".to_string()))
        );
    }

    #[test]
    fn known_identifiers_pass_containment_check() {
        let snapshot = schema_with_table("db", "public", "vendors");
        assert_eq!(validate("SELECT id FROM vendors", &snapshot, false, true), Ok(()));
    }
}
