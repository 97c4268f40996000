//! Single-letter alias resolution (`spec.md` §4.9): maps an alias used in
//! the generated SQL back to the schema table it stands for.

use semsql_core::SchemaSnapshot;
use std::collections::HashMap;

/// Extracts `alias -> table` bindings from `FROM`/`JOIN` clauses of the
/// form `table [AS] alias`, case-insensitively. This is a snippet-scoped
/// scan, not a full SQL parse — good enough for the Analyzer's purpose of
/// resolving an alias actually present in the failing statement.
pub fn alias_bindings(sql: &str) -> HashMap<String, String> {
    let mut bindings = HashMap::new();
    let tokens: Vec<&str> = sql.split_whitespace().collect();

    let mut i = 0;
    while i < tokens.len() {
        let upper = tokens[i].to_ascii_uppercase();
        if upper == "FROM" || upper == "JOIN" {
            if let Some(table) = tokens.get(i + 1) {
                let table = trim_ident(table);
                let mut next = i + 2;
                if tokens.get(next).map(|t| t.eq_ignore_ascii_case("AS")).unwrap_or(false) {
                    next += 1;
                }
                if let Some(alias_token) = tokens.get(next) {
                    let alias = trim_ident(alias_token);
                    let is_keyword = matches!(
                        alias.to_ascii_uppercase().as_str(),
                        "WHERE" | "JOIN" | "ON" | "GROUP" | "ORDER" | "LIMIT" | "" | "INNER" | "LEFT" | "RIGHT"
                    );
                    if !is_keyword && alias.chars().all(|c| c.is_alphanumeric() || c == '_') {
                        bindings.insert(alias.to_ascii_lowercase(), table.to_string());
                    }
                }
            }
        }
        i += 1;
    }

    bindings
}

fn trim_ident(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
}

/// Resolves a single-letter (or short) alias to a schema table, trying in
/// order: (a) an explicit binding found in `sql`, (b) first-letter match
/// against a table name, (c) initials match against a multi-word
/// (snake_case) table name.
pub fn resolve_alias(alias: &str, sql: &str, snapshot: &SchemaSnapshot) -> Option<String> {
    let bindings = alias_bindings(sql);
    if let Some(table) = bindings.get(&alias.to_ascii_lowercase()) {
        if snapshot.table(table).is_some() {
            return Some(table.clone());
        }
    }

    let alias_lower = alias.to_ascii_lowercase();

    if let Some(table) = snapshot
        .tables
        .iter()
        .find(|t| t.name.to_ascii_lowercase().starts_with(&alias_lower) && alias_lower.len() == 1)
    {
        return Some(table.name.clone());
    }

    snapshot
        .tables
        .iter()
        .find(|t| initials(&t.name) == alias_lower)
        .map(|t| t.name.clone())
}

fn initials(name: &str) -> String {
    name.split('_').filter_map(|part| part.chars().next()).collect::<String>().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn binds_alias_from_from_clause() {
        let bindings = alias_bindings("SELECT v.id FROM vendors v WHERE v.id = 1");
        assert_eq!(bindings.get("v"), Some(&"vendors".to_string()));
    }

    #[test]
    fn binds_alias_with_explicit_as() {
        let bindings = alias_bindings("SELECT v.id FROM vendors AS v");
        assert_eq!(bindings.get("v"), Some(&"vendors".to_string()));
    }

    #[test]
    fn resolves_via_explicit_binding_first() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let resolved = resolve_alias("v", "SELECT v.id FROM vendors v", &snapshot);
        assert_eq!(resolved, Some("vendors".to_string()));
    }

    #[test]
    fn resolves_via_first_letter_when_no_binding_present() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let resolved = resolve_alias("v", "SELECT 1", &snapshot);
        assert_eq!(resolved, Some("vendors".to_string()));
    }

    #[test]
    fn resolves_via_initials_for_multiword_tables() {
        let mut snapshot = schema_with_table("db", "public", "purchase_order");
        snapshot.tables[0].name = "purchase_order".to_string();
        let resolved = resolve_alias("po", "SELECT 1", &snapshot);
        assert_eq!(resolved, Some("purchase_order".to_string()));
    }
}
