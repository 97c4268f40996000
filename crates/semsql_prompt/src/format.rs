//! Compact `table(col:type,…)`-style schema rendering (`spec.md` §4.8).

use semsql_core::TableInfo;

/// Rough token estimate: four characters per token, the same heuristic the
/// Composer uses everywhere a real tokenizer would be overkill for a
/// budget check.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// `table(col:type, col:type, ...)`, one line per table, every column
/// included. Used for the initial prompt and retry tiers 1-2.
pub fn render_table_inline(table: &TableInfo) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{}:{}", c.name, c.data_type))
        .collect();
    format!("{}({})", table.name, columns.join(", "))
}

/// Table name plus only PK/FK columns and any columns in `must_include`
/// (error-referenced columns on retry tier 3+). Used for the ultra-compact
/// tier.
pub fn render_table_ultra_compact(table: &TableInfo, must_include: &[String]) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| {
            c.is_primary_key
                || c.is_foreign_key
                || must_include.iter().any(|m| m.eq_ignore_ascii_case(&c.name))
        })
        .map(|c| c.name.clone())
        .collect();
    if columns.is_empty() {
        table.name.clone()
    } else {
        format!("{}({})", table.name, columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn inline_rendering_includes_every_column() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let rendered = render_table_inline(&snapshot.tables[0]);
        assert_eq!(rendered, "vendors(id:integer)");
    }

    #[test]
    fn ultra_compact_keeps_only_key_and_required_columns() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let rendered = render_table_ultra_compact(&snapshot.tables[0], &[]);
        assert_eq!(rendered, "vendors(id)");
    }

    #[test]
    fn token_estimate_is_length_over_four() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
