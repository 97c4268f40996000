//! Step 1 of the Ontology Builder algorithm: a compact textual rendering of
//! a `SchemaSnapshot` batch, preserving every column untruncated.

use semsql_core::TableInfo;

/// Renders one batch of tables as plain text for the structured-generation
/// prompt. Every column is listed; nothing is elided regardless of table
/// width, per `spec.md` §4.4 step 1.
pub fn render_batch(tables: &[&TableInfo]) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str("table ");
        out.push_str(&table.name);
        out.push('\n');
        for column in &table.columns {
            out.push_str("  - ");
            out.push_str(&column.name);
            out.push_str(": ");
            out.push_str(&column.data_type);
            if !column.nullable {
                out.push_str(" not null");
            }
            if column.is_primary_key {
                out.push_str(" primary key");
            }
            if let Some(fk) = &column.references {
                out.push_str(&format!(" references {}.{}", fk.to_table, fk.to_column));
            }
            out.push('\n');
        }
    }
    out
}

/// Splits `tables` into consecutive batches of at most `batch_size`, in
/// ascending table-name order so the merge pass in `merge.rs` is
/// deterministic across runs.
pub fn batch_tables(tables: &[TableInfo], batch_size: usize) -> Vec<Vec<&TableInfo>> {
    let mut sorted: Vec<&TableInfo> = tables.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let batch_size = batch_size.max(1);
    sorted
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn render_batch_lists_every_column() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let tables: Vec<&TableInfo> = snapshot.tables.iter().collect();
        let rendered = render_batch(&tables);
        assert!(rendered.contains("table vendors"));
        assert!(rendered.contains("id"));
    }

    #[test]
    fn batch_tables_splits_and_sorts() {
        let mut snapshot = schema_with_table("db", "public", "zebra");
        snapshot.tables.push(schema_with_table("db", "public", "alpha").tables.remove(0));
        let batches = batch_tables(&snapshot.tables, 1);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][0].name, "alpha");
        assert_eq!(batches[1][0].name, "zebra");
    }
}
