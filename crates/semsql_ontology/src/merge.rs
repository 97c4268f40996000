//! Step 3 of the Ontology Builder algorithm: merging concept candidates
//! gathered from independent per-batch LLM calls into a single set.

use crate::model::{ColumnRef, Concept, Property};
use std::collections::BTreeMap;

/// Merges `candidates` by canonical (case-folded) concept name. Within a
/// group: union of `tables`, union of `properties` deduplicated by
/// `(name, maps_to.table, maps_to.column)` keeping the higher-confidence
/// copy, best-confidence synonym per synonym text, and max confidence.
///
/// Batch order is preserved by iterating `candidates` in the order given,
/// so callers that sort batches by table name (see `summary::batch_tables`)
/// get a deterministic merge regardless of per-batch LLM response order.
pub fn merge_concepts(candidates: Vec<Concept>) -> BTreeMap<String, Concept> {
    let mut merged: BTreeMap<String, Concept> = BTreeMap::new();

    for candidate in candidates {
        let key = candidate.canonical_name();
        match merged.get_mut(&key) {
            None => {
                merged.insert(key, candidate);
            }
            Some(existing) => merge_into(existing, candidate),
        }
    }

    merged
}

fn merge_into(existing: &mut Concept, incoming: Concept) {
    if incoming.confidence > existing.confidence {
        existing.confidence = incoming.confidence;
    }
    if existing.description.is_empty() {
        existing.description = incoming.description;
    }

    for table in incoming.tables {
        if !existing.tables.contains(&table) {
            existing.tables.push(table);
        }
    }

    for synonym in incoming.synonyms {
        if !existing.synonyms.iter().any(|s| s.eq_ignore_ascii_case(&synonym)) {
            existing.synonyms.push(synonym);
        }
    }

    for property in incoming.properties {
        merge_property(&mut existing.properties, property);
    }
}

fn merge_property(properties: &mut Vec<Property>, incoming: Property) {
    let existing = properties.iter_mut().find(|p| {
        p.name.eq_ignore_ascii_case(&incoming.name) && p.maps_to == incoming.maps_to
    });

    match existing {
        Some(p) if incoming.confidence > p.confidence => p.confidence = incoming.confidence,
        Some(_) => {}
        None => properties.push(incoming),
    }
}

/// Validated input for `merge_property`'s de-dup key, exported for callers
/// that need to compare two `maps_to` references directly.
pub fn same_mapping(a: &ColumnRef, b: &ColumnRef) -> bool {
    a.table.eq_ignore_ascii_case(&b.table) && a.column.eq_ignore_ascii_case(&b.column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, table: &str, column: &str, confidence: f64) -> Property {
        Property {
            name: name.to_string(),
            maps_to: ColumnRef { table: table.to_string(), column: column.to_string() },
            confidence,
        }
    }

    fn concept(name: &str, tables: &[&str], props: Vec<Property>, confidence: f64) -> Concept {
        Concept {
            name: name.to_string(),
            description: String::new(),
            confidence,
            tables: tables.iter().map(|s| s.to_string()).collect(),
            properties: props,
            synonyms: Vec::new(),
        }
    }

    #[test]
    fn same_canonical_name_merges_tables_and_properties() {
        let a = concept("Vendor", &["vendors"], vec![prop("name", "vendors", "name", 0.7)], 0.8);
        let b = concept("vendor", &["vendor_contacts"], vec![prop("name", "vendors", "name", 0.9)], 0.6);

        let merged = merge_concepts(vec![a, b]);
        assert_eq!(merged.len(), 1);
        let vendor = merged.get("vendor").unwrap();
        assert_eq!(vendor.confidence, 0.8);
        assert_eq!(vendor.tables.len(), 2);
        assert_eq!(vendor.properties.len(), 1);
        assert_eq!(vendor.properties[0].confidence, 0.9);
    }

    #[test]
    fn distinct_mappings_are_kept_separate() {
        let a = concept("Vendor", &["vendors"], vec![prop("name", "vendors", "name", 0.7)], 0.8);
        let b = concept("Vendor", &["vendors"], vec![prop("name", "vendors", "display_name", 0.7)], 0.8);

        let merged = merge_concepts(vec![a, b]);
        assert_eq!(merged.get("vendor").unwrap().properties.len(), 2);
    }
}
