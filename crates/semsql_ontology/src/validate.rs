//! Step 5 of the Ontology Builder algorithm: dropping `maps_to` mappings
//! that do not reference a real column in the snapshot.

use crate::model::Concept;
use semsql_core::SchemaSnapshot;

/// Drops every `Property` whose `maps_to` does not name an existing column,
/// logging a warning per dropped mapping, and drops any `Concept` left with
/// zero properties and zero claimed tables as a result (a candidate that
/// turned out to reference nothing real).
pub fn validate_against_snapshot(
    concepts: std::collections::BTreeMap<String, Concept>,
    snapshot: &SchemaSnapshot,
) -> std::collections::BTreeMap<String, Concept> {
    concepts
        .into_iter()
        .filter_map(|(key, mut concept)| {
            concept.properties.retain(|property| {
                let valid = snapshot
                    .table(&property.maps_to.table)
                    .map(|table| table.columns.iter().any(|c| c.name == property.maps_to.column))
                    .unwrap_or(false);
                if !valid {
                    log::warn!(
                        "dropping invalid mapping for concept {}: {}.{} not in snapshot",
                        concept.name,
                        property.maps_to.table,
                        property.maps_to.column
                    );
                }
                valid
            });

            concept.tables.retain(|table| snapshot.table(table).is_some());

            if concept.properties.is_empty() && concept.tables.is_empty() {
                None
            } else {
                Some((key, concept))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnRef, Property};
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn invalid_mapping_is_dropped_but_concept_kept_if_table_valid() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let mut concepts = std::collections::BTreeMap::new();
        concepts.insert(
            "vendor".to_string(),
            Concept {
                name: "Vendor".to_string(),
                description: String::new(),
                confidence: 0.9,
                tables: vec!["vendors".to_string()],
                properties: vec![
                    Property {
                        name: "id".to_string(),
                        maps_to: ColumnRef { table: "vendors".to_string(), column: "id".to_string() },
                        confidence: 0.9,
                    },
                    Property {
                        name: "ghost".to_string(),
                        maps_to: ColumnRef { table: "vendors".to_string(), column: "nope".to_string() },
                        confidence: 0.9,
                    },
                ],
                synonyms: vec![],
            },
        );

        let validated = validate_against_snapshot(concepts, &snapshot);
        let vendor = validated.get("vendor").unwrap();
        assert_eq!(vendor.properties.len(), 1);
        assert_eq!(vendor.properties[0].name, "id");
    }

    #[test]
    fn concept_with_no_valid_references_is_dropped_entirely() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let mut concepts = std::collections::BTreeMap::new();
        concepts.insert(
            "ghost".to_string(),
            Concept {
                name: "Ghost".to_string(),
                description: String::new(),
                confidence: 0.9,
                tables: vec!["nonexistent".to_string()],
                properties: vec![Property {
                    name: "x".to_string(),
                    maps_to: ColumnRef { table: "nonexistent".to_string(), column: "y".to_string() },
                    confidence: 0.9,
                }],
                synonyms: vec![],
            },
        );

        let validated = validate_against_snapshot(concepts, &snapshot);
        assert!(validated.is_empty());
    }
}
