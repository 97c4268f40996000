//! Step 4 of the Ontology Builder algorithm: relationship derivation.

use crate::model::{Concept, Relationship};
use semsql_core::SchemaSnapshot;
use std::collections::HashMap;

/// Derives FK-backed relationships (confidence 1.0) between concepts that
/// own the tables on either end of a foreign key. Concepts are looked up by
/// which table(s) they claim; a table claimed by more than one concept
/// produces a relationship for every owning pair, since the snapshot has no
/// single source of truth for "the" owner of a table.
pub fn relationships_from_foreign_keys(
    snapshot: &SchemaSnapshot,
    concepts: &HashMap<String, &Concept>,
) -> Vec<Relationship> {
    let owners = owners_by_table(concepts);
    let mut out = Vec::new();

    for table in &snapshot.tables {
        let Some(from_owners) = owners.get(table.name.as_str()) else {
            continue;
        };
        for fk in &table.foreign_keys {
            let Some(to_owners) = owners.get(fk.to_table.as_str()) else {
                continue;
            };
            for from_concept in from_owners {
                for to_concept in to_owners {
                    if from_concept == to_concept {
                        continue;
                    }
                    out.push(Relationship {
                        from_concept: from_concept.clone(),
                        to_concept: to_concept.clone(),
                        kind: "references".to_string(),
                        via_tables: vec![table.name.clone()],
                        confidence: 1.0,
                    });
                }
            }
        }
    }

    out
}

/// Filters LLM-suggested relationship candidates to those whose endpoints
/// both exist in `concepts`, clamping confidence to the `<= 0.9` ceiling
/// required for non-FK-derived links so they never outrank a real FK.
pub fn accept_suggested(
    candidates: Vec<Relationship>,
    concepts: &HashMap<String, &Concept>,
) -> Vec<Relationship> {
    candidates
        .into_iter()
        .filter(|r| concepts.contains_key(r.from_concept.as_str()) && concepts.contains_key(r.to_concept.as_str()))
        .map(|mut r| {
            r.confidence = r.confidence.min(0.9);
            r
        })
        .collect()
}

fn owners_by_table<'a>(concepts: &HashMap<String, &'a Concept>) -> HashMap<&'a str, Vec<String>> {
    let mut owners: HashMap<&str, Vec<String>> = HashMap::new();
    for concept in concepts.values() {
        for table in &concept.tables {
            owners.entry(table.as_str()).or_default().push(concept.name.clone());
        }
    }
    owners
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    fn concept(name: &str, tables: &[&str]) -> Concept {
        Concept {
            name: name.to_string(),
            description: String::new(),
            confidence: 0.9,
            tables: tables.iter().map(|s| s.to_string()).collect(),
            properties: Vec::new(),
            synonyms: Vec::new(),
        }
    }

    #[test]
    fn foreign_key_without_matching_owner_produces_nothing() {
        let snapshot = schema_with_table("db", "public", "orders");
        let order_concept = concept("Order", &["orders"]);
        let mut concepts = HashMap::new();
        concepts.insert("order".to_string(), &order_concept);

        let rels = relationships_from_foreign_keys(&snapshot, &concepts);
        assert!(rels.is_empty());
    }

    #[test]
    fn suggested_relationship_confidence_is_capped() {
        let vendor = concept("Vendor", &["vendors"]);
        let order = concept("Order", &["orders"]);
        let mut concepts = HashMap::new();
        concepts.insert("vendor".to_string(), &vendor);
        concepts.insert("order".to_string(), &order);

        let candidate = Relationship {
            from_concept: "Order".to_string(),
            to_concept: "Vendor".to_string(),
            kind: "placed_with".to_string(),
            via_tables: vec![],
            confidence: 1.0,
        };
        let accepted = accept_suggested(vec![candidate], &concepts);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].confidence, 0.9);
    }

    #[test]
    fn suggested_relationship_with_unknown_endpoint_is_dropped() {
        let vendor = concept("Vendor", &["vendors"]);
        let mut concepts = HashMap::new();
        concepts.insert("vendor".to_string(), &vendor);

        let candidate = Relationship {
            from_concept: "Vendor".to_string(),
            to_concept: "Ghost".to_string(),
            kind: "placed_with".to_string(),
            via_tables: vec![],
            confidence: 0.5,
        };
        assert!(accept_suggested(vec![candidate], &concepts).is_empty());
    }
}
