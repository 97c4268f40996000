//! Builds a `GraphIndex` from an `Ontology` and answers `insights` queries
//! (`spec.md` §4.5).
//!
//! The query parameter is named `question`, never `query` — the latter
//! collides with the graph-query-language keyword the spec calls out as
//! "the canonical bug to avoid".

use crate::model::{Edge, NodeId};
use semsql_ontology::Ontology;
use std::collections::HashMap;

/// One column suggested for a detected concept.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedColumn {
    pub column: String,
    pub confidence: f64,
    pub meaning: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insights {
    pub concepts_detected: Vec<String>,
    pub suggested_columns: HashMap<String, Vec<SuggestedColumn>>,
    pub semantic_mappings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Query-and-answer seam over the graph projection of an Ontology. A remote
/// or persistent graph engine can implement this trait; `InMemoryGraphBackend`
/// is the one shipped here, and it also doubles as the fallback path when a
/// remote backend is unavailable (`spec.md` §4.5's graceful-degradation
/// requirement) since any caller can construct one directly from the same
/// Ontology it was already holding.
pub trait GraphBackend: Send + Sync {
    fn insights(&self, question: &str, top_k_per_table: usize) -> Insights;
}

/// Adjacency-list projection of an `Ontology`: nodes `{Concept, Property,
/// Column, Table, Synonym}`, edges `HAS_PROPERTY`, `MAPS_TO_COLUMN{confidence}`,
/// `REFERS_TO`, `MAPS_TO_TABLE`, `RELATED_TO{kind}`.
pub struct InMemoryGraphBackend {
    adjacency: HashMap<NodeId, Vec<Edge>>,
    ontology: Ontology,
}

impl InMemoryGraphBackend {
    /// Projects `ontology` into nodes/edges. Because every edge here is
    /// derived straight from the Ontology's own `concepts`/`relationships`,
    /// removing a property from the Ontology and rebuilding drops its edges
    /// too — the round-trip invariant required by `spec.md` §3.
    pub fn from_ontology(ontology: Ontology) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<Edge>> = HashMap::new();

        for concept in ontology.concepts.values() {
            let concept_node = NodeId::Concept(concept.name.clone());

            for property in &concept.properties {
                let property_node = NodeId::Property(concept.name.clone(), property.name.clone());
                let column_node =
                    NodeId::Column(property.maps_to.table.clone(), property.maps_to.column.clone());
                let table_node = NodeId::Table(property.maps_to.table.clone());

                adjacency
                    .entry(concept_node.clone())
                    .or_default()
                    .push(Edge::HasProperty { to: property_node.clone() });
                adjacency.entry(property_node).or_default().push(Edge::MapsToColumn {
                    to: column_node,
                    confidence: property.confidence,
                });
                adjacency
                    .entry(concept_node.clone())
                    .or_default()
                    .push(Edge::MapsToTable { to: table_node });
            }

            for synonym in &concept.synonyms {
                let synonym_node = NodeId::Synonym(synonym.clone());
                adjacency
                    .entry(synonym_node)
                    .or_default()
                    .push(Edge::RefersTo { to: concept_node.clone() });
            }
        }

        for relationship in &ontology.relationships {
            let from = NodeId::Concept(relationship.from_concept.clone());
            let to = NodeId::Concept(relationship.to_concept.clone());
            adjacency.entry(from).or_default().push(Edge::RelatedTo {
                to,
                kind: relationship.kind.clone(),
                confidence: relationship.confidence,
            });
        }

        Self { adjacency, ontology }
    }

    fn concept_matches(&self, concept_name: &str, question_lower: &str) -> bool {
        let concept = match self.ontology.concepts.get(&concept_name.to_ascii_lowercase()) {
            Some(c) => c,
            None => return false,
        };
        let name_lower = concept.name.to_ascii_lowercase();
        if question_lower.contains(&name_lower) {
            return true;
        }
        concept.synonyms.iter().any(|s| question_lower.contains(&s.to_ascii_lowercase()))
    }
}

impl GraphBackend for InMemoryGraphBackend {
    fn insights(&self, question: &str, top_k_per_table: usize) -> Insights {
        let question_lower = question.to_ascii_lowercase();

        let detected: Vec<&str> = self
            .ontology
            .concepts
            .keys()
            .map(String::as_str)
            .filter(|key| self.concept_matches(key, &question_lower))
            .collect();

        let mut suggested_columns: HashMap<String, Vec<SuggestedColumn>> = HashMap::new();
        let mut semantic_mappings = Vec::new();

        for key in &detected {
            let concept = &self.ontology.concepts[*key];
            for property in &concept.properties {
                semantic_mappings.push(format!(
                    "{}.{} -> {}.{} ({:.2})",
                    concept.name,
                    property.name,
                    property.maps_to.table,
                    property.maps_to.column,
                    property.confidence
                ));
                suggested_columns
                    .entry(property.maps_to.table.clone())
                    .or_default()
                    .push(SuggestedColumn {
                        column: property.maps_to.column.clone(),
                        confidence: property.confidence,
                        meaning: property.name.clone(),
                    });
            }
        }

        for columns in suggested_columns.values_mut() {
            columns.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
            columns.truncate(top_k_per_table);
        }

        let mut recommendations = Vec::new();
        for relationship in &self.ontology.relationships {
            if detected.contains(&relationship.from_concept.as_str())
                && detected.contains(&relationship.to_concept.as_str())
            {
                recommendations.push(format!(
                    "join via {} ({})",
                    relationship.via_tables.join(", "),
                    relationship.kind
                ));
            }
        }

        Insights {
            concepts_detected: detected.into_iter().map(str::to_string).collect(),
            suggested_columns,
            semantic_mappings,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_ontology::{ColumnRef, Concept, Ontology, Property, Relationship};
    use std::collections::BTreeMap;

    fn sample_ontology() -> Ontology {
        let mut concepts = BTreeMap::new();
        concepts.insert(
            "vendor".to_string(),
            Concept {
                name: "Vendor".to_string(),
                description: "A supplier".to_string(),
                confidence: 0.9,
                tables: vec!["vendors".to_string()],
                properties: vec![Property {
                    name: "name".to_string(),
                    maps_to: ColumnRef { table: "vendors".to_string(), column: "display_name".to_string() },
                    confidence: 0.8,
                }],
                synonyms: vec!["supplier".to_string()],
            },
        );
        concepts.insert(
            "order".to_string(),
            Concept {
                name: "Order".to_string(),
                description: "A purchase order".to_string(),
                confidence: 0.9,
                tables: vec!["orders".to_string()],
                properties: vec![],
                synonyms: vec![],
            },
        );

        Ontology {
            concepts,
            relationships: vec![Relationship {
                from_concept: "Order".to_string(),
                to_concept: "Vendor".to_string(),
                kind: "placed_with".to_string(),
                via_tables: vec!["orders".to_string()],
                confidence: 1.0,
            }],
            generated_at: chrono::Utc::now(),
            source_hash: "hash".to_string(),
        }
    }

    #[test]
    fn detects_concept_by_synonym_substring() {
        let backend = InMemoryGraphBackend::from_ontology(sample_ontology());
        let insights = backend.insights("who is our biggest supplier", 5);
        assert!(insights.concepts_detected.contains(&"vendor".to_string()));
    }

    #[test]
    fn suggests_columns_capped_per_table() {
        let backend = InMemoryGraphBackend::from_ontology(sample_ontology());
        let insights = backend.insights("vendor name", 1);
        let columns = insights.suggested_columns.get("vendors").unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].column, "display_name");
    }

    #[test]
    fn recommends_join_when_both_concepts_detected() {
        let backend = InMemoryGraphBackend::from_ontology(sample_ontology());
        let insights = backend.insights("vendor order", 5);
        assert_eq!(insights.recommendations.len(), 1);
        assert!(insights.recommendations[0].contains("orders"));
    }
}
