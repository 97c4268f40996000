//! Fuses C4 (Ontology), C5 (Knowledge Graph) and C6 (RAG) into a single
//! `ResolverReport` for a question (`spec.md` §4.7).

use crate::lexical;
use crate::report::{ColumnRecommendation, JoinHint, ResolverReport, Source};
use semsql_core::SchemaSnapshot;
use semsql_graph::GraphBackend;
use semsql_ontology::Ontology;
use semsql_rag::RagEntry;
use std::collections::HashMap;

struct Candidate {
    sources: Vec<(Source, f64)>,
    specificity: f64,
}

/// Fuses an Ontology, a graph backend built from that same Ontology, and a
/// set of already-retrieved RAG examples into one ranked report.
pub fn resolve(
    question: &str,
    snapshot: &SchemaSnapshot,
    ontology: &Ontology,
    graph: &dyn GraphBackend,
    rag_examples: Vec<RagEntry>,
    top_k_per_table: usize,
) -> ResolverReport {
    let question_lower = question.to_ascii_lowercase();
    let question_tokens = lexical::tokenize(question);
    let mut candidates: HashMap<(String, String), Candidate> = HashMap::new();

    for concept in ontology.concepts.values() {
        let name_lower = concept.name.to_ascii_lowercase();
        let exact_match = question_tokens.iter().any(|t| *t == name_lower);
        let synonym_match = concept
            .synonyms
            .iter()
            .any(|s| question_lower.contains(&s.to_ascii_lowercase()));
        if !exact_match && !synonym_match && !question_lower.contains(&name_lower) {
            continue;
        }
        let specificity = if exact_match {
            1.0
        } else if synonym_match {
            0.5
        } else {
            0.25
        };

        for property in &concept.properties {
            if snapshot.table(&property.maps_to.table).is_none() {
                continue;
            }
            let key = (property.maps_to.table.clone(), property.maps_to.column.clone());
            let entry = candidates
                .entry(key)
                .or_insert_with(|| Candidate { sources: Vec::new(), specificity });
            entry.sources.push((Source::Ontology, property.confidence));
            entry.specificity = entry.specificity.max(specificity);
        }
    }

    let insights = graph.insights(question, top_k_per_table);
    for (table, columns) in &insights.suggested_columns {
        if snapshot.table(table).is_none() {
            continue;
        }
        for suggestion in columns {
            let key = (table.clone(), suggestion.column.clone());
            let entry = candidates
                .entry(key)
                .or_insert_with(|| Candidate { sources: Vec::new(), specificity: 0.25 });
            entry.sources.push((Source::Graph, suggestion.confidence));
        }
    }

    for example in &rag_examples {
        let sql_tokens = lexical::tokenize(&example.sql);
        for table in &snapshot.tables {
            for column in &table.columns {
                if sql_tokens.iter().any(|t| *t == column.name.to_ascii_lowercase()) {
                    let key = (table.name.clone(), column.name.clone());
                    let entry = candidates
                        .entry(key)
                        .or_insert_with(|| Candidate { sources: Vec::new(), specificity: 0.0 });
                    entry.sources.push((Source::Rag, 0.5));
                }
            }
        }
    }

    let mut column_recommendations: Vec<(ColumnRecommendation, f64)> = candidates
        .into_iter()
        .map(|((table, column), candidate)| {
            let mut sources: Vec<Source> = candidate.sources.iter().map(|(s, _)| *s).collect();
            sources.sort();
            sources.dedup();

            let confidence = if candidate.sources.len() > 1 {
                let min_confidence =
                    candidate.sources.iter().map(|(_, c)| *c).fold(f64::MAX, f64::min);
                (min_confidence + 0.05).min(0.99)
            } else {
                candidate.sources[0].1
            };

            (ColumnRecommendation { table, column, confidence, sources }, candidate.specificity)
        })
        .collect();

    column_recommendations.sort_by(|(a, spec_a), (b, spec_b)| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap()
            .then_with(|| spec_b.partial_cmp(spec_a).unwrap())
            .then_with(|| pk_fk_relevance(snapshot, b).cmp(&pk_fk_relevance(snapshot, a)))
            .then_with(|| {
                lexical::best_similarity(&b.column, &question_tokens)
                    .partial_cmp(&lexical::best_similarity(&a.column, &question_tokens))
                    .unwrap()
            })
    });

    let column_recommendations: Vec<ColumnRecommendation> =
        column_recommendations.into_iter().map(|(rec, _)| rec).collect();

    let suggested_tables = suggested_tables_from(&column_recommendations, snapshot);
    let join_hints = join_hints_from(&suggested_tables, snapshot);

    ResolverReport { column_recommendations, suggested_tables, join_hints, rag_examples }
}

fn pk_fk_relevance(snapshot: &SchemaSnapshot, rec: &ColumnRecommendation) -> u8 {
    snapshot
        .table(&rec.table)
        .and_then(|t| t.columns.iter().find(|c| c.name == rec.column))
        .map(|c| (c.is_primary_key || c.is_foreign_key) as u8)
        .unwrap_or(0)
}

fn suggested_tables_from(recs: &[ColumnRecommendation], snapshot: &SchemaSnapshot) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    for rec in recs {
        if !tables.contains(&rec.table) {
            tables.push(rec.table.clone());
        }
    }
    let direct = tables.clone();
    for table_name in &direct {
        if let Some(table) = snapshot.table(table_name) {
            for fk in &table.foreign_keys {
                if !tables.contains(&fk.to_table) {
                    tables.push(fk.to_table.clone());
                }
            }
        }
    }
    tables
}

fn join_hints_from(suggested_tables: &[String], snapshot: &SchemaSnapshot) -> Vec<JoinHint> {
    let mut hints = Vec::new();
    for table_name in suggested_tables {
        let Some(table) = snapshot.table(table_name) else { continue };
        for fk in &table.foreign_keys {
            if suggested_tables.contains(&fk.to_table) && fk.to_table != table.name {
                hints.push(JoinHint {
                    tables: vec![table.name.clone(), fk.to_table.clone()],
                    hop_count: 1,
                });
            }
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_graph::InMemoryGraphBackend;
    use semsql_ontology::{ColumnRef, Concept, Property, Relationship};
    use semsql_test_support::fixtures::schema_with_table;
    use std::collections::BTreeMap;

    fn vendor_ontology() -> Ontology {
        let mut concepts = BTreeMap::new();
        concepts.insert(
            "vendor".to_string(),
            Concept {
                name: "Vendor".to_string(),
                description: "A supplier".to_string(),
                confidence: 0.9,
                tables: vec!["vendors".to_string()],
                properties: vec![Property {
                    name: "identifier".to_string(),
                    maps_to: ColumnRef { table: "vendors".to_string(), column: "id".to_string() },
                    confidence: 0.8,
                }],
                synonyms: vec![],
            },
        );
        Ontology {
            concepts,
            relationships: Vec::<Relationship>::new(),
            generated_at: chrono::Utc::now(),
            source_hash: "hash".to_string(),
        }
    }

    #[test]
    fn dual_source_hit_gets_confidence_bonus() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let ontology = vendor_ontology();
        let graph = InMemoryGraphBackend::from_ontology(ontology.clone());

        let report = resolve("find the vendor", &snapshot, &ontology, &graph, Vec::new(), 5);
        let rec = report
            .column_recommendations
            .iter()
            .find(|r| r.table == "vendors" && r.column == "id")
            .unwrap();
        assert_eq!(rec.sources.len(), 2);
        assert!((rec.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn recommendations_only_reference_snapshot_columns() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let ontology = vendor_ontology();
        let graph = InMemoryGraphBackend::from_ontology(ontology.clone());
        let report = resolve("vendor", &snapshot, &ontology, &graph, Vec::new(), 5);
        for rec in &report.column_recommendations {
            assert!(snapshot.table(&rec.table).is_some());
        }
    }
}
