//! Orchestrates the five-step Ontology Builder algorithm (`spec.md` §4.4)
//! over structured LLM calls.

use crate::model::{Concept, Ontology, Relationship};
use crate::{merge, relationships, summary, validate};
use chrono::Utc;
use semsql_core::{CoreConfig, CoreError, SchemaSnapshot};
use semsql_llm::{ChatMessage, LlmProvider};
use std::collections::HashMap;

const SCHEMA_HINT: &str = r#"A JSON array of objects shaped like:
[{"name": "...", "description": "...", "confidence": 0.0..1.0,
  "tables": ["..."], "synonyms": ["..."],
  "properties": [{"name": "...", "maps_to": {"table": "...", "column": "..."}, "confidence": 0.0..1.0}]}]
Every table/column name must come from the batch below. Never invent a
name, and never emit a placeholder concept like "Entity" or "Data"."#;

const RELATIONSHIP_SCHEMA_HINT: &str = r#"A JSON array of objects shaped like:
[{"from_concept": "...", "to_concept": "...", "kind": "...", "via_tables": ["..."], "confidence": 0.0..1.0}]
Only name concepts from the list given below. Omit anything already implied
by a foreign key."#;

/// Builds an `Ontology` from `snapshot` by batching its tables, asking the
/// LLM for concept candidates per batch (step 2), merging across batches
/// (step 3), deriving relationships (step 4) and validating `maps_to`
/// references against the snapshot (step 5).
pub async fn build_ontology(
    snapshot: &SchemaSnapshot,
    config: &CoreConfig,
    llm: &dyn LlmProvider,
) -> Result<Ontology, CoreError> {
    let batches = summary::batch_tables(&snapshot.tables, config.ontology_batch_size);

    let mut candidates: Vec<Concept> = Vec::new();
    for batch in &batches {
        let rendered = summary::render_batch(batch);
        let messages = [
            ChatMessage::system(
                "You induce business concepts from a database schema batch. \
                 Respond with JSON only, no prose.",
            ),
            ChatMessage::user(format!("Schema batch:\n{rendered}")),
        ];
        let value = llm
            .generate_structured(&messages, SCHEMA_HINT)
            .await
            .map_err(CoreError::from)?;
        let batch_candidates: Vec<Concept> = serde_json::from_value(value)
            .map_err(|e| CoreError::Internal(format!("malformed concept candidates: {e}")))?;
        candidates.extend(batch_candidates);
    }

    let merged = merge::merge_concepts(candidates);
    let validated = validate::validate_against_snapshot(merged, snapshot);

    let concept_refs: HashMap<String, &Concept> = validated
        .values()
        .map(|c| (c.name.clone(), c))
        .collect();

    let mut all_relationships = relationships::relationships_from_foreign_keys(snapshot, &concept_refs);

    if !concept_refs.is_empty() {
        let concept_names: Vec<&str> = concept_refs.keys().map(String::as_str).collect();
        let messages = [
            ChatMessage::system(
                "You suggest non-obvious relationships between already-identified business \
                 concepts. Respond with JSON only, no prose.",
            ),
            ChatMessage::user(format!("Concepts: {}", concept_names.join(", "))),
        ];
        if let Ok(value) = llm.generate_structured(&messages, RELATIONSHIP_SCHEMA_HINT).await {
            if let Ok(suggested) = serde_json::from_value::<Vec<Relationship>>(value) {
                all_relationships.extend(relationships::accept_suggested(suggested, &concept_refs));
            }
        }
    }

    Ok(Ontology {
        concepts: validated,
        relationships: all_relationships,
        generated_at: Utc::now(),
        source_hash: semsql_session::content_hash(snapshot),
    })
}

/// Renders `ontology` as the YAML document described by `spec.md` §6's
/// persisted-state layout (`metadata.{concept_count,property_count,
/// relationship_count,table_count,generated_at,snapshot_hash}` alongside the
/// concepts/relationships). Writing the result to `{connection_key}_{hash}.yml`
/// is the caller's responsibility; this function never touches the filesystem.
pub fn to_yaml_document(ontology: &Ontology, table_count: usize) -> Result<String, CoreError> {
    #[derive(serde::Serialize)]
    struct Metadata {
        concept_count: usize,
        property_count: usize,
        relationship_count: usize,
        table_count: usize,
        generated_at: chrono::DateTime<Utc>,
        snapshot_hash: String,
    }

    #[derive(serde::Serialize)]
    struct Document<'a> {
        metadata: Metadata,
        concepts: &'a std::collections::BTreeMap<String, Concept>,
        relationships: &'a Vec<Relationship>,
    }

    let document = Document {
        metadata: Metadata {
            concept_count: ontology.concept_count(),
            property_count: ontology.property_count(),
            relationship_count: ontology.relationship_count(),
            table_count,
            generated_at: ontology.generated_at,
            snapshot_hash: ontology.source_hash.clone(),
        },
        concepts: &ontology.concepts,
        relationships: &ontology.relationships,
    };

    serde_yaml::to_string(&document)
        .map_err(|e| CoreError::Internal(format!("failed to render ontology YAML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::FakeLlmProvider;
    use semsql_test_support::fixtures::schema_with_table;

    #[tokio::test]
    async fn build_ontology_merges_batches_and_validates() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let config = CoreConfig::default();

        let concept_json = serde_json::json!([{
            "name": "Vendor",
            "description": "A supplier of goods.",
            "confidence": 0.9,
            "tables": ["vendors"],
            "synonyms": ["supplier"],
            "properties": [{
                "name": "identifier",
                "maps_to": {"table": "vendors", "column": "id"},
                "confidence": 0.95
            }]
        }]);
        let llm = FakeLlmProvider::new()
            .with_structured_response(concept_json)
            .with_structured_response(serde_json::json!([]));

        let ontology = build_ontology(&snapshot, &config, &llm).await.unwrap();
        assert_eq!(ontology.concept_count(), 1);
        assert_eq!(ontology.property_count(), 1);
        assert!(!ontology.source_hash.is_empty());
    }

    #[tokio::test]
    async fn build_ontology_is_idempotent_for_same_snapshot() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let config = CoreConfig::default();

        let concept_json = serde_json::json!([{
            "name": "Vendor",
            "description": "",
            "confidence": 0.9,
            "tables": ["vendors"],
            "synonyms": [],
            "properties": []
        }]);

        let llm_a = FakeLlmProvider::new()
            .with_structured_response(concept_json.clone())
            .with_structured_response(serde_json::json!([]));
        let ontology_a = build_ontology(&snapshot, &config, &llm_a).await.unwrap();

        let llm_b = FakeLlmProvider::new()
            .with_structured_response(concept_json)
            .with_structured_response(serde_json::json!([]));
        let ontology_b = build_ontology(&snapshot, &config, &llm_b).await.unwrap();

        assert_eq!(ontology_a.source_hash, ontology_b.source_hash);
        assert_eq!(ontology_a.concepts.keys().collect::<Vec<_>>(), ontology_b.concepts.keys().collect::<Vec<_>>());
    }

    #[test]
    fn to_yaml_document_includes_metadata() {
        let ontology = Ontology {
            concepts: Default::default(),
            relationships: Vec::new(),
            generated_at: Utc::now(),
            source_hash: "abc123".to_string(),
        };
        let yaml = to_yaml_document(&ontology, 3).unwrap();
        assert!(yaml.contains("snapshot_hash: abc123"));
        assert!(yaml.contains("table_count: 3"));
    }
}
