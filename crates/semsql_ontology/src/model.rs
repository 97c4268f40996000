//! Ontology data model (`spec.md` §3): concepts, their column mappings and
//! the relationships between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business concept grounded in one or more physical tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub description: String,
    /// `0.0..=1.0`.
    pub confidence: f64,
    pub tables: Vec<String>,
    pub properties: Vec<Property>,
    pub synonyms: Vec<String>,
}

impl Concept {
    /// Canonical key used for merging across batches: case-folded name.
    pub fn canonical_name(&self) -> String {
        self.name.trim().to_ascii_lowercase()
    }
}

/// One attribute of a `Concept`, grounded in a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub maps_to: ColumnRef,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// A directed semantic link between two concepts (`spec.md` §4.4 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_concept: String,
    pub to_concept: String,
    pub kind: String,
    pub via_tables: Vec<String>,
    pub confidence: f64,
}

/// The full ontology for one schema snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ontology {
    pub concepts: std::collections::BTreeMap<String, Concept>,
    pub relationships: Vec<Relationship>,
    pub generated_at: DateTime<Utc>,
    pub source_hash: String,
}

impl Ontology {
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn property_count(&self) -> usize {
        self.concepts.values().map(|c| c.properties.len()).sum()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}
