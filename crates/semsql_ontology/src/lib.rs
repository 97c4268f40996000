//! The Ontology Builder (C4, `spec.md` §4.4): LLM-assisted induction of
//! domain concepts, properties and relationships from a `SchemaSnapshot`.

mod builder;
mod merge;
mod model;
mod relationships;
mod summary;
mod validate;

pub use builder::{build_ontology, to_yaml_document};
pub use merge::merge_concepts;
pub use model::{ColumnRef, Concept, Ontology, Property, Relationship};
pub use relationships::{accept_suggested, relationships_from_foreign_keys};
pub use summary::{batch_tables, render_batch};
pub use validate::validate_against_snapshot;
