//! The Knowledge Graph Index (C5, `spec.md` §4.5): projects an `Ontology`
//! into a queryable graph of concepts, properties, tables and synonyms.

mod index;
mod model;

pub use index::{GraphBackend, InMemoryGraphBackend, Insights, SuggestedColumn};
pub use model::{Edge, NodeId};
