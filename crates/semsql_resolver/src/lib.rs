//! The Semantic Resolver (C7, `spec.md` §4.7): fuses the Ontology Builder,
//! Knowledge Graph Index and RAG Example Store into one ranked report.

mod fuse;
mod lexical;
mod report;

pub use fuse::resolve;
pub use report::{ColumnRecommendation, JoinHint, ResolverReport, Source};
