//! `ResolverReport` (`spec.md` §4.7): the fused output of C4/C5/C6 for one
//! question.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Ontology,
    Graph,
    Rag,
}

#[derive(Debug, Clone)]
pub struct ColumnRecommendation {
    pub table: String,
    pub column: String,
    pub confidence: f64,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone)]
pub struct JoinHint {
    pub tables: Vec<String>,
    pub hop_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolverReport {
    pub column_recommendations: Vec<ColumnRecommendation>,
    pub suggested_tables: Vec<String>,
    pub join_hints: Vec<JoinHint>,
    pub rag_examples: Vec<semsql_rag::RagEntry>,
}
