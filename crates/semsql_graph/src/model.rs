//! Knowledge Graph Index node/edge vocabulary (`spec.md` §3/§4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    Concept(String),
    Property(String, String),
    Column(String, String),
    Table(String),
    Synonym(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Edge {
    HasProperty { to: NodeId },
    MapsToColumn { to: NodeId, confidence: f64 },
    RefersTo { to: NodeId },
    MapsToTable { to: NodeId },
    RelatedTo { to: NodeId, kind: String, confidence: f64 },
}

impl Edge {
    pub fn target(&self) -> &NodeId {
        match self {
            Edge::HasProperty { to }
            | Edge::MapsToColumn { to, .. }
            | Edge::RefersTo { to }
            | Edge::MapsToTable { to }
            | Edge::RelatedTo { to, .. } => to,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Edge::MapsToColumn { confidence, .. } | Edge::RelatedTo { confidence, .. } => *confidence,
            _ => 1.0,
        }
    }
}
