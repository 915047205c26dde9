use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Node weights live in [0.1, 2.0]; reinforcement never pushes past either bound.
pub const NODE_WEIGHT_MIN: f32 = 0.1;
pub const NODE_WEIGHT_MAX: f32 = 2.0;
pub const DEFAULT_NODE_WEIGHT: f32 = 1.0;

/// Confidence lives in [0.1, 1.0] once reinforced; new nodes start at 0.8.
pub const CONFIDENCE_MIN: f32 = 0.1;
pub const CONFIDENCE_MAX: f32 = 1.0;
pub const DEFAULT_CONFIDENCE: f32 = 0.8;

/// Per-feedback adjustment applied to both weight and confidence.
pub const REINFORCEMENT_DELTA: f32 = 0.1;

#[derive(
    Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
#[archive(check_bytes)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Concept,
    Entity,
    Document,
    Query,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Concept => "concept",
            NodeKind::Entity => "entity",
            NodeKind::Document => "document",
            NodeKind::Query => "query",
        }
    }
}

/// Relationship category inferred from the two endpoint kinds at link time.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, Copy, PartialEq, Eq)]
#[archive(check_bytes)]
pub enum Relation {
    SimilarTo,
    Contains,
    RelatesTo,
    ConnectedTo,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::SimilarTo => "similar_to",
            Relation::Contains => "contains",
            Relation::RelatesTo => "relates_to",
            Relation::ConnectedTo => "connected_to",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn delta(&self) -> f32 {
        match self {
            Feedback::Positive => REINFORCEMENT_DELTA,
            Feedback::Negative => -REINFORCEMENT_DELTA,
        }
    }
}

#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq, Default)]
#[archive(check_bytes)]
pub struct NodeMetadata {
    pub source: Option<String>,
    pub confidence: Option<f32>,
    pub domain: Option<String>,
}

/// A unit of knowledge. `content` and `kind` are fixed at creation; only
/// `weight` and `metadata.confidence` mutate afterwards, and only through
/// reinforcement. `connections` is kept symmetric with the edge list.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct KnowledgeNode {
    pub id: u64,
    pub label: String,
    pub kind: NodeKind,
    pub content: String,
    /// Absent exactly when the embedding provider failed for this node.
    pub embedding: Option<Vec<f32>>,
    pub connections: Vec<u64>,
    pub weight: f32,
    pub created_at_ms: u64,
    pub metadata: NodeMetadata,
}

impl KnowledgeNode {
    pub fn is_isolated(&self) -> bool {
        self.connections.is_empty()
    }
}

/// A similarity-materialized link. Undirected in effect; `source` is always
/// the node whose insertion created the edge.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct KnowledgeEdge {
    pub id: u64,
    pub source: u64,
    pub target: u64,
    pub relation: Relation,
    /// The cosine similarity that triggered creation, in (0.7, 1.0].
    pub weight: f32,
    pub created_at_ms: u64,
}
