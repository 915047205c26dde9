use crate::linker::{cosine_similarity, infer_relation, link_candidates};
use crate::snapshot::{GraphSnapshot, SnapshotStore};
use noema_core::error::{ErrorCode, NoemaError};
use noema_core::ingest::{derive_label, infer_domain};
use noema_core::metrics::{self, LearningMetrics, MetricsHistory};
use noema_core::model::{
    Feedback, KnowledgeEdge, KnowledgeNode, NodeKind, NodeMetadata, CONFIDENCE_MAX,
    CONFIDENCE_MIN, DEFAULT_CONFIDENCE, DEFAULT_NODE_WEIGHT, NODE_WEIGHT_MAX, NODE_WEIGHT_MIN,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("graph capacity exhausted ({0} nodes)")]
    CapacityExhausted(usize),
}

impl NoemaError for StoreError {
    fn error_code(&self) -> ErrorCode {
        match self {
            StoreError::CapacityExhausted(_) => ErrorCode::ResourceExhausted,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphLimits {
    pub max_nodes: Option<usize>,
}

/// Everything the store needs to materialize one node. The embedding is
/// produced upstream and may be absent when the provider failed.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub content: String,
    pub kind: NodeKind,
    pub embedding: Option<Vec<f32>>,
    pub overrides: NodeMetadata,
}

impl NewNode {
    pub fn new(content: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            content: content.into(),
            kind,
            embedding: None,
            overrides: NodeMetadata::default(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_overrides(mut self, overrides: NodeMetadata) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Read-only clone of the full graph, for rendering and inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphView {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

struct GraphState {
    /// Arena in insertion order; iteration order doubles as the tie-break
    /// for metrics and insight derivation.
    nodes: Vec<KnowledgeNode>,
    node_index: HashMap<u64, usize>,
    edges: Vec<KnowledgeEdge>,
    history: MetricsHistory,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphState {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            history: MetricsHistory::new(),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let node_index = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();
        let next_node_id = snapshot.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        let next_edge_id = snapshot.edges.iter().map(|e| e.id).max().unwrap_or(0) + 1;

        Self {
            nodes: snapshot.nodes,
            node_index,
            edges: snapshot.edges,
            history: MetricsHistory::from_entries(snapshot.learning_history),
            next_node_id,
            next_edge_id,
        }
    }

    fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            learning_history: self.history.to_vec(),
        }
    }
}

/// Single-writer knowledge graph. One lock guards the whole mutation
/// surface: insert (with linking, metrics, persistence) and reinforce each
/// run to completion under a write acquisition, so readers always observe a
/// consistent snapshot. Nodes and edges are never deleted.
pub struct GraphStore {
    state: RwLock<GraphState>,
    snapshots: SnapshotStore,
    limits: GraphLimits,
}

impl GraphStore {
    pub async fn open(data_dir: impl AsRef<Path>) -> Self {
        Self::open_with_limits(data_dir, GraphLimits::default()).await
    }

    /// Open the store, restoring the persisted snapshot when one exists.
    /// A malformed snapshot is discarded with a warning; startup never
    /// fails on decode errors.
    pub async fn open_with_limits(data_dir: impl AsRef<Path>, limits: GraphLimits) -> Self {
        let snapshots = SnapshotStore::new(data_dir);
        let state = match snapshots.load().await {
            Ok(Some(snapshot)) => GraphState::from_snapshot(snapshot),
            Ok(None) => GraphState::empty(),
            Err(err) => {
                warn!(error = %err, "discarding unreadable graph snapshot, starting empty");
                GraphState::empty()
            }
        };

        Self {
            state: RwLock::new(state),
            snapshots,
            limits,
        }
    }

    /// Insert one node: derive label and domain, link by similarity against
    /// every existing embedded node, record a metrics snapshot, persist.
    /// Persistence failure is logged, never raised; the in-memory state
    /// stays authoritative.
    pub async fn insert(&self, new: NewNode) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;

        if let Some(cap) = self.limits.max_nodes {
            if state.nodes.len() >= cap {
                return Err(StoreError::CapacityExhausted(cap));
            }
        }

        let now = now_ms();
        let id = state.next_node_id;
        state.next_node_id += 1;

        let metadata = NodeMetadata {
            source: new.overrides.source,
            confidence: new.overrides.confidence.or(Some(DEFAULT_CONFIDENCE)),
            domain: new.overrides.domain.or_else(|| Some(infer_domain(&new.content))),
        };

        let mut node = KnowledgeNode {
            id,
            label: derive_label(&new.content),
            kind: new.kind,
            content: new.content,
            embedding: new.embedding,
            connections: Vec::new(),
            weight: DEFAULT_NODE_WEIGHT,
            created_at_ms: now,
            metadata,
        };

        // One pass over the arena, one edge per unordered pair at most.
        let candidates = match node.embedding.as_deref() {
            Some(embedding) => link_candidates(embedding, state.nodes.iter()),
            None => Vec::new(),
        };
        for (other_id, similarity) in candidates {
            let Some(&other_idx) = state.node_index.get(&other_id) else {
                continue;
            };
            let relation = infer_relation(node.kind, state.nodes[other_idx].kind);
            let edge_id = state.next_edge_id;
            state.next_edge_id += 1;
            state.edges.push(KnowledgeEdge {
                id: edge_id,
                source: id,
                target: other_id,
                relation,
                weight: similarity,
                created_at_ms: now,
            });
            node.connections.push(other_id);
            state.nodes[other_idx].connections.push(id);
        }

        let idx = state.nodes.len();
        state.nodes.push(node);
        state.node_index.insert(id, idx);

        let snapshot = metrics::compute(&state.nodes, &state.edges, state.history.latest(), now);
        state.history.record(snapshot);

        self.persist(&state).await;
        Ok(id)
    }

    pub async fn get(&self, id: u64) -> Option<KnowledgeNode> {
        let state = self.state.read().await;
        state
            .node_index
            .get(&id)
            .map(|&idx| state.nodes[idx].clone())
    }

    /// Feedback-driven reweighting. An unknown id is a silent no-op: the
    /// state is untouched and nothing is persisted.
    pub async fn reinforce(&self, id: u64, feedback: Feedback) {
        let mut state = self.state.write().await;
        let Some(&idx) = state.node_index.get(&id) else {
            return;
        };

        let delta = feedback.delta();
        let node = &mut state.nodes[idx];
        node.weight = (node.weight + delta).clamp(NODE_WEIGHT_MIN, NODE_WEIGHT_MAX);
        if let Some(confidence) = node.metadata.confidence {
            node.metadata.confidence =
                Some((confidence + delta).clamp(CONFIDENCE_MIN, CONFIDENCE_MAX));
        }

        self.persist(&state).await;
    }

    /// Top-k similar nodes by cosine similarity, descending, node id as the
    /// tie-break. Unembedded nodes never appear.
    pub async fn search_similar(&self, embedding: &[f32], k: usize) -> Vec<(u64, f32)> {
        let state = self.state.read().await;
        let mut scored: Vec<(u64, f32)> = state
            .nodes
            .iter()
            .filter_map(|node| {
                let other = node.embedding.as_deref()?;
                cosine_similarity(embedding, other).map(|score| (node.id, score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    pub async fn export(&self) -> GraphView {
        let state = self.state.read().await;
        GraphView {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
        }
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }

    pub async fn latest_metrics(&self) -> Option<LearningMetrics> {
        self.state.read().await.history.latest().cloned()
    }

    pub async fn metrics_history(&self) -> Vec<LearningMetrics> {
        self.state.read().await.history.to_vec()
    }

    async fn persist(&self, state: &GraphState) {
        if let Err(err) = self.snapshots.save(&state.to_snapshot()).await {
            warn!(error = %err, "graph snapshot save failed, in-memory state remains authoritative");
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
