//! Insight derivation over the current graph snapshot.
//!
//! Everything here is read-only: pattern and gap summaries are pure
//! functions of the exported node/edge lists, so repeated derivation
//! without mutation yields identical reports.

use noema_core::metrics::LearningMetrics;
use noema_core::model::{KnowledgeEdge, KnowledgeNode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use storage::graph::GraphStore;

pub const TOP_CONCEPT_LIMIT: usize = 10;
pub const PATTERN_LIMIT: usize = 3;

/// Pattern and gap aggregation buckets nodes without a domain here.
const UNKNOWN_DOMAIN: &str = "unknown";

/// A domain is underrepresented when it holds strictly fewer nodes than
/// this fraction of the graph (floored at one node).
const UNDERREPRESENTED_FRACTION: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub id: u64,
    pub label: String,
    pub weight: f32,
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsView {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub average_connectivity: f32,
    pub knowledge_domains: Vec<String>,
    pub growth_rate: f32,
    pub confidence_score: f32,
    pub recorded_at_ms: u64,
}

impl From<&LearningMetrics> for MetricsView {
    fn from(metrics: &LearningMetrics) -> Self {
        Self {
            total_nodes: metrics.total_nodes,
            total_edges: metrics.total_edges,
            average_connectivity: metrics.average_connectivity,
            knowledge_domains: metrics.knowledge_domains.clone(),
            growth_rate: metrics.growth_rate,
            confidence_score: metrics.confidence_score,
            recorded_at_ms: metrics.recorded_at_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub top_concepts: Vec<ConceptSummary>,
    pub emerging_patterns: Vec<String>,
    pub knowledge_gaps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: u64,
    pub label: String,
    pub kind: String,
    pub content: String,
    pub connections: Vec<u64>,
    pub weight: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub created_at_ms: u64,
}

impl From<&KnowledgeNode> for NodeView {
    fn from(node: &KnowledgeNode) -> Self {
        Self {
            id: node.id,
            label: node.label.clone(),
            kind: node.kind.as_str().to_string(),
            content: node.content.clone(),
            connections: node.connections.clone(),
            weight: node.weight,
            source: node.metadata.source.clone(),
            confidence: node.metadata.confidence,
            domain: node.metadata.domain.clone(),
            created_at_ms: node.created_at_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    pub id: u64,
    pub source: u64,
    pub target: u64,
    pub relation: String,
    pub weight: f32,
    pub created_at_ms: u64,
}

impl From<&KnowledgeEdge> for EdgeView {
    fn from(edge: &KnowledgeEdge) -> Self {
        Self {
            id: edge.id,
            source: edge.source,
            target: edge.target,
            relation: edge.relation.as_str().to_string(),
            weight: edge.weight,
            created_at_ms: edge.created_at_ms,
        }
    }
}

/// The `{nodes, edges}` payload the rendering boundary consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphViewResponse {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

pub struct InsightEngine {
    store: Arc<GraphStore>,
}

impl InsightEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub async fn report(&self) -> InsightReport {
        let view = self.store.export().await;
        let metrics = self.store.latest_metrics().await;

        InsightReport {
            top_concepts: top_concepts(&view.nodes),
            emerging_patterns: emerging_patterns(&view.nodes, &view.edges),
            knowledge_gaps: knowledge_gaps(&view.nodes),
            metrics: metrics.as_ref().map(MetricsView::from),
        }
    }

    pub async fn graph_view(&self) -> GraphViewResponse {
        let view = self.store.export().await;
        GraphViewResponse {
            nodes: view.nodes.iter().map(NodeView::from).collect(),
            edges: view.edges.iter().map(EdgeView::from).collect(),
        }
    }

    /// Top-k nodes most similar to a caller-supplied embedding.
    pub async fn similar_nodes(&self, embedding: &[f32], k: usize) -> Vec<(NodeView, f32)> {
        let hits = self.store.search_similar(embedding, k).await;
        let mut out = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            if let Some(node) = self.store.get(id).await {
                out.push((NodeView::from(&node), score));
            }
        }
        out
    }
}

/// All nodes by descending weight, ties broken by insertion order (stable
/// sort over the arena), truncated to the top ten.
pub fn top_concepts(nodes: &[KnowledgeNode]) -> Vec<ConceptSummary> {
    let mut ranked: Vec<&KnowledgeNode> = nodes.iter().collect();
    ranked.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    ranked.truncate(TOP_CONCEPT_LIMIT);

    ranked
        .into_iter()
        .map(|node| ConceptSummary {
            id: node.id,
            label: node.label.clone(),
            weight: node.weight,
            connections: node.connections.len(),
        })
        .collect()
}

/// Frequency table over ordered source-domain/target-domain pairs; the top
/// three by count (first-seen order breaks ties) become pattern summaries.
pub fn emerging_patterns(nodes: &[KnowledgeNode], edges: &[KnowledgeEdge]) -> Vec<String> {
    let domains: HashMap<u64, &str> = nodes
        .iter()
        .map(|node| {
            (
                node.id,
                node.metadata.domain.as_deref().unwrap_or(UNKNOWN_DOMAIN),
            )
        })
        .collect();

    struct Bucket<'a> {
        source: &'a str,
        target: &'a str,
        count: usize,
    }

    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for edge in edges {
        let (Some(&source), Some(&target)) = (domains.get(&edge.source), domains.get(&edge.target))
        else {
            continue;
        };
        match index.get(&(source, target)) {
            Some(&i) => buckets[i].count += 1,
            None => {
                index.insert((source, target), buckets.len());
                buckets.push(Bucket {
                    source,
                    target,
                    count: 1,
                });
            }
        }
    }

    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(PATTERN_LIMIT);

    buckets
        .into_iter()
        .map(|bucket| {
            format!(
                "Strong connection between {} and {}",
                bucket.source, bucket.target
            )
        })
        .collect()
}

/// Two independent checks: isolated nodes, and domains holding strictly
/// fewer nodes than `max(1, 0.1 × total)`.
pub fn knowledge_gaps(nodes: &[KnowledgeNode]) -> Vec<String> {
    let mut gaps = Vec::new();

    let isolated = nodes.iter().filter(|node| node.is_isolated()).count();
    if isolated > 0 {
        gaps.push(format!(
            "{isolated} isolated knowledge concepts need connections"
        ));
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for node in nodes {
        let domain = node.metadata.domain.as_deref().unwrap_or(UNKNOWN_DOMAIN);
        match index.get(domain) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(domain, counts.len());
                counts.push((domain, 1));
            }
        }
    }

    let min_threshold = 1.0_f32.max(UNDERREPRESENTED_FRACTION * nodes.len() as f32);
    let underrepresented: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| (*count as f32) < min_threshold)
        .map(|(domain, _)| *domain)
        .collect();

    if !underrepresented.is_empty() {
        gaps.push(format!(
            "Need more knowledge in: {}",
            underrepresented.join(", ")
        ));
    }

    gaps
}
