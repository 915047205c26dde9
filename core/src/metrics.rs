use crate::model::{KnowledgeEdge, KnowledgeNode};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use std::collections::{HashSet, VecDeque};

/// Hard cap on retained metrics snapshots; oldest entries are evicted first.
pub const METRICS_HISTORY_CAP: usize = 100;

/// Value substituted for nodes that carry no confidence in the aggregate.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Point-in-time aggregate over the graph. Immutable once recorded.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct LearningMetrics {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub average_connectivity: f32,
    /// Distinct domains in first-appearance order; nodes without a domain
    /// contribute nothing here.
    pub knowledge_domains: Vec<String>,
    /// Fractional node-count delta against the previous snapshot.
    pub growth_rate: f32,
    pub confidence_score: f32,
    pub recorded_at_ms: u64,
}

/// Pure function of the current node/edge state plus the previous snapshot;
/// recomputation without mutation yields identical values.
pub fn compute(
    nodes: &[KnowledgeNode],
    edges: &[KnowledgeEdge],
    previous: Option<&LearningMetrics>,
    recorded_at_ms: u64,
) -> LearningMetrics {
    let total_nodes = nodes.len() as u64;
    let total_edges = edges.len() as u64;

    let average_connectivity = if total_nodes == 0 {
        0.0
    } else {
        total_edges as f32 / total_nodes as f32
    };

    let mut seen = HashSet::new();
    let mut knowledge_domains = Vec::new();
    for node in nodes {
        if let Some(domain) = &node.metadata.domain {
            if seen.insert(domain.clone()) {
                knowledge_domains.push(domain.clone());
            }
        }
    }

    let growth_rate = match previous {
        Some(prev) => {
            let prev_total = prev.total_nodes;
            (total_nodes as f32 - prev_total as f32) / prev_total.max(1) as f32
        }
        None => 0.0,
    };

    let confidence_score = if nodes.is_empty() {
        FALLBACK_CONFIDENCE
    } else {
        let sum: f32 = nodes
            .iter()
            .map(|node| node.metadata.confidence.unwrap_or(FALLBACK_CONFIDENCE))
            .sum();
        sum / total_nodes as f32
    };

    LearningMetrics {
        total_nodes,
        total_edges,
        average_connectivity,
        knowledge_domains,
        growth_rate,
        confidence_score,
        recorded_at_ms,
    }
}

/// Append-only bounded history of recorded snapshots (FIFO eviction).
#[derive(Debug, Default)]
pub struct MetricsHistory {
    entries: VecDeque<LearningMetrics>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Rebuild from persisted entries, re-applying the cap in case the
    /// snapshot predates the current limit.
    pub fn from_entries(entries: Vec<LearningMetrics>) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.record(entry);
        }
        history
    }

    pub fn record(&mut self, snapshot: LearningMetrics) {
        self.entries.push_back(snapshot);
        while self.entries.len() > METRICS_HISTORY_CAP {
            self.entries.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&LearningMetrics> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<LearningMetrics> {
        self.entries.iter().cloned().collect()
    }
}
