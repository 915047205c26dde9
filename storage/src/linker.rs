use noema_core::model::{KnowledgeNode, NodeKind, Relation};

/// Similarity must be strictly above this for an edge to materialize.
pub const LINK_THRESHOLD: f32 = 0.7;

/// Cosine similarity of two vectors. `None` on dimension mismatch or empty
/// input; a zero-magnitude vector yields `Some(0.0)` so callers never see
/// NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some(dot / (norm_a * norm_b))
}

/// Relationship label for a new edge, decided by the endpoint kinds.
/// Evaluation order is fixed: same kind, then document/concept, then
/// concept/entity, then the catch-all.
pub fn infer_relation(a: NodeKind, b: NodeKind) -> Relation {
    use NodeKind::{Concept, Document, Entity};

    if a == b {
        return Relation::SimilarTo;
    }
    match (a, b) {
        (Document, Concept) | (Concept, Document) => Relation::Contains,
        (Concept, Entity) | (Entity, Concept) => Relation::RelatesTo,
        _ => Relation::ConnectedTo,
    }
}

/// Scan existing nodes for link candidates against a freshly embedded node.
/// Nodes without an embedding are skipped silently; each visited node can
/// contribute at most one candidate, so no deduplication is needed.
pub fn link_candidates<'a>(
    embedding: &[f32],
    others: impl Iterator<Item = &'a KnowledgeNode>,
) -> Vec<(u64, f32)> {
    others
        .filter_map(|other| {
            let other_embedding = other.embedding.as_deref()?;
            let similarity = cosine_similarity(embedding, other_embedding)?;
            (similarity > LINK_THRESHOLD).then_some((other.id, similarity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use noema_core::model::NodeMetadata;

    fn node_with_embedding(id: u64, embedding: Option<Vec<f32>>) -> KnowledgeNode {
        KnowledgeNode {
            id,
            label: String::new(),
            kind: NodeKind::Concept,
            content: String::new(),
            embedding,
            connections: Vec::new(),
            weight: 1.0,
            created_at_ms: 0,
            metadata: NodeMetadata::default(),
        }
    }

    #[test]
    fn self_similarity_is_one() {
        let e = vec![0.3, -0.5, 0.8];
        let sim = cosine_similarity(&e, &e).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_magnitude_yields_zero_not_nan() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn dimension_mismatch_yields_none() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0]).is_none());
        assert!(cosine_similarity(&[], &[]).is_none());
    }

    #[test]
    fn threshold_is_strict() {
        // An exact-threshold similarity never links; anything above does.
        assert!(!(LINK_THRESHOLD > LINK_THRESHOLD));
        assert!(0.700_000_1_f32 > LINK_THRESHOLD);
    }

    #[test]
    fn candidates_above_threshold_only() {
        let close = node_with_embedding(1, Some(vec![1.0, 1.0])); // cos ≈ 0.707
        let far = node_with_embedding(2, Some(vec![0.6, 0.8])); // cos = 0.6
        let unembedded = node_with_embedding(3, None);
        let nodes = [close, far, unembedded];

        let candidates = link_candidates(&[1.0, 0.0], nodes.iter());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, 1);
        assert!(candidates[0].1 > LINK_THRESHOLD);
    }

    #[test]
    fn relation_rule_order() {
        use NodeKind::*;
        assert_eq!(infer_relation(Concept, Concept), Relation::SimilarTo);
        assert_eq!(infer_relation(Document, Document), Relation::SimilarTo);
        assert_eq!(infer_relation(Document, Concept), Relation::Contains);
        assert_eq!(infer_relation(Concept, Document), Relation::Contains);
        assert_eq!(infer_relation(Concept, Entity), Relation::RelatesTo);
        assert_eq!(infer_relation(Entity, Concept), Relation::RelatesTo);
        assert_eq!(infer_relation(Document, Query), Relation::ConnectedTo);
        assert_eq!(infer_relation(Entity, Query), Relation::ConnectedTo);
    }
}
