use sha2::{Digest, Sha256};

pub const DEFAULT_EMBEDDING_DIMS: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "embedding-default-v1";

/// Hash-derived embedding, deterministic per (text, model_id) pair.
///
/// Stands in for a real embedding model at the provider boundary; useful as
/// a default provider and for reproducible tests. Each 32-byte digest block
/// is re-seeded with a counter so dimensions beyond 32 stay independent.
pub fn deterministic_embedding(text: &str, model_id: &str, dims: usize) -> Vec<f32> {
    let dims = dims.max(1);

    let mut out = Vec::with_capacity(dims);
    let mut block: u32 = 0;
    while out.len() < dims {
        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(block.to_le_bytes());
        let digest = hasher.finalize();

        for byte in digest {
            if out.len() == dims {
                break;
            }
            out.push((byte as f32 / 127.5) - 1.0);
        }
        block += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproducible_for_same_inputs() {
        let a = deterministic_embedding("knowledge graphs", DEFAULT_EMBEDDING_MODEL_ID, 384);
        let b = deterministic_embedding("knowledge graphs", DEFAULT_EMBEDDING_MODEL_ID, 384);
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
    }

    #[test]
    fn changes_when_model_changes() {
        let a = deterministic_embedding("hello", "embedding-default-v1", 16);
        let b = deterministic_embedding("hello", "embedding-alt-v1", 16);
        assert_ne!(a, b);
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let out = deterministic_embedding("bounds", DEFAULT_EMBEDDING_MODEL_ID, 64);
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn blocks_beyond_digest_size_differ() {
        let out = deterministic_embedding("long", DEFAULT_EMBEDDING_MODEL_ID, 64);
        // A cyclic repeat of the first digest would make these equal.
        assert_ne!(&out[..32], &out[32..64]);
    }
}
