use noema_core::embedding::{
    deterministic_embedding, DEFAULT_EMBEDDING_DIMS, DEFAULT_EMBEDDING_MODEL_ID,
};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

/// The text-to-vector boundary. Providers may fail per call; the pipeline
/// degrades the affected node rather than aborting ingestion.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbeddingError>>;
}

/// Hash-backed provider: reproducible vectors with no external model.
pub struct DeterministicEmbedder {
    model_id: String,
    dims: usize,
}

impl DeterministicEmbedder {
    pub fn new(model_id: impl Into<String>, dims: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dims: dims.max(1),
        }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_MODEL_ID, DEFAULT_EMBEDDING_DIMS)
    }
}

impl Embedder for DeterministicEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbeddingError>> {
        let text = text.to_string();
        let model_id = self.model_id.clone();
        let dims = self.dims;

        Box::pin(async move { Ok(deterministic_embedding(&text, &model_id, dims)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_embedder_produces_fixed_dimension() {
        let embedder = DeterministicEmbedder::default();
        let vector = embedder.embed("graphs").await.unwrap();
        assert_eq!(vector.len(), DEFAULT_EMBEDDING_DIMS);
    }

    #[tokio::test]
    async fn same_text_same_vector() {
        let embedder = DeterministicEmbedder::new("m1", 16);
        let a = embedder.embed("stable").await.unwrap();
        let b = embedder.embed("stable").await.unwrap();
        assert_eq!(a, b);
    }
}
