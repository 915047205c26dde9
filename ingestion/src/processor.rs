use crate::embedding::{DeterministicEmbedder, Embedder};
use noema_core::config::EngineConfig;
use noema_core::ingest::IngestionRequest;
use noema_core::model::NodeMetadata;
use std::sync::Arc;
use storage::graph::{GraphLimits, GraphStore, NewNode, StoreError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Ingestion orchestration: embed the text, then hand the store one fully
/// prepared node. Linking, metrics recording, and persistence all happen
/// inside the store's insert as one logical operation.
pub struct IngestionPipeline {
    store: Arc<GraphStore>,
    embedder: Box<dyn Embedder>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            embedder: Box::new(DeterministicEmbedder::default()),
        }
    }

    pub fn with_embedder(store: Arc<GraphStore>, embedder: Box<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Wire a store and the default embedder from engine configuration.
    pub async fn from_config(config: &EngineConfig) -> Self {
        let store = GraphStore::open_with_limits(
            &config.storage.data_dir,
            GraphLimits {
                max_nodes: config.graph.max_nodes,
            },
        )
        .await;
        let embedder = DeterministicEmbedder::new(
            config.embedding.model_id.clone(),
            config.embedding.dims,
        );
        Self::with_embedder(Arc::new(store), Box::new(embedder))
    }

    pub fn store(&self) -> Arc<GraphStore> {
        self.store.clone()
    }

    /// Ingest one piece of knowledge and return the new node id. Embedding
    /// failure is not fatal: the node is stored without a vector and simply
    /// never participates in similarity linking.
    pub async fn ingest(&self, request: IngestionRequest) -> Result<u64, IngestionError> {
        let embedding = match self.embedder.embed(&request.content).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(error = %err, "embedding failed, node will be stored without a vector");
                None
            }
        };

        let overrides = NodeMetadata {
            source: request.source,
            confidence: request.confidence,
            domain: request.domain,
        };

        let id = self
            .store
            .insert(
                NewNode {
                    content: request.content,
                    kind: request.kind,
                    embedding,
                    overrides,
                },
            )
            .await?;

        info!(node_id = id, "knowledge ingested");
        Ok(id)
    }
}
