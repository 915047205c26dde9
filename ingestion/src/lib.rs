pub mod embedding;
pub mod processor;

pub use embedding::{Embedder, EmbeddingError};
pub use processor::{IngestionError, IngestionPipeline};
