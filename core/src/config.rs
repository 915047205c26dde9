use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model_id: String,
    pub dims: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GraphConfig {
    /// Optional hard cap on node count. Unset means unbounded growth,
    /// matching the engine's default behavior.
    #[serde(default)]
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("storage.data_dir", "data")?
            .set_default("embedding.model_id", crate::embedding::DEFAULT_EMBEDDING_MODEL_ID)?
            .set_default("embedding.dims", crate::embedding::DEFAULT_EMBEDDING_DIMS as i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("NOEMA").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_config_files() {
        let config = EngineConfig::load().unwrap();
        assert_eq!(config.embedding.dims, crate::embedding::DEFAULT_EMBEDDING_DIMS);
        assert_eq!(
            config.embedding.model_id,
            crate::embedding::DEFAULT_EMBEDDING_MODEL_ID
        );
        assert!(!config.storage.data_dir.is_empty());
        assert_eq!(config.graph.max_nodes, None);
    }
}
