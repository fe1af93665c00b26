//! Runtime settings for the knowledge pipeline.

use crate::embeddings::EmbeddingConfig;
use crate::store::StoreBackend;
use docqa_core::{AppConfig, AppResult};
use docqa_llm::ProviderType;
use std::path::{Path, PathBuf};

/// Index file of the flat backend.
pub const FLAT_INDEX_FILE: &str = "index.bin";

/// Chunk manifest of the flat backend.
pub const FLAT_MANIFEST_FILE: &str = "metadata.txt";

/// Everything `RagPipeline` needs, resolved from `AppConfig`.
#[derive(Debug, Clone)]
pub struct KnowledgeSettings {
    pub store_backend: StoreBackend,
    pub store_path: PathBuf,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationSettings,
}

/// Generation provider selection. The provider name is kept as given so an
/// unknown identifier is reported when an answer is first generated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl KnowledgeSettings {
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        let store_backend = StoreBackend::parse(&config.vector_store.backend)?;

        let provider = config.provider.trim().to_lowercase();
        let model = config
            .model
            .clone()
            .or_else(|| ProviderType::parse(&provider).map(|p| p.default_model().to_string()))
            .unwrap_or_default();
        let generation = GenerationSettings {
            model,
            endpoint: config.resolve_endpoint(&provider),
            api_key: config.resolve_api_key(&provider),
            provider,
        };

        Ok(Self {
            store_backend,
            store_path: config.store_path(),
            embedding: EmbeddingConfig::from(&config.embedding),
            generation,
        })
    }
}

/// Path of the flat index file inside a store directory.
pub fn flat_index_path(store_path: &Path) -> PathBuf {
    store_path.join(FLAT_INDEX_FILE)
}

/// Path of the flat chunk manifest inside a store directory.
pub fn flat_manifest_path(store_path: &Path) -> PathBuf {
    store_path.join(FLAT_MANIFEST_FILE)
}
