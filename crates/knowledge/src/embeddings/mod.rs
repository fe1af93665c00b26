//! Embedding gateway.
//!
//! The configured provider is created on first use and shared for the
//! lifetime of the gateway. Concurrent first calls wait on the same
//! initialization.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct EmbeddingGateway {
    config: EmbeddingConfig,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingGateway {
    /// Create a gateway that loads the configured provider lazily.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    /// Create a gateway around an already constructed provider.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let config = EmbeddingConfig {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
            endpoint: None,
        };
        Self {
            config,
            provider: OnceCell::new_with(Some(provider)),
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Whether the provider has been created yet.
    pub fn is_loaded(&self) -> bool {
        self.provider.initialized()
    }

    async fn provider(&self) -> AppResult<&Arc<dyn EmbeddingProvider>> {
        self.provider
            .get_or_try_init(|| async {
                tracing::info!(
                    "Loading embedding provider '{}' (model: {}, dimensions: {})",
                    self.config.provider,
                    self.config.model,
                    self.config.dimensions
                );
                create_provider(&self.config).await
            })
            .await
    }

    /// Embed texts, returning one vector per input in input order.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.provider().await?;
        let embeddings = provider.embed_batch(texts).await?;

        if embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned {} embeddings for {} texts",
                provider.provider_name(),
                embeddings.len(),
                texts.len()
            )));
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            embeddings.len(),
            provider.dimensions()
        );

        Ok(embeddings)
    }

    pub async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}
