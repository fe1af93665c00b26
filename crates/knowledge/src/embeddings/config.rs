//! Embedding configuration.

use docqa_core::config::EmbeddingSection;
use serde::{Deserialize, Serialize};

/// Settings for the embedding provider behind the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider endpoint, when the provider talks to a server
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

impl From<&EmbeddingSection> for EmbeddingConfig {
    fn from(section: &EmbeddingSection) -> Self {
        Self {
            provider: section.provider.clone(),
            model: section.model.clone(),
            dimensions: section.dimensions,
            endpoint: section.endpoint.clone(),
        }
    }
}
