//! Cross-module tests for the knowledge pipeline.


use crate::config::{GenerationSettings, KnowledgeSettings};
use crate::embeddings::EmbeddingConfig;
use crate::store::StoreBackend;
use docqa_core::AppResult;
use docqa_llm::{LlmClient, LlmRequest, LlmResponse};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generation client that answers with a fixed string and counts calls.
pub(crate) struct CountingClient {
    pub calls: AtomicUsize,
}

impl CountingClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for CountingClient {
    fn provider_name(&self) -> &str {
        "counting"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: "generated answer".to_string(),
            model: request.model.clone(),
            usage: Default::default(),
        })
    }
}

/// A local URL nothing is listening on.
pub(crate) fn refused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Offline settings: trigram embeddings, a generation provider that
/// cannot be reached.
pub(crate) fn offline_settings(store_path: &Path, backend: StoreBackend) -> KnowledgeSettings {
    KnowledgeSettings {
        store_backend: backend,
        store_path: store_path.to_path_buf(),
        embedding: EmbeddingConfig {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 256,
            endpoint: None,
        },
        generation: GenerationSettings {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: Some(refused_endpoint()),
            api_key: None,
        },
    }
}
