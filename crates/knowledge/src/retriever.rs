//! Query-time retrieval.

use crate::embeddings::EmbeddingGateway;
use crate::store::VectorStore;
use crate::types::SearchHit;
use docqa_core::AppResult;
use std::sync::Arc;

pub struct Retriever {
    embeddings: Arc<EmbeddingGateway>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embeddings: Arc<EmbeddingGateway>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    /// Embed the query and return up to `top_k` nearest chunks.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchHit>> {
        let vector = self.embeddings.embed_single(query).await?;
        let hits = self.store.search(&vector, top_k).await?;

        tracing::debug!("Retrieved {} chunks (requested top-{})", hits.len(), top_k);
        Ok(hits)
    }
}
