//! Pipeline orchestrator: the entry point for ingestion and queries.

use crate::config::KnowledgeSettings;
use crate::embeddings::EmbeddingGateway;
use crate::generator::Generator;
use crate::ingest::Ingestor;
use crate::retriever::Retriever;
use crate::store::{open_store, VectorStore};
use crate::types::{IngestFailure, IngestReport, QueryAnswer};
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 20;

/// Answer returned when retrieval finds nothing.
pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found.";

/// Retrieval-augmented question answering over one vector store.
///
/// The store and the embedding provider are created on first use and
/// shared by every call on this pipeline.
pub struct RagPipeline {
    settings: KnowledgeSettings,
    store: OnceCell<Arc<dyn VectorStore>>,
    embeddings: Arc<EmbeddingGateway>,
    generator: Generator,
}

impl RagPipeline {
    pub fn new(settings: KnowledgeSettings) -> Self {
        let embeddings = Arc::new(EmbeddingGateway::new(settings.embedding.clone()));
        let generator = Generator::new(settings.generation.clone());
        Self {
            settings,
            store: OnceCell::new(),
            embeddings,
            generator,
        }
    }

    /// Build a pipeline from ready-made components.
    pub fn with_components(
        settings: KnowledgeSettings,
        store: Arc<dyn VectorStore>,
        embeddings: Arc<EmbeddingGateway>,
        generator: Generator,
    ) -> Self {
        Self {
            settings,
            store: OnceCell::new_with(Some(store)),
            embeddings,
            generator,
        }
    }

    pub fn settings(&self) -> &KnowledgeSettings {
        &self.settings
    }

    pub(crate) async fn store(&self) -> AppResult<Arc<dyn VectorStore>> {
        let store = self
            .store
            .get_or_try_init(|| open_store(self.settings.store_backend, &self.settings.store_path))
            .await?;
        Ok(Arc::clone(store))
    }

    /// Answer `query` from the `top_k` nearest chunks.
    pub async fn query(&self, query: &str, top_k: usize) -> AppResult<QueryAnswer> {
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(AppError::InvalidRequest(format!(
                "top_k must be between 1 and {}, got {}",
                MAX_TOP_K, top_k
            )));
        }

        let retriever = Retriever::new(Arc::clone(&self.embeddings), self.store().await?);
        let hits = retriever.retrieve(query, top_k).await?;

        if hits.is_empty() {
            tracing::info!("No documents matched the query");
            return Ok(QueryAnswer {
                answer: NO_DOCUMENTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let sources: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        let answer = self.generator.generate(query, &sources).await?;

        Ok(QueryAnswer { answer, sources })
    }

    /// Ingest one document, returning the number of chunks added.
    pub async fn ingest_document(&self, content: &[u8], filename: &str) -> AppResult<usize> {
        let ingestor = Ingestor::new(Arc::clone(&self.embeddings), self.store().await?);
        ingestor.ingest_document(content, filename).await
    }

    /// Ingest documents in order. A failing file is recorded in the report
    /// and does not stop the rest.
    pub async fn ingest_batch(&self, files: Vec<(String, Vec<u8>)>) -> IngestReport {
        let mut report = IngestReport::default();

        for (filename, content) in files {
            match self.ingest_document(&content, &filename).await {
                Ok(added) => {
                    report.chunks_added += added;
                    report.ingested.push(filename);
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {}: {}", filename, e);
                    report.errors.push(IngestFailure {
                        file: filename,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch ingest finished: {} ingested, {} failed, {} chunks",
            report.ingested.len(),
            report.errors.len(),
            report.chunks_added
        );
        report
    }

    /// Number of chunks in the store.
    pub async fn chunk_count(&self) -> AppResult<usize> {
        self.store().await?.len().await
    }
}
