//! Document ingestion: extract, chunk, embed, store.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingGateway;
use crate::parser::{extract_text, ContentType};
use crate::store::VectorStore;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

pub struct Ingestor {
    embeddings: Arc<EmbeddingGateway>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(embeddings: Arc<EmbeddingGateway>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    /// Index one document and return the number of chunks handed to the
    /// store.
    ///
    /// Nothing is embedded or stored for a document with no extractable
    /// text; that case is `AppError::EmptyDocument`.
    pub async fn ingest_document(&self, content: &[u8], filename: &str) -> AppResult<usize> {
        let content_type = ContentType::from_filename(filename);
        tracing::debug!(
            "Ingesting {} ({} bytes, {})",
            filename,
            content.len(),
            content_type.as_str()
        );

        let text = extract_text(content, filename)?;
        if text.trim().is_empty() {
            return Err(AppError::EmptyDocument(filename.to_string()));
        }

        let chunks = chunk_text(&text);
        if chunks.is_empty() {
            return Err(AppError::EmptyDocument(filename.to_string()));
        }

        let vectors = self.embeddings.embed(&chunks).await?;
        self.store.add(&chunks, &vectors).await?;

        tracing::info!("Ingested {} as {} chunks", filename, chunks.len());
        Ok(chunks.len())
    }
}
