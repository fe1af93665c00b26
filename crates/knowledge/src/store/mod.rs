//! Vector store abstraction.
//!
//! A store keeps chunk texts and their embeddings in lockstep and answers
//! nearest-neighbour queries. The backend is chosen once from configuration
//! and opened through [`open_store`].

pub mod flat;
pub mod lancedb;

pub use self::flat::FlatIndex;
pub use self::lancedb::LanceDbStore;

use crate::types::SearchHit;
use docqa_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Storage backends for chunk vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process flat index persisted to `index.bin` + `metadata.txt`
    Flat,
    /// Embedded LanceDB collection
    Collection,
}

impl StoreBackend {
    /// Parse a configured backend name.
    pub fn parse(name: &str) -> AppResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "flat" | "faiss" => Ok(Self::Flat),
            "collection" | "lancedb" | "chroma" => Ok(Self::Collection),
            other => Err(AppError::Config(format!(
                "Unknown vector store backend: '{}'. Supported: flat, collection",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Collection => "collection",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only store of embedded chunks.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Append chunks with their embeddings, persisting before returning.
    ///
    /// An empty batch is a no-op. A batch whose lengths disagree or whose
    /// vectors do not match the store's dimension is rejected as a whole.
    async fn add(&self, texts: &[String], vectors: &[Vec<f32>]) -> AppResult<()>;

    /// Up to `top_k` stored chunks nearest to `query`, nearest first.
    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>>;

    /// Number of stored chunks.
    async fn len(&self) -> AppResult<usize>;

    async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }

    fn backend(&self) -> StoreBackend;
}

/// Open the configured backend at `path`.
pub async fn open_store(backend: StoreBackend, path: &Path) -> AppResult<Arc<dyn VectorStore>> {
    tracing::info!("Opening {} vector store at {:?}", backend, path);

    match backend {
        StoreBackend::Flat => Ok(Arc::new(FlatIndex::open(path).await?)),
        StoreBackend::Collection => Ok(Arc::new(LanceDbStore::open(path).await?)),
    }
}

/// Check an `add` batch and return its common dimension, or `None` when
/// the batch is empty.
pub(crate) fn batch_dimension(texts: &[String], vectors: &[Vec<f32>]) -> AppResult<Option<usize>> {
    if texts.len() != vectors.len() {
        return Err(AppError::Store(format!(
            "Got {} texts but {} vectors",
            texts.len(),
            vectors.len()
        )));
    }

    let Some(first) = vectors.first() else {
        return Ok(None);
    };

    let dim = first.len();
    if dim == 0 {
        return Err(AppError::Store("Cannot store zero-length vectors".to_string()));
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(AppError::Store(format!(
            "Mixed vector dimensions in batch: {} and {}",
            dim,
            bad.len()
        )));
    }

    Ok(Some(dim))
}

/// Reject vectors whose dimension differs from the store's.
pub(crate) fn check_dimension(expected: usize, actual: usize) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::Store(format!(
            "Embedding dimension mismatch: store has {}, got {}",
            expected, actual
        )));
    }
    Ok(())
}
