//! Retrieval-augmented question answering over ingested documents.
//!
//! Documents are extracted, chunked, embedded and appended to a vector
//! store. Queries are embedded, matched against the store, and the nearest
//! chunks are handed to a generation provider as context.
//!
//! # Example
//! ```no_run
//! use docqa_core::AppConfig;
//! use docqa_knowledge::{KnowledgeSettings, RagPipeline};
//!
//! # async fn example() -> docqa_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let pipeline = RagPipeline::new(KnowledgeSettings::from_app_config(&config)?);
//!
//! pipeline.ingest_document(b"The quick brown fox jumps.", "fox.txt").await?;
//! let answer = pipeline.query("What does the fox do?", 5).await?;
//! println!("{}", answer.answer);
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod generator;
pub mod ingest;
pub mod parser;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{GenerationSettings, KnowledgeSettings};
pub use embeddings::{EmbeddingConfig, EmbeddingGateway, EmbeddingProvider};
pub use generator::Generator;
pub use pipeline::{RagPipeline, DEFAULT_TOP_K, MAX_TOP_K};
pub use store::{open_store, StoreBackend, VectorStore};
pub use types::{IngestFailure, IngestReport, QueryAnswer, SearchHit};
