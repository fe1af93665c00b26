//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// A stored chunk returned by nearest-neighbour search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk text
    pub text: String,

    /// Distance to the query under the backend's metric (smaller is nearer)
    pub distance: f32,
}

impl SearchHit {
    pub fn new(text: impl Into<String>, distance: f32) -> Self {
        Self {
            text: text.into(),
            distance,
        }
    }
}

/// Answer to a query, with the chunk texts it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,

    /// Retrieved chunk texts, nearest first
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One file that failed during a batch ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of ingesting several files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Files that were indexed, in input order
    #[serde(default)]
    pub ingested: Vec<String>,

    /// Per-file failures
    #[serde(default)]
    pub errors: Vec<IngestFailure>,

    /// Total chunks appended across all ingested files
    #[serde(default)]
    pub chunks_added: usize,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
