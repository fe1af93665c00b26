//! Error types for docqa.
//!
//! One enum covers the whole pipeline. Each variant corresponds to a failure
//! class with its own propagation policy: only `GenerationUnreachable` is
//! recovered locally (by the generator's context-only fallback), everything
//! else bubbles up to whoever called the pipeline.

use thiserror::Error;

/// Unified error type for docqa.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extracted text was empty or whitespace-only. Carries the filename.
    #[error("Empty or unreadable document: {0}")]
    EmptyDocument(String),

    /// The document could not be parsed at all (e.g. a corrupt PDF)
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// Embedding model load or inference failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store persistence or dimension errors
    #[error("Vector store error: {0}")]
    Store(String),

    /// Generation provider could not be reached (connection or credentials)
    #[error("Generation provider unreachable: {0}")]
    GenerationUnreachable(String),

    /// Any other generation provider failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Generation provider identifier is not recognised
    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    /// Caller-supplied arguments out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error means the generation provider could not be reached
    /// at all, as opposed to having answered badly.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, AppError::GenerationUnreachable(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
