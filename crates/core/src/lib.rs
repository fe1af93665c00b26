//! docqa Core Library
//!
//! This crate provides the foundational utilities shared by the docqa crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, KNOWN_STORE_BACKENDS};
pub use error::{AppError, AppResult};
