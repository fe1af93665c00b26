//! Generation provider crate for docqa.
//!
//! This crate provides a provider-agnostic abstraction for asking a Large
//! Language Model to answer a question. Providers are selected by name
//! through [`create_client`].
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat completions API
//!
//! Errors are classified where the HTTP call is made: failing to reach the
//! provider (refused connection, connect timeout, missing or rejected
//! credentials) yields `AppError::GenerationUnreachable`, anything else
//! yields `AppError::Generation`.
//!
//! # Example
//! ```no_run
//! use docqa_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new()?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
mod http;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
