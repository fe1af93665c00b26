//! LLM provider factory.
//!
//! Resolves a provider identifier to a client implementation.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns `AppError::UnknownProvider` for an unrecognised identifier. A
/// missing OpenAI key is not an error here: the client reports itself
/// unreachable when asked to complete.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let kind = ProviderType::parse(provider)
        .ok_or_else(|| AppError::UnknownProvider(provider.to_string()))?;

    tracing::debug!("Creating {} client (endpoint: {:?})", kind.as_str(), endpoint);

    match kind {
        ProviderType::Ollama => {
            let client = match endpoint {
                Some(url) => OllamaClient::with_base_url(url)?,
                None => OllamaClient::new()?,
            };
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = api_key.map(str::to_string);
            let client = match endpoint {
                Some(url) => OpenAiClient::with_base_url(url, api_key)?,
                None => OpenAiClient::new(api_key)?,
            };
            Ok(Arc::new(client))
        }
    }
}
