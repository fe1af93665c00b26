//! Answer generation with a context-only fallback.
//!
//! When the generation provider cannot be reached the generator answers
//! with the retrieved context and instructions for bringing a provider up,
//! rather than failing the query.

use crate::config::GenerationSettings;
use docqa_core::AppResult;
use docqa_llm::{create_client, LlmClient, LlmRequest};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const SYSTEM_PROMPT: &str =
    "Answer based only on the provided context. If the context does not contain the answer, say so.";

pub const FALLBACK_PREAMBLE: &str = "LLM is not reachable. For Ollama: start it on your host \
(e.g. `ollama serve` and `ollama pull llama3.2`). Or set the provider to openai and provide an \
API key. Below is the retrieved context only (no generated answer):";

/// Join retrieved chunks into the prompt context.
pub fn build_context(chunks: &[String]) -> String {
    chunks.join("\n\n")
}

/// Answer returned when no provider is reachable.
pub fn fallback_answer(context: &str) -> String {
    format!("{}\n\n---\n\n{}", FALLBACK_PREAMBLE, context)
}

fn user_prompt(query: &str, context: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context, query)
}

pub struct Generator {
    settings: GenerationSettings,
    client: OnceCell<Arc<dyn LlmClient>>,
}

impl Generator {
    /// Create a generator that resolves its provider on first use.
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    /// Create a generator around an existing client.
    pub fn with_client(settings: GenerationSettings, client: Arc<dyn LlmClient>) -> Self {
        Self {
            settings,
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> AppResult<&Arc<dyn LlmClient>> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(
                    "Using generation provider '{}' (model: {})",
                    self.settings.provider,
                    self.settings.model
                );
                create_client(
                    &self.settings.provider,
                    self.settings.endpoint.as_deref(),
                    self.settings.api_key.as_deref(),
                )
            })
            .await
    }

    /// Generate an answer to `query` grounded on `chunks`.
    ///
    /// Only an unreachable provider is turned into the fallback answer;
    /// every other error is returned.
    pub async fn generate(&self, query: &str, chunks: &[String]) -> AppResult<String> {
        let context = build_context(chunks);
        let client = self.client().await?;

        let request = LlmRequest::new(user_prompt(query, &context), &self.settings.model)
            .with_system(SYSTEM_PROMPT);

        match client.complete(&request).await {
            Ok(response) => Ok(response.content),
            Err(e) if e.is_unreachable() => {
                tracing::warn!(
                    "Generation provider '{}' unreachable, returning context only: {}",
                    client.provider_name(),
                    e
                );
                Ok(fallback_answer(&context))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::AppError;
    use docqa_llm::LlmResponse;
    use std::sync::Mutex;

    fn settings(provider: &str) -> GenerationSettings {
        GenerationSettings {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            endpoint: None,
            api_key: None,
        }
    }

    struct RecordingClient {
        reply: fn() -> AppResult<String>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl RecordingClient {
        fn new(reply: fn() -> AppResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            (self.reply)().map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: Default::default(),
            })
        }
    }

    fn chunks() -> Vec<String> {
        vec!["Paris is in France.".to_string(), "Rome is in Italy.".to_string()]
    }

    #[tokio::test]
    async fn test_prompt_shape() {
        let client = RecordingClient::new(|| Ok("Paris.".to_string()));
        let generator = Generator::with_client(settings("ollama"), client.clone());

        let answer = generator
            .generate("Where is Paris?", &chunks())
            .await
            .unwrap();
        assert_eq!(answer, "Paris.");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert_eq!(requests[0].system.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(
            requests[0].prompt,
            "Context:\nParis is in France.\n\nRome is in Italy.\n\nQuestion: Where is Paris?"
        );
    }

    #[tokio::test]
    async fn test_unreachable_falls_back_to_context() {
        let client = RecordingClient::new(|| {
            Err(AppError::GenerationUnreachable("connection refused".to_string()))
        });
        let generator = Generator::with_client(settings("ollama"), client);

        let answer = generator.generate("q", &chunks()).await.unwrap();
        assert!(answer.starts_with("LLM is not reachable."));
        assert!(answer.ends_with("\n\n---\n\nParis is in France.\n\nRome is in Italy."));
        assert_eq!(answer, fallback_answer(&build_context(&chunks())));
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let client =
            RecordingClient::new(|| Err(AppError::Generation("HTTP 500".to_string())));
        let generator = Generator::with_client(settings("openai"), client);

        let err = generator.generate("q", &chunks()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_unknown_provider_surfaces_at_generation() {
        let generator = Generator::new(settings("anthropic"));

        let err = generator.generate("q", &chunks()).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownProvider(ref name) if name == "anthropic"));
    }
}
