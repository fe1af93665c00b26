//! OpenAI chat completions provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http::{build_http_client, check_status, classify_send_error};
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI LLM client.
///
/// A client can be built without an API key; every completion then reports
/// the provider as unreachable instead of sending a request.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: Option<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_OPENAI_URL, api_key)
    }

    /// Create a client against a custom (OpenAI-compatible) endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client: build_http_client()?,
        })
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::GenerationUnreachable("OpenAI API key is not configured".to_string())
        })?;

        tracing::info!("Sending chat completion request to OpenAI");
        tracing::debug!("Request model: {}", request.model);

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| classify_send_error("OpenAI", e))?;

        let response = check_status("OpenAI", response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = chat.choices.into_iter().next().ok_or_else(|| {
            AppError::Generation("OpenAI response contained no choices".to_string())
        })?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        tracing::info!("Received completion from OpenAI");

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: chat.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_missing_key_is_unreachable() {
        let client = OpenAiClient::new(None).unwrap();
        let err = client
            .complete(&LlmRequest::new("q", "gpt-4o-mini"))
            .await
            .unwrap_err();
        assert!(err.is_unreachable());

        let blank = OpenAiClient::new(Some("   ".to_string())).unwrap();
        assert!(blank.api_key.is_none());
    }

    #[test]
    fn test_chat_request_includes_system_first() {
        let client = OpenAiClient::new(Some("sk".to_string())).unwrap();
        let request = LlmRequest::new("question", "gpt-4o-mini").with_system("rules");
        let chat = client.to_chat_request(&request);

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "question");
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [
                    { "index": 0, "message": { "role": "assistant", "content": "42" } }
                ],
                "usage": { "prompt_tokens": 20, "completion_tokens": 1, "total_tokens": 21 }
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(server.uri(), Some("sk-test".to_string())).unwrap();
        let response = client
            .complete(&LlmRequest::new("meaning of life?", "gpt-4o-mini"))
            .await
            .unwrap();

        assert_eq!(response.content, "42");
        assert_eq!(response.usage, LlmUsage::new(20, 1));
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "content": null } } ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(server.uri(), Some("sk".to_string())).unwrap();
        let response = client
            .complete(&LlmRequest::new("q", "gpt-4o-mini"))
            .await
            .unwrap();
        assert_eq!(response.content, "");
    }

    #[tokio::test]
    async fn test_rate_limit_is_fatal_and_bad_key_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer revoked"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let limited = OpenAiClient::with_base_url(server.uri(), Some("limited".to_string())).unwrap();
        let err = limited
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));

        let revoked = OpenAiClient::with_base_url(server.uri(), Some("revoked".to_string())).unwrap();
        let err = revoked
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }
}
