//! HTTP plumbing shared by the generation providers.

use docqa_core::{AppError, AppResult};
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Ceiling for a synchronous generation call, connect phase included.
pub(crate) const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the HTTP client used for generation calls. No retries are layered on top.
pub(crate) fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(GENERATION_TIMEOUT)
        .connect_timeout(GENERATION_TIMEOUT)
        .build()
        .map_err(|e| AppError::Generation(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a failed `send()`.
///
/// Only failures to establish the connection (refused, unresolvable host,
/// connect timeout) count as unreachable. A timeout while waiting for the
/// response is a real generation failure.
pub(crate) fn classify_send_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_connect() {
        AppError::GenerationUnreachable(format!("{} is not reachable: {}", provider, err))
    } else {
        AppError::Generation(format!("Failed to send request to {}: {}", provider, err))
    }
}

/// Turn a non-success status into the matching error.
///
/// 401/403 mean the credential was rejected, which is treated like a
/// missing credential.
pub(crate) async fn check_status(provider: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::GenerationUnreachable(
            format!("{} rejected the credentials ({}): {}", provider, status, error_text),
        )),
        _ => Err(AppError::Generation(format!(
            "{} API error ({}): {}",
            provider, status, error_text
        ))),
    }
}
