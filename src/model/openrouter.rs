//! OpenRouter-backed remote model.
//!
//! OpenRouter exposes many hosted models behind a single chat-completions
//! endpoint, which keeps the benchmark's remote configuration down to one
//! API key. Transport, auth, and quota failures surface as typed
//! [`BackendError`]s so the coordinator can record them per request;
//! transient failures are retried here with exponential backoff before the
//! error is reported.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationOptions, ModelBackend};
use crate::error::BackendError;

/// Default OpenRouter API endpoint.
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Maximum number of retry attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// System prompt sent with every generation request.
const SYSTEM_PROMPT: &str =
    "You are an expert programmer. Generate clean, efficient code for the given \
     requirement. Return only the code without explanations.";

/// Remote backend that generates code through the OpenRouter API.
pub struct OpenRouterBackend {
    /// HTTP client for API requests.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API.
    base_url: String,
    /// Hosted model identifier (e.g. "anthropic/claude-3-opus").
    model: String,
    /// Matches Markdown code fences in returned completions.
    fence_pattern: Regex,
}

impl OpenRouterBackend {
    /// Creates a backend for the given hosted model.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenRouter API key
    /// * `model` - Hosted model identifier (e.g. "anthropic/claude-3-opus")
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, OPENROUTER_BASE_URL.to_string())
    }

    /// Creates a backend against a custom base URL.
    ///
    /// Useful for tests and OpenRouter-compatible proxies.
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key,
            base_url,
            model,
            fence_pattern: Regex::new(r"(?m)^```[a-zA-Z]*\s*$")
                .expect("invalid fence pattern"),
        }
    }

    /// Returns the hosted model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Strips Markdown code fences from a completion.
    ///
    /// Hosted models frequently wrap code in ```lang fences even when asked
    /// not to; the benchmark scores raw code.
    fn clean_completion(&self, completion: &str) -> String {
        self.fence_pattern.replace_all(completion, "").trim().to_string()
    }

    /// Executes a request with exponential backoff on transient failures.
    async fn execute_with_retry(&self, request: &ApiRequest) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = BASE_RETRY_DELAY_MS * (1 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay_ms,
                    model = %self.model,
                    "Retrying OpenRouter request after transient failure"
                );
            }

            match self.execute_request(&url, request).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if is_transient(&err) {
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err,
                            "Transient error, will retry"
                        );
                        last_error = Some(err);
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BackendError::RequestFailed("Max retries exceeded with no error captured".to_string())
        }))
    }

    /// Executes a single request without retry logic.
    async fn execute_request(
        &self,
        url: &str,
        request: &ApiRequest,
    ) -> Result<String, BackendError> {
        let http_response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "promptbench")
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if code == 429 {
                    return Err(BackendError::RateLimited(parsed.error.message));
                }
                return Err(BackendError::Api {
                    code,
                    message: parsed.error.message,
                });
            }

            return Err(BackendError::Api {
                code,
                message: error_text,
            });
        }

        let response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(format!("Failed to parse API response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                BackendError::MalformedCompletion("response contained no choices".to_string())
            })?;

        Ok(self.clean_completion(&content))
    }
}

#[async_trait]
impl ModelBackend for OpenRouterBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        let request = ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ApiMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        self.execute_with_retry(&request).await
    }

    async fn shutdown(&self) -> Result<(), BackendError> {
        // The HTTP client holds no heavy state; connections close on drop.
        Ok(())
    }
}

/// Checks if an error is transient and worth retrying.
fn is_transient(err: &BackendError) -> bool {
    match err {
        BackendError::RateLimited(_) | BackendError::RequestFailed(_) => true,
        BackendError::Api { code, .. } => *code >= 500,
        _ => false,
    }
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f64,
}

/// A single chat message.
#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

/// Structured error envelope returned by the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenRouterBackend {
        OpenRouterBackend::new("test-key".to_string(), "test/model".to_string())
    }

    #[test]
    fn clean_completion_strips_fences() {
        let b = backend();
        let fenced = "```java\npublic class A {}\n```";
        assert_eq!(b.clean_completion(fenced), "public class A {}");
    }

    #[test]
    fn clean_completion_leaves_plain_code_alone() {
        let b = backend();
        let plain = "int x = nums[0] * 3;";
        assert_eq!(b.clean_completion(plain), plain);
    }

    #[test]
    fn transient_classification() {
        assert!(is_transient(&BackendError::RateLimited("slow down".into())));
        assert!(is_transient(&BackendError::RequestFailed("reset".into())));
        assert!(is_transient(&BackendError::Api {
            code: 503,
            message: "unavailable".into()
        }));
        assert!(!is_transient(&BackendError::Api {
            code: 401,
            message: "bad key".into()
        }));
        assert!(!is_transient(&BackendError::ParseError("garbage".into())));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_request_failure() {
        // Port 1 on loopback refuses the connection immediately.
        let b = OpenRouterBackend::with_base_url(
            "key".to_string(),
            "test/model".to_string(),
            "http://127.0.0.1:1".to_string(),
        );
        let err = b
            .generate("write code", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::RequestFailed(_)));
    }
}
