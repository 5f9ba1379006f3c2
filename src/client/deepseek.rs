//! DeepSeek (OpenAI-compatible) chat-completions client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{sse_chunks, BackendError, ChatBackend, ChunkStream};
use crate::config::Config;
use crate::models::{ChatCompletion, ChatRequest};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// Longest error body carried into an error message
const MAX_ERROR_BODY: usize = 512;

/// Client for `POST {base_url}/chat/completions`
#[derive(Debug)]
pub struct DeepSeekClient {
    http: HttpClient,
    endpoint: String,
    api_key: SecretString,
    retry: RetryConfig,
}

impl DeepSeekClient {
    /// Create a client from the server configuration
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let http = HttpClient::new()?;
        Ok(Self::with_http_client(http, config))
    }

    /// Create a client on top of an existing HTTP client
    pub fn with_http_client(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            endpoint: chat_endpoint(&config.base_url),
            api_key: SecretString::from(config.api_key.expose_secret().to_string()),
            retry: RetryConfig::transport(config.max_retries),
        }
    }

    /// Override the retry configuration
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the request, retrying transient failures, and return a successful response
    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, BackendError> {
        with_retry(self.retry, || async move {
            let response = self
                .http
                .client()
                .post(&self.endpoint)
                .bearer_auth(self.api_key.expose_secret())
                .json(request)
                .send()
                .await?;
            check_status(response).await
        })
        .await
    }
}

#[async_trait]
impl ChatBackend for DeepSeekClient {
    fn id(&self) -> &str {
        "deepseek"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, BackendError> {
        let response = self.send(request).await?;
        Ok(sse_chunks(response.bytes_stream()))
    }
}

/// `{base_url}/chat/completions`, tolerating a trailing slash
pub fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}

/// Map non-success statuses onto [`BackendError`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return Err(BackendError::RateLimit(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Prefer the API's `error.message`, else the (truncated) raw body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        None => body.trim().chars().take(MAX_ERROR_BODY).collect(),
    }
}
