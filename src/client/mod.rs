//! Chat-completion backends.
//!
//! The [`ChatBackend`] trait is the seam between the reasoning bridge and the
//! remote model. [`DeepSeekClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint that returns a `reasoning_content` field;
//! [`MockBackend`] returns scripted responses for tests.

mod deepseek;
mod mock;
mod sse;

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::pin::Pin;

use crate::models::{ChatChunk, ChatCompletion, ChatRequest};

pub use deepseek::DeepSeekClient;
pub use mock::{reasoning_chunk, MockBackend};
pub use sse::{parse_sse_line, sse_chunks, SseBuffer, SseLine};

/// Ordered stream of decoded SSE payloads
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, BackendError>> + Send>>;

/// Trait implemented by every chat-completion backend
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs
    fn id(&self) -> &str;

    /// Issue a non-streaming request and return the full response
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError>;

    /// Issue a streaming request and return its chunks in arrival order
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, BackendError>;
}

/// Errors from a chat backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the API
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded (with optional retry-after seconds)
    #[error("Rate limit exceeded")]
    RateLimit(Option<u64>),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Parse(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}
