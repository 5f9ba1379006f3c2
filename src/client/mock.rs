//! Mock backend for testing purposes.

use async_trait::async_trait;
use futures_util::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{BackendError, ChatBackend, ChunkStream};
use crate::models::{
    AssistantMessage, ChatChunk, ChatCompletion, ChatRequest, ChunkChoice, CompletionChoice,
    Delta, Role,
};

/// A mock backend that returns scripted responses.
///
/// Without any script it answers with an empty completion / empty stream.
#[derive(Debug, Default)]
pub struct MockBackend {
    completion: ChatCompletion,
    chunks: Vec<ChatChunk>,
    failure: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with this reasoning text in both modes (one chunk when streaming).
    pub fn with_reasoning(self, reasoning: &str) -> Self {
        self.with_fragments(&[reasoning]).with_completion(completion_with(reasoning))
    }

    /// Stream these reasoning fragments, one chunk each.
    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.chunks = fragments.iter().map(|f| reasoning_chunk(f)).collect();
        self
    }

    /// Stream exactly these chunks.
    pub fn with_chunks(mut self, chunks: Vec<ChatChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Return this completion in single-shot mode.
    pub fn with_completion(mut self, completion: ChatCompletion) -> Self {
        self.completion = completion;
        self
    }

    /// Fail every call with a network error carrying this message.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }

    async fn receive(&self, request: &ChatRequest) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.failure {
            Some(message) => Err(BackendError::Network(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn id(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        self.receive(request).await?;
        Ok(self.completion.clone())
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, BackendError> {
        self.receive(request).await?;
        let chunks: Vec<Result<ChatChunk, BackendError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// A streamed chunk carrying one reasoning fragment.
pub fn reasoning_chunk(fragment: &str) -> ChatChunk {
    ChatChunk {
        choices: vec![ChunkChoice {
            delta: Delta {
                content: None,
                reasoning_content: Some(fragment.to_string()),
            },
            finish_reason: None,
        }],
    }
}

fn completion_with(reasoning: &str) -> ChatCompletion {
    ChatCompletion {
        choices: vec![CompletionChoice {
            message: Some(AssistantMessage {
                role: Some(Role::Assistant),
                content: Some(String::new()),
                reasoning_content: Some(reasoning.to_string()),
            }),
            finish_reason: Some("length".to_string()),
        }],
    }
}
