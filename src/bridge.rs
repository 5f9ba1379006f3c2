//! The reasoning bridge: one prompt in, one reasoning trace out.
//!
//! A call moves through `Init -> RequestSent -> Receiving* -> Completed`, or
//! ends in `TimedOut` / `Failed`. Every terminal state maps to a
//! [`ReasoningOutcome`]; nothing escapes as an error.
//!
//! The whole call is bounded by [`Config::timeout`]. When the deadline hits,
//! the in-flight request is dropped and the call returns
//! [`ReasoningOutcome::TimedOut`]. Dropping the future returned by
//! [`ReasoningBridge::invoke`] cancels the request as well.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;

use crate::client::{BackendError, ChatBackend, DeepSeekClient};
use crate::config::Config;
use crate::models::{CallMode, ChatRequest, ReasoningOutcome};

/// Receives human-readable progress messages while a call runs
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Init,
    RequestSent,
    Receiving,
    Completed,
    TimedOut,
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Init => "init",
            CallState::RequestSent => "request_sent",
            CallState::Receiving => "receiving",
            CallState::Completed => "completed",
            CallState::TimedOut => "timed_out",
            CallState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Forwards prompts to the reasoning model and extracts its reasoning trace
#[derive(Debug, Clone)]
pub struct ReasoningBridge {
    config: Arc<Config>,
    backend: Arc<dyn ChatBackend>,
}

impl ReasoningBridge {
    /// Create a bridge over an explicit backend
    pub fn new(config: Arc<Config>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { config, backend }
    }

    /// Create a bridge talking to the configured DeepSeek endpoint
    pub fn from_config(config: Arc<Config>) -> Result<Self, BackendError> {
        let client = DeepSeekClient::new(&config)?;
        tracing::debug!("Using chat endpoint {}", client.endpoint());
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one reasoning call
    pub async fn invoke(&self, prompt: &str) -> ReasoningOutcome {
        self.invoke_with_progress(prompt, None).await
    }

    /// Run one reasoning call, reporting start and finish to `progress`
    pub async fn invoke_with_progress(
        &self,
        prompt: &str,
        progress: Option<&dyn ProgressReporter>,
    ) -> ReasoningOutcome {
        let config = &self.config;
        transition(CallState::Init);
        tracing::info!(
            "Reasoning call: model={} mode={} backend={} prompt_chars={}",
            config.model_name,
            config.mode,
            self.backend.id(),
            prompt.chars().count()
        );

        if let Some(progress) = progress {
            progress
                .report(&format!("Starting reasoning with {}...", config.model_name))
                .await;
        }

        let outcome = match timeout(config.timeout, self.request_reasoning(prompt)).await {
            Ok(Ok(reasoning)) => {
                transition(CallState::Completed);
                ReasoningOutcome::from_reasoning(reasoning)
            }
            Ok(Err(e)) => {
                transition(CallState::Failed);
                tracing::error!("Reasoning request failed: {}", e);
                ReasoningOutcome::Failed(e.to_string())
            }
            Err(_) => {
                transition(CallState::TimedOut);
                tracing::warn!("Reasoning request timed out after {:?}", config.timeout);
                ReasoningOutcome::TimedOut
            }
        };

        if let Some(progress) = progress {
            let message = match &outcome {
                ReasoningOutcome::Reasoning(_) | ReasoningOutcome::Empty => "Reasoning completed",
                ReasoningOutcome::TimedOut => "Reasoning timed out",
                ReasoningOutcome::Failed(_) => "Reasoning failed",
            };
            progress.report(message).await;
        }

        outcome
    }

    async fn request_reasoning(&self, prompt: &str) -> Result<String, BackendError> {
        let config = &self.config;
        let request = ChatRequest::single_prompt(
            &config.model_name,
            prompt,
            config.max_tokens,
            config.mode.is_streaming(),
        );

        match config.mode {
            CallMode::Streaming => self.stream_reasoning(&request).await,
            CallMode::SingleShot => self.single_shot_reasoning(&request).await,
        }
    }

    /// Concatenate reasoning fragments in arrival order
    async fn stream_reasoning(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let mut chunks = self.backend.stream(request).await?;
        transition(CallState::RequestSent);

        let mut reasoning = String::new();
        let mut fragments = 0usize;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if let Some(fragment) = chunk.reasoning_delta().filter(|f| !f.is_empty()) {
                if fragments == 0 {
                    transition(CallState::Receiving);
                }
                tracing::debug!("{}", fragment);
                reasoning.push_str(fragment);
                fragments += 1;
            }
        }

        tracing::debug!(
            "Stream finished: {} fragments, {} chars",
            fragments,
            reasoning.len()
        );
        Ok(reasoning)
    }

    /// Read the reasoning field of a single complete response
    async fn single_shot_reasoning(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let completion = self.backend.complete(request).await?;
        transition(CallState::RequestSent);

        match completion.reasoning_content() {
            Some(reasoning) => {
                tracing::debug!("{}", reasoning);
                Ok(reasoning.to_string())
            }
            None => {
                tracing::debug!("Response carried no reasoning_content");
                Ok(String::new())
            }
        }
    }
}

fn transition(state: CallState) {
    tracing::debug!(state = %state, "reasoning call state");
}
