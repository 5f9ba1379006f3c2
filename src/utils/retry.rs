//! Retry utilities with exponential backoff for the initial API request.
//!
//! Only the request send is retried. Once a streamed body has started, errors
//! are reported as-is.

use std::time::Duration;
use tokio::time::sleep;

use crate::client::BackendError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retry configuration for a transport allowing `max_retries` extra attempts
    pub fn transport(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// Set the initial delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Backoff delay before attempt `attempt + 1`
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, PartialEq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Rate limit exceeded (with optional retry-after seconds)
    RateLimit(Option<u64>),
    /// Server error (5xx)
    ServerError,
}

impl TransientError {
    /// Check if a BackendError represents a transient error
    pub fn from_backend_error(err: &BackendError) -> Option<Self> {
        match err {
            BackendError::Network(_) => Some(TransientError::Network),
            BackendError::RateLimit(retry_after) => Some(TransientError::RateLimit(*retry_after)),
            BackendError::Api { status, .. } if *status >= 500 => Some(TransientError::ServerError),
            _ => None,
        }
    }

    /// Get the minimum delay for this error
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::RateLimit(Some(seconds)) => Duration::from_secs(*seconds),
            TransientError::RateLimit(None) => Duration::from_secs(5),
            TransientError::Network | TransientError::ServerError => Duration::ZERO,
        }
    }
}

/// Execute an async operation with retry logic
///
/// Permanent errors are returned immediately; transient ones are retried
/// until `config.max_attempts` is reached.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, BackendError>>,
{
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Request succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_backend_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts {
                    tracing::warn!("Request failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                let delay = std::cmp::max(config.backoff(attempts), transient.recommended_delay());
                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
