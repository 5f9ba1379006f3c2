//! Utility modules supporting the API client.
//!
//! - [`HttpClient`]: shared reqwest client with the crate's user agent and timeouts
//! - [`RetryConfig`]: configuration for retry logic with exponential backoff
//! - [`with_retry`]: execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use mcp_server_deepseek::client::BackendError;
//! use mcp_server_deepseek::utils::{with_retry, RetryConfig};
//!
//! # async fn send() -> Result<String, BackendError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), BackendError> {
//! let config = RetryConfig::transport(3);
//! let body = with_retry(config, || send()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::{HttpClient, USER_AGENT};
pub use retry::{with_retry, RetryConfig, TransientError};
