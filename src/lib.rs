//! # mcp-server-deepseek
//!
//! A Model Context Protocol (MCP) server that lets a client model borrow
//! DeepSeek-R1's reasoning. The client sends a prompt; the server asks the
//! reasoning model, keeps only its chain of thought, and returns it wrapped in
//! `<thinking>` tags.
//!
//! ## Architecture
//!
//! - [`bridge`]: The reasoning call (deadline, streaming or single-shot, outcome mapping)
//! - [`client`]: Chat-completions backends (DeepSeek HTTP client, SSE decoding, mock)
//! - [`mcp`]: MCP tool and prompt registration, server transports
//! - [`models`]: Wire types and reasoning outcomes
//! - [`config`]: Configuration from environment, `.env` and config file
//! - [`logging`]: Console and log-file tracing setup
//! - [`utils`]: HTTP client and retry helpers

pub mod bridge;
pub mod client;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use bridge::{ProgressReporter, ReasoningBridge};
pub use client::{BackendError, ChatBackend, DeepSeekClient};
pub use config::Config;
pub use models::{CallMode, ReasoningOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
