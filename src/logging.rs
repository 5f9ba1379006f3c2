//! Tracing subscriber setup.
//!
//! Logs go to stderr (stdout carries the MCP stdio transport) and to
//! `server.log` in the configured log directory, rewritten on every run.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

/// Map a Python-style level name onto a tracing filter directive
///
/// Unknown names fall back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" | "NONE" => "off",
        _ => "info",
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise the given level for this crate
pub fn env_filter(level: &str) -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(format!("mcp_server_deepseek={}", level_directive(level))),
    }
}

/// Truncate (or create) the log file, creating its directory if needed
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    File::create(path)
}

/// Install the global subscriber
///
/// `level_override` replaces the configured level (used by `-v` / `-q`).
/// If the log file cannot be opened, logging continues on stderr only.
pub fn init(config: &Config, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&config.log_level);
    let log_path = config.log_file();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter(level));

    match open_log_file(&log_path) {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter(level));

            tracing_subscriber::registry()
                .with(console)
                .with(file_layer)
                .init();

            tracing::debug!("Logging to {}", log_path.display());
        }
        Err(e) => {
            tracing_subscriber::registry().with(console).init();
            tracing::warn!(
                "Could not open log file {}: {}; logging to stderr only",
                log_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("verbose"), "info");
    }

    #[test]
    fn test_open_log_file_creates_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("server.log");

        let _file = open_log_file(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_open_log_file_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.log");
        std::fs::write(&path, "previous run").unwrap();

        let _file = open_log_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
