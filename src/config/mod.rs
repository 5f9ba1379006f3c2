//! Configuration management.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional config file (TOML, or any format the `config` crate detects from the extension)
//! 3. `MCP_SERVER_DEEPSEEK_*` environment variables, plus `LOG_LEVEL`
//!
//! # Configuration File Format
//!
//! ```toml
//! model_name = "deepseek-reasoner"
//! api_base_url = "https://api.deepseek.com"
//! api_key = "sk-..."
//! log_level = "INFO"
//! timeout_secs = 3600
//! max_retries = 3
//! max_tokens = 1
//! mode = "streaming"
//! log_dir = "/var/log/mcp-server-deepseek"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::models::CallMode;

/// Prefix shared by all server-specific environment variables
pub const ENV_PREFIX: &str = "MCP_SERVER_DEEPSEEK";

/// Log level variable (no prefix, kept for compatibility with existing setups)
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

pub const DEFAULT_MODEL_NAME: &str = "deepseek-reasoner";
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LOG_LEVEL: &str = "DEBUG";
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_TOKENS: u32 = 1;

/// Errors raised while assembling the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Raw layered settings before validation
#[derive(Debug, Default, Deserialize)]
struct Settings {
    model_name: Option<String>,
    api_base_url: Option<String>,
    api_key: Option<String>,
    log_level: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    max_tokens: Option<u32>,
    mode: Option<String>,
    log_dir: Option<PathBuf>,
}

/// Application configuration, immutable once the server starts
pub struct Config {
    /// Model identifier sent with every request
    pub model_name: String,

    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,

    /// Bearer token for the API
    pub api_key: SecretString,

    /// Log level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`)
    pub log_level: String,

    /// Ceiling for one reasoning call, request and all fragments included
    pub timeout: Duration,

    /// Extra attempts for the initial request on transient transport errors
    pub max_retries: u32,

    /// Visible output token budget; reasoning is produced regardless
    pub max_tokens: u32,

    /// Streaming or single-shot request mode
    pub mode: CallMode,

    /// Directory holding `server.log`
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment and an optional config file
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, std::env::vars().collect())
    }

    /// Load configuration using an explicit set of environment variables
    pub fn load_with_env(
        file: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let log_level = env.get(LOG_LEVEL_VAR).cloned();

        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .source(Some(env))
                    .ignore_empty(false),
            )
            .set_override_option("log_level", log_level)?
            .build()?
            .try_deserialize()?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let mode = match settings.mode {
            Some(raw) => raw
                .parse::<CallMode>()
                .map_err(|message| ConfigError::Invalid { key: "mode", message })?,
            None => CallMode::default(),
        };

        let base_url = settings
            .api_base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api_base_url",
                message: "must not be empty".to_string(),
            });
        }

        let timeout_secs = settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            model_name: settings
                .model_name
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            base_url,
            api_key: SecretString::from(settings.api_key.unwrap_or_default()),
            log_level: settings
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: settings.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            max_tokens: settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            mode,
            log_dir: settings.log_dir.unwrap_or_else(default_log_dir),
        })
    }

    /// Override the model name
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = SecretString::from(api_key.into());
        self
    }

    /// Override the call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the transport retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the request mode
    pub fn with_mode(mut self, mode: CallMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether an API key has been configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }

    /// Full path of the per-run log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("server.log")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: SecretString::from(String::new()),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            mode: CallMode::default(),
            log_dir: default_log_dir(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("log_level", &self.log_level)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("max_tokens", &self.max_tokens)
            .field("mode", &self.mode)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

/// `~/.cache/mcp-server-deepseek`, or a temp directory when there is no home
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cache"))
        .unwrap_or_else(std::env::temp_dir)
        .join("mcp-server-deepseek")
}

/// Look for a config file in the user's config directory
pub fn find_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?
        .join("mcp-server-deepseek")
        .join("config.toml");
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::load_with_env(None, HashMap::new()).unwrap();
        assert_eq!(config.model_name, "deepseek-reasoner");
        assert_eq!(config.base_url, "https://api.deepseek.com");
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.timeout, Duration::from_secs(3600));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_tokens, 1);
        assert_eq!(config.mode, CallMode::Streaming);
        assert!(!config.has_api_key());
        assert!(config.log_file().ends_with("mcp-server-deepseek/server.log"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("MCP_SERVER_DEEPSEEK_MODEL_NAME", "deepseek-r1-distill"),
                ("MCP_SERVER_DEEPSEEK_API_BASE_URL", "http://localhost:8080/v1"),
                ("MCP_SERVER_DEEPSEEK_API_KEY", "sk-test"),
                ("MCP_SERVER_DEEPSEEK_TIMEOUT_SECS", "120"),
                ("MCP_SERVER_DEEPSEEK_MODE", "single-shot"),
                ("LOG_LEVEL", "WARNING"),
                ("UNRELATED_VAR", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.model_name, "deepseek-r1-distill");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api_key.expose_secret(), "sk-test");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.mode, CallMode::SingleShot);
        assert_eq!(config.log_level, "WARNING");
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model_name = "from-file"
api_base_url = "http://file.example"
max_retries = 5
log_level = "INFO"
"#,
        )
        .unwrap();

        let config = Config::load_with_env(
            Some(&path),
            env(&[("MCP_SERVER_DEEPSEEK_MODEL_NAME", "from-env")]),
        )
        .unwrap();

        assert_eq!(config.model_name, "from-env");
        assert_eq!(config.base_url, "http://file.example");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.log_level, "INFO");
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let result = Config::load_with_env(None, env(&[("MCP_SERVER_DEEPSEEK_MODE", "batch")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "mode", .. })
        ));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let result = Config::load_with_env(
            None,
            env(&[("MCP_SERVER_DEEPSEEK_TIMEOUT_SECS", "soon")]),
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));

        let result =
            Config::load_with_env(None, env(&[("MCP_SERVER_DEEPSEEK_TIMEOUT_SECS", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_config_file() {
        let path = PathBuf::from("/nonexistent/config.toml");
        assert!(Config::load_with_env(Some(&path), HashMap::new()).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::default().with_api_key("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
