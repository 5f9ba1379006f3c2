use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mcp_server_deepseek::bridge::ReasoningBridge;
use mcp_server_deepseek::config::{find_config_file, Config};
use mcp_server_deepseek::logging;
use mcp_server_deepseek::mcp::{render_thinking, McpServer};
use mcp_server_deepseek::models::CallMode;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// mcp-server-deepseek - Borrow DeepSeek-R1's reasoning from any MCP client
#[derive(Parser, Debug)]
#[command(name = "mcp-server-deepseek")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing DeepSeek-R1 reasoning as a thinking tool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    /// Reasoning model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// API base URL (without /chat/completions)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Deadline for one reasoning call, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Request mode
    #[arg(long, value_enum, global = true)]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Request mode for the reasoning call
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Stream reasoning fragments as they are produced
    Streaming,
    /// Wait for one complete response
    SingleShot,
}

impl From<Mode> for CallMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Streaming => CallMode::Streaming,
            Mode::SingleShot => CallMode::SingleShot,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default)
    #[command(alias = "mcp")]
    Serve {
        /// Serve over streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Ask the reasoning model once and print its thinking
    Think {
        /// The prompt to reason about
        prompt: String,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("mcp-server-deepseek - Environment Variables");
    println!();
    println!("API:");
    println!("  MCP_SERVER_DEEPSEEK_API_KEY        Bearer token for the API (default: empty)");
    println!("  MCP_SERVER_DEEPSEEK_API_BASE_URL   API base URL (default: https://api.deepseek.com)");
    println!("  MCP_SERVER_DEEPSEEK_MODEL_NAME     Model name (default: deepseek-reasoner)");
    println!();
    println!("Request:");
    println!("  MCP_SERVER_DEEPSEEK_TIMEOUT_SECS   Deadline for one reasoning call (default: 3600)");
    println!("  MCP_SERVER_DEEPSEEK_MAX_RETRIES    Retries on transient transport errors (default: 3)");
    println!("  MCP_SERVER_DEEPSEEK_MAX_TOKENS     Visible output token budget (default: 1)");
    println!("  MCP_SERVER_DEEPSEEK_MODE           streaming or single-shot (default: streaming)");
    println!();
    println!("Logging:");
    println!("  LOG_LEVEL                          DEBUG, INFO, WARNING, ERROR or CRITICAL (default: DEBUG)");
    println!("  MCP_SERVER_DEEPSEEK_LOG_DIR        Directory for server.log (default: ~/.cache/mcp-server-deepseek)");
    println!("  RUST_LOG                           Tracing filter directives, overrides LOG_LEVEL");
    println!();
    println!("Variables may also be set in a .env file in the working directory.");
    println!();
    println!("Example:");
    println!("  export MCP_SERVER_DEEPSEEK_API_KEY=\"sk-...\"");
    println!("  export LOG_LEVEL=\"INFO\"");
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(mut config: Config, cli: &Cli) -> Result<Config> {
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            anyhow::bail!("--timeout must be greater than zero");
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(mode) = cli.mode {
        config = config.with_mode(mode.into());
    }
    Ok(config)
}

/// Level that replaces the configured one, if any
fn level_override(cli: &Cli) -> Option<&'static str> {
    if cli.quiet {
        return Some("ERROR");
    }
    match cli.verbose {
        0 => None,
        1 => Some("DEBUG"),
        _ => Some("TRACE"),
    }
}

async fn serve(bridge: Arc<ReasoningBridge>, http: bool, host: &str, port: u16) -> Result<()> {
    let server = McpServer::new(bridge)?;

    if http {
        let addr = format!("{}:{}", host, port);
        let (bound_addr, handle) = server.run_http(&addr).await?;
        tracing::info!("MCP server listening on {}", bound_addr);

        tokio::select! {
            result = handle => {
                result.map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
            }
        }
    } else {
        server.run().await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(());
    }

    // Variables already set in the environment win over .env
    let dotenv_path = dotenvy::dotenv().ok();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    let config = apply_overrides(config, &cli)?;

    logging::init(&config, level_override(&cli));

    if let Some(path) = &dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    tracing::debug!("Configuration: {:?}", config);
    if !config.has_api_key() {
        tracing::warn!("MCP_SERVER_DEEPSEEK_API_KEY is not set; the API will likely reject requests");
    }

    let bridge = Arc::new(ReasoningBridge::from_config(Arc::new(config))?);

    match cli.command {
        Some(Commands::Think { prompt }) => {
            let outcome = bridge.invoke(&prompt).await;
            print!("{}", render_thinking(&outcome.into_text()));
        }
        Some(Commands::Serve { http, port, host }) => {
            serve(bridge, http, &host, port).await?;
        }
        None => {
            serve(bridge, false, "127.0.0.1", 3000).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["mcp-server-deepseek"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.env);
        assert!(cli.config.is_none());
        assert!(cli.model.is_none());
        assert!(cli.timeout.is_none());
        assert!(cli.command.is_none());
        assert_eq!(level_override(&cli), None);
    }

    #[test]
    fn test_cli_verbose_and_quiet() {
        let cli = Cli::parse_from(["mcp-server-deepseek", "-v"]);
        assert_eq!(level_override(&cli), Some("DEBUG"));

        let cli = Cli::parse_from(["mcp-server-deepseek", "-vv"]);
        assert_eq!(level_override(&cli), Some("TRACE"));

        let cli = Cli::parse_from(["mcp-server-deepseek", "-v", "--quiet"]);
        assert_eq!(level_override(&cli), Some("ERROR"));
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["mcp-server-deepseek", "serve"]);
        match &cli.command {
            Some(Commands::Serve { http, port, host }) => {
                assert!(!*http);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_http_mode() {
        let cli = Cli::parse_from([
            "mcp-server-deepseek",
            "serve",
            "--http",
            "--port",
            "8080",
            "--host",
            "0.0.0.0",
        ]);
        match &cli.command {
            Some(Commands::Serve { http, port, host }) => {
                assert!(*http);
                assert_eq!(*port, 8080);
                assert_eq!(host, "0.0.0.0");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_think_command() {
        let cli = Cli::parse_from(["mcp-server-deepseek", "think", "2+2=?"]);
        match &cli.command {
            Some(Commands::Think { prompt }) => assert_eq!(prompt, "2+2=?"),
            _ => panic!("Expected Think command"),
        }
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "mcp-server-deepseek",
            "--model",
            "deepseek-r1",
            "--base-url",
            "http://localhost:8080",
            "--timeout",
            "30",
            "--mode",
            "single-shot",
        ]);
        let config = apply_overrides(Config::default(), &cli).unwrap();

        assert_eq!(config.model_name, "deepseek-r1");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.mode, CallMode::SingleShot);
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let cli = Cli::parse_from(["mcp-server-deepseek", "--timeout", "0"]);
        assert!(apply_overrides(Config::default(), &cli).is_err());
    }

    #[test]
    fn test_cli_invalid_mode() {
        let result = Cli::try_parse_from(["mcp-server-deepseek", "--mode", "batch"]);
        assert!(result.is_err());
    }
}
