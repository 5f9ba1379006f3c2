//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::{ProgressReporter, ReasoningBridge};

/// Name of the reasoning tool
pub const THINK_TOOL_NAME: &str = "think_with_deepseek_r1";

/// Wrap text in the fixed thinking envelope
///
/// Used for every outcome, so the envelope never varies.
pub fn render_thinking(text: &str) -> String {
    format!("<thinking>\n{}\n</thinking>\n", text)
}

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "think_with_deepseek_r1")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments, reporting progress to `progress`
    ///
    /// `Err` is reserved for malformed arguments.
    async fn execute(&self, args: Value, progress: &dyn ProgressReporter)
        -> Result<Value, String>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry holding the reasoning tool
    pub fn from_bridge(bridge: Arc<ReasoningBridge>) -> Self {
        let mut registry = Self::default();

        registry.register(Tool {
            name: THINK_TOOL_NAME.to_string(),
            description: "Ask DeepSeek-R1 to think about the user's prompt and return its \
                          reasoning (enhanced thinking) wrapped in <thinking> tags."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "The user's full prompt (full text)"
                    }
                },
                "required": ["prompt"]
            }),
            handler: Arc::new(ThinkHandler { bridge }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name, with progress going to the server log
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let progress = LogProgress {
            tool: name.to_string(),
        };
        self.execute_with_progress(name, args, &progress).await
    }

    /// Execute a tool by name, reporting progress to the given sink
    pub async fn execute_with_progress(
        &self,
        name: &str,
        args: Value,
        progress: &dyn ProgressReporter,
    ) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args, progress).await
    }
}

/// Progress sink that writes to the server log
#[derive(Debug)]
struct LogProgress {
    tool: String,
}

#[async_trait]
impl ProgressReporter for LogProgress {
    async fn report(&self, message: &str) {
        tracing::info!(tool = %self.tool, "{}", message);
    }
}

/// Handler for `think_with_deepseek_r1`
#[derive(Debug)]
pub struct ThinkHandler {
    pub bridge: Arc<ReasoningBridge>,
}

#[async_trait]
impl ToolHandler for ThinkHandler {
    async fn execute(
        &self,
        args: Value,
        progress: &dyn ProgressReporter,
    ) -> Result<Value, String> {
        let prompt = args
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'prompt' parameter")?;

        let outcome = self.bridge.invoke_with_progress(prompt, Some(progress)).await;

        // A string result becomes the single text item of the tool result
        Ok(Value::String(render_thinking(&outcome.into_text())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBackend;
    use crate::config::Config;
    use crate::models::{CallMode, NO_REASONING_MESSAGE, TIMEOUT_MESSAGE};
    use std::time::Duration;

    fn registry(backend: MockBackend, mode: CallMode, timeout: Duration) -> ToolRegistry {
        let config = Config::default().with_mode(mode).with_timeout(timeout);
        let bridge = ReasoningBridge::new(Arc::new(config), Arc::new(backend));
        ToolRegistry::from_bridge(Arc::new(bridge))
    }

    fn result_text(value: &Value) -> &str {
        value.as_str().unwrap()
    }

    #[test]
    fn test_render_thinking() {
        assert_eq!(
            render_thinking("Let me compute: 2+2=4."),
            "<thinking>\nLet me compute: 2+2=4.\n</thinking>\n"
        );
        assert_eq!(render_thinking(""), "<thinking>\n\n</thinking>\n");
    }

    #[test]
    fn test_tool_schema() {
        let registry = registry(MockBackend::new(), CallMode::Streaming, Duration::from_secs(1));
        let tool = registry.get(THINK_TOOL_NAME).unwrap();

        assert_eq!(registry.all().len(), 1);
        assert_eq!(tool.input_schema["properties"]["prompt"]["type"], "string");
        assert_eq!(tool.input_schema["required"][0], "prompt");
    }

    #[tokio::test]
    async fn test_think_wraps_reasoning() {
        let registry = registry(
            MockBackend::new().with_reasoning("Let me compute: 2+2=4."),
            CallMode::SingleShot,
            Duration::from_secs(5),
        );

        let result = registry
            .execute(THINK_TOOL_NAME, serde_json::json!({"prompt": "2+2=?"}))
            .await
            .unwrap();

        assert_eq!(
            result_text(&result),
            "<thinking>\nLet me compute: 2+2=4.\n</thinking>\n"
        );
    }

    #[tokio::test]
    async fn test_think_wraps_empty_and_timeout() {
        let registry_empty = registry(MockBackend::new(), CallMode::Streaming, Duration::from_secs(5));
        let result = registry_empty
            .execute(THINK_TOOL_NAME, serde_json::json!({"prompt": "x"}))
            .await
            .unwrap();
        assert_eq!(result_text(&result), render_thinking(NO_REASONING_MESSAGE));

        let registry_slow = registry(
            MockBackend::new().with_delay(Duration::from_secs(30)),
            CallMode::Streaming,
            Duration::from_millis(50),
        );
        let result = registry_slow
            .execute(THINK_TOOL_NAME, serde_json::json!({"prompt": "x"}))
            .await
            .unwrap();
        assert!(result_text(&result).contains(TIMEOUT_MESSAGE));
        assert!(result_text(&result).starts_with("<thinking>\n"));
    }

    #[tokio::test]
    async fn test_think_missing_prompt() {
        let registry = registry(MockBackend::new(), CallMode::Streaming, Duration::from_secs(1));

        let result = registry
            .execute(THINK_TOOL_NAME, serde_json::json!({"text": "hi"}))
            .await;
        assert!(result.is_err());

        let result = registry
            .execute(THINK_TOOL_NAME, serde_json::json!({"prompt": 42}))
            .await;
        assert!(result.is_err());
    }

    #[derive(Default)]
    struct CollectProgress {
        messages: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProgressReporter for CollectProgress {
        async fn report(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_think_reports_progress_to_caller() {
        let registry = registry(
            MockBackend::new().with_reasoning("ok"),
            CallMode::SingleShot,
            Duration::from_secs(5),
        );
        let progress = CollectProgress::default();

        registry
            .execute_with_progress(THINK_TOOL_NAME, serde_json::json!({"prompt": "x"}), &progress)
            .await
            .unwrap();

        let messages = progress.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Starting reasoning with"));
        assert_eq!(messages[1], "Reasoning completed");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry(MockBackend::new(), CallMode::Streaming, Duration::from_secs(1));
        let result = registry.execute("nope", serde_json::json!({})).await;
        assert_eq!(result.unwrap_err(), "Tool 'nope' not found");
    }
}
