//! MCP (Model Context Protocol) implementation.

mod prompts;
pub mod server;
mod tools;

pub use prompts::{ask_deepseek_text, Prompt, PromptRegistry, ASK_PROMPT_NAME};
pub use server::{create_mcp_server, McpServer, SERVER_NAME};
pub use tools::{render_thinking, Tool, ToolHandler, ToolRegistry, THINK_TOOL_NAME};
