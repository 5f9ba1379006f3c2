//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Serves the reasoning tool and the `ask_deepseek` prompt over stdio or
//! streamable HTTP.

use crate::bridge::{ProgressReporter, ReasoningBridge};
use crate::mcp::prompts::{Prompt, PromptRegistry};
use crate::mcp::tools::ToolRegistry;
use async_trait::async_trait;
use pmcp::types::{Content, GetPromptResult, PromptArgument, PromptInfo, PromptMessage, Role};
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, PromptHandler,
    RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Name the server announces to clients
pub const SERVER_NAME: &str = "mcp-server-deepseek";

/// The MCP server exposing DeepSeek-R1 reasoning
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
}

impl McpServer {
    /// Create a new MCP server on top of the given bridge
    pub fn new(bridge: Arc<ReasoningBridge>) -> Result<Self, pmcp::Error> {
        let tools = ToolRegistry::from_bridge(bridge);
        let prompts = PromptRegistry::builtin();
        let server = Self::build_server_impl(tools, prompts)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
        })
    }

    fn build_server_impl(
        tools: ToolRegistry,
        prompts: PromptRegistry,
    ) -> Result<Server, pmcp::Error> {
        let mut capabilities = ServerCapabilities::tools_only();
        capabilities.prompts = ServerCapabilities::prompts_only().prompts;

        let mut builder = Server::builder()
            .name(SERVER_NAME)
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(capabilities);

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        for prompt in prompts.all() {
            builder = builder.prompt(
                prompt.name.clone(),
                PromptWrapper {
                    prompt: prompt.clone(),
                },
            );
        }

        builder.build()
    }

    /// Run the server in stdio mode until the client disconnects
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server over streamable HTTP
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());
        http_server.start().await
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, extra: RequestHandlerExtra) -> Result<Value, Error> {
        tracing::debug!("Tool call: {}", self.name);
        let progress = ClientProgress::new(&self.name, extra);
        self.handler
            .execute(args, &progress)
            .await
            .map_err(Error::invalid_params)
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

/// Forwards tool progress to the client as MCP progress notifications
///
/// Messages are logged as well. pmcp drops the notification when the client
/// did not ask for progress.
struct ClientProgress {
    tool: String,
    extra: RequestHandlerExtra,
    step: AtomicU32,
}

impl ClientProgress {
    fn new(tool: &str, extra: RequestHandlerExtra) -> Self {
        Self {
            tool: tool.to_string(),
            extra,
            step: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ProgressReporter for ClientProgress {
    async fn report(&self, message: &str) {
        tracing::info!(tool = %self.tool, "{}", message);

        // Progress values must strictly increase within one request
        let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(e) = self
            .extra
            .report_progress(f64::from(step), None, Some(message.to_string()))
            .await
        {
            tracing::debug!(tool = %self.tool, "Progress notification not sent: {}", e);
        }
    }
}

/// Wrapper for adapting our Prompt to pmcp's PromptHandler
struct PromptWrapper {
    prompt: Prompt,
}

#[async_trait]
impl PromptHandler for PromptWrapper {
    async fn handle(
        &self,
        args: HashMap<String, String>,
        _extra: RequestHandlerExtra,
    ) -> Result<GetPromptResult, Error> {
        let text = self.prompt.render(&args).map_err(Error::invalid_params)?;

        Ok(GetPromptResult::new(
            vec![PromptMessage {
                role: Role::User,
                content: Content::Text { text },
            }],
            Some(self.prompt.description.clone()),
        ))
    }

    fn metadata(&self) -> Option<PromptInfo> {
        let arguments = self
            .prompt
            .arguments
            .iter()
            .map(|arg| PromptArgument {
                name: arg.name.to_string(),
                description: Some(arg.description.to_string()),
                required: arg.required,
                completion: None,
                arg_type: None,
            })
            .collect();

        Some(PromptInfo {
            name: self.prompt.name.clone(),
            description: Some(self.prompt.description.clone()),
            arguments: Some(arguments),
        })
    }
}

/// Create a new MCP server instance
pub fn create_mcp_server(bridge: Arc<ReasoningBridge>) -> Result<McpServer, pmcp::Error> {
    McpServer::new(bridge)
}
