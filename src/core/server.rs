//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler. It owns the tool registry
//! and exposes it two ways: through rmcp's `ServerHandler` (STDIO transport)
//! and through plain methods used by the HTTP transport.
//!
//! Tools are defined in `domains/tools/definitions/` and registered in
//! `domains/tools/registry.rs`. **Adding a new tool does NOT require
//! modifying this file.**

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use std::sync::Arc;
use tracing::info;

use super::api::ApiClient;
use super::config::Config;
use super::error::Result as CoreResult;
use crate::domains::tools::{ToolContext, ToolError, ToolRegistry, build_tool_router};

/// Instructions returned to clients on `initialize`.
pub const SERVER_INSTRUCTIONS: &str = "Look up systems, their architecture and their product \
     information from the team-evolve API. Use get-systems to discover system names.";

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Registered tools and the context they run with.
    registry: Arc<ToolRegistry>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the default tool set.
    pub fn new(config: Config) -> CoreResult<Self> {
        let api = ApiClient::new(&config.api)?;
        let registry = ToolRegistry::with_default_tools(ToolContext::new(api))?;
        Ok(Self::with_registry(config, Arc::new(registry)))
    }

    /// Create a server around an existing registry.
    pub fn with_registry(config: Config, registry: Arc<ToolRegistry>) -> Self {
        info!(
            "Server configured with {} tools: {}",
            registry.tool_names().len(),
            registry.tool_names().join(", ")
        );

        Self {
            config: Arc::new(config),
            tool_router: build_tool_router::<Self>(registry.clone()),
            registry,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.registry
            .tools()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    ///
    /// Returns the serialized `CallToolResult`; execution failures are inside
    /// it with `isError: true`. `Err` means the call was rejected before the
    /// tool ran (unknown tool, invalid arguments).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => {
                return Err(ToolError::invalid_arguments(format!(
                    "arguments must be an object, got {}",
                    other
                )));
            }
        };

        let result = self.registry.invoke(name, arguments).await?;
        serde_json::to_value(&result).map_err(|e| ToolError::internal(e.to_string()))
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_lists_tools_with_schemas() {
        let server = McpServer::new(Config::default()).unwrap();
        let tools = server.list_tools();
        assert_eq!(tools.len(), 4);
        assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
    }

    #[test]
    fn test_server_info_enables_tools() {
        let server = McpServer::new(Config::default()).unwrap();
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_none());
    }

    #[tokio::test]
    async fn test_call_tool_rejects_non_object_arguments() {
        let server = McpServer::new(Config::default()).unwrap();
        let err = server
            .call_tool("weather", serde_json::json!(["Paris"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_call_tool_serializes_result() {
        let server = McpServer::new(Config::default()).unwrap();
        let value = server
            .call_tool("weather", serde_json::json!({ "city": "Lyon" }))
            .await
            .unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert!(value["content"][0]["text"].as_str().unwrap().contains("Lyon"));
    }
}
