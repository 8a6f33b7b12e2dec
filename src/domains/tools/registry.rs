//! Tool Registry - central registration and dispatch for all tools.
//!
//! This module provides:
//! - A name-keyed registry of tool handlers, fixed at startup
//! - Dispatch of tool calls for both transports
//! - Tool metadata for listing

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use tracing::{error, info, instrument, warn};

use super::ToolError;
use super::definitions::{
    WeatherTool, list_systems_tool, system_architecture_tool, system_product_info_tool,
};
use super::handlers::{ToolContext, ToolHandler};

/// The tools every server instance exposes.
pub fn default_tools() -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(list_systems_tool()),
        Arc::new(system_architecture_tool()),
        Arc::new(system_product_info_tool()),
        Arc::new(WeatherTool::new()),
    ]
}

/// Tool registry - maps tool names to handlers.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    context: ToolContext,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new(context: ToolContext) -> Self {
        Self {
            tools: BTreeMap::new(),
            context,
        }
    }

    /// Create a registry holding [`default_tools`].
    pub fn with_default_tools(context: ToolContext) -> Result<Self, ToolError> {
        let mut registry = Self::new(context);
        for tool in default_tools() {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool under its name. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        info!("Registered tool: {}", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get all tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.get(name)
    }

    /// Get all tools as Tool models (metadata).
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.to_tool()).collect()
    }

    /// The context passed to every invocation.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Dispatch a call by name.
    ///
    /// Unknown names fail with [`ToolError::NotFound`] and invalid arguments
    /// with [`ToolError::InvalidArguments`], both before the tool runs.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ToolError> {
        let Some(tool) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(ToolError::not_found(name));
        };

        tool.call(arguments.unwrap_or_default(), &self.context).await
    }

    /// Dispatch a call by name, reporting execution failures as an error
    /// result (`isError: true`) rather than a protocol error.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ToolError> {
        match self.call_tool(name, arguments).await {
            Err(e) if e.is_execution_failure() => {
                error!("{}", e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
            other => other,
        }
    }
}
