//! Tool handler abstraction.
//!
//! Every tool exposed by the server implements [`ToolHandler`]. Handlers are
//! stateless: everything they need per call arrives through [`ToolContext`].

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ToolError;
use crate::core::api::ApiClient;

/// Read-only state shared by all tool invocations.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Client for the backend REST API.
    pub api: ApiClient,
}

impl ToolContext {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

/// Typed tool arguments.
///
/// Implementors derive `Deserialize` (with `deny_unknown_fields`) and
/// `JsonSchema`; the derived schema is what clients see, and deserialization
/// is the validation step run before a tool does any work.
pub trait ToolParams: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Checks that the schema alone cannot express.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Trait implemented by every tool the registry can dispatch to.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Unique name used as the dispatch key.
    fn name(&self) -> &str;

    /// Human-readable summary shown to clients.
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn input_schema(&self) -> Arc<JsonObject>;

    /// Validate `arguments` and execute the tool.
    async fn call(
        &self,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError>;

    /// Tool metadata as advertised in `tools/list`.
    fn to_tool(&self) -> Tool {
        Tool {
            name: self.name().to_string().into(),
            description: Some(self.description().to_string().into()),
            input_schema: self.input_schema(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

/// Deserialize and check tool arguments.
pub fn parse_params<P: ToolParams>(arguments: JsonObject) -> Result<P, ToolError> {
    let params: P = serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
    params.check().map_err(ToolError::invalid_arguments)?;
    Ok(params)
}

/// Wrap a JSON payload as a single pretty-printed text block.
pub fn json_text_result(payload: &Value) -> Result<CallToolResult, ToolError> {
    let text = serde_json::to_string_pretty(payload)
        .map_err(|e| ToolError::internal(format!("Failed to serialize result: {}", e)))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
