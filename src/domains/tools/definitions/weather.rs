//! Weather example tool.
//!
//! Returns fixed sample data for the requested city; no backend call.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{CallToolResult, JsonObject},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domains::tools::ToolError;
use crate::domains::tools::handlers::{
    ToolContext, ToolHandler, ToolParams, json_text_result, parse_params,
};

/// Parameters for the weather tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WeatherParams {
    /// City to report on.
    #[schemars(description = "City name to get weather for")]
    pub city: String,
}

impl ToolParams for WeatherParams {
    fn check(&self) -> Result<(), String> {
        if self.city.trim().is_empty() {
            return Err("'city' must not be empty".to_string());
        }
        Ok(())
    }
}

/// Sample weather report.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: i32,
    pub condition: String,
    pub humidity: u8,
}

#[derive(Debug, Clone, Default)]
pub struct WeatherTool;

impl WeatherTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "weather";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Get weather information for a city";

    pub fn new() -> Self {
        Self
    }

    pub fn execute(params: &WeatherParams) -> Result<CallToolResult, ToolError> {
        info!("Reporting sample weather for {}", params.city);

        let report = WeatherReport {
            city: params.city.clone(),
            temperature: 22,
            condition: "Sunny".to_string(),
            humidity: 45,
        };

        let payload = serde_json::to_value(&report).map_err(|e| ToolError::internal(e.to_string()))?;
        json_text_result(&payload)
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn input_schema(&self) -> Arc<JsonObject> {
        cached_schema_for_type::<WeatherParams>()
    }

    async fn call(
        &self,
        arguments: JsonObject,
        _ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let params = parse_params::<WeatherParams>(arguments)?;
        Self::execute(&params)
    }
}
