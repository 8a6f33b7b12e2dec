//! System catalogue tools.
//!
//! Three proxies over the backend's `/api/mcp/systems` endpoints: the system
//! list, a system's architecture, and a system's product information.

use schemars::JsonSchema;
use serde::Deserialize;

use super::proxy::{PayloadShape, ProxyParams, RestEndpoint, RestProxyTool};
use crate::domains::tools::handlers::ToolParams;

/// Parameters for tools that take no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

impl ToolParams for NoParams {}

impl ProxyParams for NoParams {
    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Parameters for lookups of a single system by name.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SystemNameParams {
    /// The name of the system to query.
    #[schemars(description = "The name of the system to query (e.g., QARE, RBS)")]
    pub system_name: String,
}

impl ToolParams for SystemNameParams {
    fn check(&self) -> Result<(), String> {
        if self.system_name.trim().is_empty() {
            return Err("'systemName' must not be empty".to_string());
        }
        Ok(())
    }
}

impl ProxyParams for SystemNameParams {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.system_name.clone())]
    }

    fn entity(&self) -> Option<&str> {
        Some(&self.system_name)
    }
}

pub const LIST_SYSTEMS: RestEndpoint = RestEndpoint {
    name: "get-systems",
    description: "Fetches a list of systems from the team-evolve API",
    path: "/api/mcp/systems",
    subject: "systems list",
    unwrap_key: None,
    expected_fields: &[],
    shape: PayloadShape::Any,
};

pub const SYSTEM_ARCHITECTURE: RestEndpoint = RestEndpoint {
    name: "get_system_architecture_by_name",
    description: "Gets architecture information (high-level, application, deployment) for a specific system by its name.",
    path: "/api/mcp/systems/architecture",
    subject: "architecture info",
    unwrap_key: None,
    expected_fields: &["highLevel", "microservice", "deployment"],
    shape: PayloadShape::NonEmptyObject,
};

pub const SYSTEM_PRODUCT_INFO: RestEndpoint = RestEndpoint {
    name: "get_system_productinfo_by_name",
    description: "Gets product information (overview, user persona, architecture) for a specific system by its name.",
    path: "/api/mcp/systems/product-info",
    subject: "product info",
    unwrap_key: Some("productInfo"),
    expected_fields: &["overview", "userPersona", "architecture"],
    shape: PayloadShape::NonEmptyObject,
};

pub type ListSystemsTool = RestProxyTool<NoParams>;
pub type SystemArchitectureTool = RestProxyTool<SystemNameParams>;
pub type SystemProductInfoTool = RestProxyTool<SystemNameParams>;

pub fn list_systems_tool() -> ListSystemsTool {
    RestProxyTool::new(LIST_SYSTEMS)
}

pub fn system_architecture_tool() -> SystemArchitectureTool {
    RestProxyTool::new(SYSTEM_ARCHITECTURE)
}

pub fn system_product_info_tool() -> SystemProductInfoTool {
    RestProxyTool::new(SYSTEM_PRODUCT_INFO)
}
