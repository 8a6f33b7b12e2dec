//! Tool Router - builds the rmcp ToolRouter from the registry.
//!
//! The STDIO transport is driven by rmcp, which dispatches through a
//! `ToolRouter`. Each registered tool becomes one dynamic route that forwards
//! to [`ToolRegistry::invoke`], so both transports share one dispatch path.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter},
};

use super::registry::ToolRegistry;

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(registry: Arc<ToolRegistry>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    registry
        .tools()
        .into_iter()
        .fold(ToolRouter::new(), |router, tool| {
            let name = tool.name.to_string();
            let registry = registry.clone();

            router.with_route(ToolRoute::new_dyn(
                tool,
                move |ctx: ToolCallContext<'_, S>| {
                    let registry = registry.clone();
                    let name = name.clone();
                    let arguments = ctx.arguments.clone();
                    async move {
                        registry
                            .invoke(&name, arguments)
                            .await
                            .map_err(McpError::from)
                    }
                    .boxed()
                },
            ))
        })
}
