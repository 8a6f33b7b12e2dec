//! Tools domain module.
//!
//! Tools are the named, schema-validated operations MCP clients invoke.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations
//! - `handlers.rs` - The `ToolHandler` trait, typed params and result helpers
//! - `registry.rs` - Name-based registry and dispatch
//! - `router.rs` - rmcp `ToolRouter` built from the registry (STDIO transport)
//! - `error.rs` - Tool errors and failure classification
//!
//! ## Adding a New Tool
//!
//! 1. Backend proxy: declare a `RestEndpoint` and a params type implementing
//!    `ProxyParams` in `definitions/`; anything else: implement `ToolHandler`
//! 2. Add it to `default_tools()` in `registry.rs`
//!
//! Both transports pick it up from the registry.

pub mod definitions;
mod error;
pub mod handlers;
mod registry;
pub mod router;

pub use error::{FailureKind, ToolError, describe_failure};
pub use handlers::{ToolContext, ToolHandler, ToolParams};
pub use registry::{ToolRegistry, default_tools};
pub use router::build_tool_router;
