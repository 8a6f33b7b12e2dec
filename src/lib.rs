//! Systems MCP Server Library
//!
//! A Model Context Protocol (MCP) server whose tools proxy lookups to a REST
//! backend: the list of systems, a system's architecture and its product
//! information. A stub `weather` tool is included as a minimal example.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, logging, the backend API client,
//!   the server handler and the STDIO / HTTP transports
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: MCP tools that can be executed by clients
//! - **client**: a small HTTP client used to exercise a running server
//!
//! # Example
//!
//! ```rust,no_run
//! use systems_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use client::DemoClient;
pub use core::{Config, Error, McpServer, Result};
