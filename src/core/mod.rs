//! Core module containing shared infrastructure components.
//!
//! Configuration, error handling, logging, the backend API client, the MCP
//! server handler and the transport layer live here.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod transport;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use error::{Error, Result};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
