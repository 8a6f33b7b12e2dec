//! Transport layer for the MCP server.
//!
//! - **HTTP**: JSON-RPC over POST with sessions, CORS and optional SSE
//!   delivery - feature: `http` (default transport)
//! - **STDIO**: Standard input/output via rmcp - feature: `stdio`
//!
//! Each transport handles the connection lifecycle and delegates
//! message processing to the MCP server handler.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::{
    CorsConfig, HttpConfig, ResponseMode, ResumabilityConfig, SessionConfig, parse_byte_size,
};
