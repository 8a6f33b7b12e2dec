//! MCP Server Entry Point
//!
//! Loads configuration, initializes logging, and serves the tools over the
//! configured transport.

use anyhow::Result;
use tracing::info;

use systems_mcp_server::core::logging::init_logging;
use systems_mcp_server::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);
    config.log_startup();

    let server = McpServer::new(config.clone())?;

    info!("Server initialized");

    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}
