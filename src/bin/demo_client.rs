//! Demo client: connect to a running server, list its tools and optionally
//! call one.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use systems_mcp_server::client::{DEFAULT_SERVER_URL, DemoClient};
use systems_mcp_server::core::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "demo_client", version, about = "Exercise a running MCP server over HTTP")]
struct Cli {
    /// Server endpoint.
    #[arg(long, env = "MCP_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    url: String,

    /// Tool to call after listing.
    #[arg(long)]
    tool: Option<String>,

    /// Tool arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    args: String,

    /// Log level.
    #[arg(long, env = "MCP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let arguments: Value =
        serde_json::from_str(&cli.args).context("--args must be a JSON object")?;

    let mut client = DemoClient::new(&cli.url);
    client
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", cli.url))?;

    if let Some(tools) = client.list_tools().await? {
        info!("Server exposes {} tools", tools.len());
    }

    if let Some(tool) = &cli.tool {
        if let Some(result) = client.call_tool(tool, arguments).await? {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    client.disconnect().await?;
    Ok(())
}
