//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that is built
//! once at startup from environment variables (and an optional `.env` file),
//! then shared read-only with every tool invocation.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default backend base URL when `LOCAL_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Backend REST API configuration.
    pub api: ApiConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Configuration for the backend REST API the tools proxy to.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, without trailing path.
    pub base_url: String,

    /// Bearer token sent with every request.
    /// Absence is reported by each tool invocation, not at startup.
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for failed idempotent GETs (0 disables retrying).
    pub max_retries: u32,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "systems-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            api: ApiConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Some(level) = lookup("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(base_url) = lookup("LOCAL_API_BASE_URL").filter(|v| !v.is_empty()) {
            config.api.base_url = base_url;
        }

        config.api.token = lookup("LOCAL_API_TOKEN").filter(|v| !v.trim().is_empty());

        if let Some(timeout) = lookup("LOCAL_API_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.api.timeout_secs = timeout;
        }

        if let Some(retries) = lookup("LOCAL_API_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            config.api.max_retries = retries;
        }

        config.transport = TransportConfig::from_lookup(&lookup);

        config
    }

    /// Problems worth reporting at startup; none of them stop the server.
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.api.token.is_none() {
            warnings.push(
                "LOCAL_API_TOKEN is not set - every tool that calls the backend \
                 will fail until it is configured"
                    .to_string(),
            );
        }
        warnings
    }

    /// Log the loaded settings. Call once logging is initialized.
    pub fn log_startup(&self) {
        info!("Backend API: {}", self.api.base_url);
        if self.api.token.is_some() {
            info!("Backend API token loaded from environment");
        }
        for warning in self.startup_warnings() {
            warn!("{}", warning);
        }
    }
}
