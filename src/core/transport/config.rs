//! Transport configuration types.

use serde::{Deserialize, Serialize};
#[cfg(feature = "http")]
use std::collections::BTreeMap;

/// Transport configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Standard input/output transport.
    #[cfg(feature = "stdio")]
    Stdio,

    /// HTTP transport with JSON-RPC over POST.
    #[cfg(feature = "http")]
    Http(HttpConfig),
}

/// How responses to POSTed JSON-RPC messages are delivered.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// One `application/json` body holding every response.
    #[default]
    Batch,

    /// A `text/event-stream` body with one event per response.
    Stream,
}

#[cfg(feature = "http")]
impl std::str::FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "stream" => Ok(Self::Stream),
            other => Err(format!("unknown response mode '{}'", other)),
        }
    }
}

/// HTTP transport configuration.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path for the JSON-RPC endpoint.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Response delivery mode.
    #[serde(default)]
    pub response_mode: ResponseMode,

    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Upper bound for processing one JSON-RPC message, in milliseconds.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Extra headers added to every response.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// CORS policy.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Session management.
    #[serde(default)]
    pub session: SessionConfig,

    /// Stream resumability.
    #[serde(default)]
    pub resumability: ResumabilityConfig,
}

/// CORS policy for browser clients.
///
/// List-valued fields are comma separated, as they appear in the matching
/// `Access-Control-*` headers. An origin of `*` allows any origin.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub expose_headers: String,
    pub max_age_secs: u64,
}

/// Session management configuration.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether `initialize` mints session ids that later requests must carry.
    pub enabled: bool,

    /// Header carrying the session id in both directions.
    pub header_name: String,

    /// Whether clients may end their session with `DELETE`.
    pub allow_client_termination: bool,

    /// Sessions unused for this long are dropped, in milliseconds.
    pub idle_timeout_ms: u64,

    /// Upper bound on live sessions; the least recently used one is evicted.
    pub max_sessions: usize,
}

/// Stream resumability configuration.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumabilityConfig {
    /// Keep streamed events so a client can replay them with `Last-Event-ID`.
    pub enabled: bool,

    /// How long streamed events are kept, in milliseconds.
    pub history_duration_ms: u64,
}

#[cfg(feature = "http")]
fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[cfg(feature = "http")]
fn default_rpc_path() -> String {
    "/mcp".to_string()
}

#[cfg(feature = "http")]
fn default_max_message_size() -> usize {
    4 * 1024 * 1024
}

#[cfg(feature = "http")]
fn default_batch_timeout_ms() -> u64 {
    30_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        #[cfg(feature = "http")]
        {
            return Self::Http(HttpConfig::default());
        }

        #[cfg(all(not(feature = "http"), feature = "stdio"))]
        {
            return Self::Stdio;
        }

        #[cfg(not(any(feature = "stdio", feature = "http")))]
        {
            compile_error!("At least one transport feature must be enabled: stdio or http");
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: default_host(),
            rpc_path: default_rpc_path(),
            response_mode: ResponseMode::default(),
            max_message_size: default_max_message_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            headers: BTreeMap::new(),
            cors: CorsConfig::default(),
            session: SessionConfig::default(),
            resumability: ResumabilityConfig::default(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, DELETE, OPTIONS".to_string(),
            allow_headers:
                "Content-Type, Accept, Authorization, x-api-key, Mcp-Session-Id, Last-Event-ID"
                    .to_string(),
            expose_headers: "Content-Type, Authorization, x-api-key, Mcp-Session-Id".to_string(),
            max_age_secs: 86_400,
        }
    }
}

#[cfg(feature = "http")]
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "Mcp-Session-Id".to_string(),
            allow_client_termination: true,
            idle_timeout_ms: 1_800_000,
            max_sessions: 10_000,
        }
    }
}

#[cfg(feature = "http")]
impl Default for ResumabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            history_duration_ms: 300_000,
        }
    }
}

#[cfg(feature = "http")]
impl HttpConfig {
    /// Load HTTP settings from a key lookup.
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            cfg.port = port;
        }
        if let Some(host) = lookup("MCP_HTTP_HOST") {
            cfg.host = host;
        }
        if let Some(path) = lookup("MCP_HTTP_PATH") {
            cfg.rpc_path = if path.starts_with('/') {
                path
            } else {
                format!("/{}", path)
            };
        }
        if let Some(mode) = lookup("MCP_HTTP_RESPONSE_MODE").and_then(|m| m.parse().ok()) {
            cfg.response_mode = mode;
        }
        if let Some(size) = lookup("MCP_HTTP_MAX_MESSAGE_SIZE").and_then(|s| parse_byte_size(&s)) {
            cfg.max_message_size = size;
        }
        if let Some(timeout) = lookup("MCP_HTTP_BATCH_TIMEOUT_MS").and_then(|t| t.parse().ok()) {
            cfg.batch_timeout_ms = timeout;
        }
        if let Some(headers) = lookup("MCP_HTTP_HEADERS") {
            cfg.headers = parse_header_list(&headers);
        }

        if let Some(enabled) = lookup("MCP_HTTP_CORS") {
            cfg.cors.enabled = parse_flag(&enabled);
        }
        if let Some(origin) = lookup("MCP_CORS_ALLOW_ORIGIN") {
            cfg.cors.allow_origin = origin;
        }
        if let Some(methods) = lookup("MCP_CORS_ALLOW_METHODS") {
            cfg.cors.allow_methods = methods;
        }
        if let Some(headers) = lookup("MCP_CORS_ALLOW_HEADERS") {
            cfg.cors.allow_headers = headers;
        }
        if let Some(expose) = lookup("MCP_CORS_EXPOSE_HEADERS") {
            cfg.cors.expose_headers = expose;
        }
        if let Some(max_age) = lookup("MCP_CORS_MAX_AGE").and_then(|m| m.parse().ok()) {
            cfg.cors.max_age_secs = max_age;
        }

        if let Some(enabled) = lookup("MCP_SESSION_ENABLED") {
            cfg.session.enabled = parse_flag(&enabled);
        }
        if let Some(header) = lookup("MCP_SESSION_HEADER") {
            cfg.session.header_name = header;
        }
        if let Some(allow) = lookup("MCP_SESSION_ALLOW_TERMINATION") {
            cfg.session.allow_client_termination = parse_flag(&allow);
        }
        if let Some(idle) = lookup("MCP_SESSION_IDLE_TIMEOUT_MS").and_then(|i| i.parse().ok()) {
            cfg.session.idle_timeout_ms = idle;
        }
        if let Some(max) = lookup("MCP_SESSION_MAX").and_then(|m| m.parse().ok()) {
            cfg.session.max_sessions = max;
        }

        if let Some(enabled) = lookup("MCP_RESUMABILITY_ENABLED") {
            cfg.resumability.enabled = parse_flag(&enabled);
        }
        if let Some(duration) = lookup("MCP_RESUMABILITY_HISTORY_MS").and_then(|d| d.parse().ok())
        {
            cfg.resumability.history_duration_ms = duration;
        }

        cfg
    }
}

impl TransportConfig {
    /// Create a STDIO transport config.
    #[cfg(feature = "stdio")]
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an HTTP transport config.
    #[cfg(feature = "http")]
    pub fn http(port: u16, host: impl Into<String>) -> Self {
        Self::Http(HttpConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load transport config from a key lookup.
    ///
    /// `MCP_TRANSPORT=stdio` selects STDIO; anything else selects HTTP when
    /// that transport is compiled in.
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = lookup("MCP_TRANSPORT").unwrap_or_default().to_lowercase();

        match transport.as_str() {
            #[cfg(feature = "stdio")]
            "stdio" => Self::Stdio,
            #[cfg(feature = "http")]
            _ => Self::Http(HttpConfig::from_lookup(lookup)),
            #[cfg(not(feature = "http"))]
            _ => Self::Stdio,
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            #[cfg(feature = "http")]
            Self::Http(cfg) => format!("HTTP on {}:{}{}", cfg.host, cfg.port, cfg.rpc_path),
        }
    }
}

#[cfg(feature = "http")]
fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0" && value != "no"
}

/// Parse sizes like `4mb`, `512kb`, `1gb` or a plain byte count.
#[cfg(feature = "http")]
pub fn parse_byte_size(value: &str) -> Option<usize> {
    let value = value.trim().to_lowercase();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: usize = digits.parse().ok()?;

    let multiplier = match unit.trim() {
        "" | "b" => 1,
        "kb" | "k" => 1024,
        "mb" | "m" => 1024 * 1024,
        "gb" | "g" => 1024 * 1024 * 1024,
        _ => return None,
    };

    amount.checked_mul(multiplier)
}

/// Parse `Name=value,Other=value` into a header map. Malformed entries are skipped.
#[cfg(feature = "http")]
fn parse_header_list(value: &str) -> BTreeMap<String, String> {
    value
        .split(',')
        .filter_map(|entry| {
            let (name, value) = entry.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
