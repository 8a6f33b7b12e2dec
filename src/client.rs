//! Demo client for manual verification of a running server.
//!
//! Speaks JSON-RPC over HTTP to the server's endpoint: connects (initialize),
//! lists tools, calls one by name and disconnects. Every operation checks the
//! connection state first and is a logged no-op when disconnected.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default server endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/mcp";

const NOT_CONNECTED: &str = "Client is not connected.";
const PROTOCOL_VERSION: &str = "2025-03-26";

/// Errors raised while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed server response: {0}")]
    Decode(String),
}

/// A minimal MCP client over HTTP.
pub struct DemoClient {
    http: reqwest::Client,
    url: String,
    session_header: String,
    session_id: Option<String>,
    connected: bool,
    next_id: u64,
}

impl DemoClient {
    /// Create a disconnected client for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            session_header: "Mcp-Session-Id".to_string(),
            session_id: None,
            connected: false,
            next_id: 1,
        }
    }

    /// Use a non-default session header name.
    pub fn with_session_header(mut self, name: impl Into<String>) -> Self {
        self.session_header = name.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Initialize a session. Returns the server's `initialize` result.
    pub async fn connect(&mut self) -> Result<Value, ClientError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "demo-client",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        self.notify("notifications/initialized").await?;
        self.connected = true;

        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!("Connected to {} at {}", server, self.url);
        Ok(result)
    }

    /// End the session. `None` when not connected.
    pub async fn disconnect(&mut self) -> Result<Option<()>, ClientError> {
        if !self.connected {
            info!("{}", NOT_CONNECTED);
            return Ok(None);
        }

        if let Some(session_id) = self.session_id.take() {
            let response = self
                .http
                .delete(&self.url)
                .header(self.session_header.as_str(), session_id)
                .send()
                .await?;
            if !response.status().is_success() {
                warn!("Session termination answered {}", response.status());
            }
        }

        self.connected = false;
        info!("Disconnected from {}", self.url);
        Ok(Some(()))
    }

    /// List the server's tools. `None` when not connected.
    pub async fn list_tools(&mut self) -> Result<Option<Vec<Value>>, ClientError> {
        if !self.connected {
            info!("{}", NOT_CONNECTED);
            return Ok(None);
        }

        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| ClientError::Decode("tools/list result has no tools array".into()))?;

        for tool in &tools {
            let name = tool.get("name").and_then(Value::as_str).unwrap_or("?");
            let description = tool.get("description").and_then(Value::as_str).unwrap_or("");
            info!("Tool: {} - {}", name, description);
        }
        Ok(Some(tools))
    }

    /// Call a tool by name. `None` when not connected.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Option<Value>, ClientError> {
        if !self.connected {
            info!("{}", NOT_CONNECTED);
            return Ok(None);
        }

        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        info!("Tool {} returned: {}", name, result);
        Ok(Some(result))
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let response = self.post(&body).await?;

        if let Some(session_id) = response
            .headers()
            .get(self.session_header.as_str())
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let text = response.text().await?;
        debug!("{} response: {}", method, text);

        let message = if is_stream {
            first_sse_message(&text)?
        } else {
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?
        };

        rpc_result(message)
    }

    async fn notify(&self, method: &str) -> Result<(), ClientError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        self.post(&body).await?;
        Ok(())
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session_id) = &self.session_id {
            request = request.header(self.session_header.as_str(), session_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// The first `data:` payload of an event stream, as JSON.
fn first_sse_message(text: &str) -> Result<Value, ClientError> {
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .ok_or_else(|| ClientError::Decode("event stream carried no data".into()))?;
    serde_json::from_str(data.trim()).map_err(|e| ClientError::Decode(e.to_string()))
}

fn rpc_result(message: Value) -> Result<Value, ClientError> {
    if let Some(error) = message.get("error") {
        return Err(ClientError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    message
        .get("result")
        .cloned()
        .ok_or_else(|| ClientError::Decode("response has neither result nor error".into()))
}
