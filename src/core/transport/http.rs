//! HTTP transport implementation.
//!
//! HTTP server with JSON-RPC over POST requests. On top of plain request /
//! response handling it provides:
//!
//! - session ids minted on `initialize` and required afterwards
//! - `batch` (JSON body) or `stream` (server-sent events) response delivery
//! - replay of streamed events via `GET` + `Last-Event-ID` when resumability is on
//! - request size limit, per-message timeout, CORS and custom response headers

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use super::config::{CorsConfig, HttpConfig, ResponseMode, SessionConfig};
use super::{TransportError, TransportResult};
use crate::core::McpServer;
use crate::core::server::SERVER_INSTRUCTIONS;
use crate::domains::tools::ToolError;

/// Protocol version announced when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

const LAST_EVENT_ID: &str = "last-event-id";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// `None` only when the member is absent (a notification); `"id": null`
    /// is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Parse error.
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::error(None, -32700, msg)
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Per-client session state.
#[derive(Debug)]
struct SessionState {
    initialized: bool,
    protocol_version: String,
    created_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    last_event_id: u64,
    history: VecDeque<StoredEvent>,
}

/// A streamed event kept for replay.
#[derive(Debug, Clone)]
struct StoredEvent {
    id: u64,
    data: String,
    recorded_at: DateTime<Utc>,
}

/// Live sessions keyed by session id.
///
/// Sessions idle for longer than `idle_timeout` are dropped, and the store
/// never holds more than `max_sessions` entries.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    idle_timeout: TimeDelta,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: TimeDelta, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(millis(config.idle_timeout_ms), config.max_sessions)
    }

    /// Open a new session and return its id.
    pub async fn create(&self) -> String {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, session| !self.is_idle(session, now));
        if sessions.len() < before {
            info!("Dropped {} idle session(s)", before - sessions.len());
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            warn!(
                "Session limit of {} reached, evicting {}",
                self.max_sessions, oldest
            );
            sessions.remove(&oldest);
        }

        let id = uuid::Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            SessionState {
                initialized: false,
                protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
                created_at: now,
                last_seen: now,
                last_event_id: 0,
                history: VecDeque::new(),
            },
        );
        id
    }

    /// Whether `id` names a live session.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .is_some_and(|session| !self.is_idle(session, Utc::now()))
    }

    /// Mark a session as used. Returns false (and drops it) if it has gone idle.
    pub async fn touch(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };

        if !self.is_idle(session, now) {
            session.last_seen = now;
            return true;
        }

        sessions.remove(id);
        info!("Session {} expired", id);
        false
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close a session. Returns false if it did not exist.
    pub async fn remove(&self, id: &str) -> bool {
        match self.sessions.write().await.remove(id) {
            Some(session) => {
                info!(
                    "Terminated session {} (initialized: {}, protocol {}, open {}s)",
                    id,
                    session.initialized,
                    session.protocol_version,
                    (Utc::now() - session.created_at).num_seconds()
                );
                true
            }
            None => false,
        }
    }

    fn is_idle(&self, session: &SessionState, now: DateTime<Utc>) -> bool {
        now.checked_sub_signed(self.idle_timeout)
            .is_some_and(|cutoff| session.last_seen < cutoff)
    }

    async fn set_protocol_version(&self, id: &str, version: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.protocol_version = version.to_string();
        }
    }

    async fn mark_initialized(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.initialized = true;
        }
    }

    /// Keep a streamed event for replay and return its event id.
    async fn record(&self, id: &str, data: String, retention: TimeDelta) -> Option<u64> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        let now = Utc::now();

        session.last_event_id += 1;
        let event_id = session.last_event_id;
        session.history.push_back(StoredEvent {
            id: event_id,
            data,
            recorded_at: now,
        });
        prune_history(&mut session.history, now, retention);

        Some(event_id)
    }

    /// Events newer than `after` still inside the retention window.
    async fn replay(&self, id: &str, after: u64, retention: TimeDelta) -> Option<Vec<StoredEvent>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        prune_history(&mut session.history, Utc::now(), retention);

        Some(
            session
                .history
                .iter()
                .filter(|event| event.id > after)
                .cloned()
                .collect(),
        )
    }
}

/// A millisecond setting as a `TimeDelta`; out-of-range values mean "forever".
fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

fn prune_history(history: &mut VecDeque<StoredEvent>, now: DateTime<Utc>, retention: TimeDelta) {
    let Some(cutoff) = now.checked_sub_signed(retention) else {
        return;
    };
    while history.front().is_some_and(|e| e.recorded_at < cutoff) {
        history.pop_front();
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The MCP server instance.
    server: McpServer,
    /// Transport settings.
    config: Arc<HttpConfig>,
    /// Parsed session header name.
    session_header: HeaderName,
    /// Live sessions.
    sessions: Arc<SessionStore>,
}

impl AppState {
    fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.session_header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn retention(&self) -> TimeDelta {
        millis(self.config.resumability.history_duration_ms)
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router serving `server`.
    pub fn router(&self, server: McpServer) -> Router {
        let session_header =
            HeaderName::from_str(&self.config.session.header_name).unwrap_or_else(|_| {
                warn!(
                    "Invalid session header name '{}', using Mcp-Session-Id",
                    self.config.session.header_name
                );
                HeaderName::from_static("mcp-session-id")
            });

        let state = AppState {
            server,
            config: Arc::new(self.config.clone()),
            session_header,
            sessions: Arc::new(SessionStore::from_config(&self.config.session)),
        };

        let mut app = Router::new()
            .route(
                &self.config.rpc_path,
                post(handle_rpc).get(handle_replay).delete(handle_terminate),
            )
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .layer(DefaultBodyLimit::max(self.config.max_message_size))
            .with_state(state);

        let headers = custom_headers(&self.config.headers);
        if !headers.is_empty() {
            app = app.layer(middleware::from_fn_with_state(
                Arc::new(headers),
                apply_custom_headers,
            ));
        }

        if self.config.cors.enabled {
            app = app.layer(cors_layer(&self.config.cors));
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// Run the HTTP transport until Ctrl-C.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, {:?} responses, CORS {})",
            addr,
            self.config.response_mode,
            if self.config.cors.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        info!("HTTP transport stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != "*")
}

fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let origin = if cfg.allow_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(split_list(&cfg.allow_origin).filter_map(|o| HeaderValue::from_str(o).ok()))
    };

    let methods =
        AllowMethods::list(split_list(&cfg.allow_methods).filter_map(|m| Method::from_str(m).ok()));

    let headers = if cfg.allow_headers.trim() == "*" {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            split_list(&cfg.allow_headers).filter_map(|h| HeaderName::from_str(h).ok()),
        )
    };

    let expose = ExposeHeaders::list(
        split_list(&cfg.expose_headers).filter_map(|h| HeaderName::from_str(h).ok()),
    );

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
        .max_age(Duration::from_secs(cfg.max_age_secs))
}

fn custom_headers(configured: &std::collections::BTreeMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in configured {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Skipping invalid custom header {}: {}", name, value),
        }
    }
    headers
}

async fn apply_custom_headers(
    State(headers): State<Arc<HeaderMap>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    for (name, value) in headers.iter() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

fn missing_session_header(state: &AppState) -> JsonRpcResponse {
    JsonRpcResponse::error(
        None,
        -32000,
        format!(
            "Bad Request: missing {} header",
            state.config.session.header_name
        ),
    )
}

fn session_not_found() -> Response {
    rpc_error_response(
        StatusCode::NOT_FOUND,
        JsonRpcResponse::error(None, -32001, "Session not found"),
    )
}

fn rpc_error_response(status: StatusCode, body: JsonRpcResponse) -> Response {
    (status, Json(body)).into_response()
}

fn sse_response(events: Vec<Event>) -> Response {
    Sse::new(stream::iter(events.into_iter().map(Ok::<Event, Infallible>))).into_response()
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "rpc": state.config.rpc_path,
            "health": "/health"
        },
        "responseMode": state.config.response_mode,
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle POSTed JSON-RPC messages (single or batch).
#[instrument(skip_all)]
async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unparseable JSON-RPC payload: {}", e);
            return rpc_error_response(
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::parse_error(format!("Parse error: {}", e)),
            );
        }
    };

    let (items, is_batch) = match payload {
        Value::Array(items) => (items, true),
        single => (vec![single], false),
    };
    if items.is_empty() {
        return rpc_error_response(StatusCode::BAD_REQUEST, JsonRpcResponse::invalid_request(None));
    }

    let messages: Vec<Result<JsonRpcRequest, JsonRpcResponse>> = items
        .into_iter()
        .map(|item| {
            let id = item.get("id").cloned();
            serde_json::from_value(item).map_err(|_| JsonRpcResponse::invalid_request(id))
        })
        .collect();

    let session_id = match resolve_session(&state, &headers, &messages).await {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    let mut responses = Vec::new();
    for message in messages {
        match message {
            Err(invalid) => responses.push(invalid),
            Ok(request) => {
                let is_notification = request.id.is_none();
                let response = process_with_timeout(&state, request, session_id.as_deref()).await;
                if !is_notification {
                    responses.push(response);
                }
            }
        }
    }

    let mut response = if responses.is_empty() {
        StatusCode::ACCEPTED.into_response()
    } else {
        match state.config.response_mode {
            ResponseMode::Batch if is_batch => Json(responses).into_response(),
            ResponseMode::Batch => match responses.pop() {
                Some(single) => Json(single).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            },
            ResponseMode::Stream => {
                stream_response(&state, session_id.as_deref(), responses).await
            }
        }
    };

    if let Some(id) = session_id {
        if let Ok(value) = HeaderValue::from_str(&id) {
            response
                .headers_mut()
                .insert(state.session_header.clone(), value);
        }
    }

    response
}

/// Find (or, on `initialize`, open) the session a POST belongs to.
async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
    messages: &[Result<JsonRpcRequest, JsonRpcResponse>],
) -> Result<Option<String>, Response> {
    if !state.config.session.enabled {
        return Ok(None);
    }

    let initializing = messages
        .iter()
        .any(|m| matches!(m, Ok(request) if request.method == "initialize"));
    if initializing {
        let id = state.sessions.create().await;
        info!("Opened session {}", id);
        return Ok(Some(id));
    }

    match state.session_id(headers) {
        None => Err(rpc_error_response(
            StatusCode::BAD_REQUEST,
            missing_session_header(state),
        )),
        Some(id) if state.sessions.touch(&id).await => Ok(Some(id)),
        Some(id) => {
            warn!("Request for unknown session {}", id);
            Err(session_not_found())
        }
    }
}

/// Deliver responses as server-sent events, recording them for replay.
async fn stream_response(
    state: &AppState,
    session_id: Option<&str>,
    responses: Vec<JsonRpcResponse>,
) -> Response {
    let mut events = Vec::with_capacity(responses.len());

    for response in responses {
        let data = match serde_json::to_string(&response) {
            Ok(data) => data,
            Err(e) => {
                warn!("Dropping unserializable response: {}", e);
                continue;
            }
        };

        let mut event = Event::default().event("message");
        if state.config.resumability.enabled {
            if let Some(session_id) = session_id {
                if let Some(event_id) = state
                    .sessions
                    .record(session_id, data.clone(), state.retention())
                    .await
                {
                    event = event.id(event_id.to_string());
                }
            }
        }
        events.push(event.data(data));
    }

    sse_response(events)
}

/// Replay streamed events newer than `Last-Event-ID`.
#[instrument(skip_all)]
async fn handle_replay(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !state.config.resumability.enabled {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(session_id) = state.session_id(&headers) else {
        return rpc_error_response(
            StatusCode::BAD_REQUEST,
            missing_session_header(&state),
        );
    };

    if !state.sessions.touch(&session_id).await {
        return session_not_found();
    }

    let after = headers
        .get(LAST_EVENT_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    match state
        .sessions
        .replay(&session_id, after, state.retention())
        .await
    {
        Some(stored) => {
            info!(
                "Replaying {} event(s) after {} for session {}",
                stored.len(),
                after,
                session_id
            );
            let events = stored
                .into_iter()
                .map(|e| {
                    Event::default()
                        .event("message")
                        .id(e.id.to_string())
                        .data(e.data)
                })
                .collect();
            sse_response(events)
        }
        None => session_not_found(),
    }
}

/// Client-initiated session termination.
#[instrument(skip_all)]
async fn handle_terminate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = &state.config.session;
    if !session.enabled || !session.allow_client_termination {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(session_id) = state.session_id(&headers) else {
        return rpc_error_response(
            StatusCode::BAD_REQUEST,
            missing_session_header(&state),
        );
    };

    if state.sessions.remove(&session_id).await {
        StatusCode::OK.into_response()
    } else {
        session_not_found()
    }
}

/// Process one message, bounded by the configured timeout.
async fn process_with_timeout(
    state: &AppState,
    request: JsonRpcRequest,
    session_id: Option<&str>,
) -> JsonRpcResponse {
    let id = request.id.clone();
    let limit = Duration::from_millis(state.config.batch_timeout_ms);

    match tokio::time::timeout(limit, process_request(state, request, session_id)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request timed out after {} ms", state.config.batch_timeout_ms);
            JsonRpcResponse::internal_error(
                id,
                format!(
                    "Request timed out after {} ms",
                    state.config.batch_timeout_ms
                ),
            )
        }
    }
}

/// Process a JSON-RPC request and return the response.
async fn process_request(
    state: &AppState,
    request: JsonRpcRequest,
    session_id: Option<&str>,
) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    info!("Received JSON-RPC request: {}", request.method);

    match request.method.as_str() {
        "initialize" => handle_initialize(state, request, session_id).await,
        "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
        "tools/list" => handle_tools_list(state, request),
        "tools/call" => handle_tools_call(state, request).await,
        method if method.starts_with("notifications/") => {
            handle_notification(state, &request, session_id).await;
            JsonRpcResponse::success(request.id, Value::Null)
        }
        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    }
}

/// Handle initialize request.
async fn handle_initialize(
    state: &AppState,
    request: JsonRpcRequest,
    session_id: Option<&str>,
) -> JsonRpcResponse {
    let protocol_version = request
        .params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION)
        .to_string();

    if let Some(session_id) = session_id {
        state
            .sessions
            .set_protocol_version(session_id, &protocol_version)
            .await;
    }

    let result = serde_json::json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": SERVER_INSTRUCTIONS
    });

    JsonRpcResponse::success(request.id, result)
}

/// Handle tools/list request.
fn handle_tools_list(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let tools = state.server.list_tools();
    JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
}

/// Handle tools/call request.
async fn handle_tools_call(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let Some(params) = request.params else {
        return JsonRpcResponse::invalid_params(request.id, "Missing params");
    };

    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::invalid_params(request.id, "Missing tool name");
    };

    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    match state.server.call_tool(name, arguments).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e @ (ToolError::NotFound(_) | ToolError::InvalidArguments(_))) => {
            JsonRpcResponse::invalid_params(request.id, e.to_string())
        }
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

/// Handle notifications (no response is sent).
async fn handle_notification(state: &AppState, request: &JsonRpcRequest, session_id: Option<&str>) {
    match (request.method.as_str(), session_id) {
        ("notifications/initialized", Some(session_id)) => {
            info!("Client initialized session {}", session_id);
            state.sessions.mark_initialized(session_id).await;
        }
        _ => info!("Received notification: {}", request.method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::ApiClient;
    use crate::core::config::ApiConfig;
    use crate::core::Config;
    use crate::domains::tools::{ToolContext, ToolHandler, ToolRegistry};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(config: HttpConfig) -> Router {
        let server = McpServer::new(Config::default()).unwrap();
        HttpTransport::new(config).router(server)
    }

    fn message(id: Option<i64>, method: &str, params: Value) -> Value {
        let mut msg = serde_json::json!({ "jsonrpc": "2.0", "method": method, "params": params });
        if let Some(id) = id {
            msg["id"] = serde_json::json!(id);
        }
        msg
    }

    fn post(body: &Value, session: Option<&str>) -> http::Request<Body> {
        let mut builder = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(session) = session {
            builder = builder.header("Mcp-Session-Id", session);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    async fn initialize(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(post(&message(Some(1), "initialize", serde_json::json!({})), None))
            .await
            .unwrap();
        response
            .headers()
            .get("mcp-session-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_initialize_opens_session() {
        let app = app(HttpConfig::default());
        let response = app
            .clone()
            .oneshot(post(
                &message(Some(1), "initialize", serde_json::json!({ "protocolVersion": "2024-11-05" })),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("mcp-session-id"));
        let body = body_json(response).await;
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert!(body["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_missing_session_header_rejected() {
        let app = app(HttpConfig::default());
        let response = app
            .oneshot(post(&message(Some(2), "tools/list", serde_json::json!({})), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app(HttpConfig::default());
        let response = app
            .oneshot(post(
                &message(Some(2), "tools/list", serde_json::json!({})),
                Some("no-such-session"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_list_with_session() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let response = app
            .oneshot(post(
                &message(Some(2), "tools/list", serde_json::json!({})),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let response = app
            .oneshot(post(
                &message(
                    Some(3),
                    "tools/call",
                    serde_json::json!({ "name": "nope", "arguments": {} }),
                ),
                Some(&session),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32602);
        assert!(body["error"]["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_tools_call_weather() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let response = app
            .oneshot(post(
                &message(
                    Some(4),
                    "tools/call",
                    serde_json::json!({ "name": "weather", "arguments": { "city": "Rome" } }),
                ),
                Some(&session),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["result"]["isError"], false);
        assert!(body["result"]["content"][0]["text"].as_str().unwrap().contains("Rome"));
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let response = app
            .oneshot(post(
                &message(None, "notifications/initialized", serde_json::json!({})),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_batch_returns_array() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let batch = serde_json::json!([
            message(Some(5), "ping", serde_json::json!({})),
            message(Some(6), "tools/list", serde_json::json!({})),
            message(None, "notifications/initialized", serde_json::json!({})),
        ]);
        let response = app.oneshot(post(&batch, Some(&session))).await.unwrap();
        let body = body_json(response).await;
        let responses = body.as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 5);
        assert_eq!(responses[1]["id"], 6);
    }

    #[tokio::test]
    async fn test_delete_terminates_session() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let delete = http::Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header("Mcp-Session-Id", &session)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post(
                &message(Some(2), "tools/list", serde_json::json!({})),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_not_allowed_when_termination_disabled() {
        let mut config = HttpConfig::default();
        config.session.allow_client_termination = false;
        let app = app(config);
        let session = initialize(&app).await;

        let delete = http::Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header("Mcp-Session-Id", &session)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_sessions_disabled_needs_no_header() {
        let mut config = HttpConfig::default();
        config.session.enabled = false;
        let app = app(config);

        let response = app
            .oneshot(post(&message(Some(1), "tools/list", serde_json::json!({})), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("mcp-session-id"));
    }

    #[tokio::test]
    async fn test_stream_mode_uses_event_stream() {
        let mut config = HttpConfig::default();
        config.response_mode = ResponseMode::Stream;
        let app = app(config);

        let response = app
            .oneshot(post(&message(Some(1), "initialize", serde_json::json!({})), None))
            .await
            .unwrap();
        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));
        let body = body_text(response).await;
        assert!(body.contains("event: message"));
        assert!(body.contains("protocolVersion"));
    }

    #[tokio::test]
    async fn test_replay_after_last_event_id() {
        let mut config = HttpConfig::default();
        config.response_mode = ResponseMode::Stream;
        config.resumability.enabled = true;
        let app = app(config);

        // Event 1: the initialize response.
        let session = initialize(&app).await;
        // Event 2: the ping response.
        app.clone()
            .oneshot(post(&message(Some(2), "ping", serde_json::json!({})), Some(&session)))
            .await
            .unwrap();

        let replay = http::Request::builder()
            .method("GET")
            .uri("/mcp")
            .header("Mcp-Session-Id", &session)
            .header("Last-Event-ID", "1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(replay).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("id: 2"));
        assert!(!body.contains("id: 1\n"));
    }

    #[tokio::test]
    async fn test_replay_not_allowed_without_resumability() {
        let app = app(HttpConfig::default());
        let request = http::Request::builder()
            .method("GET")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_custom_headers_applied() {
        let mut config = HttpConfig::default();
        config
            .headers
            .insert("X-Custom-Header".to_string(), "value".to_string());
        let app = app(config);

        let request = http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-custom-header").unwrap(), "value");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = HttpConfig::default();
        config.max_message_size = 64;
        let app = app(config);

        let big = message(Some(1), "initialize", serde_json::json!({ "pad": "x".repeat(256) }));
        let response = app.oneshot(post(&big, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let app = app(HttpConfig::default());
        let request = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_session_store_history_is_pruned() {
        let store = SessionStore::new(TimeDelta::MAX, 10);
        let id = store.create().await;
        store.record(&id, "a".to_string(), TimeDelta::zero()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let replayed = store.replay(&id, 0, TimeDelta::zero()).await.unwrap();
        assert!(replayed.is_empty());
        assert_eq!(store.count().await, 1);
        assert!(store.remove(&id).await);
        assert!(!store.contains(&id).await);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_dropped() {
        let store = SessionStore::new(TimeDelta::try_milliseconds(10).unwrap(), 100);
        let stale = store.create().await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(!store.contains(&stale).await);
        let fresh = store.create().await;
        assert_eq!(store.count().await, 1);
        assert!(store.touch(&fresh).await);
        assert!(!store.touch(&stale).await);
    }

    #[tokio::test]
    async fn test_session_count_is_capped() {
        let store = SessionStore::new(TimeDelta::MAX, 2);
        let first = store.create().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = store.create().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(store.touch(&first).await);
        let third = store.create().await;

        assert_eq!(store.count().await, 2);
        assert!(store.contains(&first).await);
        assert!(!store.contains(&second).await);
        assert!(store.contains(&third).await);
    }

    #[tokio::test]
    async fn test_evicted_session_is_not_found() {
        let mut config = HttpConfig::default();
        config.session.max_sessions = 1;
        let app = app(config);

        let first = initialize(&app).await;
        let _second = initialize(&app).await;

        let response = app
            .oneshot(post(&message(Some(2), "ping", serde_json::json!({})), Some(&first)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let app = app(HttpConfig::default());
        let session = initialize(&app).await;

        let request = serde_json::json!({ "jsonrpc": "2.0", "id": null, "method": "ping" });
        let response = app.oneshot(post(&request, Some(&session))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body.get("id").is_some_and(Value::is_null));
        assert!(body["result"].is_object());
    }

    struct SlowTool;

    #[async_trait::async_trait]
    impl ToolHandler for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Sleeps before answering"
        }

        fn input_schema(&self) -> Arc<rmcp::model::JsonObject> {
            let schema = serde_json::json!({ "type": "object" });
            Arc::new(schema.as_object().cloned().unwrap())
        }

        async fn call(
            &self,
            _arguments: rmcp::model::JsonObject,
            _ctx: &ToolContext,
        ) -> Result<rmcp::model::CallToolResult, ToolError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(rmcp::model::CallToolResult::success(vec![]))
        }
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let api = ApiClient::new(&ApiConfig::default()).unwrap();
        let mut registry = ToolRegistry::new(ToolContext::new(api));
        registry.register(Arc::new(SlowTool)).unwrap();
        let server = McpServer::with_registry(Config::default(), Arc::new(registry));

        let mut config = HttpConfig::default();
        config.session.enabled = false;
        config.batch_timeout_ms = 20;
        let app = HttpTransport::new(config).router(server);

        let call = message(Some(7), "tools/call", serde_json::json!({ "name": "slow" }));
        let response = app.oneshot(post(&call, None)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["error"]["code"], -32603);
        assert!(body["error"]["message"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = app(HttpConfig::default());
        let request = http::Request::builder()
            .method("OPTIONS")
            .uri("/mcp")
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, mcp-session-id")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
        assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
    }
}
