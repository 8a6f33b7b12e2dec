//! Fake backend API shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Value, json};

use systems_mcp_server::core::api::ApiClient;
use systems_mcp_server::core::config::ApiConfig;
use systems_mcp_server::domains::tools::{ToolContext, ToolRegistry};

pub const TOKEN: &str = "test-token";

/// A backend on an ephemeral port that counts every request it receives.
pub struct FakeBackend {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/mcp/systems", get(systems))
            .route("/api/mcp/systems/architecture", get(architecture))
            .route("/api/mcp/systems/product-info", get(product_info))
            .route("/api/mcp/echo", post(echo))
            .route("/api/mcp/flaky", get(flaky))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn client(&self, max_retries: u32) -> ApiClient {
        ApiClient::new(&ApiConfig {
            max_retries,
            ..self.api_config(Some(TOKEN))
        })
        .unwrap()
    }

    pub fn api_config(&self, token: Option<&str>) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            token: token.map(str::to_string),
            ..ApiConfig::default()
        }
    }

    pub fn registry(&self, token: Option<&str>) -> ToolRegistry {
        let api = ApiClient::new(&self.api_config(token)).unwrap();
        ToolRegistry::with_default_tools(ToolContext::new(api)).unwrap()
    }
}

/// The single text block of a tool result.
pub fn text_of(result: &CallToolResult) -> String {
    match &result.content[0].raw {
        RawContent::Text(text) => text.text.clone(),
        _ => panic!("expected text content"),
    }
}

pub fn args(value: Value) -> Option<serde_json::Map<String, Value>> {
    value.as_object().cloned()
}

fn authorize(hits: &AtomicUsize, headers: &HeaderMap) -> Result<(), Response> {
    hits.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "System not found" }))).into_response()
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid name" }))).into_response()
}

async fn systems(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&hits, &headers) {
        return denied;
    }
    Json(json!([
        { "id": 1, "name": "QARE" },
        { "id": 2, "name": "EMPTY" }
    ]))
    .into_response()
}

async fn architecture(
    State(hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = authorize(&hits, &headers) {
        return denied;
    }
    match query.get("name").map(String::as_str) {
        Some("QARE") => Json(json!({
            "highLevel": { "style": "event-driven" },
            "microservice": [{ "name": "billing" }],
            "deployment": { "target": "kubernetes" }
        }))
        .into_response(),
        Some("QARE & Co") => Json(json!({ "highLevel": { "style": "monolith" } })).into_response(),
        Some("DIRECT") => Json(json!({ "notes": "partial" })).into_response(),
        Some("EMPTY") => Json(json!({})).into_response(),
        Some("BAD") => bad_request(),
        _ => not_found(),
    }
}

async fn product_info(
    State(hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = authorize(&hits, &headers) {
        return denied;
    }
    match query.get("name").map(String::as_str) {
        Some("WRAPPED") => Json(json!({
            "productInfo": { "overview": "Quality platform", "userPersona": ["QA"] },
            "meta": { "source": "db" }
        }))
        .into_response(),
        Some("DIRECT") => Json(json!({ "overview": "Direct payload" })).into_response(),
        Some("EMPTY") => Json(json!({ "productInfo": {} })).into_response(),
        Some("BAD") => bad_request(),
        _ => not_found(),
    }
}

async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&hits, &headers) {
        return denied;
    }
    Json(json!({ "echo": body })).into_response()
}

/// Unavailable for the first request the backend sees, fine afterwards.
async fn flaky(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&hits, &headers) {
        return denied;
    }
    if hits.load(Ordering::SeqCst) == 1 {
        return (StatusCode::SERVICE_UNAVAILABLE, "warming up").into_response();
    }
    Json(json!({ "status": "ok" })).into_response()
}
