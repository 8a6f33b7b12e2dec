//! Generic REST proxy tool.
//!
//! A [`RestProxyTool`] forwards one validated invocation to a fixed backend
//! endpoint, normalizes the JSON answer and returns it as a text block. The
//! concrete tools in `systems.rs` are just [`RestEndpoint`] values paired with
//! a params type.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    handler::server::tool::cached_schema_for_type,
    model::{CallToolResult, JsonObject},
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::core::api::ApiError;
use crate::domains::tools::handlers::{
    ToolContext, ToolHandler, ToolParams, json_text_result, parse_params,
};
use crate::domains::tools::{FailureKind, ToolError, describe_failure};

/// What a successful backend answer must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Any JSON value is returned as-is.
    Any,
    /// The (unwrapped) payload must be a JSON object with at least one key.
    NonEmptyObject,
}

/// Static description of a proxied backend endpoint.
#[derive(Debug, Clone)]
pub struct RestEndpoint {
    /// Tool name.
    pub name: &'static str,
    /// Tool description.
    pub description: &'static str,
    /// Path appended to the API base URL.
    pub path: &'static str,
    /// What is being fetched, as used in log lines and error messages.
    pub subject: &'static str,
    /// Key the payload of interest may be nested under.
    pub unwrap_key: Option<&'static str>,
    /// Fields of which at least one should be present; otherwise a warning is logged.
    pub expected_fields: &'static [&'static str],
    /// Required payload shape.
    pub shape: PayloadShape,
}

/// Params of a proxy tool: how they map onto query pairs and which entity they name.
pub trait ProxyParams: ToolParams {
    /// Query parameters appended to the endpoint URL.
    fn query(&self) -> Vec<(&'static str, String)>;

    /// The queried entity, used in error messages.
    fn entity(&self) -> Option<&str> {
        None
    }
}

impl RestEndpoint {
    /// Pick the payload of interest out of a backend answer and check its shape.
    pub fn normalize(&self, body: Value, entity: Option<&str>) -> Result<Value, ToolError> {
        let payload = match self.unwrap_key {
            Some(key) => unwrap_payload(body, key),
            None => body,
        };

        if self.shape == PayloadShape::NonEmptyObject
            && !payload.as_object().is_some_and(|o| !o.is_empty())
        {
            error!(
                "Unexpected or empty {} data format received for system {}: {}",
                self.subject,
                entity.unwrap_or("-"),
                payload
            );
            return Err(ToolError::execution_failed(
                self.name,
                FailureKind::DataShape,
                format!(
                    "Unexpected or empty {} data format received from API for system {}.",
                    self.subject,
                    entity.unwrap_or("-")
                ),
                None,
            ));
        }

        Ok(payload)
    }

    /// Whether none of the expected fields carries a value.
    pub fn is_incomplete(&self, payload: &Value) -> bool {
        !self.expected_fields.is_empty()
            && self
                .expected_fields
                .iter()
                .all(|field| !payload.get(*field).is_some_and(is_truthy))
    }

    /// Turn a failed backend call into this tool's descriptive error.
    pub fn failure(&self, err: &ApiError, entity: Option<&str>) -> ToolError {
        let status = err.status();
        let mut message = err.to_string();
        if let Some(status) = status {
            message.push_str(&format!(" (Status: {})", status));
        }

        let kind = FailureKind::classify(status, &message);
        let reason = describe_failure(kind, self.subject, entity, &message);
        ToolError::execution_failed(self.name, kind, reason, status)
    }
}

/// Return `body[key]` when present and non-null, otherwise `body` itself.
pub fn unwrap_payload(body: Value, key: &str) -> Value {
    match body.get(key) {
        Some(inner) if !inner.is_null() => inner.clone(),
        _ => body,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A tool that proxies one GET endpoint of the backend API.
pub struct RestProxyTool<P> {
    endpoint: RestEndpoint,
    _params: PhantomData<fn() -> P>,
}

impl<P: ProxyParams> RestProxyTool<P> {
    pub fn new(endpoint: RestEndpoint) -> Self {
        Self {
            endpoint,
            _params: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &RestEndpoint {
        &self.endpoint
    }

    /// Execute the tool with already validated params.
    pub async fn execute(&self, params: &P, ctx: &ToolContext) -> Result<CallToolResult, ToolError> {
        let endpoint = &self.endpoint;
        let entity = params.entity();

        if !ctx.api.has_token() {
            error!("LOCAL_API_TOKEN environment variable is not set");
            return Err(ToolError::configuration(ApiError::MissingToken.to_string()));
        }

        let query = params.query();
        match ctx.api.url(endpoint.path, &query) {
            Ok(url) => info!("Fetching {} from {} with authentication", endpoint.subject, url),
            Err(e) => return Err(endpoint.failure(&e, entity)),
        }

        let body = match ctx.api.get_json(endpoint.path, &query).await {
            Ok(body) => body,
            Err(ApiError::MissingToken) => {
                return Err(ToolError::configuration(ApiError::MissingToken.to_string()));
            }
            Err(e) => {
                error!("Error in {} for {:?}: {}", endpoint.name, entity, e);
                return Err(endpoint.failure(&e, entity));
            }
        };

        debug!("Raw response for {}: {}", endpoint.subject, body);

        let payload = endpoint.normalize(body, entity)?;

        if endpoint.is_incomplete(&payload) {
            warn!(
                "{} for system {} might be incomplete or missing expected fields ({})",
                endpoint.subject,
                entity.unwrap_or("-"),
                endpoint.expected_fields.join(", ")
            );
        }

        info!("Successfully fetched {}", endpoint.subject);
        json_text_result(&payload)
    }
}

#[async_trait]
impl<P: ProxyParams> ToolHandler for RestProxyTool<P> {
    fn name(&self) -> &str {
        self.endpoint.name
    }

    fn description(&self) -> &str {
        self.endpoint.description
    }

    fn input_schema(&self) -> Arc<JsonObject> {
        cached_schema_for_type::<P>()
    }

    async fn call(
        &self,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let params = parse_params::<P>(arguments)?;
        self.execute(&params, ctx).await
    }
}
