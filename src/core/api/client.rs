//! Authenticated JSON fetch helper for the backend API.

use std::time::Duration;

use reqwest::{Client, Method, Url, header};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::ApiError;
use crate::core::config::ApiConfig;

/// Base delay between GET retries; doubled on every attempt.
const BACKOFF_BASE_MS: u64 = 200;

/// Upper bound for a single backoff delay.
const BACKOFF_MAX_MS: u64 = 5_000;

/// Client for the backend REST API.
///
/// Cheap to clone: the underlying `reqwest::Client` shares its connection
/// pool between clones.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

/// Custom Debug implementation to redact the bearer token from logs.
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from the API configuration.
    ///
    /// A missing token is not an error here; it is reported by every request
    /// attempt instead, before anything goes over the wire.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            max_retries: config.max_retries,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a bearer token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Resolve `path` against the base URL and append the query pairs.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// GET `path` and return the parsed JSON body.
    ///
    /// Fails with [`ApiError::Status`] on any non-2xx answer. Transport errors
    /// and 5xx answers are retried up to `max_retries` times.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let token = self.token()?;
        let url = self.url(path, query)?;

        let mut attempt: u32 = 0;
        loop {
            match self.send(Method::GET, url.clone(), token, None).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = BACKOFF_BASE_MS
                        .saturating_mul(2u64.saturating_pow(attempt))
                        .min(BACKOFF_MAX_MS);
                    warn!(
                        "GET {} failed ({}), retrying in {}ms ({}/{})",
                        url,
                        e,
                        delay,
                        attempt + 1,
                        self.max_retries
                    );
                    sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// POST a JSON body to `path` and return the parsed JSON answer. Never retried.
    pub async fn post_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, ApiError> {
        let token = self.token()?;
        let url = self.url(path, query)?;
        self.send(Method::POST, url, token, Some(body)).await
    }

    fn token(&self) -> Result<&str, ApiError> {
        self.token.as_deref().ok_or(ApiError::MissingToken)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
