//! Backend API error types.

use thiserror::Error;

/// Errors returned by the backend fetch helper.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token is configured, so no request can be authenticated.
    #[error("Authentication token is missing. Please set LOCAL_API_TOKEN.")]
    MissingToken,

    /// The base URL plus path did not form a valid URL.
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The backend answered with a non-2xx status.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or the connection failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("Failed to decode API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a GET that failed this way may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
