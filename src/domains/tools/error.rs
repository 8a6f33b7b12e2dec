//! Tool-specific error types and failure classification.

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Category of a failed tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend has no such entity (HTTP 404).
    NotFound,
    /// The backend rejected the bearer token (HTTP 401).
    Unauthorized,
    /// The backend rejected the request parameters (HTTP 400).
    BadRequest,
    /// Any other non-2xx answer.
    Remote,
    /// The backend answered, but not with the payload shape the tool expects.
    DataShape,
    /// Anything else (connection failures, undecodable bodies).
    Other,
}

impl FailureKind {
    /// Classify a failure from its HTTP status, falling back to the message
    /// text when no status is known.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        match status {
            Some(404) => Self::NotFound,
            Some(401) => Self::Unauthorized,
            Some(400) => Self::BadRequest,
            Some(_) => Self::Remote,
            None if message.contains("404") => Self::NotFound,
            None if message.contains("401") => Self::Unauthorized,
            None if message.contains("400") => Self::BadRequest,
            None => Self::Other,
        }
    }
}

/// Build the human-readable reason for a failed backend call.
///
/// `subject` names what was being fetched ("architecture info"), `entity`
/// the queried system if the tool takes one, and `raw` the underlying error
/// message used for kinds without a dedicated wording.
pub fn describe_failure(
    kind: FailureKind,
    subject: &str,
    entity: Option<&str>,
    raw: &str,
) -> String {
    match (kind, entity) {
        (FailureKind::NotFound, Some(entity)) => {
            format!("System named '{}' not found or has no {}.", entity, subject)
        }
        (FailureKind::NotFound, None) => {
            format!("Resource not found when fetching {}.", subject)
        }
        (FailureKind::Unauthorized, Some(entity)) => format!(
            "Authentication failed when fetching {} for system '{}'. Check token.",
            subject, entity
        ),
        (FailureKind::Unauthorized, None) => {
            format!("Authentication failed when fetching {}. Check token.", subject)
        }
        (FailureKind::BadRequest, Some(entity)) => format!(
            "Bad request when fetching {} for system '{}'. Check 'name' parameter.",
            subject, entity
        ),
        (FailureKind::BadRequest, None) => format!("Bad request when fetching {}.", subject),
        _ => raw.to_string(),
    }
}

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A tool with the same name is already registered.
    #[error("Duplicate tool name: {0}")]
    Duplicate(String),

    /// Required configuration is missing; no request was attempted.
    #[error("{0}")]
    Configuration(String),

    /// The tool ran but could not produce a result.
    #[error("Failed to execute {tool} tool: {message}")]
    ExecutionFailed {
        tool: String,
        kind: FailureKind,
        message: String,
        status: Option<u16>,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(
        tool: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self::ExecutionFailed {
            tool: tool.into(),
            kind,
            message: message.into(),
            status,
        }
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The failure category, for execution failures.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::ExecutionFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The upstream HTTP status, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ExecutionFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the tool was dispatched and failed while running, as opposed
    /// to the call being rejected before dispatch.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::ExecutionFailed { .. } | Self::Internal(_)
        )
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) | ToolError::InvalidArguments(_) => {
                McpError::invalid_params(err.to_string(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}
