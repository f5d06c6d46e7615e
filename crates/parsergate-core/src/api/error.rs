use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Coarse failure classes surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed or missing request fields, caught before the network
    Validation,
    /// No response reached the client
    Network,
    /// 401/403 from the backend
    Authorization,
    /// Any other non-2xx, or an unreadable 2xx body
    Backend,
    /// Protected action refused locally because the session is not authenticated
    NotAuthenticated,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an error from a non-2xx status and its (possibly empty) body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::detail_message(body).unwrap_or_else(|| Self::fallback_message(status));
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            code => ApiError::Backend {
                status: code,
                message,
            },
        }
    }

    /// Pull a human-readable message out of a `{"detail": ...}` error body.
    ///
    /// `detail` is usually a string; request validation failures carry a list
    /// of `{"msg": ...}` entries instead, which are joined.
    fn detail_message(body: &str) -> Option<String> {
        let parsed: Value = serde_json::from_str(body).ok()?;
        match parsed.get("detail")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Array(entries) => {
                let msgs: Vec<&str> = entries
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(Value::as_str))
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            _ => None,
        }
    }

    fn fallback_message(status: reqwest::StatusCode) -> String {
        match status.canonical_reason() {
            Some(reason) => format!("Request failed with status {} {}", status.as_u16(), reason),
            None => format!("Request failed with status {}", status.as_u16()),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Validation(_) => FailureKind::Validation,
            ApiError::Network(_) => FailureKind::Network,
            ApiError::Unauthorized(_) | ApiError::AccessDenied(_) => FailureKind::Authorization,
            ApiError::Backend { .. } | ApiError::InvalidResponse(_) => FailureKind::Backend,
        }
    }

    /// True for failures that prove the session credential is no longer accepted.
    pub fn is_authorization(&self) -> bool {
        self.kind() == FailureKind::Authorization
    }

    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::from_status(status, ""),
            None => ApiError::Network(err.to_string()),
        }
    }
}
