use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, FailureKind};

/// Uniform outcome of every gateway and invoker operation.
///
/// The presentation layer renders `message` directly; `kind` is there for
/// callers that want to branch on the failure class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: None,
            payload: None,
        }
    }

    pub fn ok_with_payload(message: impl Into<String>, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::ok(message)
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: Some(kind),
            payload: None,
        }
    }

    pub fn not_authenticated() -> Self {
        Self::failure(FailureKind::NotAuthenticated, "Not authenticated")
    }
}

impl From<ApiError> for ActionResult {
    fn from(err: ApiError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}
