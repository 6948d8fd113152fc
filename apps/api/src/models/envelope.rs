//! The `{ success, content | message }` envelope every action returns.

use axum::{
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// User-safe failure categories. Raw upstream detail never crosses this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    QuotaExceeded,
    UpstreamUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Response header naming the failure category, for clients and log pipelines
/// that need more than the human-readable message.
pub const ERROR_KIND_HEADER: &str = "x-error-kind";

/// Result of one action, shared by every action handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Success { content: String },
    Failure { kind: ErrorKind, message: String },
}

impl ActionOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        ActionOutcome::Success {
            content: content.into(),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ActionOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ActionOutcome::Success { content } => json!({ "success": true, "content": content }),
            ActionOutcome::Failure { message, .. } => json!({ "success": false, "message": message }),
        }
    }
}

impl IntoResponse for ActionOutcome {
    fn into_response(self) -> Response {
        let mut response = Json(self.to_json()).into_response();
        if let ActionOutcome::Failure { kind, .. } = &self {
            response
                .headers_mut()
                .insert(ERROR_KIND_HEADER, HeaderValue::from_static(kind.as_str()));
        }
        response
    }
}
