use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::IdentityError;
use crate::llm_client::LlmError;
use crate::media::MediaError;
use crate::models::envelope::{ActionOutcome, ErrorKind};

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - No userId";
pub const QUOTA_MESSAGE: &str = "Limit reached. Upgrade to continue.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Free usage limit reached")]
    QuotaExceeded,

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Any failure while resolving the caller's plan, other than a bad token.
    #[error("Plan gate failed: {0}")]
    PlanGate(#[source] Box<AppError>),
}

impl AppError {
    /// Marks an error raised inside the plan gate. Token rejections stay 401;
    /// everything else becomes a 500.
    pub fn in_plan_gate(self) -> Self {
        match self {
            AppError::Unauthorized | AppError::PlanGate(_) => self,
            other => AppError::PlanGate(Box::new(other)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::QuotaExceeded => ErrorKind::QuotaExceeded,
            AppError::Llm(_) | AppError::Media(_) => ErrorKind::UpstreamUnavailable,
            AppError::Identity(_) | AppError::Database(_) | AppError::PlanGate(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// The message clients see. Only validation messages are passed through.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            AppError::QuotaExceeded => QUOTA_MESSAGE.to_string(),
            AppError::Llm(LlmError::EmptyContent) => "AI returned empty content".to_string(),
            AppError::Llm(_) => {
                "The AI service is unavailable right now. Please try again.".to_string()
            }
            AppError::Media(_) => {
                "The image service is unavailable right now. Please try again.".to_string()
            }
            AppError::Identity(_) | AppError::PlanGate(_) => {
                "Unable to verify your account right now.".to_string()
            }
            AppError::Database(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Identity(_) | AppError::PlanGate(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Soft failures: clients branch on `success`, not on the status code.
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::debug!("Validation error: {msg}"),
            AppError::Unauthorized => tracing::debug!("Rejected unauthenticated request"),
            AppError::QuotaExceeded => tracing::info!("Free usage limit reached"),
            AppError::Identity(e) => tracing::error!("Identity provider error: {e}"),
            AppError::Database(e) => tracing::error!("Database error: {e}"),
            AppError::Llm(e) => tracing::error!("LLM error: {e}"),
            AppError::Media(e) => tracing::error!("Media error: {e}"),
            AppError::PlanGate(e) => tracing::error!("Plan gate failed: {e}"),
        }

        let mut response = ActionOutcome::failure(self.kind(), self.user_message()).into_response();
        *response.status_mut() = self.status();
        response
    }
}
