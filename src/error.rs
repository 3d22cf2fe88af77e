//! Central error type and response formatting.
//!
//! Every failure that reaches an HTTP client passes through `AppError` so
//! response shapes stay uniform, per the propagation policy in the design
//! spec's error handling section.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication failed")]
    Auth,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("room is locked")]
    Locked,

    #[error("room is full")]
    Full,

    #[error("room has expired")]
    Expired,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Auth => "AUTH",
            Self::NotFound(_) => "NOT_FOUND",
            Self::StateConflict(_) => "STATE_CONFLICT",
            Self::Locked => "LOCKED",
            Self::Full => "FULL",
            Self::Expired => "EXPIRED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StateConflict(_) => StatusCode::CONFLICT,
            Self::Locked => StatusCode::FORBIDDEN,
            Self::Full => StatusCode::CONFLICT,
            Self::Expired => StatusCode::GONE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                "an unexpected error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after_secs = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let body = ErrorBody {
            detail: self.detail(),
            code: self.code(),
            retry_after_secs,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
