//! Axum-specific error types and mappings.
//!
//! Every component error is mapped onto one `HttpError` kind, and each kind
//! has a fixed status code and a stable `type` string for clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use voxgate_core::{GenerationError, ReferenceError, TaskError, TaskStatus, ValidationError};

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Rejected input.
    #[error("{0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Conflict (resource already exists).
    #[error("{0}")]
    Conflict(String),

    /// Missing or wrong bearer token.
    #[error("Missing or invalid API key")]
    Unauthorized,

    /// Task result requested before the task completed.
    #[error("{message}")]
    NotReady { message: String, status: TaskStatus },

    /// The task was cancelled and has no result.
    #[error("{0}")]
    Cancelled(String),

    /// The synthesis engine reported a failure.
    #[error("{0}")]
    EngineFailure(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::NotReady { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Cancelled(_) => StatusCode::GONE,
            Self::EngineFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error type discriminant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::NotReady { .. } => "not_ready",
            Self::Cancelled(_) => "cancelled",
            Self::EngineFailure(_) => "engine_failure",
            Self::Internal(_) => "internal",
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    /// Stable error type discriminant for client-side handling
    #[serde(rename = "type")]
    error_type: &'static str,
    /// Optional additional metadata for specific error types
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(target: "voxgate.http", error = %self, "Request failed");
        }

        let metadata = match &self {
            Self::NotReady { status, .. } => {
                Some(serde_json::json!({ "current_status": status.as_str() }))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
            error_type: self.kind(),
            metadata,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, Self::Unauthorized) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ReferenceError> for HttpError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::InvalidId { .. } => Self::Validation(err.to_string()),
            ReferenceError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            ReferenceError::NotFound(_) => Self::NotFound(err.to_string()),
            ReferenceError::Io(e) => Self::Internal(format!("Reference store error: {e}")),
        }
    }
}

impl From<GenerationError> for HttpError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::ReferenceNotFound(_) => Self::NotFound(err.to_string()),
            GenerationError::TextTooLong { .. } => Self::Validation(err.to_string()),
            GenerationError::Cancelled => Self::Cancelled(err.to_string()),
            GenerationError::Failed(_) => Self::EngineFailure(err.to_string()),
            GenerationError::Reference(_)
            | GenerationError::Encoding(_)
            | GenerationError::Worker(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<TaskError> for HttpError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::DuplicateId(_) => Self::Conflict(err.to_string()),
            TaskError::NotFound(_) => Self::NotFound(err.to_string()),
            TaskError::NotReady { status, .. } => Self::NotReady {
                message: err.to_string(),
                status,
            },
            TaskError::Cancelled(_) => Self::Cancelled(err.to_string()),
            TaskError::Io(e) => Self::Internal(format!("Task result error: {e}")),
        }
    }
}
