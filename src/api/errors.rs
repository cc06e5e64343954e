//! API error types and HTTP status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::core::types::TaskId;

/// Error body shape the control plane has always used.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API error type convertible to an HTTP response. The control plane always
/// answers; these are the only failure shapes it produces.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No queued or archived task with this id.
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    /// Unknown probe `type` on POST.
    #[error("task type not found")]
    TypeNotFound,

    /// Malformed request body.
    #[error("{0}")]
    BadRequest(String),

    /// A task with this id is already queued.
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TypeNotFound => StatusCode::NOT_IMPLEMENTED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateTask(_) => StatusCode::CONFLICT,
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
