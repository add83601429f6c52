//! services/api/src/web/error.rs
//!
//! The JSON error shape shared by every REST handler: `{message}` for caller
//! errors and `{message, error}` for server-side failures.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An error that renders as an HTTP status plus `ErrorBody`.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// A 500 carrying a generic message for the client and the underlying cause.
    pub fn internal(message: impl Into<String>, cause: impl Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            error: Some(cause.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for HttpError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for HttpError {
    fn from(e: MultipartError) -> Self {
        Self::bad_request(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                status = self.status.as_u16(),
                cause = self.error.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        }
        let body = ErrorBody {
            message: self.message,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}
