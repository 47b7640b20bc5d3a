//! API errors and their HTTP responses
//!
//! Every failure is answered with a generic 500 body; the cause is only logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use super::protocol::ErrorResponse;
use crate::config::ConfigError;
use crate::sync::SyncError;

/// Failures surfaced to HTTP clients
///
/// The client only sees a generic message; the cause is logged.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Course content is not configured")]
    Config(#[from] ConfigError),

    #[error("Failed to load course content")]
    Upstream(#[source] SyncError),
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Config(e) => ApiError::Config(e),
            upstream => ApiError::Upstream(upstream),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Config(cause) => error!(error = %cause, "Request failed: configuration"),
            ApiError::Upstream(cause) => error!(error = %cause, "Request failed: upstream"),
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
