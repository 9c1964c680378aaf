//! Shared error type for HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Handler error that converts to a plain-text response.
#[derive(Debug, Error)]
pub enum AppError {
    /// The session store could not be read or written.
    #[error("session error: {0}")]
    Session(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let message = match self {
            AppError::Session(_) => "session unavailable, please try again",
            AppError::Internal(_) => "internal server error",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
