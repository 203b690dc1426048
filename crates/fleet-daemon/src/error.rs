//! Error types for fleet-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Listener certificate, key or CA could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// Backend client construction error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Desired-state store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Store cannot serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<fleet_types::ValidationError> for StoreError {
    fn from(err: fleet_types::ValidationError) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}

/// Orchestration backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with an error status
    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Unexpected response body
    #[error("Decode error: {0}")]
    Decode(String),

    /// Certificate, key or CA material could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// Backend address is not usable
    #[error("Invalid backend address: {0}")]
    InvalidAddress(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Submission could not be decoded or accepted
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Submission(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SUBMISSION_FAILED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        };

        tracing::warn!(error = %self, code, "Request failed");

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
