//! Error types for the HTTP surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use smart_intercom_signaling::SignalingError;

/// Credential errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Request-level errors. Every variant is answered with 403 and a plain-text
/// reason; there is no structured error body at this boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("access denied")]
    AccessDenied,

    #[error("invalid token")]
    InvalidToken(#[source] AuthError),

    #[error("invalid body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("invalid body")]
    EmptyName,

    #[error("already subscribed")]
    AlreadyPolling(#[from] SignalingError),

    #[error("generate error")]
    TokenIssue(#[source] AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::AccessDenied => warn!("request rejected: access denied"),
            ApiError::InvalidToken(err) => warn!(error = %err, "request rejected: invalid token"),
            ApiError::InvalidBody(err) => warn!(error = %err, "request rejected: invalid body"),
            ApiError::EmptyName => warn!("request rejected: empty plugin name"),
            ApiError::AlreadyPolling(err) => warn!(error = %err, "request rejected: already polling"),
            ApiError::TokenIssue(err) => warn!(error = %err, "request rejected: token not issued"),
        }
        (StatusCode::FORBIDDEN, self.to_string()).into_response()
    }
}

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Credential setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
