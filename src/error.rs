//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::io;
use thiserror::Error;

/// Result type alias for server startup operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that stop the server from starting or running.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
}

/// Errors produced while handling a single relay invocation.
///
/// Everything raised before the first output byte becomes a JSON
/// `{"error": ...}` response via [`IntoResponse`]. Anything raised after
/// streaming has started is yielded from the body stream instead, which
/// aborts the response.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No response body from upstream")]
    MissingBody,

    #[error("Too many active streams")]
    Overloaded,

    #[error("Shutdown in progress")]
    Shutdown,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// HTTP status used when this error is returned before streaming.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Auth(_) => StatusCode::UNAUTHORIZED,
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Upstream { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if !code.is_success() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            RelayError::Overloaded | RelayError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Transport(_) | RelayError::MissingBody | RelayError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the `error` field of the JSON body.
    pub fn client_message(&self) -> String {
        match self {
            RelayError::Auth(_) => "Unauthorized".to_string(),
            RelayError::Validation(msg) => msg.clone(),
            RelayError::PayloadTooLarge => "Request body too large".to_string(),
            RelayError::Upstream { message, .. } => message.clone(),
            RelayError::Transport(_) => "Failed to reach generation service".to_string(),
            RelayError::MissingBody => "No response body from upstream".to_string(),
            RelayError::Overloaded => "Too many concurrent generation streams".to_string(),
            RelayError::Shutdown => "Server is shutting down".to_string(),
            RelayError::Config(_) => "Internal server error".to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Auth(_) => "auth",
            RelayError::Validation(_) => "validation",
            RelayError::PayloadTooLarge => "payload_too_large",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Transport(_) => "transport",
            RelayError::MissingBody => "missing_body",
            RelayError::Overloaded => "overloaded",
            RelayError::Shutdown => "shutdown",
            RelayError::Config(_) => "config",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::Auth("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(RelayError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::MissingBody.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(RelayError::Overloaded.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let err = RelayError::Upstream {
            status: 422,
            message: "bad grade".into(),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.client_message(), "bad grade");
    }

    #[test]
    fn test_upstream_invalid_status_maps_to_bad_gateway() {
        let err = RelayError::Upstream {
            status: 200,
            message: "odd".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_transport_detail_not_leaked() {
        let err = RelayError::Transport("connect refused 10.0.0.3:8000".into());
        assert!(!err.client_message().contains("10.0.0.3"));
    }
}
