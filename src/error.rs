/// Unified error types for the vLEI BFF
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the BFF
#[derive(Error, Debug)]
pub enum BffError {
    /// Identifier configuration invariant violations (caught before any
    /// network call reaches the agent)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rotation attempted on a non-transferable identifier
    #[error("Rotation not allowed: {0}")]
    RotationNotAllowed(String),

    /// Remote operation did not complete within the caller's deadline
    #[error("Operation {operation} timed out after {elapsed_ms}ms")]
    OperationTimeout { operation: String, elapsed_ms: u64 },

    /// Remote agent reported the operation completed with an error.
    /// The agent's payload is preserved verbatim.
    #[error("Remote operation failed: {payload}")]
    RemoteOperation { payload: serde_json::Value },

    /// Transport-level failures talking to the agent
    #[error("Agent error: {0}")]
    Agent(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert BffError to HTTP response
impl IntoResponse for BffError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            BffError::Configuration(_) => (
                StatusCode::BAD_REQUEST,
                "ConfigurationError",
                self.to_string(),
            ),
            BffError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            BffError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            BffError::RotationNotAllowed(_) => (
                StatusCode::CONFLICT,
                "RotationNotAllowed",
                self.to_string(),
            ),
            BffError::OperationTimeout { .. } => (
                StatusCode::GATEWAY_TIMEOUT,
                "OperationTimeout",
                self.to_string(),
            ),
            BffError::RemoteOperation { payload } => (
                StatusCode::BAD_GATEWAY,
                "RemoteOperationFailed",
                payload.to_string(),
            ),
            BffError::Agent(_) => (
                StatusCode::BAD_GATEWAY,
                "AgentUnavailable",
                self.to_string(),
            ),
            BffError::Internal(_) | BffError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for BFF operations
pub type BffResult<T> = Result<T, BffError>;
