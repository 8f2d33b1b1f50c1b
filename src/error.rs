//! Domain-specific error types for cdc-firefighter

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single tool invocation against the MCP backend.
///
/// Always contained by the aggregator and reported in-band; never fails a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Failed to connect to MCP at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Timeout calling MCP after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("MCP request failed: {message}")]
    Request { message: String },

    #[error("MCP HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid MCP response (malformed JSON): {body}")]
    MalformedBody { body: String },

    #[error("MCP error: {message}")]
    Application { message: String },
}

/// Failure of the answer-synthesis capability.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Synthesis backend request failed: {message}")]
    Transport { message: String },

    #[error("Synthesis backend HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Synthesis backend returned an unreadable response: {message}")]
    MalformedResponse { message: String },

    #[error("Synthesis backend returned an empty response")]
    EmptyResponse,
}

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Answer synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError::Internal {
            message: err.to_string(),
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Synthesis(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert GatewayError to an HTTP error body
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            GatewayError::Synthesis(err) => format!("Error generating answer: {err}"),
            GatewayError::Validation { message } => message.clone(),
            other => format!("Internal server error: {other}"),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
