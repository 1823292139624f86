//! Gateway error taxonomy.
//!
//! Every failure past startup is scoped to one connection or one request.
//! Handlers turn these into HTTP responses at the edge; nothing here ends
//! the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::routing::RouteError;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Describes things that can go wrong in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    // startup
    #[error("Failed to listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid route table: {0}")]
    Route(#[from] RouteError),
    #[error("Invalid backend address: {0}")]
    InvalidBackend(String),
    #[error("Invalid header name: {0}")]
    InvalidHeader(String),

    // per connection
    #[error("Failed to reach backend {target}: {reason}")]
    Dial { target: String, reason: String },
    #[error("Upgrade handshake failed: {0}")]
    UpgradeHandshake(String),
    #[error("Relay I/O error: {0}")]
    RelayIo(#[from] std::io::Error),

    // per request
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl GatewayError {
    pub fn dial(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Dial {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Status code presented to the caller when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedPayload(_) | GatewayError::UpgradeHandshake(_) => StatusCode::BAD_REQUEST,
            GatewayError::Dial { .. } | GatewayError::RelayIo(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GatewayError::MalformedPayload(_) => "Malformed request payload",
            GatewayError::UpgradeHandshake(_) => "Upgrade handshake failed",
            GatewayError::Dial { .. } => "Upstream request failed",
            GatewayError::RelayIo(_) => "Upstream relay failed",
            _ => "Internal gateway error",
        };
        (status, body).into_response()
    }
}
