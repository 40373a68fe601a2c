//! API Gateway error types with HTTP status mapping.
//!
//! Error bodies are plain text so clients can read them with `text()`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mc_01_utxo_ledger::LedgerError;
use mc_02_tx_indexer::IndexingError;
use mc_04_message_relay::RelayError;
use shared_types::LocationParseError;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// API error carrying the HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Resource not found (transaction, location, jig, channel)
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Not found: {resource}"))
    }

    /// Bad path, query or body parameter
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Request exceeds a configured limit
    pub fn limit_exceeded(limit: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Limit exceeded: {}", limit.into()),
        )
    }

    /// Operation did not complete in time
    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            format!("Timeout: {operation} did not complete within {after:?}"),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), message = %self.message, "Request failed");
        } else {
            debug!(status = self.status.as_u16(), message = %self.message, "Request rejected");
        }
        (self.status, self.message).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::DoubleSpendOrMissingInput { .. } => StatusCode::CONFLICT,
            LedgerError::MalformedTransaction(_) | LedgerError::InvalidAddress(_) => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::PipelineClosed => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = match &err {
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            RelayError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

impl From<IndexingError> for ApiError {
    fn from(err: IndexingError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<LocationParseError> for ApiError {
    fn from(err: LocationParseError) -> Self {
        Self::invalid_params(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_params(format!("invalid JSON body: {err}"))
    }
}

/// Gateway-level errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server bind error
    #[error("server bind error: {0}")]
    Bind(#[from] std::io::Error),

    /// Shutdown in progress
    #[error("shutdown in progress")]
    ShuttingDown,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
