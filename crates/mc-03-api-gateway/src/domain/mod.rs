//! Domain types for the API Gateway.
//!
//! Configuration, error mapping and the open-stream registry.

pub mod config;
pub mod error;
pub mod streams;

pub use config::{
    ConfigError, CorsConfig, FaucetConfig, GatewayConfig, HttpConfig, LimitsConfig, StreamConfig,
    TimeoutConfig, DEFAULT_FAUCET_SATOSHIS, DEFAULT_HTTP_PORT,
};
pub use error::{ApiError, GatewayError};
pub use streams::{ConnectionId, StreamGuard, StreamInfo, StreamRegistry, StreamTransport};

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;
