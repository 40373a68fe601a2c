//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default HTTP port, the one wallets and agents expect.
pub const DEFAULT_HTTP_PORT: u16 = 8082;

/// Default faucet amount (1 BTC).
pub const DEFAULT_FAUCET_SATOSHIS: u64 = 100_000_000;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// SSE and WebSocket stream configuration
    pub streams: StreamConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Faucet configuration
    pub faucet: FaucetConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.limits.max_batch_locations == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_batch_locations cannot be 0".into(),
            ));
        }

        if self.streams.max_subscriptions_per_connection == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_subscriptions_per_connection cannot be 0".into(),
            ));
        }

        if self.streams.max_topics_per_stream == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_topics_per_stream cannot be 0".into(),
            ));
        }

        if self.streams.max_messages_per_second == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_messages_per_second cannot be 0".into(),
            ));
        }

        if self.streams.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.timeouts.broadcast.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "broadcast timeout cannot be 0".into(),
            ));
        }

        if self.streams.keep_alive.is_zero() || self.streams.ping_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "stream keep-alive and ping intervals cannot be 0".into(),
            ));
        }

        if self.faucet.satoshis == 0 {
            return Err(ConfigError::Invalid("faucet satoshis cannot be 0".into()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8082)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Streaming connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Interval between SSE keep-alive comments
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
    /// Interval between WebSocket pings
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
    /// Max inbound WebSocket message size in bytes
    pub max_message_size: usize,
    /// Max live subscriptions per WebSocket connection
    pub max_subscriptions_per_connection: usize,
    /// Max topics one SSE stream may cover
    pub max_topics_per_stream: usize,
    /// Max inbound WebSocket messages per second per connection
    pub max_messages_per_second: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(15),
            ping_interval: Duration::from_secs(30),
            max_message_size: 64 * 1024,
            max_subscriptions_per_connection: 100,
            max_topics_per_stream: 100,
            max_messages_per_second: 100,
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
    /// Max locations in one `POST /utxos` query
    pub max_batch_locations: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
            max_batch_locations: 1000,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for non-streaming requests
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    /// Timeout for applying one broadcast to the ledger
    #[serde(with = "humantime_serde")]
    pub broadcast: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            broadcast: Duration::from_secs(10),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins (* for any)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Last-Event-ID".to_string(),
            ],
            max_age: 3600,
        }
    }
}

/// Faucet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Amount paid by `GET /fund/:address` when no `satoshis` is given
    pub satoshis: u64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            satoshis: DEFAULT_FAUCET_SATOSHIS,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be tried before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 8082);
        assert_eq!(config.faucet.satoshis, 100_000_000);
        assert_eq!(config.http_addr().port(), 8082);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = GatewayConfig::default();
        config.limits.max_batch_locations = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimit(_))
        ));

        let mut config = GatewayConfig::default();
        config.streams.max_topics_per_stream = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = GatewayConfig::default();
        config.timeouts.broadcast = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_zero_faucet_rejected() {
        let mut config = GatewayConfig::default();
        config.faucet.satoshis = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_durations() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("15s"), Ok(Duration::from_secs(15)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_minutes_overflow_is_error() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration(&format!("{}m", u64::MAX)), Err("invalid minutes"));
        assert!(serde_json::from_str::<GatewayConfig>(
            &format!(r#"{{"timeouts":{{"request":"{}m"}}}}"#, u64::MAX / 2)
        )
        .is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"http":{"port":9000},"timeouts":{"broadcast":"250ms"}}"#,
        )
        .unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.timeouts.broadcast, Duration::from_millis(250));
        assert_eq!(config.timeouts.request, Duration::from_secs(30));
        assert_eq!(config.streams.keep_alive, Duration::from_secs(15));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeouts"]["broadcast"], "250ms");
        assert_eq!(json["timeouts"]["request"], "30s");
    }
}
