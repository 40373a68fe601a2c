//! # Node Configuration
//!
//! Unified configuration for every subsystem, built from defaults and
//! overridden by environment variables:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `MOCKCHAIN_HOST` | HTTP bind address |
//! | `MOCKCHAIN_PORT` (or `PORT`) | HTTP port |
//! | `MOCKCHAIN_NETWORK` | `bitcoin`, `testnet`, `signet` or `regtest` |
//! | `MOCKCHAIN_FAUCET_SATOSHIS` | default faucet amount |
//! | `MOCKCHAIN_EVENT_RETENTION` | events retained per topic |
//! | `MOCKCHAIN_SUBSCRIBER_CAPACITY` | live events buffered per subscriber |
//! | `MOCKCHAIN_MAX_MESSAGES` | relayed messages kept for lookup |
//!
//! Values that do not parse are logged and ignored.

use std::fmt::Display;
use std::str::FromStr;

use mc_01_utxo_ledger::LedgerConfig;
use mc_02_tx_indexer::IndexerConfig;
use mc_03_api_gateway::GatewayConfig;
use mc_04_message_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use shared_bus::BusConfig;
use tracing::{info, warn};

pub const ENV_HOST: &str = "MOCKCHAIN_HOST";
pub const ENV_PORT: &str = "MOCKCHAIN_PORT";
pub const ENV_PORT_FALLBACK: &str = "PORT";
pub const ENV_NETWORK: &str = "MOCKCHAIN_NETWORK";
pub const ENV_FAUCET_SATOSHIS: &str = "MOCKCHAIN_FAUCET_SATOSHIS";
pub const ENV_EVENT_RETENTION: &str = "MOCKCHAIN_EVENT_RETENTION";
pub const ENV_SUBSCRIBER_CAPACITY: &str = "MOCKCHAIN_SUBSCRIBER_CAPACITY";
pub const ENV_MAX_MESSAGES: &str = "MOCKCHAIN_MAX_MESSAGES";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub ledger: LedgerConfig,
    pub bus: BusConfig,
    pub indexer: IndexerConfig,
    pub relay: RelayConfig,
    pub gateway: GatewayConfig,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("gateway: {0}")]
    Gateway(#[from] mc_03_api_gateway::ConfigError),

    #[error("bus: {0}")]
    Bus(String),

    #[error("indexer: {0}")]
    Indexer(String),

    #[error("relay: {0}")]
    Relay(String),
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = parse_var(&lookup, ENV_HOST) {
            self.gateway.http.host = host;
        }
        let port = parse_var(&lookup, ENV_PORT).or_else(|| parse_var(&lookup, ENV_PORT_FALLBACK));
        if let Some(port) = port {
            self.gateway.http.port = port;
        }
        if let Some(network) = parse_var(&lookup, ENV_NETWORK) {
            self.ledger.network = network;
        }
        if let Some(satoshis) = parse_var(&lookup, ENV_FAUCET_SATOSHIS) {
            self.gateway.faucet.satoshis = satoshis;
        }
        if let Some(retention) = parse_var(&lookup, ENV_EVENT_RETENTION) {
            self.bus.retention = retention;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_SUBSCRIBER_CAPACITY) {
            self.bus.channel_capacity = capacity;
        }
        if let Some(max) = parse_var(&lookup, ENV_MAX_MESSAGES) {
            self.relay.max_messages = max;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;

        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::Bus("channel_capacity cannot be 0".into()));
        }
        if self.bus.retention == 0 {
            return Err(ConfigError::Bus("retention cannot be 0".into()));
        }
        if self.indexer.queue_capacity == 0 {
            return Err(ConfigError::Indexer("queue_capacity cannot be 0".into()));
        }
        if self.relay.max_messages == 0 {
            return Err(ConfigError::Relay("max_messages cannot be 0".into()));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => {
            info!(key, value = %raw.trim(), "Configuration override");
            Some(value)
        }
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid configuration value");
            None
        }
    }
}
