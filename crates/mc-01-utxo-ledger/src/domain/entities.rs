//! Ledger results and configuration.

use serde::{Deserialize, Serialize};
use shared_types::bitcoin::{Network, Txid};
use shared_types::{Location, Utxo};

/// The typed result of applying (or re-observing) one transaction.
///
/// This is what flows from the ledger into the indexing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMutation {
    pub txid: Txid,
    /// Inputs consumed, in input order, as they look after the spend.
    pub spent: Vec<Utxo>,
    /// Outputs created, in output order.
    pub created: Vec<Utxo>,
    /// True when the transaction was already stored and nothing changed.
    pub already_known: bool,
}

impl LedgerMutation {
    pub fn created_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.created.iter().map(|utxo| utxo.location)
    }
}

/// Result of `fund`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Funding {
    /// The new funding output.
    pub utxo: Utxo,
    /// The faucet transaction that created it.
    pub mutation: LedgerMutation,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Network used to derive addresses from locking scripts.
    pub network: Network,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
        }
    }
}

/// Ledger statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub transactions: usize,
    pub utxos: usize,
    pub unspent: usize,
}
