//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::bitcoin::Txid;
use shared_types::{Location, SpentStatus, TransactionView, Utxo};

use crate::domain::{Funding, LedgerMutation, LedgerResult, LedgerStats};

/// Primary UTXO Ledger API.
///
/// The ledger is the single mutation authority over UTXOs and transactions.
/// Reads may observe the state before or after an in-flight `broadcast`,
/// never a partially applied one.
#[async_trait]
pub trait UtxoLedgerApi: Send + Sync {
    /// Create a funding output owned by `address` through a faucet
    /// transaction.
    ///
    /// # Errors
    /// * `InvalidAddress` - `address` does not parse
    async fn fund(&self, address: &str, satoshis: u64) -> LedgerResult<Funding>;

    /// Apply a hex raw transaction atomically.
    ///
    /// # Errors
    /// * `MalformedTransaction` - undecodable, coinbase, or input-less
    /// * `DoubleSpendOrMissingInput` - an input is missing, spent, or
    ///   repeated; nothing is applied
    async fn broadcast(&self, rawtx: &str) -> LedgerResult<LedgerMutation>;

    /// A stored transaction with per-output spent annotations.
    async fn fetch(&self, txid: &Txid) -> LedgerResult<TransactionView>;

    /// UTXOs indexed under an address or hex script.
    async fn utxos(&self, address_or_script: &str, include_spent: bool) -> LedgerResult<Vec<Utxo>>;

    /// Batch lookup. Unknown locations are omitted.
    async fn utxos_by_location(&self, locations: &[Location]) -> Vec<Utxo>;

    async fn is_spent(&self, location: &Location) -> LedgerResult<SpentStatus>;

    /// Every stored transaction, in broadcast order.
    async fn transactions(&self) -> Vec<TransactionView>;

    async fn stats(&self) -> LedgerStats;
}
