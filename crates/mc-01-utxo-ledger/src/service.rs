//! # UTXO Ledger Service
//!
//! The in-memory ledger implementing `UtxoLedgerApi`.
//!
//! ## Concurrency
//!
//! One `RwLock` guards the whole `LedgerState`. `broadcast` decodes outside
//! the lock, then validates and applies inside a single write section, so
//! two transactions touching the same input are strictly ordered and the
//! loser sees `DoubleSpendOrMissingInput`. Readers take the read lock and
//! see either the state before a broadcast or after it.
//!
//! When a `MutationSink` is attached, a slot is reserved before the write
//! lock is taken and filled before it is released. The sink therefore sees
//! mutations in commit order, and a committed mutation always reaches it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::bitcoin::Txid;
use shared_types::{
    locking_script, script_for_query, DecodedTransaction, Location, SpentStatus,
    TransactionBuilder, TransactionView, Utxo,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{
    Funding, LedgerConfig, LedgerError, LedgerMutation, LedgerResult, LedgerState, LedgerStats,
};
use crate::ports::inbound::UtxoLedgerApi;
use crate::ports::outbound::{MutationSink, MutationSlot};

pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    config: LedgerConfig,
    /// Receives every committed mutation, in commit order.
    sink: Option<Arc<dyn MutationSink>>,
    /// Makes every faucet transaction unique.
    fund_nonce: AtomicI64,
}

impl InMemoryLedger {
    /// A ledger without a downstream consumer. Callers index mutations
    /// themselves.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            state: RwLock::new(LedgerState::new(config.network)),
            config,
            sink: None,
            fund_nonce: AtomicI64::new(0),
        }
    }

    /// A ledger that hands every committed mutation to `sink`.
    pub fn with_sink(config: LedgerConfig, sink: Arc<dyn MutationSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn reserve(&self) -> LedgerResult<Option<Box<dyn MutationSlot>>> {
        match &self.sink {
            Some(sink) => Ok(Some(sink.reserve().await?)),
            None => Ok(None),
        }
    }
}

fn deliver(slot: Option<Box<dyn MutationSlot>>, mutation: &LedgerMutation) {
    if let Some(slot) = slot {
        slot.deliver(mutation.clone());
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[async_trait]
impl UtxoLedgerApi for InMemoryLedger {
    async fn fund(&self, address: &str, satoshis: u64) -> LedgerResult<Funding> {
        let nonce = self.fund_nonce.fetch_add(1, Ordering::Relaxed) + 1;
        let tx = TransactionBuilder::new()
            .coinbase(nonce)
            .pay_to_address(address, satoshis)
            .map_err(LedgerError::invalid_address)?
            .build();
        let decoded = DecodedTransaction::from_transaction(&tx);

        let slot = self.reserve().await?;
        let mut state = self.state.write().await;
        let mutation = state.apply(decoded);
        deliver(slot, &mutation);
        drop(state);

        let utxo = mutation.created.first().cloned().ok_or_else(|| {
            LedgerError::MalformedTransaction("faucet transaction has no output".to_string())
        })?;

        info!(
            txid = %mutation.txid,
            address,
            satoshis,
            "Funded address"
        );
        Ok(Funding { utxo, mutation })
    }

    async fn broadcast(&self, rawtx: &str) -> LedgerResult<LedgerMutation> {
        let decoded = DecodedTransaction::from_hex(rawtx).map_err(LedgerError::malformed)?;
        let txid = decoded.txid;

        let slot = self.reserve().await?;
        let mut state = self.state.write().await;
        if let Some(known) = state.replay_mutation(&txid) {
            // Re-delivered so a consumer that lost it can catch up.
            deliver(slot, &known);
            debug!(txid = %txid, "Transaction already applied");
            return Ok(known);
        }
        if let Err(err) = state.validate(&decoded) {
            warn!(txid = %txid, error = %err, "Broadcast rejected");
            return Err(err);
        }
        let mutation = state.apply(decoded);
        deliver(slot, &mutation);
        drop(state);

        info!(
            txid = %txid,
            spent = mutation.spent.len(),
            created = mutation.created.len(),
            "Transaction applied"
        );
        Ok(mutation)
    }

    async fn fetch(&self, txid: &Txid) -> LedgerResult<TransactionView> {
        self.state
            .read()
            .await
            .transaction_view(txid)
            .ok_or_else(|| LedgerError::not_found(format!("transaction {txid}")))
    }

    async fn utxos(&self, address_or_script: &str, include_spent: bool) -> LedgerResult<Vec<Utxo>> {
        let script = script_for_query(address_or_script).map_err(LedgerError::invalid_address)?;
        let key = hex::encode(locking_script(&script).as_bytes());
        Ok(self
            .state
            .read()
            .await
            .utxos_for_script(&key, include_spent))
    }

    async fn utxos_by_location(&self, locations: &[Location]) -> Vec<Utxo> {
        let state = self.state.read().await;
        locations
            .iter()
            .filter_map(|location| state.utxo(location).cloned())
            .collect()
    }

    async fn is_spent(&self, location: &Location) -> LedgerResult<SpentStatus> {
        self.state
            .read()
            .await
            .spent_status(location)
            .ok_or_else(|| LedgerError::not_found(format!("location {location}")))
    }

    async fn transactions(&self) -> Vec<TransactionView> {
        self.state.read().await.transaction_views()
    }

    async fn stats(&self) -> LedgerStats {
        self.state.read().await.stats()
    }
}
