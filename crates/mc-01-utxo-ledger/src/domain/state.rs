//! # Ledger State
//!
//! The UTXO set, the per-script index and the stored transactions. Pure
//! bookkeeping: no locking and no I/O. The service wraps it in a lock and
//! calls `validate` and `apply` inside the same write section.

use std::collections::{HashMap, HashSet};

use shared_types::bitcoin::{Address, Network, Txid};
use shared_types::{
    locking_script, now_millis, DecodedTransaction, Location, OutputView, SpentStatus,
    TransactionView, Utxo,
};

use super::entities::{LedgerMutation, LedgerStats};
use super::errors::{InputRejection, LedgerError, LedgerResult};

struct StoredTransaction {
    decoded: DecodedTransaction,
    ts: i64,
}

pub struct LedgerState {
    network: Network,
    utxos: HashMap<Location, Utxo>,
    /// Locking-script hex → locations, in creation order.
    by_script: HashMap<String, Vec<Location>>,
    transactions: HashMap<Txid, StoredTransaction>,
    /// Txids in broadcast order.
    order: Vec<Txid>,
}

impl LedgerState {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            utxos: HashMap::new(),
            by_script: HashMap::new(),
            transactions: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn contains_transaction(&self, txid: &Txid) -> bool {
        self.transactions.contains_key(txid)
    }

    /// Check every input without touching state.
    pub fn validate(&self, tx: &DecodedTransaction) -> LedgerResult<()> {
        if tx.coinbase || tx.inputs.iter().any(Location::is_null) {
            return Err(LedgerError::MalformedTransaction(
                "coinbase inputs cannot be broadcast".to_string(),
            ));
        }
        if tx.inputs.is_empty() {
            return Err(LedgerError::MalformedTransaction(
                "transaction has no inputs".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for location in &tx.inputs {
            if !seen.insert(*location) {
                return Err(LedgerError::rejected(*location, InputRejection::DuplicateInput));
            }
            match self.utxos.get(location) {
                None => return Err(LedgerError::rejected(*location, InputRejection::Missing)),
                Some(utxo) => {
                    if let Some(spent_txid) = utxo.spent_txid {
                        return Err(LedgerError::rejected(
                            *location,
                            InputRejection::AlreadySpent { spent_txid },
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Spend the inputs, create the outputs and store the transaction.
    ///
    /// Callers must have validated `tx` under the same lock.
    pub fn apply(&mut self, tx: DecodedTransaction) -> LedgerMutation {
        let ts = now_millis();
        let txid = tx.txid;

        let mut spent = Vec::with_capacity(tx.inputs.len());
        for (index, location) in (0u32..).zip(&tx.inputs) {
            if let Some(utxo) = self.utxos.get_mut(location) {
                utxo.spent_txid = Some(txid);
                utxo.spent_index = Some(index);
                spent.push(utxo.clone());
            }
        }

        let mut created = Vec::with_capacity(tx.outputs.len());
        for output in &tx.outputs {
            let locking = locking_script(&output.script);
            let location = tx.output_location(output.vout);
            let utxo = Utxo {
                location,
                txid,
                vout: output.vout,
                address: Address::from_script(locking, self.network)
                    .ok()
                    .map(|address| address.to_string()),
                script: hex::encode(output.script.as_bytes()),
                satoshis: output.satoshis,
                ts,
                lock_until: 0,
                spent_txid: None,
                spent_index: None,
            };
            self.by_script
                .entry(hex::encode(locking.as_bytes()))
                .or_default()
                .push(location);
            self.utxos.insert(location, utxo.clone());
            created.push(utxo);
        }

        self.transactions
            .insert(txid, StoredTransaction { decoded: tx, ts });
        self.order.push(txid);

        LedgerMutation {
            txid,
            spent,
            created,
            already_known: false,
        }
    }

    /// The mutation a stored transaction produced, as it looks now.
    pub fn replay_mutation(&self, txid: &Txid) -> Option<LedgerMutation> {
        let stored = self.transactions.get(txid)?;
        let spent = stored
            .decoded
            .inputs
            .iter()
            .filter_map(|location| self.utxos.get(location).cloned())
            .collect();
        let created = stored
            .decoded
            .outputs
            .iter()
            .filter_map(|output| self.utxos.get(&stored.decoded.output_location(output.vout)).cloned())
            .collect();
        Some(LedgerMutation {
            txid: *txid,
            spent,
            created,
            already_known: true,
        })
    }

    pub fn transaction_view(&self, txid: &Txid) -> Option<TransactionView> {
        let stored = self.transactions.get(txid)?;
        let outputs = stored
            .decoded
            .outputs
            .iter()
            .map(|output| {
                let utxo = self.utxos.get(&stored.decoded.output_location(output.vout));
                OutputView {
                    vout: output.vout,
                    satoshis: output.satoshis,
                    script: hex::encode(output.script.as_bytes()),
                    address: utxo.and_then(|u| u.address.clone()),
                    spent_txid: utxo.and_then(|u| u.spent_txid),
                    spent_index: utxo.and_then(|u| u.spent_index),
                }
            })
            .collect();

        Some(TransactionView {
            txid: *txid,
            rawtx: stored.decoded.rawtx.clone(),
            inputs: stored.decoded.inputs.clone(),
            outputs,
            ts: stored.ts,
        })
    }

    pub fn transaction_views(&self) -> Vec<TransactionView> {
        self.order
            .iter()
            .filter_map(|txid| self.transaction_view(txid))
            .collect()
    }

    /// UTXOs locked by `locking_hex`, unspent only unless `include_spent`.
    pub fn utxos_for_script(&self, locking_hex: &str, include_spent: bool) -> Vec<Utxo> {
        self.by_script
            .get(locking_hex)
            .map(|locations| {
                locations
                    .iter()
                    .filter_map(|location| self.utxos.get(location))
                    .filter(|utxo| include_spent || !utxo.is_spent())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn utxo(&self, location: &Location) -> Option<&Utxo> {
        self.utxos.get(location)
    }

    pub fn spent_status(&self, location: &Location) -> Option<SpentStatus> {
        self.utxos.get(location).map(Utxo::spent_status)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            transactions: self.transactions.len(),
            utxos: self.utxos.len(),
            unspent: self.utxos.values().filter(|utxo| !utxo.is_spent()).count(),
        }
    }
}
