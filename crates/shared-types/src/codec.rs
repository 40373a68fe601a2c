//! # Raw Transaction Codec
//!
//! Raw transactions are hex-encoded Bitcoin consensus bytes. Decoding keeps
//! only what the ledger does bookkeeping on: the txid, the input locations and
//! the output scripts and values. Spending conditions are never evaluated.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::script::Builder;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::entities::Location;
use crate::errors::CodecError;
use crate::script::parse_address;

/// A decoded transaction, reduced to its bookkeeping data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub txid: Txid,
    /// Locations consumed by the inputs, in input order.
    pub inputs: Vec<Location>,
    pub outputs: Vec<DecodedOutput>,
    /// True when the only input has a null outpoint.
    pub coinbase: bool,
    /// Canonical hex encoding.
    pub rawtx: String,
}

/// One output of a decoded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOutput {
    pub vout: u32,
    pub satoshis: u64,
    pub script: ScriptBuf,
}

impl DecodedTransaction {
    /// Decode a hex raw transaction.
    pub fn from_hex(rawtx: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(rawtx.trim())?;
        let tx: Transaction = encode::deserialize(&bytes)?;
        Ok(Self::from_transaction(&tx))
    }

    pub fn from_transaction(tx: &Transaction) -> Self {
        let txid = tx.compute_txid();
        let inputs = tx
            .input
            .iter()
            .map(|input| Location::new(input.previous_output.txid, input.previous_output.vout))
            .collect();
        let outputs = tx
            .output
            .iter()
            .zip(0u32..)
            .map(|(output, vout)| DecodedOutput {
                vout,
                satoshis: output.value.to_sat(),
                script: output.script_pubkey.clone(),
            })
            .collect();

        Self {
            txid,
            inputs,
            outputs,
            coinbase: tx.is_coinbase(),
            rawtx: encode::serialize_hex(tx),
        }
    }

    pub fn output_location(&self, vout: u32) -> Location {
        Location::new(self.txid, vout)
    }
}

/// Builds unsigned transactions for the faucet, test harnesses and tools.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend the output at `location`.
    pub fn spend(mut self, location: Location) -> Self {
        self.inputs.push(TxIn {
            previous_output: OutPoint::new(location.txid, location.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        self
    }

    /// Add a coinbase-style input. `nonce` keeps otherwise identical
    /// transactions from sharing a txid.
    pub fn coinbase(mut self, nonce: i64) -> Self {
        self.inputs.push(TxIn {
            previous_output: OutPoint::null(),
            script_sig: Builder::new().push_int(nonce).into_script(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        self
    }

    /// Pay `satoshis` to an arbitrary output script.
    pub fn pay(mut self, script: ScriptBuf, satoshis: u64) -> Self {
        self.outputs.push(TxOut {
            value: Amount::from_sat(satoshis),
            script_pubkey: script,
        });
        self
    }

    /// Pay `satoshis` to an address.
    pub fn pay_to_address(self, address: &str, satoshis: u64) -> Result<Self, CodecError> {
        let script = parse_address(address)?.script_pubkey();
        Ok(self.pay(script, satoshis))
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: self.inputs,
            output: self.outputs,
        }
    }

    /// Build and hex-encode.
    pub fn to_hex(self) -> String {
        encode::serialize_hex(&self.build())
    }
}
