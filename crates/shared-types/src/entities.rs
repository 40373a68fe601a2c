//! # Core Domain Entities
//!
//! Defines the ledger entities every component agrees on.
//!
//! ## Clusters
//!
//! - **Ledger**: `Location`, `Utxo`, `SpentStatus`, `TransactionView`
//! - **Contracts**: `JigRecord`, `ChannelRecord`
//! - **Messaging**: `Message`

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

use crate::errors::LocationParseError;

/// Separator between txid and output index in a location string.
pub const LOCATION_SEPARATOR: &str = "_o";

/// Milliseconds since the Unix epoch, the timestamp unit used by clients.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// CLUSTER A: THE LEDGER
// =============================================================================

/// The unique address of one transaction output: `{txid}_o{vout}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct Location {
    /// Transaction that created the output.
    pub txid: Txid,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl Location {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// The null outpoint that coinbase inputs reference.
    pub fn is_null(&self) -> bool {
        OutPoint::new(self.txid, self.vout).is_null()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.txid, LOCATION_SEPARATOR, self.vout)
    }
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .rsplit_once(LOCATION_SEPARATOR)
            .ok_or_else(|| LocationParseError(s.to_string()))?;
        let txid = Txid::from_str(txid).map_err(|_| LocationParseError(s.to_string()))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|_| LocationParseError(s.to_string()))?;
        Ok(Self { txid, vout })
    }
}

/// A transaction output tracked by the ledger.
///
/// A UTXO is unspent while `spent_txid` is `None`. It moves to spent exactly
/// once and is never deleted, so history queries can still return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    #[serde(rename = "_id")]
    pub location: Location,
    pub txid: Txid,
    pub vout: u32,
    /// Address derived from the locking script, if it is a standard one.
    pub address: Option<String>,
    /// Output script as hex.
    pub script: String,
    pub satoshis: u64,
    /// Creation time in milliseconds.
    pub ts: i64,
    /// Lock-until time in milliseconds, `0` when unlocked.
    pub lock_until: i64,
    #[serde(rename = "spentTxId")]
    pub spent_txid: Option<Txid>,
    pub spent_index: Option<u32>,
}

impl Utxo {
    pub fn is_spent(&self) -> bool {
        self.spent_txid.is_some()
    }

    /// The address this output is indexed and notified under, falling back
    /// to the script hex for non-standard scripts.
    pub fn owner(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.script)
    }

    pub fn spent_status(&self) -> SpentStatus {
        SpentStatus {
            location: self.location,
            spent: self.is_spent(),
            spent_txid: self.spent_txid,
            spent_index: self.spent_index,
        }
    }
}

/// Spent status of a single location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpentStatus {
    pub location: Location,
    pub spent: bool,
    #[serde(rename = "spentTxId")]
    pub spent_txid: Option<Txid>,
    pub spent_index: Option<u32>,
}

/// One output of a stored transaction, annotated with its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputView {
    pub vout: u32,
    pub satoshis: u64,
    pub script: String,
    pub address: Option<String>,
    #[serde(rename = "spentTxId")]
    pub spent_txid: Option<Txid>,
    pub spent_index: Option<u32>,
}

/// A stored transaction as returned by `fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub txid: Txid,
    pub rawtx: String,
    pub inputs: Vec<Location>,
    pub outputs: Vec<OutputView>,
    pub ts: i64,
}

// =============================================================================
// CLUSTER B: CONTRACT RECORDS
// =============================================================================

/// One indexed state of a jig.
///
/// Records are append-only. The current state of a logical jig is the most
/// recently indexed record sharing its `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JigRecord {
    pub location: Location,
    /// Origin of the contract class; empty when the decoder could not tell.
    pub kind: String,
    /// Display name of the contract class.
    #[serde(rename = "type")]
    pub type_name: String,
    pub origin: Location,
    pub owner: String,
    pub ts: i64,
    pub is_origin: bool,
}

/// An addressed channel update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub loc: Location,
    pub recipients: Vec<String>,
    /// Owner of the channel output.
    #[serde(rename = "address")]
    pub owner: Option<String>,
    pub ts: i64,
}

// =============================================================================
// CLUSTER C: MESSAGING
// =============================================================================

/// A message relayed between wallets and agents.
///
/// The relay stores and fans it out as posted; `sig` is carried, never
/// checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub from: String,
    /// Addresses the message is delivered to.
    pub to: Vec<String>,
    /// Id of the message this one answers.
    pub reply: Option<String>,
    pub subject: String,
    /// Conversation contexts the message belongs to.
    pub context: Vec<String>,
    pub payload: String,
    pub ts: i64,
    pub sig: Option<String>,
}
