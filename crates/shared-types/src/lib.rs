//! # Shared Types Crate
//!
//! This crate contains the ledger entities exchanged between the mockchain
//! components: the UTXO ledger, the transaction indexer, the notification bus
//! and the API gateway.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-component types are defined here.
//! - **Wire Compatibility**: JSON field names match what wallet and agent
//!   clients already read (`_id`, `spentTxId`, `isOrigin`, ...).
//! - **Real Transactions**: Raw transactions are Bitcoin consensus bytes,
//!   decoded with the `bitcoin` crate rather than a simulator-only format.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod script;

pub use codec::{DecodedOutput, DecodedTransaction, TransactionBuilder};
pub use entities::*;
pub use errors::*;
pub use script::{
    envelope_script, locking_script, owner_of, parse_address, script_for_query, split_envelope,
    Envelope, CHANNEL_TAG, JIG_TAG,
};

/// Re-exported so downstream crates agree on a single `bitcoin` version.
pub use bitcoin;
