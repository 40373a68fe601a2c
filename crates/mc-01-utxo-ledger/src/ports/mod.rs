//! Ports for the UTXO Ledger subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::UtxoLedgerApi;
pub use outbound::{MutationSink, MutationSlot};
