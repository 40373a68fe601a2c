//! # UTXO Ledger Subsystem (mc-01)
//!
//! The ledger is the single authority over unspent transaction outputs and
//! stored transactions. It accepts hex raw transactions, checks that every
//! input exists and is unspent, and applies the spend-and-create as one
//! atomic step.
//!
//! ## Mutation flow
//!
//! ```text
//! rawtx ──decode──► DecodedTransaction
//!                         │
//!                  reserve sink slot
//!                         │
//!            ┌────────────┴─────────────┐  write lock
//!            │ known txid? ─► replay    │
//!            │ validate inputs          │
//!            │ spend inputs, create     │
//!            │ outputs, store tx        │
//!            │ deliver to the slot      │
//!            └────────────┬─────────────┘
//!                         ▼
//!                  LedgerMutation ──► indexing pipeline
//! ```
//!
//! Delivery happens under the write lock, so the pipeline receives
//! mutations in commit order.
//!
//! ## Invariants
//!
//! - A UTXO is unspent or spent exactly once; it is never deleted.
//! - A rejected broadcast leaves the UTXO set unchanged.
//! - Re-broadcasting a stored transaction changes nothing and reports
//!   `already_known`.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): `LedgerState`, errors, results
//! - **Ports Layer** (`ports/`): `UtxoLedgerApi` (inbound), `MutationSink` (outbound)
//! - **Service** (`service.rs`): `InMemoryLedger`

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    Funding, InputRejection, LedgerConfig, LedgerError, LedgerMutation, LedgerResult, LedgerState,
    LedgerStats, SinkClosed,
};
pub use ports::{MutationSink, MutationSlot, UtxoLedgerApi};
pub use service::InMemoryLedger;
