//! # Domain Layer
//!
//! Pure ledger bookkeeping for the UTXO Ledger subsystem.
//!
//! This module contains NO I/O and no locking. Concurrency is the service's
//! concern.

pub mod entities;
pub mod errors;
pub mod state;

pub use entities::*;
pub use errors::*;
pub use state::LedgerState;
