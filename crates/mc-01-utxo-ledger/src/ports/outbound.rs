//! Outbound (Driven) ports for the UTXO Ledger subsystem.
//!
//! The ledger hands every committed mutation to a downstream consumer (the
//! indexing pipeline) from inside its write section, so the consumer sees
//! mutations in exactly the order the ledger committed them.

use async_trait::async_trait;

use crate::domain::LedgerMutation;
pub use crate::domain::SinkClosed;

/// Room for exactly one mutation, reserved before the ledger commits.
///
/// Delivering never waits, so it can happen while the write lock is held.
/// Dropping an undelivered slot releases the room.
pub trait MutationSlot: Send {
    fn deliver(self: Box<Self>, mutation: LedgerMutation);
}

/// Receiver of committed ledger mutations.
///
/// The ledger reserves a slot before it takes the write lock and delivers
/// into it only after a successful commit. A caller cancelled while waiting
/// for room therefore leaves the ledger untouched, and a commit can never be
/// lost between the ledger and the sink.
#[async_trait]
pub trait MutationSink: Send + Sync {
    /// Wait until the sink can accept one more mutation.
    async fn reserve(&self) -> Result<Box<dyn MutationSlot>, SinkClosed>;
}
