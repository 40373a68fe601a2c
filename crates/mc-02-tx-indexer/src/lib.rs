//! # Transaction Indexer Subsystem (mc-02)
//!
//! Derives jig and channel records from ledger mutations and publishes every
//! ledger change to the notification bus.
//!
//! ## Flow
//!
//! ```text
//! LedgerMutation ──► IndexerHandle ──► indexing task
//!                                          │
//!                                          ▼
//!                    created outputs ──► CommitmentDecoder::classify
//!                                          │
//!            ┌─────────────┬───────────────┼──────────────┐
//!            ▼             ▼               ▼              ▼
//!         Payment    JigCommitment   ChannelUpdate   Unrecognized
//!                          │               │
//!                          ▼               ▼
//!                      JigRecord     ChannelRecord ──► NotificationBus
//! ```
//!
//! ## Invariants
//!
//! - Records are append-only and keyed by location; re-indexing is a no-op.
//! - A decode failure on one output never aborts the rest of the
//!   transaction.
//! - The current state of a jig is the latest record sharing its origin.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): classification types, `RecordIndex`,
//!   `JigQuery`
//! - **Ports Layer** (`ports/`): `CommitmentDecoder`
//! - **Adapters Layer** (`adapters/`): `EnvelopeDecoder`
//! - **Service** (`service.rs`, `pipeline.rs`): `TransactionIndexer` and its
//!   task

pub mod adapters;
pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod service;

pub use adapters::EnvelopeDecoder;
pub use domain::{
    ChannelUpdate, DecodeError, IndexerStats, IndexingError, JigCommitment, JigQuery, OutputClass,
    RecordIndex, SortOrder, DEFAULT_QUERY_LIMIT,
};
pub use pipeline::{spawn_pipeline, IndexerHandle};
pub use ports::CommitmentDecoder;
pub use service::{IndexReport, IndexerConfig, TransactionIndexer, DEFAULT_QUEUE_CAPACITY};
