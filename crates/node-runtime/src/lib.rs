//! # Node Runtime Library
//!
//! Wiring for the mockchain binary, exposed as a library for testing.
//!
//! ```text
//!                 ┌──────────────────── API Gateway ────────────────────┐
//!  HTTP / SSE /WS │ broadcast, fund ──► UTXO Ledger                      │
//!                 │        │                                            │
//!                 │        └─ LedgerMutation ─► pipeline ─► Tx Indexer  │
//!                 │                                            │        │
//!                 │ streams ◄─────────── Notification Bus ◄────┘        │
//!                 └─────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod container;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::{NodeRuntime, SHUTDOWN_GRACE};
