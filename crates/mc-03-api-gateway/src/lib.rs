//! # API Gateway (mc-03)
//!
//! The network face of the mockchain. One axum router serves:
//!
//! - **REST**: broadcast, transaction and UTXO lookups, the faucet, and the
//!   jig/channel record queries.
//! - **SSE**: `/notify/*` streams backed by notification bus subscriptions,
//!   resumable through `Last-Event-ID`.
//! - **WebSocket**: `/ws`, where one connection subscribes and unsubscribes
//!   topics with JSON control messages.
//!
//! ## Request flow
//!
//! ```text
//! POST /broadcast ──► UtxoLedgerApi::broadcast ──► IndexerHandle (queued at commit)
//!                                                     │ (background)
//!                                                     ▼
//!                                         TransactionIndexer ──► NotificationBus
//!                                                                      │
//!                                      SSE / WebSocket subscribers ◄───┘
//! ```
//!
//! The gateway never queues mutations itself; the ledger it is given must
//! deliver into the same pipeline. The response to a broadcast does not wait
//! for indexing. Clients that need to observe the effects subscribe first and
//! read the events.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod domain;
pub mod middleware;
pub mod rest;
pub mod service;
pub mod sse;
pub mod ws;

pub use domain::{
    ApiError, ApiResult, ConfigError, ConnectionId, GatewayConfig, GatewayError, StreamInfo,
    StreamRegistry, StreamTransport,
};
pub use service::{AppState, GatewayService};
