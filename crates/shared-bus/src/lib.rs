//! # Shared Bus - Notification Bus for Ledger Events
//!
//! A topic-keyed, append-only event log with live fan-out. Wallets, agents
//! and UIs subscribe to the topics they care about and resume after a
//! disconnect from the last sequence number they saw.
//!
//! ## Replay-then-live
//!
//! ```text
//!                publish()                      subscribe(topics, after = S)
//!  Indexer ──────────────┐                  ┌──────────────────────── Client
//!                        ▼                  │
//!                 ┌────────────────────────────────┐
//!                 │ Notification Bus (one lock)    │
//!                 │  sequence ─► 1 2 3 … S S+1 …   │
//!                 │  topic log ─► retained events  │
//!                 └────────────────────────────────┘
//!                        │                  │
//!                        │ live             │ backlog (seq > S)
//!                        ▼                  ▼
//!                     bounded sink ──► Subscription stream
//! ```
//!
//! The backlog is captured and the sink registered in the same critical
//! section as `publish`, so every event after `S` is delivered exactly once,
//! in sequence order.
//!
//! ## Policies
//!
//! - **Buffering:** each subscription owns a bounded channel. A subscriber
//!   whose channel is full when an event arrives is disconnected; it
//!   reconnects with its last sequence number.
//! - **Retention:** each topic keeps its most recent events. Older replay
//!   points are flagged as truncated.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventType, NotificationEvent, Topic, TopicParseError};
pub use publisher::{BusConfig, BusStats, EventPublisher, NotificationBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum live events to buffer per subscriber before it is disconnected.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Events retained per topic for catch-up replay.
pub const DEFAULT_TOPIC_RETENTION: usize = 10_000;
