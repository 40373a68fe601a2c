//! # Message Relay Subsystem (mc-04)
//!
//! Wallets and agents talk to each other through the mockchain: a posted
//! message is stored under its id and published as a `msg` event.
//!
//! ## Fan-out
//!
//! ```text
//! POST /messages ──► MessageRelayApi::post
//!                         │ store (bounded, oldest evicted first)
//!                         ├──► address:<to>        for each recipient
//!                         ├──► context:<context>   for each context
//!                         └──► subject:<subject>   when set
//! ```
//!
//! Storing and publishing happen under one lock, so a client woken by the
//! event can always fetch the message by id (until it is evicted).
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): `MessageStore`, errors
//! - **Ports Layer** (`ports/`): `MessageRelayApi`
//! - **Service** (`service.rs`): `MessageRelay`

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{MessageStore, RelayError, RelayResult};
pub use ports::MessageRelayApi;
pub use service::{MessageRelay, RelayConfig, DEFAULT_MAX_MESSAGES};
