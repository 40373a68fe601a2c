//! # Domain Layer
//!
//! The message store and relay errors.

pub mod errors;
pub mod store;

pub use errors::{RelayError, RelayResult};
pub use store::MessageStore;
