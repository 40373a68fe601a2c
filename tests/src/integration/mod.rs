//! Cross-crate scenarios.

pub mod fixtures;

mod flows;
mod streaming;

pub use fixtures::Harness;
