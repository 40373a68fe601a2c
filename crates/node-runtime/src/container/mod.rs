//! # Subsystem Container
//!
//! Configuration plus the subsystem instances it produces.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig};
pub use subsystems::SubsystemContainer;
