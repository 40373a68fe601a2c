//! Ports for the Transaction Indexer subsystem.

pub mod outbound;

pub use outbound::CommitmentDecoder;
