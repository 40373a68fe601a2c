//! Adapters for the Transaction Indexer subsystem.

pub mod envelope;

pub use envelope::EnvelopeDecoder;
