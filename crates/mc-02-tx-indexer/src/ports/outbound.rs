//! Driven Ports (SPI - Outbound)

use shared_types::bitcoin::Script;

use crate::domain::{DecodeError, OutputClass};

/// Recognizes jig and channel commitments in output scripts.
///
/// Supplied by the contract-execution layer. `EnvelopeDecoder` is the
/// built-in implementation.
pub trait CommitmentDecoder: Send + Sync {
    /// Classify one output script.
    ///
    /// Unrecognized scripts are `Ok(OutputClass::Unrecognized)`. An error
    /// means the script claimed to be a commitment but its body was invalid.
    fn classify(&self, script: &Script) -> Result<OutputClass, DecodeError>;
}
