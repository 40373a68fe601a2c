//! # Error Types
//!
//! Defines error types used across components.

use thiserror::Error;

/// Errors raised while decoding or building raw transactions and scripts.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The raw transaction was not valid hex.
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The bytes were not a consensus-encoded transaction.
    #[error("Invalid transaction encoding: {0}")]
    Consensus(#[from] bitcoin::consensus::encode::Error),

    /// A push exceeded the script push limit.
    #[error("Invalid script push: {0}")]
    Push(#[from] bitcoin::script::PushBytesError),

    /// The string is neither a valid address nor a hex script.
    #[error("Invalid address or script: {value} ({message})")]
    Address { value: String, message: String },
}

/// A location string that is not of the form `{txid}_o{vout}`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid location: {0}")]
pub struct LocationParseError(pub String);
