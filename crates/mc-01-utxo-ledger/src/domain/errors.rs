use shared_types::bitcoin::Txid;
use shared_types::{CodecError, Location};
use std::fmt;
use thiserror::Error;

/// Why an input was rejected by `broadcast`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejection {
    /// The location was never created.
    Missing,
    /// The location was already consumed.
    AlreadySpent { spent_txid: Txid },
    /// The transaction lists the same location twice.
    DuplicateInput,
}

impl fmt::Display for InputRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "input does not exist"),
            Self::AlreadySpent { spent_txid } => write!(f, "already spent by {spent_txid}"),
            Self::DuplicateInput => write!(f, "input listed more than once"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Double spend or missing input {location}: {reason}")]
    DoubleSpendOrMissingInput {
        location: Location,
        reason: InputRejection,
    },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The indexing pipeline no longer accepts mutations; nothing was applied.
    #[error("Indexing pipeline closed")]
    PipelineClosed,
}

impl LedgerError {
    pub fn not_found(resource: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
        }
    }

    pub(crate) fn rejected(location: Location, reason: InputRejection) -> Self {
        Self::DoubleSpendOrMissingInput { location, reason }
    }

    /// Codec failures on a raw transaction.
    pub(crate) fn malformed(err: CodecError) -> Self {
        Self::MalformedTransaction(err.to_string())
    }

    /// Codec failures on an address or script query.
    pub(crate) fn invalid_address(err: CodecError) -> Self {
        match err {
            CodecError::Address { value, message } => Self::InvalidAddress(format!("{value}: {message}")),
            other => Self::InvalidAddress(other.to_string()),
        }
    }
}

/// The consumer behind a `MutationSink` has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mutation sink closed")]
pub struct SinkClosed;

impl From<SinkClosed> for LedgerError {
    fn from(_: SinkClosed) -> Self {
        Self::PipelineClosed
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
