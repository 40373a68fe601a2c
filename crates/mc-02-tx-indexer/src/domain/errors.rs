use shared_types::Location;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexingError {
    /// One output could not be decoded. The rest of the transaction is
    /// still indexed.
    #[error("Failed to decode output {location}: {message}")]
    Decode { location: Location, message: String },

    #[error("Indexing pipeline closed")]
    PipelineClosed,
}

/// A recognized commitment whose body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }

    pub fn at(self, location: Location) -> IndexingError {
        IndexingError::Decode {
            location,
            message: self.0,
        }
    }
}
