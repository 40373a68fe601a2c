use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Not found: message {id}")]
    NotFound { id: String },

    /// The message names an empty recipient or context.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
