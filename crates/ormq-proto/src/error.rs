//! Protocol error types.

use thiserror::Error;

/// Errors raised while building or decoding filters.
#[derive(Debug, Error)]
pub enum Error {
    /// A builder was given arguments it cannot represent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Serialization or JSON conversion failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
