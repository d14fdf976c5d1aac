//! Core error types.

use thiserror::Error;

/// Errors raised while resolving metadata or compiling a collection query.
///
/// None of these are transient; they signal a mapping or caller defect.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity is not declared in the schema.
    #[error("unknown entity `{entity}`")]
    UnknownEntity { entity: String },

    /// Property is not declared on the entity.
    #[error("unknown property `{property}` on entity `{entity}`")]
    UnknownProperty { entity: String, property: String },

    /// The arguments cannot be compiled, e.g. an aggregation without a join.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant was violated.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The function has no implementation for the active backend.
    #[error("function `{function}` is not supported by the {backend} backend")]
    NotSupported {
        function: String,
        backend: &'static str,
    },

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ormq_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
