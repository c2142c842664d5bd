//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during normalization or query building.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A record in a paginated payload has no usable value under the schema's
    /// identifier field.
    #[error("record is missing identifier field `{0}`")]
    MissingIdentifier(String),

    /// A payload element had a shape the normalizer cannot process.
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// A query parameter could not be encoded.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
