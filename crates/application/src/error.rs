//! Application error taxonomy.
//!
//! Every failure a fetch can hit maps onto one of these variants, and every
//! variant renders a human-readable message: callers surface `to_string()`
//! through `PaginationState.error` without further mapping.

use thiserror::Error;

use riptide_domain::DomainError;

use crate::ports::{CredentialStoreError, TransportError};

/// Errors surfaced by the request pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never reached the server, or the server was unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Parsed response body (JSON, or a JSON string for text bodies).
        body: serde_json::Value,
    },

    /// A 401 survived the refresh-and-retry attempt, or no usable credential
    /// was available for an authenticated endpoint.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// A transform step rejected the payload.
    #[error("transform error: {0}")]
    Transform(String),

    /// The payload did not match the normalization schema.
    #[error("normalization error: {0}")]
    Normalization(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Shorthand for an HTTP error with a plain-text body.
    #[must_use]
    pub fn http_text(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: serde_json::Value::String(body.into()),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<CredentialStoreError> for ApiError {
    fn from(error: CredentialStoreError) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidQuery(message) => Self::Transform(message),
            other => Self::Normalization(other.to_string()),
        }
    }
}

/// Result type alias for application operations.
pub type ApiResult<T> = Result<T, ApiError>;
