//! Domain errors for the issue tracker.

use thiserror::Error;

/// Domain-level errors raised by the document store and the issue service.
///
/// None of these reach a client verbatim: the HTTP adapter logs them and
/// answers with a fixed, generic body.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid stored document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
