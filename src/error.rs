//! Error types for snapshot persistence.

use crate::types::{Hash, RecordId};
use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::documents::DocumentStore)
/// implementation. Passed through to callers unmodified.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Insert rejected: {0}")]
    InsertRejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Other(String),
}

/// Main error type for persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Integrity check failed for record {record}: expected {expected}, got {got}")]
    Integrity {
        record: RecordId,
        expected: Hash,
        got: Hash,
    },

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("No snapshot for instance: {0}")]
    InstanceNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] BackendError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl PersistenceError {
    /// True for both not-found kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PersistenceError::RecordNotFound(_) | PersistenceError::InstanceNotFound(_)
        )
    }

    /// True when stored content no longer matches what was written.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            PersistenceError::Integrity { .. } | PersistenceError::Corruption(_)
        )
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
