//! Error types for the storage layer.

use collecta_types::IdKind;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// An entity with this id already exists.
    #[error("{kind} {id} already exists")]
    DuplicateId { kind: IdKind, id: String },

    /// The backend could not complete the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
