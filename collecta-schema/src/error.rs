//! Errors for schemas that cannot be used to validate anything.

use thiserror::Error;

/// The schema itself is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaStructureError {
    #[error("root type {0:?} is not declared in the schema")]
    MissingRootType(String),

    #[error("referenced type {0:?} is not declared in the schema")]
    UnknownRef(String),

    #[error("type {0:?} is a chain of references that never reaches a definition")]
    RefCycle(String),
}
