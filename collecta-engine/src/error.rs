//! Error types for engine operations.

use collecta_schema::{Issue, SchemaStructureError};
use collecta_storage::StorageError;
use collecta_types::{CollectionId, IdError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A `DocumentRef` in content that points at no existing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub collection_id: String,
    pub document_id: String,
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection_id, self.document_id)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur in engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The pack has structural reference problems. Nothing was created.
    #[error("pack is not valid: {}", join(.issues))]
    PackNotValid { issues: Vec<Issue> },

    #[error("collection schema is not valid: {}", join(.issues))]
    CollectionSchemaNotValid { issues: Vec<Issue> },

    #[error("document content is not valid for collection {collection_id}: {}", join(.issues))]
    DocumentContentNotValid {
        collection_id: CollectionId,
        issues: Vec<Issue>,
    },

    #[error("files not found: {}", .file_ids.join(", "))]
    FilesNotFound { file_ids: Vec<String> },

    #[error("referenced documents not found: {}", join(.references))]
    ReferencedDocumentsNotFound { references: Vec<DocumentReference> },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("collection category not found: {0}")]
    CollectionCategoryNotFound(String),

    #[error("app not found: {0}")]
    AppNotFound(String),

    /// A batch holds more documents than the engine accepts at once.
    #[error("batch of {count} documents exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error(transparent)]
    SchemaStructure(#[from] SchemaStructureError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The issues carried by validation errors, if any.
    pub fn issues(&self) -> &[Issue] {
        match self {
            EngineError::PackNotValid { issues }
            | EngineError::CollectionSchemaNotValid { issues }
            | EngineError::DocumentContentNotValid { issues, .. } => issues,
            _ => &[],
        }
    }
}
