//! The engine: entity creation on top of a [`Storage`].

use crate::{EngineConfig, EngineError, EngineResult};
use collecta_model::{App, Collection, CollectionCategory, Document, StoredFile};
use collecta_schema::{ContentValidator, Format, FormatRegistry};
use collecta_storage::{Storage, StorageTransaction};
use collecta_types::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Creates and reads Collecta entities.
///
/// Every write operation runs in a single storage transaction: it either
/// commits everything it created or nothing at all.
pub struct Engine {
    storage: Arc<dyn Storage>,
    formats: FormatRegistry,
    config: EngineConfig,
}

/// Ids allocated by the running operation for entities it has not created
/// yet. References to them are accepted because the operation creates them
/// before committing, or fails as a whole.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    pub(crate) collections: HashSet<CollectionId>,
    pub(crate) apps: HashSet<AppId>,
    /// Document id to the collection it will belong to.
    pub(crate) documents: HashMap<DocumentId, CollectionId>,
}

impl Engine {
    /// Creates an engine with the built-in formats and default limits.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    pub fn with_config(storage: Arc<dyn Storage>, config: EngineConfig) -> Self {
        Self {
            storage,
            formats: FormatRegistry::with_builtins(),
            config,
        }
    }

    /// Adds a format, replacing a registered one with the same target and id.
    pub fn register_format(&mut self, format: impl Format + 'static) {
        self.formats.register(format);
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn validator(&self) -> ContentValidator<'_> {
        ContentValidator::new(&self.formats)
            .with_max_json_object_depth(self.config.max_json_object_depth)
    }

    pub(crate) async fn begin(&self) -> EngineResult<Box<dyn StorageTransaction>> {
        Ok(self.storage.begin().await?)
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn get_collection_category(
        &self,
        id: &CollectionCategoryId,
    ) -> EngineResult<Option<CollectionCategory>> {
        Ok(self.begin().await?.get_collection_category(id).await?)
    }

    pub async fn list_collection_categories(&self) -> EngineResult<Vec<CollectionCategory>> {
        Ok(self.begin().await?.list_collection_categories().await?)
    }

    pub async fn get_collection(&self, id: &CollectionId) -> EngineResult<Option<Collection>> {
        Ok(self.begin().await?.get_collection(id).await?)
    }

    pub async fn list_collections(&self) -> EngineResult<Vec<Collection>> {
        Ok(self.begin().await?.list_collections().await?)
    }

    pub async fn get_app(&self, id: &AppId) -> EngineResult<Option<App>> {
        Ok(self.begin().await?.get_app(id).await?)
    }

    pub async fn list_apps(&self) -> EngineResult<Vec<App>> {
        Ok(self.begin().await?.list_apps().await?)
    }

    pub async fn get_document(&self, id: &DocumentId) -> EngineResult<Option<Document>> {
        Ok(self.begin().await?.get_document(id).await?)
    }

    /// Documents of a collection, in creation order.
    pub async fn list_documents(&self, collection_id: &CollectionId) -> EngineResult<Vec<Document>> {
        Ok(self.begin().await?.list_documents(collection_id).await?)
    }

    pub async fn get_file(&self, id: &FileId) -> EngineResult<Option<StoredFile>> {
        Ok(self.begin().await?.get_file(id).await?)
    }
}

/// Commits `tx` if `result` is a success, rolls it back otherwise.
pub(crate) async fn finish<T>(
    tx: Box<dyn StorageTransaction>,
    operation: &'static str,
    result: EngineResult<T>,
) -> EngineResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            warn!(operation, error = %e, "Operation failed, rolling back");
            if let Err(rollback_error) = tx.rollback().await {
                warn!(operation, error = %rollback_error, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Fails with `CollectionNotFound` unless the collection exists or is pending.
pub(crate) async fn ensure_collection(
    tx: &dyn StorageTransaction,
    pending: &Pending,
    id: &CollectionId,
) -> EngineResult<()> {
    if pending.collections.contains(id) || tx.get_collection(id).await?.is_some() {
        Ok(())
    } else {
        Err(EngineError::CollectionNotFound(id.to_string()))
    }
}
