//! Storage abstraction traits.

use crate::StorageResult;
use async_trait::async_trait;
use collecta_model::{App, Collection, CollectionCategory, Document, StoredFile};
use collecta_types::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId};

/// A store of Collecta entities.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the name of the backend.
    fn backend_name(&self) -> &'static str;

    /// Starts a transaction. Must provide at least read-committed isolation.
    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>>;
}

/// One unit of work against a [`Storage`].
///
/// Dropping a transaction without calling [`StorageTransaction::commit`]
/// discards its writes.
#[async_trait]
pub trait StorageTransaction: Send + Sync {
    /// Creates a category. The store mints its id.
    async fn create_collection_category(
        &mut self,
        name: &str,
        icon: &str,
        parent_id: Option<CollectionCategoryId>,
    ) -> StorageResult<CollectionCategory>;

    async fn get_collection_category(
        &self,
        id: &CollectionCategoryId,
    ) -> StorageResult<Option<CollectionCategory>>;

    async fn list_collection_categories(&self) -> StorageResult<Vec<CollectionCategory>>;

    /// Inserts a collection whose id was allocated by the caller.
    async fn insert_collection(&mut self, collection: Collection) -> StorageResult<()>;

    async fn get_collection(&self, id: &CollectionId) -> StorageResult<Option<Collection>>;

    async fn list_collections(&self) -> StorageResult<Vec<Collection>>;

    async fn insert_app(&mut self, app: App) -> StorageResult<()>;

    async fn get_app(&self, id: &AppId) -> StorageResult<Option<App>>;

    async fn list_apps(&self) -> StorageResult<Vec<App>>;

    async fn insert_document(&mut self, document: Document) -> StorageResult<()>;

    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>>;

    /// Documents of one collection, in creation order.
    async fn list_documents(&self, collection_id: &CollectionId) -> StorageResult<Vec<Document>>;

    async fn insert_file(&mut self, file: StoredFile) -> StorageResult<()>;

    async fn get_file(&self, id: &FileId) -> StorageResult<Option<StoredFile>>;

    /// Makes every staged write visible, all at once.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discards every staged write.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
