//! Shared test helpers for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use collecta_engine::Engine;
use collecta_model::{
    App, Collection, CollectionCategory, CollectionSettings, Document, Pack, StoredFile,
};
use collecta_schema::{Schema, TypeDefinition};
use collecta_storage::{MemoryStorage, Storage, StorageResult, StorageTransaction};
use collecta_types::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine over a fresh in-memory store, plus a handle on that store.
pub fn engine() -> (Engine, MemoryStorage) {
    init_tracing();
    let storage = MemoryStorage::new();
    (Engine::new(Arc::new(storage.clone())), storage)
}

pub fn settings(name: &str) -> CollectionSettings {
    CollectionSettings {
        name: name.to_owned(),
        icon: "box".to_owned(),
        description: String::new(),
        collection_category_id: None,
        default_collection_view_app_id: None,
    }
}

/// `Book { title: String, sequel: DocumentRef("self")? }`
pub fn book_schema() -> Schema {
    Schema::new(
        "Book",
        [(
            "Book",
            TypeDefinition::structure([
                ("title", TypeDefinition::string()),
                ("sequel", TypeDefinition::document_ref(Some("self"))),
            ])
            .with_nullable(["sequel"]),
        )],
    )
}

/// `Author { name: String, portrait: File(image/*)? }`
pub fn author_schema() -> Schema {
    Schema::new(
        "Author",
        [(
            "Author",
            TypeDefinition::structure([
                ("name", TypeDefinition::string()),
                (
                    "portrait",
                    TypeDefinition::File {
                        accept: Some(
                            [("image/*".to_owned(), vec![".png".to_owned(), ".jpg".to_owned()])]
                                .into(),
                        ),
                    },
                ),
            ])
            .with_nullable(["portrait"]),
        )],
    )
}

/// Two categories, two collections that reference each other, an app and
/// two documents that reference each other.
pub fn library_pack() -> Pack {
    serde_json::from_value(json!({
        "id": "library",
        "info": {"name": "Library"},
        "collectionCategories": [
            {"name": "Library", "icon": "book"},
            {"name": "Fiction", "icon": "star", "parentId": "ProtoCollectionCategory_0"},
        ],
        "collections": [
            {
                "settings": {
                    "name": "Books",
                    "icon": "book",
                    "collectionCategoryId": "ProtoCollectionCategory_1",
                    "defaultCollectionViewAppId": "ProtoApp_0",
                },
                "schema": {
                    "rootType": "Book",
                    "types": {
                        "Book": {
                            "dataType": "Struct",
                            "properties": {
                                "title": {"dataType": "String"},
                                "author": {"dataType": "DocumentRef", "collectionId": "ProtoCollection_1"},
                                "relatedDoc": {"dataType": "DocumentRef", "collectionId": "self"},
                            },
                        },
                    },
                },
            },
            {
                "settings": {"name": "Authors", "icon": "user", "collectionCategoryId": "ProtoCollectionCategory_0"},
                "schema": {
                    "rootType": "Author",
                    "types": {
                        "Author": {
                            "dataType": "Struct",
                            "properties": {
                                "name": {"dataType": "String"},
                                "books": {
                                    "dataType": "List",
                                    "items": {"dataType": "DocumentRef", "collectionId": "ProtoCollection_0"},
                                },
                            },
                        },
                    },
                },
            },
        ],
        "apps": [{
            "type": "CollectionView",
            "name": "Shelf",
            "targetCollectionIds": ["ProtoCollection_0", "ProtoCollection_1"],
        }],
        "documents": [
            {
                "collectionId": "ProtoCollection_0",
                "content": {
                    "title": "Dune",
                    "author": {"collectionId": "ProtoCollection_1", "documentId": "ProtoDocument_2"},
                    "relatedDoc": {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_1"},
                },
            },
            {
                "collectionId": "ProtoCollection_0",
                "content": {
                    "title": "Dune Messiah",
                    "author": {"collectionId": "ProtoCollection_1", "documentId": "ProtoDocument_2"},
                    "relatedDoc": {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_0"},
                },
            },
            {
                "collectionId": "ProtoCollection_1",
                "content": {
                    "name": "Frank Herbert",
                    "books": [
                        {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_0"},
                        {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_1"},
                    ],
                },
            },
        ],
    }))
    .unwrap()
}

// ── Yielding storage ─────────────────────────────────────────────

/// Wraps [`MemoryStorage`] and yields to the scheduler before every write,
/// so an operation can be dropped halfway through.
pub struct YieldingStorage(pub MemoryStorage);

#[async_trait]
impl Storage for YieldingStorage {
    fn backend_name(&self) -> &'static str {
        "yielding"
    }

    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>> {
        Ok(Box::new(YieldingTransaction(self.0.begin().await?)))
    }
}

struct YieldingTransaction(Box<dyn StorageTransaction>);

#[async_trait]
impl StorageTransaction for YieldingTransaction {
    async fn create_collection_category(
        &mut self,
        name: &str,
        icon: &str,
        parent_id: Option<CollectionCategoryId>,
    ) -> StorageResult<CollectionCategory> {
        tokio::task::yield_now().await;
        self.0.create_collection_category(name, icon, parent_id).await
    }

    async fn get_collection_category(
        &self,
        id: &CollectionCategoryId,
    ) -> StorageResult<Option<CollectionCategory>> {
        self.0.get_collection_category(id).await
    }

    async fn list_collection_categories(&self) -> StorageResult<Vec<CollectionCategory>> {
        self.0.list_collection_categories().await
    }

    async fn insert_collection(&mut self, collection: Collection) -> StorageResult<()> {
        tokio::task::yield_now().await;
        self.0.insert_collection(collection).await
    }

    async fn get_collection(&self, id: &CollectionId) -> StorageResult<Option<Collection>> {
        self.0.get_collection(id).await
    }

    async fn list_collections(&self) -> StorageResult<Vec<Collection>> {
        self.0.list_collections().await
    }

    async fn insert_app(&mut self, app: App) -> StorageResult<()> {
        tokio::task::yield_now().await;
        self.0.insert_app(app).await
    }

    async fn get_app(&self, id: &AppId) -> StorageResult<Option<App>> {
        self.0.get_app(id).await
    }

    async fn list_apps(&self) -> StorageResult<Vec<App>> {
        self.0.list_apps().await
    }

    async fn insert_document(&mut self, document: Document) -> StorageResult<()> {
        tokio::task::yield_now().await;
        self.0.insert_document(document).await
    }

    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        self.0.get_document(id).await
    }

    async fn list_documents(&self, collection_id: &CollectionId) -> StorageResult<Vec<Document>> {
        self.0.list_documents(collection_id).await
    }

    async fn insert_file(&mut self, file: StoredFile) -> StorageResult<()> {
        tokio::task::yield_now().await;
        self.0.insert_file(file).await
    }

    async fn get_file(&self, id: &FileId) -> StorageResult<Option<StoredFile>> {
        self.0.get_file(id).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.0.commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.0.rollback().await
    }
}
