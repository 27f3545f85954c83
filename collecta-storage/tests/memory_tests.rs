use collecta_model::{App, Collection, CollectionSettings, Document, StoredFile, VersionSettings};
use collecta_schema::{Schema, TypeDefinition};
use collecta_storage::{MemoryStorage, Storage, StorageError, now_millis};
use collecta_types::{AppId, CollectionId, DocumentId, FileId, IdKind};
use pretty_assertions::assert_eq;
use serde_json::json;

fn collection(id: &CollectionId) -> Collection {
    Collection {
        id: id.clone(),
        settings: CollectionSettings {
            name: "Books".into(),
            icon: "book".into(),
            description: String::new(),
            collection_category_id: None,
            default_collection_view_app_id: None,
        },
        schema: Schema::new("Book", [("Book", TypeDefinition::structure([("title", TypeDefinition::string())]))]),
        version_settings: VersionSettings::default(),
        created_at: now_millis(),
    }
}

fn document(collection_id: &CollectionId, title: &str) -> Document {
    Document {
        id: DocumentId::new(),
        collection_id: collection_id.clone(),
        content: json!({"title": title}),
        created_at: now_millis(),
    }
}

// ── Commit & rollback ────────────────────────────────────────────

#[tokio::test]
async fn committed_writes_are_visible_to_new_transactions() {
    let storage = MemoryStorage::new();
    let id = CollectionId::new();

    let mut tx = storage.begin().await.unwrap();
    tx.insert_collection(collection(&id)).await.unwrap();
    tx.commit().await.unwrap();

    let tx = storage.begin().await.unwrap();
    assert_eq!(tx.get_collection(&id).await.unwrap().map(|c| c.id), Some(id));
    assert_eq!(storage.entity_count().await, 1);
}

#[tokio::test]
async fn uncommitted_writes_are_only_visible_inside_the_transaction() {
    let storage = MemoryStorage::new();
    let id = CollectionId::new();

    let mut writer = storage.begin().await.unwrap();
    writer.insert_collection(collection(&id)).await.unwrap();
    assert!(writer.get_collection(&id).await.unwrap().is_some());

    let reader = storage.begin().await.unwrap();
    assert!(reader.get_collection(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn rollback_discards_writes() {
    let storage = MemoryStorage::new();
    let mut tx = storage.begin().await.unwrap();
    tx.create_collection_category("Library", "book", None).await.unwrap();
    tx.insert_app(App {
        id: AppId::new(),
        app_type: "CollectionView".into(),
        name: "Shelf".into(),
        target_collection_ids: vec![],
        files: Default::default(),
        created_at: now_millis(),
    })
    .await
    .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(storage.entity_count().await, 0);
}

#[tokio::test]
async fn dropping_a_transaction_discards_writes() {
    let storage = MemoryStorage::new();
    {
        let mut tx = storage.begin().await.unwrap();
        tx.create_collection_category("Library", "book", None).await.unwrap();
    }
    assert_eq!(storage.entity_count().await, 0);
}

// ── Ids ──────────────────────────────────────────────────────────

#[tokio::test]
async fn category_ids_are_minted_by_the_store() {
    let storage = MemoryStorage::new();
    let mut tx = storage.begin().await.unwrap();
    let parent = tx.create_collection_category("Library", "book", None).await.unwrap();
    let child = tx
        .create_collection_category("Fiction", "star", Some(parent.id.clone()))
        .await
        .unwrap();
    assert_ne!(parent.id, child.id);
    assert_eq!(child.parent_id, Some(parent.id.clone()));
    tx.commit().await.unwrap();

    let tx = storage.begin().await.unwrap();
    let names: Vec<_> = tx
        .list_collection_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Library", "Fiction"]);
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let storage = MemoryStorage::new();
    let id = CollectionId::new();
    let mut tx = storage.begin().await.unwrap();
    tx.insert_collection(collection(&id)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = storage.begin().await.unwrap();
    let err = tx.insert_collection(collection(&id)).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::DuplicateId {
            kind: IdKind::Collection,
            id: id.to_string()
        }
    );
}

#[tokio::test]
async fn racing_transactions_with_the_same_id_commit_once() {
    let storage = MemoryStorage::new();
    let id = CollectionId::new();
    let mut first = storage.begin().await.unwrap();
    let mut second = storage.begin().await.unwrap();
    first.insert_collection(collection(&id)).await.unwrap();
    second.insert_collection(collection(&id)).await.unwrap();

    first.commit().await.unwrap();
    assert!(matches!(
        second.commit().await,
        Err(StorageError::DuplicateId { .. })
    ));
    assert_eq!(storage.entity_count().await, 1);
}

// ── Documents & files ────────────────────────────────────────────

#[tokio::test]
async fn documents_are_listed_per_collection_in_creation_order() {
    let storage = MemoryStorage::new();
    let books = CollectionId::new();
    let authors = CollectionId::new();

    let mut tx = storage.begin().await.unwrap();
    tx.insert_document(document(&books, "Dune")).await.unwrap();
    tx.insert_document(document(&authors, "Herbert")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = storage.begin().await.unwrap();
    tx.insert_document(document(&books, "Emma")).await.unwrap();
    let titles: Vec<_> = tx
        .list_documents(&books)
        .await
        .unwrap()
        .iter()
        .filter_map(|d| d.get_str("/title").map(str::to_owned))
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma"]);
}

#[tokio::test]
async fn files_roundtrip() {
    let storage = MemoryStorage::new();
    let file = StoredFile {
        id: FileId::new(),
        name: "cover.png".into(),
        mime_type: "image/png".into(),
        content: vec![137, 80, 78, 71],
        created_at: now_millis(),
    };
    let mut tx = storage.begin().await.unwrap();
    tx.insert_file(file.clone()).await.unwrap();
    tx.commit().await.unwrap();

    let tx = storage.begin().await.unwrap();
    assert_eq!(tx.get_file(&file.id).await.unwrap(), Some(file));
}

// ── Fault injection ──────────────────────────────────────────────

#[tokio::test]
async fn writes_fail_after_the_budget() {
    let storage = MemoryStorage::new();
    storage.fail_writes_after(1);
    let mut tx = storage.begin().await.unwrap();
    tx.create_collection_category("a", "a", None).await.unwrap();
    let err = tx.create_collection_category("b", "b", None).await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));

    storage.clear_write_failures();
    tx.create_collection_category("c", "c", None).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(storage.entity_count().await, 2);
}

#[test]
fn backend_name() {
    assert_eq!(MemoryStorage::new().backend_name(), "memory");
}
