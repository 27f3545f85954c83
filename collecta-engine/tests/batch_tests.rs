mod common;

use collecta_engine::{Engine, EngineConfig, EngineError};
use collecta_model::{DocumentSpec, VersionSettings};
use collecta_storage::MemoryStorage;
use common::{book_schema, engine, settings};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

// ── Atomic batches ───────────────────────────────────────────────

#[tokio::test]
async fn batch_creates_every_document() {
    let (engine, _) = engine();
    let books = engine
        .create_collection(settings("Books"), book_schema(), VersionSettings::default())
        .await
        .unwrap();
    let specs = ["Dune", "Emma", "Ulysses"]
        .into_iter()
        .map(|title| DocumentSpec {
            collection_id: books.id.clone(),
            content: json!({"title": title, "sequel": null}),
        })
        .collect();

    let created = engine.create_many_documents(specs).await.unwrap();
    assert_eq!(created.len(), 3);
    let stored = engine.list_documents(&books.id).await.unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn one_invalid_document_fails_the_whole_batch() {
    let (engine, _) = engine();
    let books = engine
        .create_collection(settings("Books"), book_schema(), VersionSettings::default())
        .await
        .unwrap();
    let specs = vec![
        DocumentSpec {
            collection_id: books.id.clone(),
            content: json!({"title": "Dune", "sequel": null}),
        },
        DocumentSpec {
            collection_id: books.id.clone(),
            content: json!({"title": 7, "sequel": null}),
        },
    ];

    let err = engine.create_many_documents(specs).await.unwrap_err();
    assert!(matches!(err, EngineError::DocumentContentNotValid { .. }));
    assert!(engine.list_documents(&books.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_documents_can_reference_each_other() {
    let (engine, _) = engine();
    let books = engine
        .create_collection(settings("Books"), book_schema(), VersionSettings::default())
        .await
        .unwrap();
    let link = |index: usize| {
        json!({"collectionId": books.id.as_str(), "documentId": format!("ProtoDocument_{index}")})
    };
    let specs = vec![
        DocumentSpec {
            collection_id: books.id.clone(),
            content: json!({"title": "Dune", "sequel": link(1)}),
        },
        DocumentSpec {
            collection_id: books.id.clone(),
            content: json!({"title": "Dune Messiah", "sequel": link(0)}),
        },
    ];

    let created = engine.create_many_documents(specs).await.unwrap();
    assert_eq!(
        created[0].content["sequel"]["documentId"],
        json!(created[1].id.as_str())
    );
    assert_eq!(
        created[1].content["sequel"]["documentId"],
        json!(created[0].id.as_str())
    );
}

#[tokio::test]
async fn batch_reference_outside_the_batch_fails() {
    let (engine, storage) = engine();
    let books = engine
        .create_collection(settings("Books"), book_schema(), VersionSettings::default())
        .await
        .unwrap();
    let specs = vec![DocumentSpec {
        collection_id: books.id.clone(),
        content: json!({
            "title": "Dune",
            "sequel": {"collectionId": books.id.as_str(), "documentId": "ProtoDocument_5"},
        }),
    }];
    let err = engine.create_many_documents(specs).await.unwrap_err();
    assert!(matches!(err, EngineError::ReferencedDocumentsNotFound { .. }));
    assert_eq!(storage.entity_count().await, 1);
}

#[tokio::test]
async fn batch_size_is_limited() {
    let storage = MemoryStorage::new();
    let config = EngineConfig {
        max_batch_documents: 1,
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(Arc::new(storage), config);
    let collection_id = collecta_types::CollectionId::new();
    let specs = vec![
        DocumentSpec {
            collection_id: collection_id.clone(),
            content: json!({}),
        },
        DocumentSpec {
            collection_id,
            content: json!({}),
        },
    ];
    assert_eq!(
        engine.create_many_documents(specs).await.unwrap_err(),
        EngineError::BatchTooLarge { count: 2, max: 1 }
    );
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let (engine, storage) = engine();
    assert!(engine.create_many_documents(Vec::new()).await.unwrap().is_empty());
    assert_eq!(storage.entity_count().await, 0);
}
