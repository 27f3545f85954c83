use crate::engine::{Pending, finish};
use crate::{DocumentReference, Engine, EngineError, EngineResult};
use collecta_model::{Collection, Document, DocumentSpec, StoredFile};
use collecta_schema::proto_refs::replace_proto_document_ids_and_proto_collection_ids;
use collecta_schema::walk::{visit_content, visit_content_mut};
use collecta_schema::{FileValue, Schema, SchemaStructureError, TypeDefinition};
use collecta_storage::{StorageTransaction, now_millis};
use collecta_types::{
    CollectionId, DocumentId, FileId, ResolutionContext, make_proto_document_id_mapping,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

impl Engine {
    /// Creates a document in an existing collection.
    ///
    /// ProtoFiles in the content are stored and replaced by FileRefs.
    pub async fn create_document(
        &self,
        collection_id: &CollectionId,
        content: Value,
    ) -> EngineResult<Document> {
        let mut tx = self.begin().await?;
        let result = self
            .create_document_in(&mut *tx, collection_id, content)
            .await;
        let document = finish(tx, "create_document", result).await?;
        info!(document_id = %document.id, collection_id = %collection_id, "Created document");
        Ok(document)
    }

    async fn create_document_in(
        &self,
        tx: &mut dyn StorageTransaction,
        collection_id: &CollectionId,
        content: Value,
    ) -> EngineResult<Document> {
        let collection = load_collection(tx, collection_id).await?;
        self.insert_document(tx, &Pending::default(), DocumentId::new(), &collection, content)
            .await
    }

    /// Creates several documents at once. Either all are created or none.
    ///
    /// Content may reference another document of the batch with
    /// `ProtoDocument_<i>`, `i` being that document's position in `specs`.
    pub async fn create_many_documents(
        &self,
        specs: Vec<DocumentSpec>,
    ) -> EngineResult<Vec<Document>> {
        let max = self.config().max_batch_documents;
        if specs.len() > max {
            return Err(EngineError::BatchTooLarge {
                count: specs.len(),
                max,
            });
        }

        let ids: Vec<DocumentId> = specs.iter().map(|_| DocumentId::new()).collect();
        let mut ctx = ResolutionContext::new();
        ctx.documents = make_proto_document_id_mapping(&ids);
        let pending = Pending {
            documents: ids
                .iter()
                .cloned()
                .zip(specs.iter().map(|spec| spec.collection_id.clone()))
                .collect(),
            ..Pending::default()
        };

        let mut tx = self.begin().await?;
        let result = self
            .insert_batch(&mut *tx, &pending, &ctx, ids, specs)
            .await;
        let documents = finish(tx, "create_many_documents", result).await?;
        info!(count = documents.len(), "Created documents");
        Ok(documents)
    }

    async fn insert_batch(
        &self,
        tx: &mut dyn StorageTransaction,
        pending: &Pending,
        ctx: &ResolutionContext,
        ids: Vec<DocumentId>,
        specs: Vec<DocumentSpec>,
    ) -> EngineResult<Vec<Document>> {
        let mut collections: HashMap<CollectionId, Collection> = HashMap::new();
        let mut documents = Vec::with_capacity(specs.len());
        for (id, spec) in ids.into_iter().zip(specs) {
            if !collections.contains_key(&spec.collection_id) {
                let collection = load_collection(tx, &spec.collection_id).await?;
                collections.insert(spec.collection_id.clone(), collection);
            }
            let collection = collections
                .get(&spec.collection_id)
                .ok_or_else(|| EngineError::CollectionNotFound(spec.collection_id.to_string()))?;
            let content = replace_proto_document_ids_and_proto_collection_ids(
                &collection.schema,
                &spec.content,
                ctx,
            )?;
            documents.push(
                self.insert_document(tx, pending, id, collection, content)
                    .await?,
            );
        }
        Ok(documents)
    }

    /// Validates content against its collection and stages the document.
    pub(crate) async fn insert_document(
        &self,
        tx: &mut dyn StorageTransaction,
        pending: &Pending,
        id: DocumentId,
        collection: &Collection,
        mut content: Value,
    ) -> EngineResult<Document> {
        let issues = self.validator().validate(&collection.schema, &content)?;
        if !issues.is_empty() {
            return Err(EngineError::DocumentContentNotValid {
                collection_id: collection.id.clone(),
                issues,
            });
        }

        let scan = ContentScan::of(&collection.schema, &content)?;

        let mut missing = Vec::new();
        for reference in scan.references {
            if !reference_exists(tx, pending, &id, &collection.id, &reference).await?
                && !missing.contains(&reference)
            {
                missing.push(reference);
            }
        }
        if !missing.is_empty() {
            return Err(EngineError::ReferencedDocumentsNotFound {
                references: missing,
            });
        }

        let mut missing_files = BTreeSet::new();
        for file_id in scan.file_ids {
            let exists = match FileId::parse(&file_id) {
                Ok(parsed) => tx.get_file(&parsed).await?.is_some(),
                Err(_) => false,
            };
            if !exists {
                missing_files.insert(file_id);
            }
        }
        if !missing_files.is_empty() {
            return Err(EngineError::FilesNotFound {
                file_ids: missing_files.into_iter().collect(),
            });
        }

        if !scan.new_files.is_empty() {
            let mut file_refs = Vec::with_capacity(scan.new_files.len());
            for file in scan.new_files {
                file_refs.push(file.to_file_ref());
                tx.insert_file(file).await?;
            }
            replace_proto_files(&collection.schema, &mut content, file_refs)?;
        }

        let document = Document {
            id,
            collection_id: collection.id.clone(),
            content,
            created_at: now_millis(),
        };
        tx.insert_document(document.clone()).await?;
        debug!(document_id = %document.id, collection_id = %document.collection_id, "Staged document");
        Ok(document)
    }
}

pub(crate) async fn load_collection(
    tx: &dyn StorageTransaction,
    id: &CollectionId,
) -> EngineResult<Collection> {
    tx.get_collection(id)
        .await?
        .ok_or_else(|| EngineError::CollectionNotFound(id.to_string()))
}

/// What a document's content points at.
struct ContentScan {
    references: Vec<DocumentReference>,
    file_ids: Vec<String>,
    /// ProtoFiles, in traversal order, as files ready to store.
    new_files: Vec<StoredFile>,
}

impl ContentScan {
    fn of(schema: &Schema, content: &Value) -> Result<Self, SchemaStructureError> {
        let mut scan = ContentScan {
            references: Vec::new(),
            file_ids: Vec::new(),
            new_files: Vec::new(),
        };
        visit_content(schema, content, &mut |def, _, value| match def {
            TypeDefinition::DocumentRef { .. } => {
                let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
                if let (Some(collection_id), Some(document_id)) =
                    (field("collectionId"), field("documentId"))
                {
                    scan.references.push(DocumentReference {
                        collection_id,
                        document_id,
                    });
                }
            }
            TypeDefinition::File { .. } => match FileValue::parse(value) {
                Some(FileValue::Ref { id, .. }) => scan.file_ids.push(id.to_owned()),
                Some(file @ FileValue::Proto { .. }) => scan.new_files.push(StoredFile {
                    id: FileId::new(),
                    name: file.name().to_owned(),
                    mime_type: file.mime_type().to_owned(),
                    content: file.bytes().unwrap_or_default(),
                    created_at: now_millis(),
                }),
                None => {}
            },
            _ => {}
        })?;
        Ok(scan)
    }
}

/// Whether a `DocumentRef` points at a document of the named collection:
/// the document being created, one pending in the same operation, or one
/// already stored.
async fn reference_exists(
    tx: &dyn StorageTransaction,
    pending: &Pending,
    own_id: &DocumentId,
    own_collection_id: &CollectionId,
    reference: &DocumentReference,
) -> EngineResult<bool> {
    let Ok(document_id) = DocumentId::parse(&reference.document_id) else {
        return Ok(false);
    };
    let collection_id = if &document_id == own_id {
        Some(own_collection_id.clone())
    } else if let Some(collection_id) = pending.documents.get(&document_id) {
        Some(collection_id.clone())
    } else {
        tx.get_document(&document_id)
            .await?
            .map(|document| document.collection_id)
    };
    Ok(collection_id.is_some_and(|id| id.as_str() == reference.collection_id))
}

/// Replaces the ProtoFiles of `content`, in traversal order, with `file_refs`.
fn replace_proto_files(
    schema: &Schema,
    content: &mut Value,
    file_refs: Vec<Value>,
) -> Result<(), SchemaStructureError> {
    let mut file_refs = file_refs.into_iter();
    visit_content_mut(schema, content, &mut |def, _, value| {
        let is_proto_file = matches!(def, TypeDefinition::File { .. })
            && matches!(FileValue::parse(value), Some(FileValue::Proto { .. }));
        if is_proto_file {
            if let Some(file_ref) = file_refs.next() {
                *value = file_ref;
            }
        }
    })
}
