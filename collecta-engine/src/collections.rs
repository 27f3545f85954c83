use crate::engine::{Pending, finish};
use crate::{Engine, EngineError, EngineResult};
use collecta_model::{Collection, CollectionSettings, VersionSettings};
use collecta_schema::proto_refs::{document_ref_collection_ids, replace_self_collection_id};
use collecta_schema::{Issue, PathSegment, Schema, TypeDefinition};
use collecta_storage::{StorageTransaction, now_millis};
use collecta_types::CollectionId;
use tracing::{debug, info};

impl Engine {
    /// Creates a collection.
    ///
    /// `"self"` in a `DocumentRef.collectionId` of the schema is replaced by
    /// the new collection's id. Every other `collectionId` must be a real id.
    pub async fn create_collection(
        &self,
        settings: CollectionSettings,
        schema: Schema,
        version_settings: VersionSettings,
    ) -> EngineResult<Collection> {
        let mut tx = self.begin().await?;
        let result = insert_collection(
            &mut *tx,
            &Pending::default(),
            CollectionId::new(),
            settings,
            &schema,
            version_settings,
        )
        .await;
        let collection = finish(tx, "create_collection", result).await?;
        info!(collection_id = %collection.id, "Created collection");
        Ok(collection)
    }
}

/// Checks what a stored schema must satisfy beyond being well formed.
fn schema_issues(schema: &Schema) -> Result<Vec<Issue>, EngineError> {
    schema.check_structure()?;
    let mut issues = Vec::new();

    let root = schema.resolved_root()?;
    if !matches!(root, TypeDefinition::Struct { .. }) {
        issues.push(Issue::schema(
            format!(
                "Invalid root type: Expected Struct but received {}",
                root.data_type()
            ),
            vec![PathSegment::name("rootType")],
        ));
    }

    for (type_name, collection_id) in document_ref_collection_ids(schema) {
        if CollectionId::parse(collection_id).is_err() {
            issues.push(Issue::schema(
                format!("Invalid DocumentRef: \"{collection_id}\" is not a collection id"),
                vec![
                    PathSegment::name("types"),
                    PathSegment::name(type_name),
                    PathSegment::name("collectionId"),
                ],
            ));
        }
    }
    Ok(issues)
}

pub(crate) async fn insert_collection(
    tx: &mut dyn StorageTransaction,
    pending: &Pending,
    id: CollectionId,
    settings: CollectionSettings,
    schema: &Schema,
    version_settings: VersionSettings,
) -> EngineResult<Collection> {
    let schema = replace_self_collection_id(schema, &id);
    let issues = schema_issues(&schema)?;
    if !issues.is_empty() {
        return Err(EngineError::CollectionSchemaNotValid { issues });
    }

    if let Some(category_id) = &settings.collection_category_id {
        if tx.get_collection_category(category_id).await?.is_none() {
            return Err(EngineError::CollectionCategoryNotFound(category_id.to_string()));
        }
    }
    if let Some(app_id) = &settings.default_collection_view_app_id {
        if !pending.apps.contains(app_id) && tx.get_app(app_id).await?.is_none() {
            return Err(EngineError::AppNotFound(app_id.to_string()));
        }
    }

    let collection = Collection {
        id,
        settings,
        schema,
        version_settings,
        created_at: now_millis(),
    };
    tx.insert_collection(collection.clone()).await?;
    debug!(collection_id = %collection.id, "Staged collection");
    Ok(collection)
}
