//! Pack installation.
//!
//! A pack is installed in four phases:
//! 1. structural validation of every proto id reference (nothing is written)
//! 2. allocation of real ids for collections, apps and documents
//! 3. creation inside one transaction: categories one by one (a category's
//!    id exists only once it is created), then collections, apps and
//!    documents with every proto id replaced by its real id
//! 4. commit, or rollback of everything on the first failure

use crate::apps::insert_app;
use crate::categories::create_collection_category;
use crate::collections::insert_collection;
use crate::documents::load_collection;
use crate::engine::{Pending, finish};
use crate::{Engine, EngineError, EngineResult};
use collecta_model::{
    App, Collection, CollectionCategory, CollectionSettings, Document, Pack,
    ProtoCollectionSettings,
};
use collecta_schema::proto_refs::{
    content_id_references, document_ref_collection_ids, replace_proto_collection_ids,
    replace_proto_document_ids_and_proto_collection_ids,
};
use collecta_schema::{Issue, PathSegment};
use collecta_storage::{StorageTransaction, now_millis};
use collecta_types::{
    AppId, CollectionCategoryId, CollectionId, DocumentId, FileId, IdKind, ProtoId, ResolutionContext,
    SELF_COLLECTION_ID, make_proto_app_id_mapping, make_proto_collection_id_mapping,
    make_proto_document_id_mapping, replace_proto_app_id, replace_proto_collection_category_id,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// The entities created by one pack install, in pack order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInstallation {
    pub collection_categories: Vec<CollectionCategory>,
    pub collections: Vec<Collection>,
    pub apps: Vec<App>,
    pub documents: Vec<Document>,
}

impl Engine {
    /// Checks every reference of the pack without touching storage.
    ///
    /// Returns the issues found; an empty list means the pack can be
    /// installed as far as its internal references go.
    pub fn validate_pack(&self, pack: &Pack) -> Vec<Issue> {
        PackChecker::new(pack, self.config().max_pack_entities).run()
    }

    /// Installs a pack atomically.
    ///
    /// Fails with [`EngineError::PackNotValid`] before writing anything if
    /// a reference is malformed, and rolls back every entity created so far
    /// if a later step fails.
    pub async fn install_pack(&self, pack: &Pack) -> EngineResult<PackInstallation> {
        info!(
            pack_id = %pack.id,
            categories = pack.collection_categories.len(),
            collections = pack.collections.len(),
            apps = pack.apps.len(),
            documents = pack.documents.len(),
            "Installing pack"
        );

        let issues = self.validate_pack(pack);
        if !issues.is_empty() {
            info!(pack_id = %pack.id, issues = issues.len(), "Pack rejected");
            return Err(EngineError::PackNotValid { issues });
        }

        let ids = PreallocatedIds::for_pack(pack);
        let ctx = ids.resolution_context();
        let pending = ids.pending(pack, &ctx)?;

        let mut tx = self.begin().await?;
        let result = self.install_in(&mut *tx, pack, &ids, ctx, &pending).await;
        let installation = finish(tx, "install_pack", result).await?;
        info!(pack_id = %pack.id, "Installed pack");
        Ok(installation)
    }

    async fn install_in(
        &self,
        tx: &mut dyn StorageTransaction,
        pack: &Pack,
        ids: &PreallocatedIds,
        mut ctx: ResolutionContext,
        pending: &Pending,
    ) -> EngineResult<PackInstallation> {
        let mut categories = Vec::with_capacity(pack.collection_categories.len());
        for (index, spec) in pack.collection_categories.iter().enumerate() {
            let parent_id = replace_proto_collection_category_id(
                spec.parent_id.as_deref(),
                &ctx.collection_categories,
            )
            .map(|id| CollectionCategoryId::parse(&id))
            .transpose()?;
            let category = create_collection_category(tx, &spec.name, &spec.icon, parent_id).await?;
            ctx.collection_categories
                .insert(index, category.id.as_str());
            categories.push(category);
        }
        debug!(pack_id = %pack.id, count = categories.len(), "Pack categories staged");

        let mut collections = Vec::with_capacity(pack.collections.len());
        for (id, spec) in ids.collections.iter().zip(&pack.collections) {
            let settings = resolve_settings(&spec.settings, &ctx)?;
            let schema = replace_proto_collection_ids(&spec.schema, &ctx.collections);
            let collection = insert_collection(
                tx,
                pending,
                id.clone(),
                settings,
                &schema,
                spec.version_settings.clone(),
            )
            .await?;
            collections.push(collection);
        }

        let mut apps = Vec::with_capacity(pack.apps.len());
        for (id, spec) in ids.apps.iter().zip(&pack.apps) {
            let target_collection_ids = spec
                .target_collection_ids
                .iter()
                .map(|target| resolve_collection_id(target, &ctx))
                .collect::<EngineResult<Vec<_>>>()?;
            let app = App {
                id: id.clone(),
                app_type: spec.app_type.clone(),
                name: spec.name.clone(),
                target_collection_ids,
                files: spec.files.clone(),
                created_at: now_millis(),
            };
            apps.push(insert_app(tx, pending, app).await?);
        }

        let mut documents = Vec::with_capacity(pack.documents.len());
        for (id, spec) in ids.documents.iter().zip(&pack.documents) {
            let collection_id = resolve_collection_id(&spec.collection_id, &ctx)?;
            let collection = load_collection(tx, &collection_id).await?;
            let content = replace_proto_document_ids_and_proto_collection_ids(
                &collection.schema,
                &spec.content,
                &ctx,
            )?;
            documents.push(
                self.insert_document(tx, pending, id.clone(), &collection, content)
                    .await?,
            );
        }

        Ok(PackInstallation {
            collection_categories: categories,
            collections,
            apps,
            documents,
        })
    }
}

fn resolve_collection_id(value: &str, ctx: &ResolutionContext) -> EngineResult<CollectionId> {
    let resolved = ctx.collections.resolve(value);
    Ok(CollectionId::parse(&resolved)?)
}

fn resolve_settings(
    settings: &ProtoCollectionSettings,
    ctx: &ResolutionContext,
) -> EngineResult<CollectionSettings> {
    let collection_category_id = replace_proto_collection_category_id(
        settings.collection_category_id.as_deref(),
        &ctx.collection_categories,
    )
    .map(|id| CollectionCategoryId::parse(&id))
    .transpose()?;
    let default_collection_view_app_id =
        replace_proto_app_id(settings.default_collection_view_app_id.as_deref(), &ctx.apps)
            .map(|id| AppId::parse(&id))
            .transpose()?;
    Ok(CollectionSettings {
        name: settings.name.clone(),
        icon: settings.icon.clone(),
        description: settings.description.clone(),
        collection_category_id,
        default_collection_view_app_id,
    })
}

/// Real ids minted for the pack before anything is written.
struct PreallocatedIds {
    collections: Vec<CollectionId>,
    apps: Vec<AppId>,
    documents: Vec<DocumentId>,
}

impl PreallocatedIds {
    fn for_pack(pack: &Pack) -> Self {
        Self {
            collections: pack.collections.iter().map(|_| CollectionId::new()).collect(),
            apps: pack.apps.iter().map(|_| AppId::new()).collect(),
            documents: pack.documents.iter().map(|_| DocumentId::new()).collect(),
        }
    }

    /// Category mappings start empty and fill up as categories are created.
    fn resolution_context(&self) -> ResolutionContext {
        ResolutionContext {
            collections: make_proto_collection_id_mapping(&self.collections),
            apps: make_proto_app_id_mapping(&self.apps),
            documents: make_proto_document_id_mapping(&self.documents),
            ..ResolutionContext::new()
        }
    }

    fn pending(&self, pack: &Pack, ctx: &ResolutionContext) -> EngineResult<Pending> {
        let mut documents = HashMap::new();
        for (id, spec) in self.documents.iter().zip(&pack.documents) {
            documents.insert(id.clone(), resolve_collection_id(&spec.collection_id, ctx)?);
        }
        Ok(Pending {
            collections: self.collections.iter().cloned().collect(),
            apps: self.apps.iter().cloned().collect(),
            documents,
        })
    }
}

// ── Phase 1 ──────────────────────────────────────────────────────

/// Walks a pack and collects every reference issue.
struct PackChecker<'a> {
    pack: &'a Pack,
    max_entities: usize,
    issues: Vec<Issue>,
}

fn path<const N: usize>(segments: [PathSegment; N]) -> Vec<PathSegment> {
    segments.into()
}

impl<'a> PackChecker<'a> {
    fn new(pack: &'a Pack, max_entities: usize) -> Self {
        Self {
            pack,
            max_entities,
            issues: Vec::new(),
        }
    }

    fn count(&self, kind: IdKind) -> usize {
        match kind {
            IdKind::CollectionCategory => self.pack.collection_categories.len(),
            IdKind::Collection => self.pack.collections.len(),
            IdKind::App => self.pack.apps.len(),
            IdKind::Document => self.pack.documents.len(),
            IdKind::File => 0,
        }
    }

    fn issue(&mut self, message: String, path: Vec<PathSegment>) {
        self.issues.push(Issue::validation(message, path));
    }

    /// A reference field of `kind`: a proto id of that kind pointing inside
    /// the pack, or a well-formed real id whose existence is checked when
    /// the entity is created.
    fn check_reference(&mut self, kind: IdKind, value: &str, path: Vec<PathSegment>) {
        match ProtoId::parse(value) {
            Ok(proto) => self.check_proto(kind, proto, path),
            Err(_) if is_real_id(kind, value) => {}
            Err(_) => self.issue(
                format!("Invalid reference: \"{value}\" is not a {kind} id"),
                path,
            ),
        }
    }

    fn check_proto(&mut self, kind: IdKind, proto: ProtoId, path: Vec<PathSegment>) {
        if proto.kind() != kind {
            self.issue(
                format!("Invalid reference: Expected a {kind} id but received \"{proto}\""),
                path,
            );
        } else if proto.index() >= self.count(kind) {
            self.issue(
                format!(
                    "Invalid reference: \"{proto}\" does not match any of the {} {kind} entries of the pack",
                    self.count(kind)
                ),
                path,
            );
        }
    }

    fn run(mut self) -> Vec<Issue> {
        let total = self.pack.entity_count();
        if total > self.max_entities {
            self.issue(
                format!(
                    "Pack holds {total} entities; at most {} are allowed",
                    self.max_entities
                ),
                Vec::new(),
            );
        }
        self.check_categories();
        self.check_collections();
        self.check_apps();
        self.check_documents();
        self.issues
    }

    fn check_categories(&mut self) {
        let pack = self.pack;
        for (index, spec) in pack.collection_categories.iter().enumerate() {
            let Some(parent_id) = spec.parent_id.as_deref() else {
                continue;
            };
            let at = path([
                PathSegment::name("collectionCategories"),
                PathSegment::index(index),
                PathSegment::name("parentId"),
            ]);
            match ProtoId::parse_kind(IdKind::CollectionCategory, parent_id) {
                // categories are created in order, so a parent must come first
                Some(proto) if proto.index() >= index => self.issue(
                    format!(
                        "Invalid reference: \"{parent_id}\" must reference a category declared before index {index}"
                    ),
                    at,
                ),
                Some(_) => {}
                None => self.check_reference(IdKind::CollectionCategory, parent_id, at),
            }
        }
    }

    fn check_collections(&mut self) {
        let pack = self.pack;
        for (index, spec) in pack.collections.iter().enumerate() {
            let base = |field: &str| {
                vec![
                    PathSegment::name("collections"),
                    PathSegment::index(index),
                    PathSegment::name("settings"),
                    PathSegment::name(field),
                ]
            };
            if let Some(id) = spec.settings.collection_category_id.as_deref() {
                self.check_reference(IdKind::CollectionCategory, id, base("collectionCategoryId"));
            }
            if let Some(id) = spec.settings.default_collection_view_app_id.as_deref() {
                self.check_reference(IdKind::App, id, base("defaultCollectionViewAppId"));
            }

            if let Err(e) = spec.schema.check_structure() {
                self.issue(
                    e.to_string(),
                    path([
                        PathSegment::name("collections"),
                        PathSegment::index(index),
                        PathSegment::name("schema"),
                    ]),
                );
            }
            for (type_name, collection_id) in document_ref_collection_ids(&spec.schema) {
                if collection_id == SELF_COLLECTION_ID {
                    continue;
                }
                self.check_reference(
                    IdKind::Collection,
                    collection_id,
                    path([
                        PathSegment::name("collections"),
                        PathSegment::index(index),
                        PathSegment::name("schema"),
                        PathSegment::name("types"),
                        PathSegment::name(type_name),
                        PathSegment::name("collectionId"),
                    ]),
                );
            }
        }
    }

    fn check_apps(&mut self) {
        let pack = self.pack;
        for (index, spec) in pack.apps.iter().enumerate() {
            for (position, id) in spec.target_collection_ids.iter().enumerate() {
                self.check_reference(
                    IdKind::Collection,
                    id,
                    path([
                        PathSegment::name("apps"),
                        PathSegment::index(index),
                        PathSegment::name("targetCollectionIds"),
                        PathSegment::index(position),
                    ]),
                );
            }
        }
    }

    fn check_documents(&mut self) {
        let pack = self.pack;
        for (index, spec) in pack.documents.iter().enumerate() {
            let at = |rest: &[PathSegment]| {
                let mut at = vec![PathSegment::name("documents"), PathSegment::index(index)];
                at.extend_from_slice(rest);
                at
            };

            // the collection's schema drives the content scan, so it must be
            // one of the pack's own collections
            let collection = ProtoId::parse_kind(IdKind::Collection, &spec.collection_id)
                .and_then(|proto| pack.collections.get(proto.index()));
            let Some(collection) = collection else {
                self.issue(
                    format!(
                        "Invalid reference: \"{}\" is not a collection of this pack",
                        spec.collection_id
                    ),
                    at(&[PathSegment::name("collectionId")]),
                );
                continue;
            };

            // a malformed schema is already reported under its collection
            let Ok(references) = content_id_references(&collection.schema, &spec.content) else {
                continue;
            };
            for reference in references {
                let mut content_path = vec![PathSegment::name("content")];
                content_path.extend(reference.path);
                self.check_reference(reference.expected, &reference.value, at(&content_path));
            }
        }
    }
}

fn is_real_id(kind: IdKind, value: &str) -> bool {
    match kind {
        IdKind::CollectionCategory => CollectionCategoryId::parse(value).is_ok(),
        IdKind::Collection => CollectionId::parse(value).is_ok(),
        IdKind::App => AppId::parse(value).is_ok(),
        IdKind::Document => DocumentId::parse(value).is_ok(),
        IdKind::File => FileId::parse(value).is_ok(),
    }
}
