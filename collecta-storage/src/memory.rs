//! In-process storage backend.

use crate::{Storage, StorageError, StorageResult, StorageTransaction, now_millis};
use async_trait::async_trait;
use collecta_model::{App, Collection, CollectionCategory, Document, StoredFile};
use collecta_types::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId, IdKind};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Rows of one entity kind in insertion order, indexed by id.
#[derive(Debug)]
struct Table<K, V> {
    rows: Vec<V>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Display, V> Table<K, V> {
    fn get(&self, id: &K) -> Option<&V> {
        self.index.get(id).and_then(|&i| self.rows.get(i))
    }

    fn contains(&self, id: &K) -> bool {
        self.index.contains_key(id)
    }

    fn push(&mut self, id: K, row: V) {
        self.index.insert(id, self.rows.len());
        self.rows.push(row);
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn ensure_absent(&self, kind: IdKind, id: &K) -> StorageResult<()> {
        if self.contains(id) {
            return Err(StorageError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Moves every row of `other` into this table.
    fn absorb(&mut self, other: Table<K, V>) {
        let mut ids: Vec<(K, usize)> = other.index.into_iter().collect();
        ids.sort_by_key(|(_, i)| *i);
        for ((id, _), row) in ids.into_iter().zip(other.rows) {
            self.push(id, row);
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    categories: Table<CollectionCategoryId, CollectionCategory>,
    collections: Table<CollectionId, Collection>,
    apps: Table<AppId, App>,
    documents: Table<DocumentId, Document>,
    files: Table<FileId, StoredFile>,
}

impl Tables {
    fn entity_count(&self) -> usize {
        self.categories.len()
            + self.collections.len()
            + self.apps.len()
            + self.documents.len()
            + self.files.len()
    }

    fn ensure_disjoint(&self, staged: &Tables) -> StorageResult<()> {
        for id in staged.categories.index.keys() {
            self.categories.ensure_absent(IdKind::CollectionCategory, id)?;
        }
        for id in staged.collections.index.keys() {
            self.collections.ensure_absent(IdKind::Collection, id)?;
        }
        for id in staged.apps.index.keys() {
            self.apps.ensure_absent(IdKind::App, id)?;
        }
        for id in staged.documents.index.keys() {
            self.documents.ensure_absent(IdKind::Document, id)?;
        }
        for id in staged.files.index.keys() {
            self.files.ensure_absent(IdKind::File, id)?;
        }
        Ok(())
    }

    fn absorb(&mut self, staged: Tables) {
        self.categories.absorb(staged.categories);
        self.collections.absorb(staged.collections);
        self.apps.absorb(staged.apps);
        self.documents.absorb(staged.documents);
        self.files.absorb(staged.files);
    }
}

/// Number of writes left before staged writes start failing.
#[derive(Debug)]
struct WriteBudget(AtomicUsize);

const UNLIMITED: usize = usize::MAX;

impl WriteBudget {
    fn spend(&self) -> StorageResult<()> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| StorageError::Unavailable("write rejected by memory backend".into()))
    }
}

/// Storage held in memory. Clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    budget: Arc<WriteBudget>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            budget: Arc::new(WriteBudget(AtomicUsize::new(UNLIMITED))),
        }
    }

    /// Makes every staged write after the next `writes` fail with
    /// [`StorageError::Unavailable`].
    pub fn fail_writes_after(&self, writes: usize) {
        self.budget.0.store(writes, Ordering::SeqCst);
    }

    /// Lifts a limit set by [`MemoryStorage::fail_writes_after`].
    pub fn clear_write_failures(&self) {
        self.budget.0.store(UNLIMITED, Ordering::SeqCst);
    }

    /// Number of committed entities of every kind.
    pub async fn entity_count(&self) -> usize {
        self.tables.read().await.entity_count()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>> {
        Ok(Box::new(MemoryTransaction {
            committed: Arc::clone(&self.tables),
            staged: Tables::default(),
            budget: Arc::clone(&self.budget),
        }))
    }
}

struct MemoryTransaction {
    committed: Arc<RwLock<Tables>>,
    staged: Tables,
    budget: Arc<WriteBudget>,
}

#[async_trait]
impl StorageTransaction for MemoryTransaction {
    async fn create_collection_category(
        &mut self,
        name: &str,
        icon: &str,
        parent_id: Option<CollectionCategoryId>,
    ) -> StorageResult<CollectionCategory> {
        self.budget.spend()?;
        let category = CollectionCategory {
            id: CollectionCategoryId::new(),
            name: name.to_owned(),
            icon: icon.to_owned(),
            parent_id,
            created_at: now_millis(),
        };
        self.staged
            .categories
            .push(category.id.clone(), category.clone());
        Ok(category)
    }

    async fn get_collection_category(
        &self,
        id: &CollectionCategoryId,
    ) -> StorageResult<Option<CollectionCategory>> {
        if let Some(category) = self.staged.categories.get(id) {
            return Ok(Some(category.clone()));
        }
        Ok(self.committed.read().await.categories.get(id).cloned())
    }

    async fn list_collection_categories(&self) -> StorageResult<Vec<CollectionCategory>> {
        let committed = self.committed.read().await;
        Ok(committed
            .categories
            .rows
            .iter()
            .chain(&self.staged.categories.rows)
            .cloned()
            .collect())
    }

    async fn insert_collection(&mut self, collection: Collection) -> StorageResult<()> {
        self.budget.spend()?;
        self.committed
            .read()
            .await
            .collections
            .ensure_absent(IdKind::Collection, &collection.id)?;
        self.staged
            .collections
            .ensure_absent(IdKind::Collection, &collection.id)?;
        self.staged
            .collections
            .push(collection.id.clone(), collection);
        Ok(())
    }

    async fn get_collection(&self, id: &CollectionId) -> StorageResult<Option<Collection>> {
        if let Some(collection) = self.staged.collections.get(id) {
            return Ok(Some(collection.clone()));
        }
        Ok(self.committed.read().await.collections.get(id).cloned())
    }

    async fn list_collections(&self) -> StorageResult<Vec<Collection>> {
        let committed = self.committed.read().await;
        Ok(committed
            .collections
            .rows
            .iter()
            .chain(&self.staged.collections.rows)
            .cloned()
            .collect())
    }

    async fn insert_app(&mut self, app: App) -> StorageResult<()> {
        self.budget.spend()?;
        self.committed
            .read()
            .await
            .apps
            .ensure_absent(IdKind::App, &app.id)?;
        self.staged.apps.ensure_absent(IdKind::App, &app.id)?;
        self.staged.apps.push(app.id.clone(), app);
        Ok(())
    }

    async fn get_app(&self, id: &AppId) -> StorageResult<Option<App>> {
        if let Some(app) = self.staged.apps.get(id) {
            return Ok(Some(app.clone()));
        }
        Ok(self.committed.read().await.apps.get(id).cloned())
    }

    async fn list_apps(&self) -> StorageResult<Vec<App>> {
        let committed = self.committed.read().await;
        Ok(committed
            .apps
            .rows
            .iter()
            .chain(&self.staged.apps.rows)
            .cloned()
            .collect())
    }

    async fn insert_document(&mut self, document: Document) -> StorageResult<()> {
        self.budget.spend()?;
        self.committed
            .read()
            .await
            .documents
            .ensure_absent(IdKind::Document, &document.id)?;
        self.staged
            .documents
            .ensure_absent(IdKind::Document, &document.id)?;
        self.staged
            .documents
            .push(document.id.clone(), document);
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        if let Some(document) = self.staged.documents.get(id) {
            return Ok(Some(document.clone()));
        }
        Ok(self.committed.read().await.documents.get(id).cloned())
    }

    async fn list_documents(&self, collection_id: &CollectionId) -> StorageResult<Vec<Document>> {
        let committed = self.committed.read().await;
        Ok(committed
            .documents
            .rows
            .iter()
            .chain(&self.staged.documents.rows)
            .filter(|document| &document.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn insert_file(&mut self, file: StoredFile) -> StorageResult<()> {
        self.budget.spend()?;
        self.committed
            .read()
            .await
            .files
            .ensure_absent(IdKind::File, &file.id)?;
        self.staged.files.ensure_absent(IdKind::File, &file.id)?;
        self.staged.files.push(file.id.clone(), file);
        Ok(())
    }

    async fn get_file(&self, id: &FileId) -> StorageResult<Option<StoredFile>> {
        if let Some(file) = self.staged.files.get(id) {
            return Ok(Some(file.clone()));
        }
        Ok(self.committed.read().await.files.get(id).cloned())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let MemoryTransaction {
            committed, staged, ..
        } = *self;
        let mut tables = committed.write().await;
        tables.ensure_disjoint(&staged)?;
        let written = staged.entity_count();
        tables.absorb(staged);
        debug!(written, total = tables.entity_count(), "memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        debug!(
            discarded = self.staged.entity_count(),
            "memory transaction rolled back"
        );
        Ok(())
    }
}
