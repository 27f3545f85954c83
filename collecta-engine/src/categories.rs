use crate::engine::finish;
use crate::{Engine, EngineError, EngineResult};
use collecta_model::CollectionCategory;
use collecta_storage::StorageTransaction;
use collecta_types::CollectionCategoryId;
use tracing::{debug, info};

impl Engine {
    /// Creates a collection category under an existing parent, or at the top
    /// level when `parent_id` is `None`.
    pub async fn create_collection_category(
        &self,
        name: &str,
        icon: &str,
        parent_id: Option<CollectionCategoryId>,
    ) -> EngineResult<CollectionCategory> {
        let mut tx = self.begin().await?;
        let result = create_collection_category(&mut *tx, name, icon, parent_id).await;
        let category = finish(tx, "create_collection_category", result).await?;
        info!(category_id = %category.id, "Created collection category");
        Ok(category)
    }
}

pub(crate) async fn create_collection_category(
    tx: &mut dyn StorageTransaction,
    name: &str,
    icon: &str,
    parent_id: Option<CollectionCategoryId>,
) -> EngineResult<CollectionCategory> {
    if let Some(parent_id) = &parent_id {
        if tx.get_collection_category(parent_id).await?.is_none() {
            return Err(EngineError::CollectionCategoryNotFound(parent_id.to_string()));
        }
    }
    let category = tx.create_collection_category(name, icon, parent_id).await?;
    debug!(category_id = %category.id, name, "Staged collection category");
    Ok(category)
}
