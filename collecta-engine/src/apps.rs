use crate::engine::{Pending, ensure_collection, finish};
use crate::{Engine, EngineResult};
use collecta_model::App;
use collecta_storage::{StorageTransaction, now_millis};
use collecta_types::{AppId, CollectionId};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl Engine {
    /// Creates an app targeting existing collections.
    pub async fn create_app(
        &self,
        app_type: &str,
        name: &str,
        target_collection_ids: Vec<CollectionId>,
        files: BTreeMap<String, String>,
    ) -> EngineResult<App> {
        let app = App {
            id: AppId::new(),
            app_type: app_type.to_owned(),
            name: name.to_owned(),
            target_collection_ids,
            files,
            created_at: now_millis(),
        };
        let mut tx = self.begin().await?;
        let result = insert_app(&mut *tx, &Pending::default(), app).await;
        let app = finish(tx, "create_app", result).await?;
        info!(app_id = %app.id, "Created app");
        Ok(app)
    }
}

pub(crate) async fn insert_app(
    tx: &mut dyn StorageTransaction,
    pending: &Pending,
    app: App,
) -> EngineResult<App> {
    for collection_id in &app.target_collection_ids {
        ensure_collection(tx, pending, collection_id).await?;
    }
    tx.insert_app(app.clone()).await?;
    debug!(app_id = %app.id, targets = app.target_collection_ids.len(), "Staged app");
    Ok(app)
}
