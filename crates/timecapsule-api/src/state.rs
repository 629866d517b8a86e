use std::sync::Arc;

use timecapsule_db::Database;
use timecapsule_engine::DeliveryEngine;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub engine: DeliveryEngine,
    pub jwt_secret: String,
    pub admin_key: String,
}

impl AppStateInner {
    /// Run blocking DB work off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ApiError::internal(format!("spawn_blocking join error: {}", e)))?
            .map_err(ApiError::internal)
    }
}
