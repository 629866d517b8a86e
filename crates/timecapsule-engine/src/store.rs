use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use timecapsule_types::models::{Message, MessageStatus};

use crate::error::DeliveryError;

/// Narrow repository the engine runs against.
///
/// Implementations are blocking; the engine calls them from
/// `spawn_blocking` so a slow database never stalls the runtime.
pub trait MessageStore: Send + Sync + 'static {
    /// All `Scheduled` messages with `delivery_at <= now`, oldest delivery first.
    fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Message>>;

    /// Move a `Scheduled` message to `status`. `delivered_at` is only given
    /// for `Delivered`. Fails if the message is gone or no longer `Scheduled`.
    fn commit_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Name shown as the author of the notification.
    fn owner_display_name(&self, owner_id: Uuid) -> Result<String>;
}

/// Run a store call on the blocking pool.
pub(crate) async fn blocking<T, F>(store: &Arc<dyn MessageStore>, f: F) -> Result<T, DeliveryError>
where
    T: Send + 'static,
    F: FnOnce(&dyn MessageStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| DeliveryError::store(format!("spawn_blocking join error: {}", e)))?
        .map_err(DeliveryError::store)
}
