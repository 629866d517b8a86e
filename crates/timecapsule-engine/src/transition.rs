use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use timecapsule_types::models::MessageStatus;

use crate::error::DeliveryError;
use crate::store::{MessageStore, blocking};

/// Commits the result of one delivery attempt.
///
/// SCHEDULED -> DELIVERED (with `delivered_at`) on success,
/// SCHEDULED -> FAILED otherwise. Never touches content or recipient.
pub struct StatusTransitions {
    store: Arc<dyn MessageStore>,
}

impl StatusTransitions {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DeliveryError> {
        self.commit(id, MessageStatus::Delivered, Some(at)).await?;
        info!(message_id = %id, "message delivered");
        Ok(())
    }

    /// The delivery cause is logged before the commit and carried in the
    /// returned error if the commit fails.
    pub async fn mark_failed(&self, id: Uuid, cause: &DeliveryError) -> Result<(), DeliveryError> {
        warn!(message_id = %id, error = %cause, "message failed");
        self.commit(id, MessageStatus::Failed, None)
            .await
            .map_err(|e| match e {
                DeliveryError::Store(msg) => {
                    DeliveryError::Store(format!("{} (delivery failed: {})", msg, cause))
                }
                other => other,
            })
    }

    /// Commit errors are logged here and returned for counting; the caller
    /// moves on to the next message either way.
    async fn commit(
        &self,
        id: Uuid,
        status: MessageStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<(), DeliveryError> {
        blocking(&self.store, move |s| s.commit_status(id, status, delivered_at))
            .await
            .inspect_err(|e| {
                error!(message_id = %id, %status, error = %e, "failed to commit message status");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Duration;
    use timecapsule_types::models::Message;

    fn setup() -> (Arc<MemoryStore>, StatusTransitions, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let id = Uuid::new_v4();
        store.insert(Message {
            id,
            owner_id: Uuid::new_v4(),
            recipient_email: "me@example.com".into(),
            encrypted_subject: "s".into(),
            encrypted_body: "b".into(),
            delivery_at: now - Duration::seconds(1),
            status: MessageStatus::Scheduled,
            created_at: now - Duration::days(1),
            delivered_at: None,
        });
        let transitions = StatusTransitions::new(store.clone());
        (store, transitions, id)
    }

    #[tokio::test]
    async fn delivered_sets_timestamp() {
        let (store, transitions, id) = setup();
        let at = Utc::now();

        transitions.mark_delivered(id, at).await.unwrap();

        let m = store.get(id).unwrap();
        assert_eq!(m.status, MessageStatus::Delivered);
        assert_eq!(m.delivered_at, Some(at));
    }

    #[tokio::test]
    async fn failed_leaves_timestamp_unset() {
        let (store, transitions, id) = setup();

        let cause = DeliveryError::Decryption("bad tag".into());
        transitions.mark_failed(id, &cause).await.unwrap();

        let m = store.get(id).unwrap();
        assert_eq!(m.status, MessageStatus::Failed);
        assert!(m.delivered_at.is_none());
    }

    #[tokio::test]
    async fn commit_failure_is_reported_and_status_left_alone() {
        let (store, transitions, id) = setup();
        store.fail_commits_for(id);

        let err = transitions.mark_delivered(id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Store(_)));
        assert_eq!(store.get(id).unwrap().status, MessageStatus::Scheduled);
    }

    #[tokio::test]
    async fn failed_commit_keeps_delivery_cause() {
        let (store, transitions, id) = setup();
        store.fail_commits_for(id);

        let cause = DeliveryError::Decryption("bad tag".into());
        let err = transitions.mark_failed(id, &cause).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Store(_)));
        assert!(err.to_string().contains("decryption failed: bad tag"));
        assert_eq!(store.get(id).unwrap().status, MessageStatus::Scheduled);
    }
}
