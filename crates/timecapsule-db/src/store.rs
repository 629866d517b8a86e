use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{error, warn};
use uuid::Uuid;

use timecapsule_engine::MessageStore;
use timecapsule_types::models::{Message, MessageStatus, User};

use crate::Database;

impl MessageStore for Database {
    fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Message>> {
        let rows = self.get_due_messages(now)?;
        let mut due = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match Message::try_from(row) {
                Ok(message) => due.push(message),
                Err(e) => self.fail_corrupt(&id, &e),
            }
        }
        Ok(due)
    }

    fn commit_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let changed = self.update_status(&id.to_string(), status, delivered_at)?;
        if changed == 0 {
            bail!("Message {} not found or no longer SCHEDULED", id);
        }
        Ok(())
    }

    fn owner_display_name(&self, owner_id: Uuid) -> Result<String> {
        let row = self
            .get_user(&owner_id.to_string())?
            .ok_or_else(|| anyhow!("User not found: {}", owner_id))?;
        Ok(User::try_from(row)?.display_name().to_string())
    }
}

impl Database {
    /// A due row that cannot be decoded can never be sent. Mark it FAILED so
    /// it leaves the queue and shows up in the failed list.
    fn fail_corrupt(&self, id: &str, cause: &anyhow::Error) {
        if Uuid::parse_str(id).is_err() {
            error!(message_id = %id, error = %cause, "corrupt message row with unreadable id, skipping");
            return;
        }
        warn!(message_id = %id, error = %cause, "corrupt message row, marking FAILED");
        if let Err(e) = self.update_status(id, MessageStatus::Failed, None) {
            error!(message_id = %id, error = %e, "failed to mark corrupt message row FAILED");
        }
    }
}
