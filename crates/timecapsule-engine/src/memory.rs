use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use timecapsule_types::models::{Message, MessageStatus, User};

use crate::store::MessageStore;

/// In-process store for tests and dry runs.
///
/// Selection and per-message commits can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    messages: Mutex<HashMap<Uuid, Message>>,
    owners: Mutex<HashMap<Uuid, User>>,
    fail_selection: AtomicBool,
    fail_commits: Mutex<HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, message: Message) {
        lock(&self.messages).insert(message.id, message);
    }

    pub fn get(&self, id: Uuid) -> Option<Message> {
        lock(&self.messages).get(&id).cloned()
    }

    pub fn add_owner(&self, id: Uuid, name: Option<&str>) {
        self.add_user(User {
            id,
            email: format!("{}@example.com", id),
            name: name.map(str::to_string),
            created_at: Utc::now(),
        });
    }

    pub fn add_user(&self, user: User) {
        lock(&self.owners).insert(user.id, user);
    }

    /// Manual reset: FAILED -> SCHEDULED. Returns false for any other state.
    pub fn reset_failed(&self, id: Uuid) -> bool {
        match lock(&self.messages).get_mut(&id) {
            Some(m) if m.status == MessageStatus::Failed => {
                m.status = MessageStatus::Scheduled;
                true
            }
            _ => false,
        }
    }

    pub fn set_fail_selection(&self, fail: bool) {
        self.fail_selection.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits_for(&self, id: Uuid) {
        lock(&self.fail_commits).insert(id);
    }
}

impl MessageStore for MemoryStore {
    fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Message>> {
        if self.fail_selection.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }

        let mut due: Vec<Message> = lock(&self.messages)
            .values()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            (a.delivery_at, a.created_at, a.id).cmp(&(b.delivery_at, b.created_at, b.id))
        });
        Ok(due)
    }

    fn commit_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if lock(&self.fail_commits).contains(&id) {
            bail!("store unavailable");
        }

        let mut messages = lock(&self.messages);
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Message not found: {}", id))?;
        if message.status != MessageStatus::Scheduled {
            bail!("Message {} is {}, not SCHEDULED", id, message.status);
        }
        message.status = status;
        message.delivered_at = delivered_at;
        Ok(())
    }

    fn owner_display_name(&self, owner_id: Uuid) -> Result<String> {
        lock(&self.owners)
            .get(&owner_id)
            .map(|user| user.display_name().to_string())
            .ok_or_else(|| anyhow!("User not found: {}", owner_id))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
