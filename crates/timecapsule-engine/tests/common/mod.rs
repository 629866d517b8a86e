//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;
use uuid::Uuid;

use timecapsule_crypto::PayloadCodec;
use timecapsule_crypto::keys::generate_key;
use timecapsule_engine::{
    DeliveryEngine, EmailTransport, EngineConfig, MemoryStore, OutgoingEmail, TransportError,
};
use timecapsule_types::models::{Message, MessageStatus};

/// Records every send. Recipients in `reject` get a provider rejection.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(Instant, OutgoingEmail)>>,
    reject: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn reject(&self, recipient: &str) {
        self.reject.lock().unwrap().insert(recipient.to_string());
    }

    pub fn allow(&self, recipient: &str) {
        self.reject.lock().unwrap().remove(recipient);
    }

    pub fn sent(&self) -> Vec<(Instant, OutgoingEmail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((Instant::now(), email.clone()));
        if self.reject.lock().unwrap().contains(&email.to) {
            return Err(TransportError::Rejected {
                status: 550,
                body: "mailbox unavailable".into(),
            });
        }
        Ok(())
    }
}

/// Blocks inside `send` until the test releases it.
pub struct GatedTransport {
    pub entered: Notify,
    pub release: Semaphore,
}

impl GatedTransport {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl EmailTransport for GatedTransport {
    async fn send(&self, _email: &OutgoingEmail) -> Result<(), TransportError> {
        self.entered.notify_one();
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        permit.forget();
        Ok(())
    }
}

pub struct Harness {
    pub engine: DeliveryEngine,
    pub store: Arc<MemoryStore>,
    pub codec: PayloadCodec,
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        poll_interval: Duration::from_millis(50),
        warmup_delay: Duration::from_millis(10),
        send_interval: Duration::from_millis(100),
        send_timeout: Duration::from_secs(5),
        ..EngineConfig::default()
    }
}

pub fn harness(transport: Arc<dyn EmailTransport>) -> Harness {
    harness_with(test_config(), transport)
}

pub fn harness_with(config: EngineConfig, transport: Arc<dyn EmailTransport>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let codec = PayloadCodec::new(generate_key());
    let engine = DeliveryEngine::new(config, store.clone(), transport, codec.clone());
    Harness {
        engine,
        store,
        codec,
    }
}

impl Harness {
    /// Insert a SCHEDULED message whose owner is known to the store.
    pub fn schedule(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        delivery_at: DateTime<Utc>,
    ) -> Uuid {
        let owner_id = Uuid::new_v4();
        self.store.add_owner(owner_id, Some("Ada"));

        let id = Uuid::new_v4();
        self.store.insert(Message {
            id,
            owner_id,
            recipient_email: recipient.to_string(),
            encrypted_subject: self.codec.encrypt_text(subject).unwrap(),
            encrypted_body: self.codec.encrypt_text(body).unwrap(),
            delivery_at,
            status: MessageStatus::Scheduled,
            created_at: delivery_at - chrono::Duration::days(7),
            delivered_at: None,
        });
        id
    }

    pub fn status(&self, id: Uuid) -> MessageStatus {
        self.store.get(id).unwrap().status
    }
}

/// Poll `cond` for up to two seconds.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
