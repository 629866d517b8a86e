use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use timecapsule_crypto::PayloadCodec;
use timecapsule_types::models::{DEFAULT_DISPLAY_NAME, Message};
use timecapsule_types::stats::{EngineStats, PassReport};

use crate::compose::{Notification, compose};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::{DeliveryError, TransportError};
use crate::scheduler::TimerHandle;
use crate::stats::StatsSink;
use crate::store::{MessageStore, blocking};
use crate::transition::StatusTransitions;
use crate::transport::{EmailTransport, OutgoingEmail};

/// What started a pass. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Warmup,
    Tick,
    Manual,
}

impl fmt::Display for PassTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warmup => "warmup",
            Self::Tick => "tick",
            Self::Manual => "manual",
        })
    }
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass held the exclusivity flag.
    Skipped,
    /// Selection failed; nothing was sent. The next tick starts over.
    Aborted(DeliveryError),
}

/// The scheduled-delivery engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DeliveryEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    store: Arc<dyn MessageStore>,
    codec: PayloadCodec,
    dispatcher: Dispatcher,
    transitions: StatusTransitions,
    stats: StatsSink,
    pub(crate) timer: Mutex<Option<TimerHandle>>,
}

impl DeliveryEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn EmailTransport>,
        codec: PayloadCodec,
    ) -> Self {
        let dispatcher = Dispatcher::new(transport, config.send_interval, config.send_timeout);
        let transitions = StatusTransitions::new(store.clone());
        Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                codec,
                dispatcher,
                transitions,
                stats: StatsSink::new(),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.stats.snapshot()
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.inner.codec
    }

    /// Run a pass right away unless one is already in flight.
    pub async fn trigger_now(&self) -> PassOutcome {
        info!("manually triggering message processing");
        self.run_pass(PassTrigger::Manual).await
    }

    /// Send an arbitrary notification through the same rate-limited
    /// dispatcher the passes use. Store state is not touched.
    pub async fn send_test_email(&self, recipient: &str) -> Result<(), TransportError> {
        let email = compose(
            &Notification {
                recipient,
                subject: "Test Message",
                body: "This is a test message to verify email delivery is working correctly.\n\n\
                       If you received this, everything is set up properly!",
                author: "Test User",
                delivered_on: Utc::now().date_naive(),
            },
            &self.inner.config.sender,
        );
        self.inner.dispatcher.send(&email).await
    }

    pub async fn run_pass(&self, trigger: PassTrigger) -> PassOutcome {
        let Some(_guard) = self.inner.stats.try_begin_pass() else {
            info!(%trigger, "message processor already running, skipping");
            return PassOutcome::Skipped;
        };

        let started = Instant::now();
        let now = Utc::now();
        debug!(%trigger, %now, "checking for messages to deliver");

        let due = match blocking(&self.inner.store, move |s| s.find_due(now)).await {
            Ok(due) => due,
            Err(e) => {
                error!(%trigger, error = %e, "due-message selection failed, pass aborted");
                return PassOutcome::Aborted(e);
            }
        };

        let mut report = PassReport {
            selected: due.len(),
            ..Default::default()
        };
        if !due.is_empty() {
            info!(count = due.len(), "found messages to deliver");
        }

        for message in &due {
            debug!(message_id = %message.id, to = %message.recipient_email, "processing message");

            let committed = match self.attempt(message).await {
                Ok(()) => {
                    report.delivered += 1;
                    self.inner.transitions.mark_delivered(message.id, Utc::now()).await
                }
                Err(cause) => {
                    report.failed += 1;
                    self.inner.transitions.mark_failed(message.id, &cause).await
                }
            };
            if committed.is_err() {
                report.commit_errors += 1;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report.completed_at = Some(Utc::now());

        if report.selected > 0 {
            info!(
                delivered = report.delivered,
                failed = report.failed,
                commit_errors = report.commit_errors,
                duration_ms = report.duration_ms,
                "processing complete"
            );
        }

        self.inner.stats.record_pass(report.clone());
        PassOutcome::Completed(report)
    }

    /// Decrypt, render and send one message. Does not commit.
    async fn attempt(&self, message: &Message) -> Result<(), DeliveryError> {
        let email = self.render(message, Utc::now()).await?;
        self.inner.dispatcher.send(&email).await?;
        Ok(())
    }

    async fn render(&self, message: &Message, now: DateTime<Utc>) -> Result<OutgoingEmail, DeliveryError> {
        let codec = &self.inner.codec;
        let subject = codec
            .decrypt_text(&message.encrypted_subject)
            .map_err(|e| DeliveryError::Decryption(e.to_string()))?;
        let body = codec
            .decrypt_text(&message.encrypted_body)
            .map_err(|e| DeliveryError::Decryption(e.to_string()))?;

        let owner_id = message.owner_id;
        let author = blocking(&self.inner.store, move |s| s.owner_display_name(owner_id))
            .await
            .unwrap_or_else(|e| {
                warn!(message_id = %message.id, %owner_id, error = %e, "owner lookup failed, using default name");
                DEFAULT_DISPLAY_NAME.to_string()
            });

        Ok(compose(
            &Notification {
                recipient: &message.recipient_email,
                subject: &subject,
                body: &body,
                author: &author,
                delivered_on: now.date_naive(),
            },
            &self.inner.config.sender,
        ))
    }
}
