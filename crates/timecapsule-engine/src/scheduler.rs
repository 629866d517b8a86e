use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{DeliveryEngine, PassTrigger};

/// Handle to the running periodic timer.
pub(crate) struct TimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DeliveryEngine {
    /// Start the periodic timer: one warm-up pass after `warmup_delay`, then
    /// one pass every `poll_interval`. Calling `start` on a running engine
    /// does nothing. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut timer = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.as_ref().is_some_and(|t| !t.task.is_finished()) {
            warn!("message processor already started");
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(
            self.clone(),
            self.inner.config.poll_interval,
            self.inner.config.warmup_delay,
            cancel.clone(),
        ));
        *timer = Some(TimerHandle { cancel, task });

        info!(
            poll_interval = ?self.inner.config.poll_interval,
            warmup_delay = ?self.inner.config.warmup_delay,
            "message processor started"
        );
    }

    /// Cancel the timer. A pass already in flight runs to completion.
    pub fn stop(&self) {
        let handle = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            info!("message processor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.task.is_finished())
    }
}

async fn run_timer(
    engine: DeliveryEngine,
    poll_interval: Duration,
    warmup_delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(warmup_delay) => spawn_pass(&engine, PassTrigger::Warmup),
    }

    let mut interval = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => spawn_pass(&engine, PassTrigger::Tick),
        }
    }
}

/// Each pass runs as its own task so a tick that lands during a long pass
/// hits the exclusivity flag and is skipped, and `stop` never cuts a pass short.
fn spawn_pass(engine: &DeliveryEngine, trigger: PassTrigger) {
    let engine = engine.clone();
    tokio::spawn(async move {
        engine.run_pass(trigger).await;
    });
}
