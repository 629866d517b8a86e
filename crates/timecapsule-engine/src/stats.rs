use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use timecapsule_types::stats::{EngineStats, PassReport};

/// Engine-owned counters. Readers may snapshot at any time, including while
/// a pass is in flight; only the engine writes.
pub struct StatsSink {
    processing: AtomicBool,
    pass_count: AtomicU64,
    last_pass: Mutex<Option<PassReport>>,
    started_at: DateTime<Utc>,
}

/// Held for the whole pass. Dropping it clears the processing flag, so the
/// flag is released on every exit path, including unwinding.
pub struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl StatsSink {
    pub fn new() -> Self {
        Self {
            processing: AtomicBool::new(false),
            pass_count: AtomicU64::new(0),
            last_pass: Mutex::new(None),
            started_at: Utc::now(),
        }
    }

    /// Claim the exclusivity flag. `None` means a pass is already running.
    pub fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard {
                flag: &self.processing,
            })
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count.load(Ordering::Acquire)
    }

    /// Record a completed pass. Aborted and skipped passes are not recorded.
    pub fn record_pass(&self, report: PassReport) {
        *self.last_pass.lock().unwrap_or_else(|e| e.into_inner()) = Some(report);
        self.pass_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> EngineStats {
        let last_pass = self
            .last_pass
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let now = Utc::now();

        EngineStats {
            is_processing: self.is_processing(),
            pass_count: self.pass_count(),
            last_pass_completed_at: last_pass.as_ref().and_then(|p| p.completed_at),
            started_at: self.started_at,
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            last_pass,
        }
    }
}

impl Default for StatsSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let stats = StatsSink::new();

        let guard = stats.try_begin_pass().expect("first claim");
        assert!(stats.is_processing());
        assert!(stats.try_begin_pass().is_none());

        drop(guard);
        assert!(!stats.is_processing());
        assert!(stats.try_begin_pass().is_some());
    }

    #[test]
    fn guard_released_when_pass_panics() {
        let stats = StatsSink::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = stats.try_begin_pass();
            panic!("pass blew up");
        }));
        assert!(result.is_err());
        assert!(!stats.is_processing());
    }

    #[test]
    fn snapshot_before_first_pass_is_empty() {
        let stats = StatsSink::new();
        let snap = stats.snapshot();
        assert_eq!(snap.pass_count, 0);
        assert!(snap.last_pass_completed_at.is_none());
        assert!(snap.last_pass.is_none());
    }

    #[test]
    fn record_pass_counts_passes_not_messages() {
        let stats = StatsSink::new();
        let completed_at = Utc::now();
        stats.record_pass(PassReport {
            selected: 5,
            delivered: 4,
            failed: 1,
            completed_at: Some(completed_at),
            ..Default::default()
        });

        let snap = stats.snapshot();
        assert_eq!(snap.pass_count, 1);
        assert_eq!(snap.last_pass_completed_at, Some(completed_at));
        assert_eq!(snap.last_pass.unwrap().delivered, 4);
    }
}
