use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one completed processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Outcomes that could not be written back to the store.
    pub commit_errors: usize,
    pub duration_ms: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Read-only snapshot of the delivery engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub is_processing: bool,
    pub pass_count: u64,
    pub last_pass_completed_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub last_pass: Option<PassReport>,
}

/// Per-status message totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub scheduled: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl MessageCounts {
    pub fn total(&self) -> u64 {
        self.scheduled + self.delivered + self.failed
    }
}

/// User totals, plus how many joined since a cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: u64,
    pub recent_week: u64,
}
