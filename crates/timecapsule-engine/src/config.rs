use std::time::Duration;

/// Address and display name the notification is sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub address: String,
    pub name: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            address: "noreply@localhost".into(),
            name: "FutureMe".into(),
        }
    }
}

/// Engine timing and identity. Read once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between periodic passes.
    pub poll_interval: Duration,
    /// Delay before the first pass after `start()`.
    pub warmup_delay: Duration,
    /// Minimum gap between the starts of two consecutive sends.
    pub send_interval: Duration,
    /// Upper bound on a single transport call.
    pub send_timeout: Duration,
    pub sender: SenderIdentity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            warmup_delay: Duration::from_secs(5),
            send_interval: Duration::from_millis(100),
            send_timeout: Duration::from_secs(30),
            sender: SenderIdentity::default(),
        }
    }
}
