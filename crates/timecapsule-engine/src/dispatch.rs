use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::{EmailTransport, OutgoingEmail};

/// Rate-limited front for the transport.
///
/// Consecutive sends start at least `min_interval` apart, and each send is
/// bounded by `timeout`.
pub struct Dispatcher {
    transport: Arc<dyn EmailTransport>,
    min_interval: Duration,
    timeout: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn EmailTransport>, min_interval: Duration, timeout: Duration) -> Self {
        Self {
            transport,
            min_interval,
            timeout,
            last_send: Mutex::new(None),
        }
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        self.wait_for_slot().await;

        debug!(to = %email.to, "dispatching email");
        match tokio::time::timeout(self.timeout, self.transport.send(email)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(to = %email.to, timeout = ?self.timeout, "transport call timed out");
                Err(TransportError::Timeout(self.timeout))
            }
        }
    }

    /// Sleep until the next send is allowed, then claim that slot.
    async fn wait_for_slot(&self) {
        let mut last = self.last_send.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stuck;

    #[async_trait]
    impl EmailTransport for Stuck {
        async fn send(&self, _email: &OutgoingEmail) -> Result<(), TransportError> {
            std::future::pending().await
        }
    }

    struct Recorder(std::sync::Mutex<Vec<Instant>>);

    #[async_trait]
    impl EmailTransport for Recorder {
        async fn send(&self, _email: &OutgoingEmail) -> Result<(), TransportError> {
            self.0.lock().unwrap().push(Instant::now());
            Ok(())
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "a@b.co".into(),
            from_address: "noreply@b.co".into(),
            from_name: "FutureMe".into(),
            subject: "s".into(),
            text_body: "t".into(),
            html_body: "h".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_transport_times_out() {
        let dispatcher = Dispatcher::new(Arc::new(Stuck), Duration::ZERO, Duration::from_secs(30));
        let err = dispatcher.send(&email()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_sends_are_spaced() {
        let transport = Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            Duration::from_millis(100),
            Duration::from_secs(30),
        );

        for _ in 0..3 {
            dispatcher.send(&email()).await.unwrap();
        }

        let times = transport.0.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }
}
