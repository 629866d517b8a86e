use std::time::Duration;

use thiserror::Error;

/// Why a single delivery attempt, or a whole pass, did not succeed.
///
/// `Decryption` and `Transport` fail one message. `Store` aborts the pass when
/// it happens during selection and is only logged when it happens on commit.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(String),
}

impl DeliveryError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("rejected by provider (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("network failure: {0}")]
    Network(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}
