//! Scheduled-delivery engine.
//!
//! Each pass selects due messages, opens their sealed content, hands the
//! rendered email to a transport and records the outcome. A pass never
//! overlaps another pass in the same process.

pub mod compose;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod memory;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod transition;
pub mod transport;

pub use config::{EngineConfig, SenderIdentity};
pub use engine::{DeliveryEngine, PassOutcome, PassTrigger};
pub use error::{DeliveryError, TransportError};
pub use memory::MemoryStore;
pub use store::MessageStore;
pub use transport::{EmailTransport, LogTransport, OutgoingEmail, SendGridTransport};
