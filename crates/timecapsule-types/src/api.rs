use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MessageStatus;
use crate::stats::{EngineStats, MessageCounts, PassReport, UserCounts};

// -- JWT Claims --

/// Claims issued by the external identity provider. The API trusts `sub`,
/// `email` and `name` once the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub subject: String,
    pub message: String,
    /// RFC 3339 timestamp.
    pub delivery_at: String,
    #[serde(default)]
    pub recipient_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageResponse {
    pub id: Uuid,
    pub delivery_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageCountResponse {
    pub scheduled_count: u64,
    pub delivered_count: u64,
    pub failed_count: u64,
    pub total_count: u64,
}

impl From<MessageCounts> for MessageCountResponse {
    fn from(c: MessageCounts) -> Self {
        Self {
            scheduled_count: c.scheduled,
            delivered_count: c.delivered,
            failed_count: c.failed,
            total_count: c.total(),
        }
    }
}

/// Timeline entries never carry content, only scheduling metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub delivery_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub messages: Vec<TimelineEntry>,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct MessageStats {
    #[serde(flatten)]
    pub counts: MessageCounts,
    pub total: u64,
    pub recent_week: u64,
}

#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub users: UserCounts,
    pub messages: MessageStats,
    pub processor: EngineStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

/// Message metadata with its owner, for the admin activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageActivity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub delivery_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub recent_users: Vec<RecentUser>,
    pub recent_messages: Vec<MessageActivity>,
    pub recent_deliveries: Vec<MessageActivity>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerResponse {
    Completed { report: PassReport },
    Skipped,
    Aborted { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedMessageSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_email: Option<String>,
    pub recipient_email: String,
    pub delivery_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FailedMessagesResponse {
    pub failed_messages: Vec<FailedMessageSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestEmailRequest {
    pub email: String,
}

// -- Generic --

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}
