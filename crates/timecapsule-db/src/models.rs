//! Database row types. These map directly to SQLite rows.
//! Distinct from timecapsule-types models to keep the DB layer independent.
use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use timecapsule_types::models::{Message, MessageStatus};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub owner_id: String,
    pub recipient_email: String,
    pub encrypted_subject: String,
    pub encrypted_body: String,
    pub delivery_at: String,
    pub status: String,
    pub created_at: String,
    pub delivered_at: Option<String>,
}

/// A message row joined with its owner's email and name.
pub struct OwnedMessageRow {
    pub message: MessageRow,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
}

pub struct UserActivityRow {
    pub user: UserRow,
    pub message_count: i64,
}

/// Fixed-width RFC 3339 in UTC, so text comparison in SQL matches time order.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Corrupt timestamp '{}': {}", raw, e))
}

fn decode_id(raw: &str, field: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| anyhow!("Corrupt {} '{}': {}", field, raw, e))
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: decode_id(&row.id, "message id")?,
            owner_id: decode_id(&row.owner_id, "owner_id")?,
            recipient_email: row.recipient_email,
            encrypted_subject: row.encrypted_subject,
            encrypted_body: row.encrypted_body,
            delivery_at: decode_ts(&row.delivery_at)?,
            status: row.status.parse::<MessageStatus>()?,
            created_at: decode_ts(&row.created_at)?,
            delivered_at: row.delivered_at.as_deref().map(decode_ts).transpose()?,
        })
    }
}

impl TryFrom<UserRow> for timecapsule_types::models::User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: decode_id(&row.id, "user id")?,
            email: row.email,
            name: row.name,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}
