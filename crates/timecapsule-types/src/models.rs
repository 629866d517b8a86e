use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when the owning user has not set one.
pub const DEFAULT_DISPLAY_NAME: &str = "Future You";

/// Delivery state of a scheduled message.
///
/// `Delivered` is terminal. `Failed` only leaves via an external manual reset
/// back to `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Scheduled,
    Delivered,
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 3] = [Self::Scheduled, Self::Delivered, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A message scheduled for future delivery.
/// Subject and body are always ciphertext while at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipient_email: String,
    pub encrypted_subject: String,
    pub encrypted_body: String,
    pub delivery_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Message {
    /// True when the message is eligible for a pass whose reference time is `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Scheduled && self.delivery_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(status: MessageStatus, delivery_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            recipient_email: "future@example.com".into(),
            encrypted_subject: String::new(),
            encrypted_body: String::new(),
            delivery_at,
            status,
            created_at: delivery_at - Duration::days(1),
            delivered_at: None,
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for status in MessageStatus::ALL {
            assert_eq!(status.as_str().parse::<MessageStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&MessageStatus::Delivered).unwrap();
        assert_eq!(json, "\"DELIVERED\"");
    }

    #[test]
    fn due_boundary_is_inclusive() {
        let now = Utc::now();
        assert!(message(MessageStatus::Scheduled, now).is_due(now));
        assert!(!message(MessageStatus::Scheduled, now + Duration::milliseconds(1)).is_due(now));
        assert!(!message(MessageStatus::Failed, now - Duration::hours(1)).is_due(now));
    }

    #[test]
    fn blank_name_falls_back() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            name: Some("   ".into()),
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), DEFAULT_DISPLAY_NAME);
    }
}
