use std::sync::LazyLock;

use chrono::{DateTime, Months, Utc};
use regex::Regex;

use timecapsule_types::api::CreateMessageRequest;

pub const MAX_SUBJECT_CHARS: usize = 200;
pub const MAX_BODY_CHARS: usize = 10_000;
pub const MAX_YEARS_AHEAD: u32 = 50;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A creation request that passed every check. Text is trimmed.
#[derive(Debug)]
pub struct ValidMessage {
    pub subject: String,
    pub body: String,
    pub delivery_at: DateTime<Utc>,
    pub recipient_email: Option<String>,
}

/// Check a creation request against `now`. Collects every problem rather
/// than stopping at the first.
pub fn validate_message(
    req: &CreateMessageRequest,
    now: DateTime<Utc>,
) -> Result<ValidMessage, Vec<String>> {
    let mut errors = Vec::new();

    let subject = req.subject.trim();
    if subject.is_empty() {
        errors.push("Subject is required".to_string());
    } else if subject.chars().count() > MAX_SUBJECT_CHARS {
        errors.push(format!("Subject must be at most {} characters", MAX_SUBJECT_CHARS));
    }

    let body = req.message.trim();
    if body.is_empty() {
        errors.push("Message content is required".to_string());
    } else if body.chars().count() > MAX_BODY_CHARS {
        errors.push(format!("Message must be at most {} characters", MAX_BODY_CHARS));
    }

    let delivery_at = match DateTime::parse_from_rfc3339(req.delivery_at.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            errors.push("Invalid delivery date format".to_string());
            None
        }
    };
    if let Some(at) = delivery_at {
        if at <= now {
            errors.push("Delivery date must be in the future".to_string());
        }
        let latest = now
            .checked_add_months(Months::new(MAX_YEARS_AHEAD * 12))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if at > latest {
            errors.push(format!(
                "Delivery date cannot be more than {} years in the future",
                MAX_YEARS_AHEAD
            ));
        }
    }

    let recipient_email = req
        .recipient_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    if let Some(email) = recipient_email {
        if !is_valid_email(email) {
            errors.push("Recipient email is invalid".to_string());
        }
    }

    match delivery_at {
        Some(delivery_at) if errors.is_empty() => Ok(ValidMessage {
            subject: subject.to_string(),
            body: body.to_string(),
            delivery_at,
            recipient_email: recipient_email.map(str::to_string),
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(subject: &str, message: &str, delivery_at: DateTime<Utc>) -> CreateMessageRequest {
        CreateMessageRequest {
            subject: subject.into(),
            message: message.into(),
            delivery_at: delivery_at.to_rfc3339(),
            recipient_email: None,
        }
    }

    #[test]
    fn accepts_and_trims() {
        let now = Utc::now();
        let valid = validate_message(&request("  Hi  ", "\nWorld\n", now + Duration::days(1)), now).unwrap();
        assert_eq!(valid.subject, "Hi");
        assert_eq!(valid.body, "World");
        assert!(valid.recipient_email.is_none());
    }

    #[test]
    fn rejects_past_and_present() {
        let now = Utc::now();
        let errs = validate_message(&request("Hi", "World", now), now).unwrap_err();
        assert_eq!(errs, vec!["Delivery date must be in the future"]);
    }

    #[test]
    fn fifty_year_cap() {
        let now = Utc::now();
        let ok = now.checked_add_months(Months::new(600)).unwrap();
        assert!(validate_message(&request("Hi", "World", ok), now).is_ok());

        let too_far = ok + Duration::seconds(1);
        assert!(validate_message(&request("Hi", "World", too_far), now).is_err());
    }

    #[test]
    fn collects_every_problem() {
        let now = Utc::now();
        let mut req = request(" ", &"x".repeat(MAX_BODY_CHARS + 1), now);
        req.delivery_at = "next tuesday".into();
        req.recipient_email = Some("not-an-email".into());

        let errs = validate_message(&req, now).unwrap_err();
        assert_eq!(errs.len(), 4);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("me@example.com"));
        assert!(!is_valid_email("me@example"));
        assert!(!is_valid_email("me @example.com"));
        assert!(!is_valid_email("@example.com"));
    }
}
