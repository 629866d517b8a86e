use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::TransportError;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A fully rendered notification, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub from_address: String,
    pub from_name: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// External email capability. One call per message, no internal retry.
#[async_trait]
pub trait EmailTransport: Send + Sync + 'static {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}

/// SendGrid v3 `mail/send` transport.
pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SendGridTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, SENDGRID_ENDPOINT)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Request body for one notification. Click and open tracking stay off so
/// the provider never rewrites links in private content.
pub fn sendgrid_payload(email: &OutgoingEmail) -> Value {
    json!({
        "personalizations": [{ "to": [{ "email": email.to }] }],
        "from": { "email": email.from_address, "name": email.from_name },
        "subject": email.subject,
        "content": [
            { "type": "text/plain", "value": email.text_body },
            { "type": "text/html", "value": email.html_body },
        ],
        "tracking_settings": {
            "click_tracking": { "enable": false },
            "open_tracking": { "enable": false },
        },
        "headers": {
            "X-Message-Source": "FutureMe-Scheduler",
            "X-Priority": "3",
        },
    })
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&sendgrid_payload(email))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            info!(to = %email.to, "email accepted by SendGrid");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        error!(to = %email.to, status = status.as_u16(), %body, "SendGrid rejected email");
        Err(TransportError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Logs instead of sending. Used when no provider key is configured.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        info!(
            to = %email.to,
            from = %email.from_address,
            subject = %email.subject,
            text_len = email.text_body.len(),
            "dry-run transport: email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "future@example.com".into(),
            from_address: "noreply@example.com".into(),
            from_name: "FutureMe".into(),
            subject: "📧 Hi".into(),
            text_body: "World".into(),
            html_body: "<p>World</p>".into(),
        }
    }

    #[test]
    fn payload_carries_both_renderings() {
        let payload = sendgrid_payload(&email());

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "future@example.com");
        assert_eq!(payload["from"]["name"], "FutureMe");
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][1]["value"], "<p>World</p>");
        assert_eq!(payload["tracking_settings"]["open_tracking"]["enable"], false);
    }

    #[tokio::test]
    async fn log_transport_always_succeeds() {
        assert!(LogTransport.send(&email()).await.is_ok());
    }
}
