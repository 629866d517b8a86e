use chrono::NaiveDate;

use crate::config::SenderIdentity;
use crate::transport::OutgoingEmail;

/// Decrypted content of one message plus everything needed to render it.
#[derive(Debug, Clone)]
pub struct Notification<'a> {
    pub recipient: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    /// Display name of the message author.
    pub author: &'a str,
    pub delivered_on: NaiveDate,
}

/// Render the plain-text and HTML versions of a notification.
///
/// Output depends only on the arguments.
pub fn compose(n: &Notification<'_>, sender: &SenderIdentity) -> OutgoingEmail {
    OutgoingEmail {
        to: n.recipient.to_string(),
        from_address: sender.address.clone(),
        from_name: sender.name.clone(),
        subject: format!("📧 {}", n.subject),
        text_body: render_text(n, &sender.name),
        html_body: render_html(n, &sender.name),
    }
}

fn delivered_label(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

fn render_text(n: &Notification<'_>, service: &str) -> String {
    format!(
        "📧 MESSAGE FROM YOUR PAST SELF\n\
         \n\
         From: {author}\n\
         Delivered: {date}\n\
         \n\
         Subject: {subject}\n\
         \n\
         {body}\n\
         \n\
         ---\n\
         This message was scheduled and delivered by {service}",
        author = n.author,
        date = delivered_label(n.delivered_on),
        subject = n.subject,
        body = n.body,
        service = service,
    )
}

fn render_html(n: &Notification<'_>, service: &str) -> String {
    let body = escape_html(n.body).replace("\r\n", "\n").replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Message from Your Past Self</title>
</head>
<body style="margin:0;padding:0;background-color:#f5f5f5;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;line-height:1.6;color:#333;">
<div style="max-width:600px;margin:20px auto;background:#fff;border-radius:12px;overflow:hidden;">
<div style="background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);color:#fff;padding:40px 30px;text-align:center;">
<h1 style="font-size:28px;margin:0 0 10px;">Message from Your Past Self</h1>
<p style="margin:0;">You scheduled this message to arrive today!</p>
</div>
<div style="padding:40px 30px;">
<div style="background:#f8f9ff;border-left:4px solid #667eea;padding:15px 20px;margin-bottom:30px;">
<strong>From:</strong> {author}<br>
<strong>Delivered:</strong> {date}
</div>
<h2 style="font-size:22px;margin:0 0 20px;">{subject}</h2>
<div style="background:#fafafa;padding:25px;border-radius:8px;border:1px solid #e1e5e9;font-size:16px;">{body}</div>
</div>
<div style="background:#f8f9fa;padding:25px 30px;text-align:center;font-size:14px;color:#666;">
<p>This message was scheduled and delivered by {service}</p>
</div>
</div>
</body>
</html>"#,
        author = escape_html(n.author),
        date = delivered_label(n.delivered_on),
        subject = escape_html(n.subject),
        body = body,
        service = escape_html(service),
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification<'a>(subject: &'a str, body: &'a str) -> Notification<'a> {
        Notification {
            recipient: "future@example.com",
            subject,
            body,
            author: "Ada",
            delivered_on: NaiveDate::from_ymd_opt(2031, 3, 7).unwrap(),
        }
    }

    #[test]
    fn renders_text_and_html() {
        let email = compose(&notification("Hi", "World"), &SenderIdentity::default());

        assert_eq!(email.to, "future@example.com");
        assert_eq!(email.subject, "📧 Hi");
        assert!(email.text_body.contains("From: Ada"));
        assert!(email.text_body.contains("Delivered: March 07, 2031"));
        assert!(email.text_body.contains("\nWorld\n"));
        assert!(email.html_body.contains("<h2 style=\"font-size:22px;margin:0 0 20px;\">Hi</h2>"));
    }

    #[test]
    fn composition_is_deterministic() {
        let sender = SenderIdentity::default();
        let a = compose(&notification("Hi", "World"), &sender);
        let b = compose(&notification("Hi", "World"), &sender);
        assert_eq!(a, b);
    }

    #[test]
    fn html_body_is_escaped_and_keeps_line_breaks() {
        let email = compose(
            &notification("<b>", "first\nsecond <script>"),
            &SenderIdentity::default(),
        );

        assert!(email.html_body.contains("first<br>second &lt;script&gt;"));
        assert!(email.html_body.contains("&lt;b&gt;"));
        assert!(!email.html_body.contains("<script>"));
        // The plain-text version stays verbatim.
        assert!(email.text_body.contains("first\nsecond <script>"));
    }
}
