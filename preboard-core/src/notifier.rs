//! Outbound email.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    /// Provider template; when absent `text_body` is sent as plain text.
    pub template_id: Option<String>,
    pub template_data: Value,
    pub text_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait EmailNotifier: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> Result<(), NotifierError>;
}

/// Mail API body for a SendGrid-style `mail/send` call.
pub fn build_mail_payload(from_address: &str, message: &EmailMessage) -> Value {
    let mut personalization = json!({
        "to": [{ "email": message.to_email, "name": message.to_name }],
    });
    let mut payload = json!({
        "from": { "email": from_address },
        "subject": message.subject,
    });

    match &message.template_id {
        Some(template_id) => {
            personalization["dynamic_template_data"] = message.template_data.clone();
            payload["template_id"] = Value::String(template_id.clone());
        }
        None => {
            payload["content"] = json!([{ "type": "text/plain", "value": message.text_body }]);
        }
    }
    payload["personalizations"] = json!([personalization]);
    payload
}

pub struct HttpEmailNotifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpEmailNotifier {
    pub fn new(api_url: String, api_key: String, from_address: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_url,
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl EmailNotifier for HttpEmailNotifier {
    #[tracing::instrument(skip_all, err, fields(to = %message.to_email))]
    async fn send_email(&self, message: EmailMessage) -> Result<(), NotifierError> {
        let payload = build_mail_payload(&self.from_address, &message);
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogEmailNotifier;

#[async_trait]
impl EmailNotifier for LogEmailNotifier {
    async fn send_email(&self, message: EmailMessage) -> Result<(), NotifierError> {
        info!(
            to = %message.to_email,
            subject = %message.subject,
            template_id = ?message.template_id,
            "Email delivery disabled, message logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(template_id: Option<&str>) -> EmailMessage {
        EmailMessage {
            to_email: "jane@example.com".into(),
            to_name: "Jane Doe".into(),
            subject: "Your spot is reserved".into(),
            template_id: template_id.map(str::to_string),
            template_data: json!({ "reservationToken": "SC-PAY-ABCDEFGHJK" }),
            text_body: "Token: SC-PAY-ABCDEFGHJK".into(),
        }
    }

    #[test]
    fn test_templated_payload() {
        let payload = build_mail_payload("noreply@example.com", &message(Some("d-123")));
        assert_eq!(payload["template_id"], "d-123");
        assert_eq!(payload["from"]["email"], "noreply@example.com");
        assert_eq!(
            payload["personalizations"][0]["dynamic_template_data"]["reservationToken"],
            "SC-PAY-ABCDEFGHJK"
        );
        assert!(payload.get("content").is_none());
    }

    #[test]
    fn test_plain_text_payload() {
        let payload = build_mail_payload("noreply@example.com", &message(None));
        assert_eq!(payload["content"][0]["value"], "Token: SC-PAY-ABCDEFGHJK");
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "jane@example.com");
        assert!(payload.get("template_id").is_none());
    }
}
