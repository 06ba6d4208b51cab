use crate::error::MailError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Identifier the mail backend assigns to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

pub trait Mailer {
    fn send(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<MessageId, MailError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

/// Transactional email over a JSON HTTP API.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl Mailer for HttpMailer {
    fn send(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<MessageId, MailError> {
        let to: Vec<_> = recipients.iter().map(|r| json!({ "email": r })).collect();
        let body = json!({
            "sender": { "email": sender },
            "to": to,
            "subject": subject,
            "htmlContent": html_body,
        });

        info!(recipients = recipients.len(), subject, "Trying to send email");

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| MailError::new("network", e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| MailError::new("network", e.to_string()))?;

        parse_response(status, &text)
    }
}

/// Maps an API reply to a message id or a coded error. Error bodies that are
/// not `{code, message}` JSON fall back to the HTTP status as code.
fn parse_response(status: StatusCode, text: &str) -> Result<MessageId, MailError> {
    if status.is_success() {
        let parsed: SendResponse = serde_json::from_str(text)
            .map_err(|e| MailError::new("invalid_response", e.to_string()))?;
        Ok(MessageId(parsed.message_id))
    } else {
        Err(match serde_json::from_str::<ErrorResponse>(text) {
            Ok(err) => MailError::new(err.code, err.message),
            Err(_) => MailError::new(status.as_u16().to_string(), text),
        })
    }
}

/// Logs messages instead of sending them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<MessageId, MailError> {
        info!(
            sender,
            recipients = ?recipients,
            subject,
            bytes = html_body.len(),
            "Not sending email (no mail API configured)"
        );
        Ok(MessageId("logged".to_string()))
    }
}
