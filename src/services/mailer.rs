//! Email delivery collaborator

use std::time::Duration;

use hyper::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

/// A composed email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail API answered with status {0}")]
    Rejected(StatusCode),

    #[error("mail API unreachable: {0}")]
    Transport(String),
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Logs emails instead of sending them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Email (log only)");
        Ok(())
    }
}

#[derive(Serialize)]
struct MailApiRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Sends emails through an HTTP mail API with a bearer key
pub struct HttpMailer {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    sender: String,
    timeout: Duration,
}

impl HttpMailer {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        api_key: Option<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            api_key,
            sender: sender.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let payload = MailApiRequest {
            from: &self.sender,
            to: [&message.to],
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.http.post(&self.url).timeout(self.timeout).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let status = response.status();
        let _ = response.bytes().await;

        if !status.is_success() {
            return Err(MailError::Rejected(status));
        }

        debug!(to = %message.to, status = %status, "Email accepted by mail API");
        Ok(())
    }
}
