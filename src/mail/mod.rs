//! Outgoing mail. Services talk to the `Mailer` trait; the transport is picked
//! from config at startup.

pub mod template;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid link base URL: {0}")]
    InvalidUrl(String),

    #[error("Mail endpoint rejected message with status {0}")]
    Rejected(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes mail to the log instead of delivering it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Outgoing mail (log transport)");
        tracing::debug!(html = %email.html, "Outgoing mail body");
        Ok(())
    }
}

/// Keeps every message in memory, newest last
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<Email>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<Email> {
        self.sent.lock().await.iter().rev().find(|e| e.to == to).cloned()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::debug!(to = %email.to, subject = %email.subject, "Queued mail in outbox");
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// Delivers mail by POSTing JSON to a mail-provider webhook
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct HttpMailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let payload = HttpMailPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };
        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            tracing::error!(status = %response.status(), to = %email.to, "Mail endpoint rejected message");
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        tracing::info!(to = %email.to, subject = %email.subject, "Mail delivered to endpoint");
        Ok(())
    }
}

/// Builds the transport selected by `MAIL_TRANSPORT`
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Memory => Ok(Arc::new(OutboxMailer::new())),
        MailTransport::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or(MailError::NotConfigured("MAIL_ENDPOINT is required for the http transport"))?;
            Ok(Arc::new(HttpMailer::new(endpoint, config.api_key.clone(), config.from.clone())))
        }
    }
}
