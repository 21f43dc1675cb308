use crate::configuration::MailSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("no recipient configured")]
    MissingRecipient,
    #[error("mail api url is invalid: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("failed to reach mail api: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail api answered with status {0}")]
    Rejected(u16),
    #[error("mail outbox is unavailable")]
    Outbox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

impl Email {
    pub fn new(to: &str, subject: String, html: String) -> Self {
        Self {
            to: to.to_string(),
            reply_to: None,
            subject,
            html,
        }
    }

    pub fn reply_to(mut self, address: &str) -> Self {
        self.reply_to = Some(address.to_string());
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync + Debug {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// `ApiMailer` when an api url is configured, otherwise `LogMailer`.
pub fn from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    match settings.api_url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(url) => Ok(Arc::new(ApiMailer::new(
            Url::from_str(url)?,
            settings.api_token.clone(),
            settings.sender.clone(),
        )?)),
        None => Ok(Arc::new(LogMailer {
            sender: settings.sender.clone(),
        })),
    }
}

#[derive(Serialize)]
struct ApiPayload<'a> {
    from: &'a str,
    #[serde(flatten)]
    email: &'a Email,
}

/// Posts messages as JSON to a transactional mail HTTP API.
#[derive(Debug, Clone)]
pub struct ApiMailer {
    client: Client,
    endpoint: Url,
    token: Option<String>,
    sender: String,
}

impl ApiMailer {
    pub fn new(endpoint: Url, token: Option<String>, sender: String) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            token,
            sender,
        })
    }
}

#[async_trait]
impl Mailer for ApiMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&ApiPayload {
            from: &self.sender,
            email: &email,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        info!("mail '{}' delivered to {}", email.subject, email.to);
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    pub sender: String,
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            from = %self.sender,
            to = %email.to,
            reply_to = ?email.reply_to,
            "mail '{}' not sent, no mail api configured",
            email.subject
        );
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
    failing_recipients: Vec<String>,
}

impl MemoryMailer {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            outbox: Mutex::default(),
            failing_recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.failing_recipients.contains(&email.to) {
            return Err(MailError::Rejected(503));
        }
        self.outbox
            .lock()
            .map_err(|_| MailError::Outbox)?
            .push(email);
        Ok(())
    }
}
