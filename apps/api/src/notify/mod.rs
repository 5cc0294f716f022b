//! Outcome notification. Scoring decisions are authoritative; mail is
//! advisory. The dispatcher attempts delivery exactly once per terminal
//! decision and absorbs every transport failure into a `DeliveryResult` that
//! callers record but never act on.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod templates;

pub use templates::Outcome;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport is disabled (no mail API configured)")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Mail transport port. Production talks to an HTTP mail API; tests swap in
/// recording or always-failing stubs.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Result of one delivery attempt. `ok: false` is a normal outcome, not an
/// error; the triggering decision is never rolled back or retried.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub ok: bool,
    pub detail: String,
}

impl DeliveryResult {
    pub fn sent() -> Self {
        Self {
            ok: true,
            detail: "sent".to_string(),
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            ok: false,
            detail: format!("error: {reason}"),
        }
    }
}

/// HTTP mail API transport (JSON POST, bearer auth).
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&OutboundMail {
                from: &self.from,
                to,
                subject,
                text: body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Transport used when no mail API is configured. Every send reports failure;
/// nothing is ever raised past the dispatcher.
pub struct DisabledMailer;

#[async_trait]
impl MailTransport for DisabledMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }
}

/// Fires outcome mail. One attempt per decision, failure tolerated.
pub struct NotificationDispatcher {
    transport: std::sync::Arc<dyn MailTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: std::sync::Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Renders the outcome template and attempts delivery exactly once.
    /// Never returns an error and never panics: delivery failure is reported
    /// in the result and logged, nothing more.
    pub async fn notify(&self, to: &str, outcome: &Outcome) -> DeliveryResult {
        let (subject, body) = outcome.render();
        match self.transport.send(to, &subject, &body).await {
            Ok(()) => {
                info!("Notification sent to {to}: {subject}");
                DeliveryResult::sent()
            }
            Err(e) => {
                warn!("Notification to {to} failed: {e}");
                DeliveryResult::failed(e.to_string())
            }
        }
    }
}
