//! Email digest: one plaintext message per non-empty run.
//!
//! The body opens with a dated header line, then one block per record:
//!
//! ```text
//! 📡 Deep-sea trend summary (2025-05-06)
//!
//! 🔹 [Twitter] rare jellyfish
//! Spotted a rare jellyfish off the coast...
//! https://twitter.com/user/status/1790000000000000001
//!
//! ```
//!
//! Delivery goes through the [`Mailer`] trait; [`SmtpMailer`] submits over
//! implicit TLS (port 465).

use crate::error::MailError;
use crate::models::TrendRecord;
use crate::utils::preview;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use itertools::Itertools;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, instrument};

/// Characters of post content shown per record before truncation.
pub const PREVIEW_CHARS: usize = 100;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Render the digest body for `batch`, dated `date`.
pub fn render_digest(batch: &[TrendRecord], date: NaiveDate) -> String {
    let header = format!("📡 Deep-sea trend summary ({})\n\n", date.format("%Y-%m-%d"));
    let blocks = batch
        .iter()
        .map(|r| {
            format!(
                "🔹 [{}] {}\n{}\n{}\n\n",
                r.platform,
                r.keyword,
                preview(&r.content, PREVIEW_CHARS),
                r.url
            )
        })
        .join("");
    header + &blocks
}

pub struct NotificationSink {
    mailer: Arc<dyn Mailer>,
    subject: String,
}

impl NotificationSink {
    pub fn new(mailer: Arc<dyn Mailer>, subject: String) -> Self {
        Self { mailer, subject }
    }

    /// Mail the digest for `batch`. An empty batch sends nothing.
    #[instrument(level = "info", skip_all, fields(records = batch.len()))]
    pub async fn notify(&self, batch: &[TrendRecord]) -> Result<(), MailError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = render_digest(batch, Local::now().date_naive());
        self.mailer.send(&self.subject, &body).await?;
        info!("Sent trend digest email");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .finish()
    }
}

impl SmtpMailer {
    /// Build a mailer that authenticates as `sender` against `host:465`.
    pub fn new(host: &str, sender: &str, password: &str, recipient: &str) -> Result<Self, MailError> {
        let from: Mailbox = sender
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(format!("{sender}: {e}")))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(format!("{recipient}: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(to = %self.to))]
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}
