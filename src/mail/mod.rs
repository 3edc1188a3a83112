//! Mail transport — SMTP via lettre for outbound, raw IMAP polling for inbound.
//!
//! The pipeline sends and reads mail through the [`MailSender`] and
//! [`MailboxReader`] traits; production backends live in [`smtp`] and
//! [`imap`], tests substitute scripted fakes.

pub mod imap;
pub mod reply;
pub mod smtp;

pub use imap::ImapMailbox;
pub use smtp::SmtpMailer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MailError;

// ── Configuration ───────────────────────────────────────────────────

/// Mail transport configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl MailConfig {
    /// Build config from environment variables.
    /// Returns `None` if `EMAIL_IMAP_HOST` is not set.
    pub fn from_env() -> Option<Self> {
        let imap_host = std::env::var("EMAIL_IMAP_HOST").ok()?;

        let imap_port: u16 = std::env::var("EMAIL_IMAP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(993);

        let smtp_host =
            std::env::var("EMAIL_SMTP_HOST").unwrap_or_else(|_| imap_host.replace("imap", "smtp"));

        let smtp_port: u16 = std::env::var("EMAIL_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("EMAIL_USERNAME").unwrap_or_default();
        let password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        Some(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
        })
    }
}

// ── Inbound message ─────────────────────────────────────────────────

/// An email pulled from the mailbox.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    /// Message-ID header (generated when the header is absent).
    pub message_id: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body (HTML stripped when no text part exists).
    pub body: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

// ── Traits ──────────────────────────────────────────────────────────

/// Trait for outbound mail — pure I/O, no business logic.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Send a single email.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Trait for inbound mail lookup.
#[async_trait]
pub trait MailboxReader: Send + Sync {
    /// Fetch the newest unread message from `from_address` received after
    /// `since`, if any. Returning `Ok(None)` means nothing new yet.
    async fn fetch_latest(
        &self,
        from_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<InboundEmail>, MailError>;
}
