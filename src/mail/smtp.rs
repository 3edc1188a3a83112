//! SMTP sender backed by lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::MailError;
use crate::mail::{MailConfig, MailSender};

/// Outbound mail over SMTP.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Send an email via SMTP.
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let transport = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| MailError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| MailError::InvalidAddress {
                        address: self.config.from_address.clone(),
                        reason: format!("{e}"),
                    })?,
            )
            .to(to.parse().map_err(|e| MailError::InvalidAddress {
                address: to.to_string(),
                reason: format!("{e}"),
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::SendFailed(format!("Failed to build email: {e}")))?;

        transport
            .send(&email)
            .map_err(|e| MailError::SendFailed(format!("SMTP send failed: {e}")))?;

        tracing::info!("Email sent to {to}");
        Ok(())
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.send_email(to, subject, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MailConfig {
        MailConfig {
            imap_host: "imap.test.com".into(),
            imap_port: 993,
            smtp_host: "smtp.test.com".into(),
            smtp_port: 587,
            username: "user".into(),
            password: "pass".into(),
            from_address: "user@test.com".into(),
        }
    }

    #[tokio::test]
    async fn send_rejects_invalid_recipient() {
        let mailer = SmtpMailer::new(test_config());
        let result = mailer.send("not-an-address", "Hi", "body").await;
        assert!(matches!(result, Err(MailError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn send_rejects_invalid_from_address() {
        let mut config = test_config();
        config.from_address = "broken".into();
        let mailer = SmtpMailer::new(config);
        let result = mailer.send("ok@test.com", "Hi", "body").await;
        assert!(matches!(result, Err(MailError::InvalidAddress { .. })));
    }
}
