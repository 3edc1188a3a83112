//! Reply watching.
//!
//! After an outreach email goes out, the watcher polls the mailbox for
//! an answer from that lead until one arrives or the timeout elapses.
//! Noise (autoresponders, sharing notifications, empty bodies) never
//! counts as a reply and never ends the watch early: a lead who only
//! produced noise gets the full window before being written off.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::mail::MailboxReader;
use crate::mail::reply::{NoiseFilter, clean_reply, preview};
use crate::pipeline::types::ReplyRecord;

/// Watches one mailbox for replies from outreached leads.
pub struct ReplyWatcher {
    mailbox: Arc<dyn MailboxReader>,
    noise: NoiseFilter,
    timeout: Duration,
    poll_interval: Duration,
    preview_chars: usize,
}

impl ReplyWatcher {
    pub fn new(mailbox: Arc<dyn MailboxReader>, config: &PipelineConfig) -> Self {
        Self {
            mailbox,
            noise: NoiseFilter::default_signatures(),
            timeout: config.reply_timeout,
            poll_interval: config.poll_interval,
            preview_chars: config.reply_preview_chars,
        }
    }

    /// Replace the default noise filter.
    pub fn with_noise_filter(mut self, noise: NoiseFilter) -> Self {
        self.noise = noise;
        self
    }

    /// Watch for a reply from `contact_address`, considering only mail
    /// received after `since`.
    ///
    /// Returns a `Replied` record with a cleaned, preview-capped body,
    /// or `NoReply` once the timeout elapses. Mailbox errors are logged
    /// and treated as "nothing yet" so one flaky poll cannot end the
    /// watch.
    pub async fn observe(&self, contact_address: &str, since: DateTime<Utc>) -> ReplyRecord {
        let started = tokio::time::Instant::now();

        loop {
            match self.mailbox.fetch_latest(contact_address, since).await {
                Ok(Some(email)) => {
                    let cleaned = clean_reply(&email.body);
                    if self.noise.is_noise(&cleaned) {
                        debug!(
                            lead = %contact_address,
                            message_id = %email.message_id,
                            "Discarding automated or empty message"
                        );
                    } else {
                        let snippet = preview(&cleaned, self.preview_chars);
                        info!(
                            lead = %contact_address,
                            chars = snippet.chars().count(),
                            "Reply received"
                        );
                        return ReplyRecord::replied(contact_address, snippet);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        lead = %contact_address,
                        error = %e,
                        "Mailbox poll failed; will retry"
                    );
                }
            }

            if started.elapsed() >= self.timeout {
                info!(lead = %contact_address, "No reply within the watch window");
                return ReplyRecord::no_reply(contact_address);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
