//! Outreach fan-out.
//!
//! The coordinator runs the full outreach sequence for every
//! shortlisted lead concurrently: draft, send, then watch for a reply.
//! Per-lead failures stay per-lead; a dead SMTP relay for one address
//! still produces a record for that lead and leaves the others alone.
//! Because the watchers interleave, the wall time of the whole fan-out
//! is one reply window, not one per lead.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::llm::provider::TextCompletion;
use crate::mail::{MailSender, MailboxReader};
use crate::outreach::composer::EmailComposer;
use crate::outreach::watcher::ReplyWatcher;
use crate::pipeline::types::{Lead, OutreachResult, ReplyRecord};

/// Runs the outreach stage across a shortlist.
pub struct OutreachCoordinator {
    composer: EmailComposer,
    mailer: Arc<dyn MailSender>,
    watcher: ReplyWatcher,
}

impl OutreachCoordinator {
    pub fn new(
        llm: Arc<dyn TextCompletion>,
        mailer: Arc<dyn MailSender>,
        mailbox: Arc<dyn MailboxReader>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            composer: EmailComposer::new(llm, config.org_name.clone()),
            mailer,
            watcher: ReplyWatcher::new(mailbox, config),
        }
    }

    /// Draft, send, and watch for every lead concurrently.
    ///
    /// Output order matches input order, so result `i` and reply `i`
    /// belong to lead `i`.
    pub async fn run(&self, leads: &[Lead]) -> (Vec<OutreachResult>, Vec<ReplyRecord>) {
        if leads.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let since = Utc::now();
        info!(count = leads.len(), "Starting outreach fan-out");

        let per_lead = leads.iter().map(|lead| self.process_lead(lead, since));
        join_all(per_lead).await.into_iter().unzip()
    }

    async fn process_lead(
        &self,
        lead: &Lead,
        since: chrono::DateTime<Utc>,
    ) -> (OutreachResult, ReplyRecord) {
        let draft = self.composer.compose(lead).await;

        let result = match self
            .mailer
            .send(&lead.contact_address, &draft.subject, &draft.body)
            .await
        {
            Ok(()) => {
                info!(lead = %lead.contact_address, subject = %draft.subject, "Outreach email sent");
                OutreachResult::sent(&lead.contact_address, &draft.subject)
            }
            Err(e) => {
                warn!(lead = %lead.contact_address, error = %e, "Outreach send failed");
                OutreachResult::failed(&lead.contact_address, &draft.subject, e.to_string())
            }
        };

        // A failed send still gets a watch: the lead may answer an
        // earlier touchpoint, and uniform records keep the stage simple.
        let reply = self.watcher.observe(&lead.contact_address, since).await;
        (result, reply)
    }
}
