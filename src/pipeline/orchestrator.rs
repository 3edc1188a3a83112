//! Stage sequencing.
//!
//! The orchestrator runs the four stages strictly in order and threads
//! one [`PipelineState`] through them. Two short-circuits keep empty
//! work from flowing downstream: an empty shortlist ends the run after
//! recruitment, and a reply set with no valid entries skips scheduling.
//! The only fatal error is a missing prospects file; everything else
//! is absorbed into records and logs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::analytics::{self, TranscriptAnalyzer};
use crate::calendar::CalendarBooker;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::llm::provider::TextCompletion;
use crate::mail::{MailSender, MailboxReader};
use crate::outreach::OutreachCoordinator;
use crate::pipeline::types::{PipelineState, ReplyRecord, ReplyStatus};
use crate::recruit::{self, LeadRanker};
use crate::scheduling::SchedulingEngine;

/// Reply bodies carrying any of these fragments are machine noise that
/// slipped past the watcher (forwarded notifications, bounce reports)
/// and never reach the scheduling stage.
const REPLY_BLOCKLIST: [&str; 4] = [
    "drive.google.com",
    "no-reply",
    "automated message",
    "requests access",
];

/// Check whether a reply is worth scheduling against: a real body,
/// not a sentinel, no blocklisted fragment.
pub fn is_valid_reply(record: &ReplyRecord) -> bool {
    let Some(text) = record.raw_text.as_deref() else {
        return false;
    };
    if crate::mail::reply::is_sentinel(text) {
        return false;
    }
    let lowered = text.to_lowercase();
    !REPLY_BLOCKLIST.iter().any(|noise| lowered.contains(noise))
}

/// Runs the whole pipeline against the configured collaborators.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    llm: Arc<dyn TextCompletion>,
    mailer: Arc<dyn MailSender>,
    mailbox: Arc<dyn MailboxReader>,
    calendar: Arc<dyn CalendarBooker>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        llm: Arc<dyn TextCompletion>,
        mailer: Arc<dyn MailSender>,
        mailbox: Arc<dyn MailboxReader>,
        calendar: Arc<dyn CalendarBooker>,
    ) -> Self {
        Self {
            config,
            llm,
            mailer,
            mailbox,
            calendar,
        }
    }

    /// Run recruitment, outreach, scheduling, and analytics in order.
    ///
    /// Fails only when the prospects file is missing; every
    /// collaborator failure downstream degrades into records.
    pub async fn run(&self) -> Result<PipelineState> {
        info!(model = self.llm.model_name(), "Pipeline starting");

        // Stage 1: recruitment
        let leads = recruit::load_leads(&self.config.prospects_path)?;
        let ranker = LeadRanker::new(Arc::clone(&self.llm), self.config.org_name.clone());
        let leads = ranker.rank(leads).await;
        let shortlisted = recruit::shortlist(&leads, self.config.shortlist_size);
        info!(
            loaded = leads.len(),
            shortlisted = shortlisted.len(),
            "Recruitment stage complete"
        );

        let mut state = PipelineState {
            leads,
            shortlisted,
            ..Default::default()
        };

        if state.shortlisted.is_empty() {
            info!("No leads shortlisted; ending the run here");
            return Ok(state);
        }

        // Stage 2: outreach
        let coordinator = OutreachCoordinator::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.mailer),
            Arc::clone(&self.mailbox),
            &self.config,
        );
        let (emails_sent, mut responses) = coordinator.run(&state.shortlisted).await;
        for response in &mut responses {
            response.normalize();
        }
        info!(
            sent = emails_sent.len(),
            replied = responses
                .iter()
                .filter(|r| r.status == ReplyStatus::Replied)
                .count(),
            "Outreach stage complete"
        );
        state.emails_sent = emails_sent;
        state.responses = responses;

        // Stage 3: scheduling
        let valid: Vec<ReplyRecord> = state
            .responses
            .iter()
            .filter(|r| is_valid_reply(r))
            .cloned()
            .collect();

        if valid.is_empty() {
            info!("No valid replies; skipping the scheduling stage");
        } else {
            info!(valid = valid.len(), "Scheduling stage starting");
            let mut engine = SchedulingEngine::new(
                Arc::clone(&self.llm),
                Arc::clone(&self.calendar),
                Arc::clone(&self.mailer),
                &self.config,
            );
            let outcome = engine.run(&valid, Utc::now()).await;
            state.scheduled_meetings = outcome.meetings;
            state.follow_ups_sent = outcome.follow_ups;
        }

        // Stage 4: analytics
        let transcripts = analytics::load_transcripts(&self.config.transcripts_path);
        let analyzer = TranscriptAnalyzer::new(Arc::clone(&self.llm), self.config.org_name.clone());
        let analyses = analyzer.analyze_all(&transcripts).await;
        if let Err(e) = analytics::write_report(&self.config.report_path, &analyses) {
            warn!(
                path = %self.config.report_path.display(),
                error = %e,
                "Could not write the analytics report"
            );
        }
        state.transcripts = transcripts;
        state.analyses = analyses;

        info!(
            meetings = state.scheduled_meetings.len(),
            follow_ups = state.follow_ups_sent.len(),
            analyses = state.analyses.len(),
            "Pipeline complete"
        );
        Ok(state)
    }
}
