//! Shared entities for the outreach pipeline.
//!
//! Every stage is a function over these types: leads in, records out.
//! Entities are immutable after creation — the one exception is
//! [`ReplyRecord::normalize`], which clears sentinel bodies into a real
//! absent value between the outreach and scheduling stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mail::reply::is_sentinel;

// ── Lead ────────────────────────────────────────────────────────────

/// A prospective client, loaded from the prospects JSON file.
///
/// `intent_score` is absent until the ranking stage fills it; leads the
/// ranker could not match keep `None` and sort as zero. Identity across
/// the pipeline is `contact_address`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Company name used in prompts and ranking.
    pub company_name: String,
    /// Industry descriptor (free text).
    pub industry: String,
    /// Short company description fed to the ranker and composer.
    pub description: String,
    /// Email address outreach goes to — the lead's identity downstream.
    pub contact_address: String,
    /// Likelihood the company needs our services, in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_score: Option<f64>,
}

// ── Outreach result ─────────────────────────────────────────────────

/// Whether the outreach email left the building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one outreach send. One per lead, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachResult {
    pub contact_address: String,
    pub delivery_status: DeliveryStatus,
    pub subject: String,
    /// Transport error text when `delivery_status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutreachResult {
    pub fn sent(contact_address: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            contact_address: contact_address.into(),
            delivery_status: DeliveryStatus::Sent,
            subject: subject.into(),
            error: None,
        }
    }

    pub fn failed(
        contact_address: impl Into<String>,
        subject: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            contact_address: contact_address.into(),
            delivery_status: DeliveryStatus::Failed,
            subject: subject.into(),
            error: Some(error.into()),
        }
    }
}

// ── Reply record ────────────────────────────────────────────────────

/// Whether a lead answered within the watch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Replied,
    NoReply,
}

impl ReplyStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::NoReply => "no_reply",
        }
    }
}

/// What the reply watcher observed for one lead.
///
/// Invariant: `status == Replied` implies `raw_text` is a non-empty
/// human-authored body. The watcher never surfaces noise or empty
/// bodies as `Replied`, and [`normalize`](Self::normalize) re-asserts
/// the invariant defensively before scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub contact_address: String,
    /// Cleaned, preview-capped reply body; `None` when nothing usable
    /// arrived within the timeout.
    pub raw_text: Option<String>,
    pub status: ReplyStatus,
}

impl ReplyRecord {
    pub fn replied(contact_address: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            contact_address: contact_address.into(),
            raw_text: Some(raw_text.into()),
            status: ReplyStatus::Replied,
        }
    }

    pub fn no_reply(contact_address: impl Into<String>) -> Self {
        Self {
            contact_address: contact_address.into(),
            raw_text: None,
            status: ReplyStatus::NoReply,
        }
    }

    /// Clear sentinel bodies (`none`, `null`, empty, `no reply`) into an
    /// actual absent value, flipping the status to keep the Replied
    /// invariant honest.
    pub fn normalize(&mut self) {
        if let Some(text) = &self.raw_text
            && is_sentinel(text)
        {
            self.raw_text = None;
            self.status = ReplyStatus::NoReply;
        }
    }
}

// ── Scheduling records ──────────────────────────────────────────────

/// A meeting booked (or attempted) for one lead.
///
/// A booking failure embeds the collaborator error instead of raising;
/// the lead still counts as handled for pipeline bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub contact_address: String,
    pub scheduled_time: DateTime<Utc>,
    /// Calendar event link or id on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_event_ref: Option<String>,
    /// Booking error text on collaborator failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MeetingRecord {
    pub fn booked(
        contact_address: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        external_event_ref: impl Into<String>,
    ) -> Self {
        Self {
            contact_address: contact_address.into(),
            scheduled_time,
            external_event_ref: Some(external_event_ref.into()),
            error: None,
        }
    }

    pub fn failed(
        contact_address: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            contact_address: contact_address.into(),
            scheduled_time,
            external_event_ref: None,
            error: Some(error.into()),
        }
    }
}

/// Status of a follow-up request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    FollowUpSent,
}

/// A recorded availability-request follow-up for one lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRecord {
    pub contact_address: String,
    pub status: FollowUpStatus,
}

impl FollowUpRecord {
    pub fn new(contact_address: impl Into<String>) -> Self {
        Self {
            contact_address: contact_address.into(),
            status: FollowUpStatus::FollowUpSent,
        }
    }
}

// ── Analytics entities ──────────────────────────────────────────────

/// A post-call transcript loaded from the transcripts JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTranscript {
    pub company_name: String,
    pub industry: String,
    pub transcript_text: String,
}

/// Company metadata attached to an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMeta {
    pub company_name: String,
    pub industry: String,
}

/// Structured insights extracted from one call transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnalysis {
    pub summary: String,
    pub top_themes: Vec<String>,
    pub pain_points: Vec<String>,
    pub next_best_actions: Vec<String>,
    /// Overall tone as reported by the analyst model (display only).
    pub sentiment: String,
    pub notable_quotes: Vec<String>,
    pub meta: AnalysisMeta,
}

// ── Pipeline state ──────────────────────────────────────────────────

/// The single state value threaded through the orchestrator.
///
/// Each stage reads the fields the previous stages filled and appends
/// its own; nothing is shared or mutated across stage boundaries. The
/// final value is serialized as the run artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    /// All loaded leads, with ranking scores merged in.
    pub leads: Vec<Lead>,
    /// The top-ranked leads that advanced to outreach.
    pub shortlisted: Vec<Lead>,
    pub emails_sent: Vec<OutreachResult>,
    pub responses: Vec<ReplyRecord>,
    pub scheduled_meetings: Vec<MeetingRecord>,
    pub follow_ups_sent: Vec<FollowUpRecord>,
    pub transcripts: Vec<CallTranscript>,
    pub analyses: Vec<CallAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replied_record_has_text() {
        let record = ReplyRecord::replied("alice@acme.com", "Tuesday works");
        assert_eq!(record.status, ReplyStatus::Replied);
        assert_eq!(record.raw_text.as_deref(), Some("Tuesday works"));
    }

    #[test]
    fn no_reply_record_has_no_text() {
        let record = ReplyRecord::no_reply("bob@x.com");
        assert_eq!(record.status, ReplyStatus::NoReply);
        assert!(record.raw_text.is_none());
    }

    #[test]
    fn normalize_clears_sentinel_text() {
        for sentinel in ["none", "Null", "  ", "No Reply"] {
            let mut record = ReplyRecord {
                contact_address: "a@x.com".into(),
                raw_text: Some(sentinel.into()),
                status: ReplyStatus::Replied,
            };
            record.normalize();
            assert!(record.raw_text.is_none(), "sentinel {sentinel:?} kept");
            assert_eq!(record.status, ReplyStatus::NoReply);
        }
    }

    #[test]
    fn normalize_keeps_real_content() {
        let mut record = ReplyRecord::replied("a@x.com", "Happy to chat tomorrow");
        record.normalize();
        assert_eq!(record.status, ReplyStatus::Replied);
        assert!(record.raw_text.is_some());
    }

    #[test]
    fn status_serialization_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Sent).unwrap(),
            "\"sent\""
        );
        assert_eq!(
            serde_json::to_string(&ReplyStatus::NoReply).unwrap(),
            "\"no_reply\""
        );
        assert_eq!(
            serde_json::to_string(&FollowUpStatus::FollowUpSent).unwrap(),
            "\"follow_up_sent\""
        );
    }

    #[test]
    fn status_labels() {
        assert_eq!(DeliveryStatus::Sent.label(), "sent");
        assert_eq!(DeliveryStatus::Failed.label(), "failed");
        assert_eq!(ReplyStatus::Replied.label(), "replied");
        assert_eq!(ReplyStatus::NoReply.label(), "no_reply");
    }

    #[test]
    fn lead_deserializes_without_score() {
        let raw = r#"{
            "company_name": "Acme Corp",
            "industry": "Manufacturing",
            "description": "Makes everything",
            "contact_address": "ceo@acme.com"
        }"#;
        let lead: Lead = serde_json::from_str(raw).unwrap();
        assert!(lead.intent_score.is_none());
        assert_eq!(lead.contact_address, "ceo@acme.com");
    }

    #[test]
    fn lead_serialization_omits_absent_score() {
        let lead = Lead {
            company_name: "Acme".into(),
            industry: "Mfg".into(),
            description: "d".into(),
            contact_address: "a@acme.com".into(),
            intent_score: None,
        };
        let json = serde_json::to_string(&lead).unwrap();
        assert!(!json.contains("intent_score"));
    }

    #[test]
    fn outreach_result_constructors() {
        let ok = OutreachResult::sent("a@x.com", "Hello");
        assert_eq!(ok.delivery_status, DeliveryStatus::Sent);
        assert!(ok.error.is_none());

        let bad = OutreachResult::failed("b@x.com", "Hello", "relay refused");
        assert_eq!(bad.delivery_status, DeliveryStatus::Failed);
        assert_eq!(bad.error.as_deref(), Some("relay refused"));
    }

    #[test]
    fn meeting_record_failure_keeps_time() {
        let start = Utc::now();
        let record = MeetingRecord::failed("a@x.com", start, "401 from calendar");
        assert_eq!(record.scheduled_time, start);
        assert!(record.external_event_ref.is_none());
        assert!(record.error.is_some());
    }

    #[test]
    fn pipeline_state_default_is_empty() {
        let state = PipelineState::default();
        assert!(state.leads.is_empty());
        assert!(state.scheduled_meetings.is_empty());
    }

    #[test]
    fn pipeline_state_serializes_round_trip() {
        let state = PipelineState {
            responses: vec![ReplyRecord::replied("a@x.com", "hi")],
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.responses.len(), 1);
        assert_eq!(back.responses[0].status, ReplyStatus::Replied);
    }
}
