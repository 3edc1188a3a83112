//! Scheduling engine.
//!
//! Walks the valid replies strictly in order and turns each into at
//! most one action: a calendar booking when a concrete time can be
//! resolved, an availability-request follow-up when the interest is
//! there but the time is not, or nothing at all. A per-contact state
//! ledger makes the walk idempotent — a contact who already reached a
//! terminal state is skipped on any later pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::CalendarBooker;
use crate::config::PipelineConfig;
use crate::llm::provider::TextCompletion;
use crate::mail::MailSender;
use crate::pipeline::types::{FollowUpRecord, MeetingRecord, ReplyRecord};
use crate::scheduling::datetime::DateTimeResolver;
use crate::scheduling::intent::{IntentClassifier, Sentiment};

// ── Reply state machine ─────────────────────────────────────────────

/// Where one contact's reply sits in the scheduling flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyState {
    /// Nothing has looked at this reply yet.
    Unprocessed,
    /// Intent is known; no action taken yet.
    Classified,
    /// A booking was attempted (the record may carry an error).
    Scheduled,
    /// An availability request went out.
    FollowUpRequested,
    /// The contact is not interested.
    Declined,
}

impl ReplyState {
    /// Check if a transition to the given state is valid.
    pub fn can_transition_to(&self, next: ReplyState) -> bool {
        matches!(
            (self, next),
            (ReplyState::Unprocessed, ReplyState::Classified)
                | (ReplyState::Classified, ReplyState::Classified)
                | (ReplyState::Classified, ReplyState::Scheduled)
                | (ReplyState::Classified, ReplyState::FollowUpRequested)
                | (ReplyState::Classified, ReplyState::Declined)
        )
    }

    /// Terminal states take no further action on later passes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplyState::Scheduled | ReplyState::FollowUpRequested | ReplyState::Declined
        )
    }
}

impl fmt::Display for ReplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplyState::Unprocessed => "unprocessed",
            ReplyState::Classified => "classified",
            ReplyState::Scheduled => "scheduled",
            ReplyState::FollowUpRequested => "follow_up_requested",
            ReplyState::Declined => "declined",
        };
        write!(f, "{s}")
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// What a scheduling pass produced.
#[derive(Debug, Default)]
pub struct SchedulingOutcome {
    pub meetings: Vec<MeetingRecord>,
    pub follow_ups: Vec<FollowUpRecord>,
}

/// Turns classified replies into bookings and follow-ups.
pub struct SchedulingEngine {
    classifier: IntentClassifier,
    resolver: DateTimeResolver,
    calendar: Arc<dyn CalendarBooker>,
    mailer: Arc<dyn MailSender>,
    org_name: String,
    meeting_duration: Duration,
    states: HashMap<String, ReplyState>,
}

impl SchedulingEngine {
    pub fn new(
        llm: Arc<dyn TextCompletion>,
        calendar: Arc<dyn CalendarBooker>,
        mailer: Arc<dyn MailSender>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(llm),
            resolver: DateTimeResolver::new(),
            calendar,
            mailer,
            org_name: config.org_name.clone(),
            meeting_duration: config.meeting_duration,
            states: HashMap::new(),
        }
    }

    /// Current ledger state for one contact.
    pub fn state_of(&self, contact_address: &str) -> ReplyState {
        self.states
            .get(contact_address)
            .copied()
            .unwrap_or(ReplyState::Unprocessed)
    }

    /// Process replies strictly in order, one action per contact at
    /// most. `now` anchors date resolution for the whole pass.
    pub async fn run(&mut self, replies: &[ReplyRecord], now: DateTime<Utc>) -> SchedulingOutcome {
        let mut outcome = SchedulingOutcome::default();
        for reply in replies {
            self.process_reply(reply, now, &mut outcome).await;
        }
        info!(
            meetings = outcome.meetings.len(),
            follow_ups = outcome.follow_ups.len(),
            "Scheduling pass complete"
        );
        outcome
    }

    async fn process_reply(
        &mut self,
        reply: &ReplyRecord,
        now: DateTime<Utc>,
        outcome: &mut SchedulingOutcome,
    ) {
        let contact = reply.contact_address.as_str();

        let Some(text) = reply.raw_text.as_deref() else {
            debug!(lead = %contact, "Reply has no body; nothing to schedule");
            return;
        };

        let current = self.state_of(contact);
        if current.is_terminal() {
            debug!(lead = %contact, state = %current, "Contact already handled; skipping");
            return;
        }

        let judgment = self.classifier.classify(text).await;
        self.transition(contact, ReplyState::Classified);
        info!(
            lead = %contact,
            sentiment = judgment.sentiment.label(),
            availability = judgment.availability_phrase.as_deref().unwrap_or("-"),
            "Reply classified"
        );

        match judgment.sentiment {
            Sentiment::Negative => {
                info!(lead = %contact, "Contact declined; closing out");
                self.transition(contact, ReplyState::Declined);
            }
            Sentiment::Positive => {
                // The quoted phrase is the best source for a time; the
                // full reply is only consulted when no phrase exists.
                let start = match judgment.availability_phrase.as_deref() {
                    Some(phrase) => self.resolver.resolve(phrase, now),
                    None => self.resolver.resolve(text, now),
                };

                match start {
                    Some(start) => {
                        let record = self.book_meeting(contact, start).await;
                        outcome.meetings.push(record);
                        self.transition(contact, ReplyState::Scheduled);
                    }
                    None => {
                        self.send_availability_request(contact).await;
                        outcome.follow_ups.push(FollowUpRecord::new(contact));
                        self.transition(contact, ReplyState::FollowUpRequested);
                    }
                }
            }
            Sentiment::Neutral => {
                debug!(lead = %contact, "No actionable intent; leaving for a later pass");
            }
        }
    }

    async fn book_meeting(&self, contact: &str, start: DateTime<Utc>) -> MeetingRecord {
        let summary = format!("{} Discovery Call", self.org_name);
        match self
            .calendar
            .book(contact, &summary, start, self.meeting_duration)
            .await
        {
            Ok(event_ref) => {
                info!(lead = %contact, start = %start, event = %event_ref, "Meeting booked");
                MeetingRecord::booked(contact, start, event_ref)
            }
            Err(e) => {
                // The contact still counts as handled; the record
                // carries the error for the run artifact.
                warn!(lead = %contact, error = %e, "Calendar booking failed");
                MeetingRecord::failed(contact, start, e.to_string())
            }
        }
    }

    async fn send_availability_request(&self, contact: &str) {
        let subject = "Scheduling Your Discovery Call";
        let body = format!(
            "Hi,\n\n\
             Thanks for your interest in connecting with {org}! Could you \
             please share your availability this week for a quick 30-minute \
             call?\n\n\
             Best,\n\
             The {org} team",
            org = self.org_name,
        );
        match self.mailer.send(contact, subject, &body).await {
            Ok(()) => info!(lead = %contact, "Availability request sent"),
            Err(e) => {
                // The request is still recorded; the lead showed intent
                // and a later pass should not re-classify them.
                warn!(lead = %contact, error = %e, "Availability request failed to send");
            }
        }
    }

    fn transition(&mut self, contact: &str, next: ReplyState) {
        let current = self.state_of(contact);
        if current.can_transition_to(next) {
            self.states.insert(contact.to_string(), next);
        } else {
            warn!(
                lead = %contact,
                from = %current,
                to = %next,
                "Invalid state transition ignored"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::error::{CalendarError, LlmError, MailError};
    use crate::llm::provider::{CompletionRequest, CompletionResponse};

    // ── State machine tests ─────────────────────────────────────────

    #[test]
    fn valid_transitions() {
        assert!(ReplyState::Unprocessed.can_transition_to(ReplyState::Classified));
        assert!(ReplyState::Classified.can_transition_to(ReplyState::Classified));
        assert!(ReplyState::Classified.can_transition_to(ReplyState::Scheduled));
        assert!(ReplyState::Classified.can_transition_to(ReplyState::FollowUpRequested));
        assert!(ReplyState::Classified.can_transition_to(ReplyState::Declined));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!ReplyState::Unprocessed.can_transition_to(ReplyState::Scheduled));
        assert!(!ReplyState::Scheduled.can_transition_to(ReplyState::Classified));
        assert!(!ReplyState::Declined.can_transition_to(ReplyState::FollowUpRequested));
        assert!(!ReplyState::FollowUpRequested.can_transition_to(ReplyState::Scheduled));
    }

    #[test]
    fn terminal_states() {
        assert!(!ReplyState::Unprocessed.is_terminal());
        assert!(!ReplyState::Classified.is_terminal());
        assert!(ReplyState::Scheduled.is_terminal());
        assert!(ReplyState::FollowUpRequested.is_terminal());
        assert!(ReplyState::Declined.is_terminal());
    }

    #[test]
    fn state_serde_round_trip() {
        let json = serde_json::to_string(&ReplyState::FollowUpRequested).unwrap();
        assert_eq!(json, "\"follow_up_requested\"");
        let back: ReplyState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ReplyState::FollowUpRequested);
    }

    // ── Engine fixtures ─────────────────────────────────────────────

    /// Verdict keyed by a substring of the reply text in the prompt.
    struct VerdictLlm {
        verdicts: Vec<(&'static str, &'static str)>,
    }

    #[async_trait]
    impl TextCompletion for VerdictLlm {
        fn model_name(&self) -> &str {
            "verdicts"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let prompt = request
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let content = self
                .verdicts
                .iter()
                .find(|(key, _)| prompt.contains(key))
                .map(|(_, verdict)| verdict.to_string())
                .unwrap_or_else(|| r#"{"sentiment": "neutral", "availability": null}"#.into());
            Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    #[derive(Default)]
    struct FakeCalendar {
        bookings: Mutex<Vec<(String, DateTime<Utc>)>>,
        fail: bool,
    }

    #[async_trait]
    impl CalendarBooker for FakeCalendar {
        async fn book(
            &self,
            attendee: &str,
            _summary: &str,
            start: DateTime<Utc>,
            _duration: Duration,
        ) -> Result<String, CalendarError> {
            if self.fail {
                return Err(CalendarError::BookingFailed("503 from calendar".into()));
            }
            let mut bookings = self.bookings.lock().unwrap();
            bookings.push((attendee.to_string(), start));
            Ok(format!("evt-{}", bookings.len()))
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MailSender for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::SendFailed("relay down".into()));
            }
            self.sent.lock().unwrap().push((to.into(), subject.into()));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap()
    }

    fn engine(
        verdicts: Vec<(&'static str, &'static str)>,
        calendar: Arc<FakeCalendar>,
        mailer: Arc<RecordingMailer>,
    ) -> SchedulingEngine {
        SchedulingEngine::new(
            Arc::new(VerdictLlm { verdicts }),
            calendar,
            mailer,
            &PipelineConfig::default(),
        )
    }

    // ── Engine behavior ─────────────────────────────────────────────

    #[tokio::test]
    async fn positive_reply_with_time_books_a_meeting() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![(
                "works great",
                r#"{"sentiment": "positive", "availability": "tomorrow 3pm"}"#,
            )],
            calendar.clone(),
            mailer.clone(),
        );

        let replies = vec![ReplyRecord::replied("a@x.test", "Tomorrow works great!")];
        let outcome = engine.run(&replies, now()).await;

        assert_eq!(outcome.meetings.len(), 1);
        assert!(outcome.follow_ups.is_empty());
        let meeting = &outcome.meetings[0];
        assert_eq!(meeting.contact_address, "a@x.test");
        assert_eq!(
            meeting.scheduled_time,
            Utc.with_ymd_and_hms(2025, 11, 11, 15, 0, 0).unwrap()
        );
        assert_eq!(meeting.external_event_ref.as_deref(), Some("evt-1"));
        assert_eq!(engine.state_of("a@x.test"), ReplyState::Scheduled);
        // No follow-up mail went out for a booked contact.
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn positive_reply_without_time_requests_availability() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![(
                "sounds interesting",
                r#"{"sentiment": "positive", "availability": null}"#,
            )],
            calendar.clone(),
            mailer.clone(),
        );

        let replies = vec![ReplyRecord::replied(
            "b@y.test",
            "This sounds interesting, tell me more.",
        )];
        let outcome = engine.run(&replies, now()).await;

        assert!(outcome.meetings.is_empty());
        assert_eq!(outcome.follow_ups.len(), 1);
        assert_eq!(outcome.follow_ups[0].contact_address, "b@y.test");
        assert_eq!(engine.state_of("b@y.test"), ReplyState::FollowUpRequested);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Scheduling Your Discovery Call");
        assert!(calendar.bookings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_reply_is_declined_with_no_records() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![(
                "not interested",
                r#"{"sentiment": "negative", "availability": null}"#,
            )],
            calendar.clone(),
            mailer.clone(),
        );

        let replies = vec![ReplyRecord::replied("c@z.test", "We are not interested.")];
        let outcome = engine.run(&replies, now()).await;

        assert!(outcome.meetings.is_empty());
        assert!(outcome.follow_ups.is_empty());
        assert_eq!(engine.state_of("c@z.test"), ReplyState::Declined);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn neutral_reply_takes_no_action_and_stays_open() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(Vec::new(), calendar, mailer);

        let replies = vec![ReplyRecord::replied(
            "d@w.test",
            "Can you send over more details first?",
        )];
        let outcome = engine.run(&replies, now()).await;

        assert!(outcome.meetings.is_empty());
        assert!(outcome.follow_ups.is_empty());
        assert_eq!(engine.state_of("d@w.test"), ReplyState::Classified);
    }

    #[tokio::test]
    async fn bodyless_reply_is_skipped() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(Vec::new(), calendar, mailer);

        let replies = vec![ReplyRecord::no_reply("e@v.test")];
        let outcome = engine.run(&replies, now()).await;

        assert!(outcome.meetings.is_empty());
        assert!(outcome.follow_ups.is_empty());
        assert_eq!(engine.state_of("e@v.test"), ReplyState::Unprocessed);
    }

    #[tokio::test]
    async fn booking_failure_still_counts_as_scheduled() {
        let calendar = Arc::new(FakeCalendar {
            fail: true,
            ..Default::default()
        });
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![(
                "works great",
                r#"{"sentiment": "positive", "availability": "tomorrow 3pm"}"#,
            )],
            calendar,
            mailer.clone(),
        );

        let replies = vec![ReplyRecord::replied("a@x.test", "Tomorrow works great!")];
        let outcome = engine.run(&replies, now()).await;

        assert_eq!(outcome.meetings.len(), 1);
        let meeting = &outcome.meetings[0];
        assert!(meeting.external_event_ref.is_none());
        assert_eq!(meeting.error.as_deref(), Some("Booking failed: 503 from calendar"));
        // The slot the lead asked for is preserved even though the
        // booking call failed.
        assert_eq!(
            meeting.scheduled_time,
            Utc.with_ymd_and_hms(2025, 11, 11, 15, 0, 0).unwrap()
        );
        assert_eq!(engine.state_of("a@x.test"), ReplyState::Scheduled);
        // No availability request goes out for a failed booking.
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_up_send_failure_still_records_the_follow_up() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let mut engine = engine(
            vec![(
                "sounds interesting",
                r#"{"sentiment": "positive", "availability": null}"#,
            )],
            calendar,
            mailer,
        );

        let replies = vec![ReplyRecord::replied("b@y.test", "This sounds interesting.")];
        let outcome = engine.run(&replies, now()).await;

        assert_eq!(outcome.follow_ups.len(), 1);
        assert_eq!(engine.state_of("b@y.test"), ReplyState::FollowUpRequested);
    }

    #[tokio::test]
    async fn terminal_contacts_are_skipped_on_later_passes() {
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![
                (
                    "works great",
                    r#"{"sentiment": "positive", "availability": "tomorrow 3pm"}"#,
                ),
                (
                    "not interested",
                    r#"{"sentiment": "negative", "availability": null}"#,
                ),
            ],
            calendar.clone(),
            mailer,
        );

        let replies = vec![
            ReplyRecord::replied("a@x.test", "Tomorrow works great!"),
            ReplyRecord::replied("c@z.test", "We are not interested."),
        ];

        let first = engine.run(&replies, now()).await;
        assert_eq!(first.meetings.len(), 1);

        // Same replies again: both contacts are terminal, nothing new
        // happens and the calendar sees no second booking.
        let second = engine.run(&replies, now()).await;
        assert!(second.meetings.is_empty());
        assert!(second.follow_ups.is_empty());
        assert_eq!(calendar.bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_phrase_falls_through_to_follow_up() {
        // The classifier quotes a phrase the resolver cannot turn into
        // a timestamp; the full text is not consulted in that case.
        let calendar = Arc::new(FakeCalendar::default());
        let mailer = Arc::new(RecordingMailer::default());
        let mut engine = engine(
            vec![(
                "after the holidays",
                r#"{"sentiment": "positive", "availability": "after the holidays"}"#,
            )],
            calendar.clone(),
            mailer,
        );

        let replies = vec![ReplyRecord::replied(
            "f@u.test",
            "Let's touch base after the holidays.",
        )];
        let outcome = engine.run(&replies, now()).await;

        assert!(outcome.meetings.is_empty());
        assert_eq!(outcome.follow_ups.len(), 1);
        assert!(calendar.bookings.lock().unwrap().is_empty());
    }
}
