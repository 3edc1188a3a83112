//! Scheduling stage — intent classification, time resolution, booking.
//!
//! [`intent`] decides what a reply means, [`datetime`] turns loose
//! availability text into a timestamp, and [`engine`] sequences both
//! into calendar bookings and follow-up requests behind a per-contact
//! state ledger.

pub mod datetime;
pub mod engine;
pub mod intent;

pub use datetime::DateTimeResolver;
pub use engine::{ReplyState, SchedulingEngine, SchedulingOutcome};
pub use intent::{IntentClassifier, IntentJudgment, Sentiment};
