//! Outreach stage — drafting, sending, and reply watching.
//!
//! The stage fans out over the shortlist: every lead gets a drafted
//! email, a send attempt, and a reply watch, all running concurrently.
//! The [`coordinator`] owns the fan-out; [`composer`] and [`watcher`]
//! each do one job and know nothing about the other leads.

pub mod composer;
pub mod coordinator;
pub mod watcher;

pub use composer::{EmailComposer, EmailDraft};
pub use coordinator::OutreachCoordinator;
pub use watcher::ReplyWatcher;
