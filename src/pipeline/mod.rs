//! The outreach pipeline.
//!
//! Four stages run strictly in order:
//! 1. Recruitment — load and rank prospects, shortlist the top N
//! 2. Outreach — draft, send, and watch for replies concurrently
//! 3. Scheduling — classify replies, book meetings or ask for times
//! 4. Analytics — turn call transcripts into a written report
//!
//! **Stages never overlap.** Each one consumes records the previous
//! stage produced, and the orchestrator threads a single
//! [`types::PipelineState`] through all of them.

pub mod orchestrator;
pub mod types;
