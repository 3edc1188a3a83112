//! LeadFlow — staged client-outreach pipeline.

pub mod analytics;
pub mod calendar;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod outreach;
pub mod pipeline;
pub mod recruit;
pub mod scheduling;
