//! Outreach email drafting.
//!
//! One completion call per lead, constrained to a `{subject, body}`
//! JSON shape. Drafting never fails: unparseable output keeps the raw
//! text as the body under a default subject, and a backend failure
//! falls back to a deterministic template built from the lead fields.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::llm::decode::{extract_json_object, strip_fences};
use crate::llm::provider::{ChatMessage, CompletionRequest, TextCompletion};
use crate::pipeline::types::Lead;

/// Sampling temperature for drafting. High enough to keep the copy from
/// reading templated, low enough to stay on-message.
const COMPOSE_TEMPERATURE: f32 = 0.4;

/// Token ceiling for a subject plus a short email body.
const COMPOSE_MAX_TOKENS: u32 = 512;

// ── Draft ───────────────────────────────────────────────────────────

/// A ready-to-send outreach email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

/// The JSON shape the composer asks the model for.
#[derive(Debug, Deserialize)]
struct DraftPayload {
    subject: String,
    body: String,
}

// ── Composer ────────────────────────────────────────────────────────

/// Drafts one outreach email per lead through the completion seam.
pub struct EmailComposer {
    llm: Arc<dyn TextCompletion>,
    org_name: String,
}

impl EmailComposer {
    pub fn new(llm: Arc<dyn TextCompletion>, org_name: impl Into<String>) -> Self {
        Self {
            llm,
            org_name: org_name.into(),
        }
    }

    /// Draft an email for one lead. Infallible: every failure mode
    /// degrades to a usable draft.
    pub async fn compose(&self, lead: &Lead) -> EmailDraft {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_compose_system_prompt(&self.org_name)),
            ChatMessage::user(build_compose_user_prompt(lead)),
        ])
        .with_temperature(COMPOSE_TEMPERATURE)
        .with_max_tokens(COMPOSE_MAX_TOKENS);

        match self.llm.complete(request).await {
            Ok(response) => parse_draft(&response.content, &lead.company_name),
            Err(e) => {
                warn!(
                    company = %lead.company_name,
                    error = %e,
                    "Draft call failed; using the template fallback"
                );
                fallback_draft(lead, &self.org_name)
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_compose_system_prompt(org_name: &str) -> String {
    format!(
        "You are an outreach assistant at {org_name}, a consulting firm.\n\
         Compose a short, professional outreach email to the CEO of the \
         company described by the user. The email should:\n\
         - Highlight {org_name}'s relevant expertise.\n\
         - Sound conversational and human.\n\
         - End with a call-to-action for a discovery call.\n\
         Return ONLY a JSON object like:\n\
         {{\"subject\": \"...\", \"body\": \"...\"}}"
    )
}

fn build_compose_user_prompt(lead: &Lead) -> String {
    format!(
        "Company: {} ({})\n\nDescription:\n{}",
        lead.company_name, lead.industry, lead.description
    )
}

// ── Draft parsing and fallbacks ─────────────────────────────────────

/// Decode a draft from model output.
///
/// Fences and surrounding prose are stripped before the serde pass; if
/// the result still is not a `{subject, body}` object, the raw text
/// becomes the body under the default subject.
fn parse_draft(raw: &str, company_name: &str) -> EmailDraft {
    if let Ok(payload) = serde_json::from_str::<DraftPayload>(&extract_json_object(raw)) {
        return EmailDraft {
            subject: payload.subject,
            body: payload.body,
        };
    }
    warn!(
        company = %company_name,
        "Draft output not a subject/body object; sending the raw text"
    );
    EmailDraft {
        subject: default_subject(company_name),
        body: strip_fences(raw),
    }
}

fn default_subject(company_name: &str) -> String {
    format!("Exploring a partnership with {company_name}")
}

/// Deterministic draft used when the completion backend is down.
fn fallback_draft(lead: &Lead, org_name: &str) -> EmailDraft {
    EmailDraft {
        subject: default_subject(&lead.company_name),
        body: format!(
            "Hello,\n\n\
             I'm reaching out from {org_name}. Given {company}'s work in \
             {industry}, I believe there is a strong fit worth a short \
             conversation. Would you be open to a 15-minute discovery call \
             this week?\n\n\
             Best regards,\n\
             The {org_name} team",
            company = lead.company_name,
            industry = lead.industry,
        ),
    }
}
