//! Recruitment stage — prospect loading and lead ranking.
//!
//! The ranker submits the whole prospect list to the completion backend
//! and asks for per-company intent scores. Responses are decoded
//! leniently (JSON list first, `name: score` lines as fallback) and a
//! backend failure leaves the leads unranked rather than failing the
//! run.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::llm::decode::extract_json_array;
use crate::llm::{ChatMessage, CompletionRequest, TextCompletion};
use crate::pipeline::types::Lead;

/// Temperature for ranking (deterministic).
const RANKING_TEMPERATURE: f32 = 0.0;

/// Max tokens for the ranking call — one score line per company.
const RANKING_MAX_TOKENS: u32 = 512;

// ── Prospect loading ────────────────────────────────────────────────

/// Load the prospect list from a JSON file.
///
/// A missing file is the one fatal precondition of the whole pipeline;
/// it is reported to the caller before any stage runs.
pub fn load_leads(path: &Path) -> Result<Vec<Lead>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingInputFile {
            path: path.display().to_string(),
            hint: "Provide the prospect list or set LEADFLOW_PROSPECTS.".into(),
        });
    }

    let raw = std::fs::read_to_string(path)?;
    let leads: Vec<Lead> = serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    info!(count = leads.len(), path = %path.display(), "Loaded prospects");
    Ok(leads)
}

/// Sort leads by intent score (missing scores rank last) and keep the
/// top `size`.
pub fn shortlist(leads: &[Lead], size: usize) -> Vec<Lead> {
    let mut ranked = leads.to_vec();
    ranked.sort_by(|a, b| {
        let sa = a.intent_score.unwrap_or(0.0);
        let sb = b.intent_score.unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(size);
    ranked
}

// ── Ranker ──────────────────────────────────────────────────────────

/// Scores leads via the completion backend and merges the scores onto
/// the original records.
pub struct LeadRanker {
    llm: Arc<dyn TextCompletion>,
    org_name: String,
}

impl LeadRanker {
    pub fn new(llm: Arc<dyn TextCompletion>, org_name: impl Into<String>) -> Self {
        Self {
            llm,
            org_name: org_name.into(),
        }
    }

    /// Ask the backend for intent scores and merge them onto the leads.
    ///
    /// Input order is preserved. A backend failure or an unusable
    /// response leaves every score absent; those leads sort as zero at
    /// shortlist time.
    pub async fn rank(&self, mut leads: Vec<Lead>) -> Vec<Lead> {
        if leads.is_empty() {
            return leads;
        }

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_ranking_system_prompt(&self.org_name)),
            ChatMessage::user(build_ranking_user_prompt(&leads)),
        ])
        .with_temperature(RANKING_TEMPERATURE)
        .with_max_tokens(RANKING_MAX_TOKENS);

        let scores = match self.llm.complete(request).await {
            Ok(response) => parse_intent_scores(&response.content),
            Err(e) => {
                warn!(error = %e, "Ranking call failed; leads stay unranked");
                Vec::new()
            }
        };

        if scores.is_empty() {
            warn!("No intent scores recovered from ranking response");
        }

        for lead in &mut leads {
            let company_lower = lead.company_name.to_lowercase();
            let matched = scores
                .iter()
                .find(|s| company_lower.contains(&s.company_name.to_lowercase()));
            if let Some(score) = matched {
                lead.intent_score = Some(score.intent_score.clamp(0.0, 1.0));
            } else {
                debug!(company = %lead.company_name, "No intent score matched");
            }
        }

        leads
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_ranking_system_prompt(org_name: &str) -> String {
    format!(
        "You are a recruitment analyst working for {org_name}, a consulting firm.\n\
         Given a list of companies with descriptions, assign each an 'intent_score' \
         between 0 and 1 representing how likely the company is to need {org_name}'s \
         consulting services.\n\
         Return ONLY a JSON list like:\n\
         [{{\"company_name\": \"...\", \"intent_score\": 0.87}}, ...]"
    )
}

fn build_ranking_user_prompt(leads: &[Lead]) -> String {
    let company_list = leads
        .iter()
        .map(|l| format!("{}: {}", l.company_name, l.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Companies:\n{company_list}")
}

// ── Score parsing ───────────────────────────────────────────────────

/// One scored company as returned by the ranking call.
#[derive(Debug, Deserialize)]
struct IntentScore {
    company_name: String,
    intent_score: f64,
}

/// Decode intent scores from model output.
///
/// Tries a JSON list (fences and surrounding prose stripped) first,
/// then falls back to `name: score` lines for semi-structured output.
/// Unusable lines are skipped, never fatal.
fn parse_intent_scores(raw: &str) -> Vec<IntentScore> {
    let json_str = extract_json_array(raw);
    if let Ok(scores) = serde_json::from_str::<Vec<IntentScore>>(&json_str) {
        return scores;
    }

    raw.lines()
        .filter_map(|line| {
            let (name, score) = line.split_once(':')?;
            let score: f64 = score.trim().parse().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(IntentScore {
                company_name: name.to_string(),
                intent_score: score,
            })
        })
        .collect()
}
