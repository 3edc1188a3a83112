//! Analytics stage — call-transcript analysis and the written report.
//!
//! Transcripts are an optional input: a missing or unreadable file
//! yields an empty stage, never an error. Each transcript gets one
//! completion call constrained to a fixed six-key JSON shape;
//! unusable output degrades to a neutral placeholder so one bad
//! response cannot hide the rest of the report.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::llm::decode::extract_json_object;
use crate::llm::provider::{ChatMessage, CompletionRequest, TextCompletion};
use crate::pipeline::types::{AnalysisMeta, CallAnalysis, CallTranscript};

/// Slightly warm: summaries should read naturally, not clinically.
const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Token ceiling for the six-key analysis object.
const ANALYSIS_MAX_TOKENS: u32 = 1024;

// ── Transcript loading ──────────────────────────────────────────────

/// Load call transcripts from a JSON file.
///
/// The transcripts file is optional; absence or a parse failure both
/// resolve to "no transcripts" with a log line.
pub fn load_transcripts(path: &Path) -> Vec<CallTranscript> {
    if !path.exists() {
        debug!(path = %path.display(), "No transcripts file; skipping analytics input");
        return Vec::new();
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read transcripts file");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<CallTranscript>>(&raw) {
        Ok(transcripts) => {
            info!(count = transcripts.len(), "Loaded call transcripts");
            transcripts
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Transcripts file is not valid JSON");
            Vec::new()
        }
    }
}

// ── Analyzer ────────────────────────────────────────────────────────

/// Extracts structured insights from call transcripts through the
/// completion seam.
pub struct TranscriptAnalyzer {
    llm: Arc<dyn TextCompletion>,
    org_name: String,
}

impl TranscriptAnalyzer {
    pub fn new(llm: Arc<dyn TextCompletion>, org_name: impl Into<String>) -> Self {
        Self {
            llm,
            org_name: org_name.into(),
        }
    }

    /// Analyze all transcripts in order. A backend failure skips that
    /// transcript; malformed output keeps it with placeholder content.
    pub async fn analyze_all(&self, transcripts: &[CallTranscript]) -> Vec<CallAnalysis> {
        let mut analyses = Vec::with_capacity(transcripts.len());
        for transcript in transcripts {
            if let Some(analysis) = self.analyze(transcript).await {
                analyses.push(analysis);
            }
        }
        analyses
    }

    async fn analyze(&self, transcript: &CallTranscript) -> Option<CallAnalysis> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_analysis_system_prompt(&self.org_name)),
            ChatMessage::user(build_analysis_user_prompt(transcript)),
        ])
        .with_temperature(ANALYSIS_TEMPERATURE)
        .with_max_tokens(ANALYSIS_MAX_TOKENS);

        let payload = match self.llm.complete(request).await {
            Ok(response) => parse_analysis(&response.content),
            Err(e) => {
                warn!(
                    company = %transcript.company_name,
                    error = %e,
                    "Analysis call failed; skipping this transcript"
                );
                return None;
            }
        };

        Some(CallAnalysis {
            summary: payload.summary,
            top_themes: payload.top_themes,
            pain_points: payload.pain_points,
            next_best_actions: payload.next_best_actions,
            sentiment: payload.sentiment,
            notable_quotes: payload.notable_quotes,
            meta: AnalysisMeta {
                company_name: transcript.company_name.clone(),
                industry: transcript.industry.clone(),
            },
        })
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_analysis_system_prompt(org_name: &str) -> String {
    format!(
        "You are an analytics assistant at {org_name}, a consulting firm.\n\
         Analyze the discovery-call transcript provided by the user.\n\
         Return ONLY a JSON object with exactly these keys:\n\
         - \"summary\": 2-3 sentence recap of the call\n\
         - \"top_themes\": list of recurring themes\n\
         - \"pain_points\": list of problems the client voiced\n\
         - \"next_best_actions\": list of concrete follow-ups for {org_name}\n\
         - \"sentiment\": \"Positive\", \"Neutral\", or \"Negative\"\n\
         - \"notable_quotes\": list of short verbatim quotes"
    )
}

fn build_analysis_user_prompt(transcript: &CallTranscript) -> String {
    format!(
        "Company: {} ({})\n\nTranscript:\n{}",
        transcript.company_name, transcript.industry, transcript.transcript_text
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// The JSON shape the analyzer asks the model for. Every field is
/// defaulted so a partial object still parses.
#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    top_themes: Vec<String>,
    #[serde(default)]
    pain_points: Vec<String>,
    #[serde(default)]
    next_best_actions: Vec<String>,
    #[serde(default = "default_sentiment")]
    sentiment: String,
    #[serde(default)]
    notable_quotes: Vec<String>,
}

fn default_sentiment() -> String {
    "Neutral".to_string()
}

/// Decode an analysis from model output, degrading to a placeholder
/// when nothing object-shaped can be recovered.
fn parse_analysis(raw: &str) -> AnalysisPayload {
    match serde_json::from_str(&extract_json_object(raw)) {
        Ok(payload) => payload,
        Err(_) => {
            warn!("Analysis output not a JSON object; using placeholder");
            AnalysisPayload {
                summary: "Parsing failed.".to_string(),
                top_themes: Vec::new(),
                pain_points: Vec::new(),
                next_best_actions: Vec::new(),
                sentiment: default_sentiment(),
                notable_quotes: Vec::new(),
            }
        }
    }
}

// ── Report rendering ────────────────────────────────────────────────

/// Render the human-readable summary report.
pub fn render_report(analyses: &[CallAnalysis]) -> String {
    let mut out = String::new();
    for analysis in analyses {
        let _ = writeln!(
            out,
            "=== {} ({}) ===",
            analysis.meta.company_name, analysis.meta.industry
        );
        let _ = writeln!(out, "Sentiment: {}", analysis.sentiment);
        let _ = writeln!(out, "Summary: {}", analysis.summary);
        out.push('\n');

        render_section(&mut out, "Top Themes", &analysis.top_themes);
        render_section(&mut out, "Pain Points", &analysis.pain_points);
        render_section(&mut out, "Next Best Actions", &analysis.next_best_actions);
        render_section(&mut out, "Notable Quotes", &analysis.notable_quotes);

        out.push('\n');
        out.push_str(&"=".repeat(60));
        out.push_str("\n\n");
    }
    out
}

fn render_section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Write the report to disk.
pub fn write_report(path: &Path, analyses: &[CallAnalysis]) -> std::io::Result<()> {
    std::fs::write(path, render_report(analyses))?;
    info!(path = %path.display(), companies = analyses.len(), "Analytics report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::CompletionResponse;

    fn transcript(company: &str) -> CallTranscript {
        CallTranscript {
            company_name: company.into(),
            industry: "Logistics".into(),
            transcript_text: "We talked about fleet routing.".into(),
        }
    }

    struct ScriptLlm {
        replies: Mutex<Vec<Result<String, ()>>>,
    }

    impl ScriptLlm {
        fn new(replies: Vec<Result<&str, ()>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl TextCompletion for ScriptLlm {
        fn model_name(&self) -> &str {
            "script"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match self.replies.lock().unwrap().remove(0) {
                Ok(content) => Ok(CompletionResponse {
                    content,
                    input_tokens: 0,
                    output_tokens: 0,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "script".into(),
                    reason: "down".into(),
                }),
            }
        }
    }

    const GOOD_ANALYSIS: &str = r#"{
        "summary": "Call went well.",
        "top_themes": ["automation"],
        "pain_points": ["manual routing"],
        "next_best_actions": ["send proposal"],
        "sentiment": "Positive",
        "notable_quotes": ["we waste hours every day"]
    }"#;

    // ── Loading ─────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_is_empty() {
        let transcripts = load_transcripts(Path::new("/definitely/not/here.json"));
        assert!(transcripts.is_empty());
    }

    #[test]
    fn load_malformed_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(load_transcripts(file.path()).is_empty());
    }

    #[test]
    fn load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"company_name": "Acme", "industry": "Mfg", "transcript_text": "hello"}]"#,
        )
        .unwrap();
        let transcripts = load_transcripts(file.path());
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].company_name, "Acme");
    }

    // ── Analysis ────────────────────────────────────────────────────

    #[tokio::test]
    async fn analysis_attaches_company_meta() {
        let analyzer = TranscriptAnalyzer::new(
            Arc::new(ScriptLlm::new(vec![Ok(GOOD_ANALYSIS)])),
            "LeadFlow",
        );
        let analyses = analyzer.analyze_all(&[transcript("Acme Freight")]).await;
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].meta.company_name, "Acme Freight");
        assert_eq!(analyses[0].sentiment, "Positive");
        assert_eq!(analyses[0].top_themes, vec!["automation"]);
    }

    #[tokio::test]
    async fn garbage_output_keeps_placeholder_entry() {
        let analyzer = TranscriptAnalyzer::new(
            Arc::new(ScriptLlm::new(vec![Ok("the call was nice, I guess")])),
            "LeadFlow",
        );
        let analyses = analyzer.analyze_all(&[transcript("Acme")]).await;
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].summary, "Parsing failed.");
        assert_eq!(analyses[0].sentiment, "Neutral");
    }

    #[tokio::test]
    async fn backend_failure_skips_only_that_transcript() {
        let analyzer = TranscriptAnalyzer::new(
            Arc::new(ScriptLlm::new(vec![Err(()), Ok(GOOD_ANALYSIS)])),
            "LeadFlow",
        );
        let analyses = analyzer
            .analyze_all(&[transcript("Broken"), transcript("Fine")])
            .await;
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].meta.company_name, "Fine");
    }

    #[tokio::test]
    async fn partial_object_parses_with_defaults() {
        let analyzer = TranscriptAnalyzer::new(
            Arc::new(ScriptLlm::new(vec![Ok(r#"{"summary": "Short call."}"#)])),
            "LeadFlow",
        );
        let analyses = analyzer.analyze_all(&[transcript("Acme")]).await;
        assert_eq!(analyses[0].summary, "Short call.");
        assert_eq!(analyses[0].sentiment, "Neutral");
        assert!(analyses[0].pain_points.is_empty());
    }

    // ── Report ──────────────────────────────────────────────────────

    #[test]
    fn report_renders_sections_per_company() {
        let analysis = CallAnalysis {
            summary: "Went well.".into(),
            top_themes: vec!["automation".into()],
            pain_points: vec!["manual work".into()],
            next_best_actions: vec!["send proposal".into()],
            sentiment: "Positive".into(),
            notable_quotes: vec!["quote me".into()],
            meta: AnalysisMeta {
                company_name: "Acme".into(),
                industry: "Mfg".into(),
            },
        };
        let report = render_report(&[analysis]);

        assert!(report.contains("=== Acme (Mfg) ==="));
        assert!(report.contains("Sentiment: Positive"));
        assert!(report.contains("Top Themes:\n  - automation"));
        assert!(report.contains("Notable Quotes:\n  - quote me"));
        assert!(report.contains(&"=".repeat(60)));
    }

    #[test]
    fn report_for_nothing_is_empty() {
        assert!(render_report(&[]).is_empty());
    }

    #[test]
    fn write_report_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        write_report(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
