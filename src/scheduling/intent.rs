//! Reply-intent classification.
//!
//! One completion call per reply, constrained to a
//! `{sentiment, availability}` JSON shape, followed by a deterministic
//! date-mention sweep. The sweep exists because models regularly label
//! a reply "neutral" while quoting a concrete slot in the same breath;
//! text that names a weekday or month next to a day number is treated
//! as availability no matter what the model said.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::decode::extract_json_object;
use crate::llm::provider::{ChatMessage, CompletionRequest, TextCompletion};
use crate::mail::reply::is_sentinel;

/// Classification runs cold; the rubric leaves no room for creativity.
const INTENT_TEMPERATURE: f32 = 0.0;

/// Token ceiling for the two-field verdict object.
const INTENT_MAX_TOKENS: u32 = 128;

/// Date-like mention: a weekday or month token within short range of a
/// day number. Deliberately loose; a false positive costs one failed
/// resolve, a false negative costs a meeting.
const AVAILABILITY_PATTERN: &str = r"(?i)(?:\b(?:mon|tue|wed|thu|fri|sat|sun)\b|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b).{0,20}?\b\d{1,2}\b.*?(?:am|pm)?";

// ── Judgment types ──────────────────────────────────────────────────

/// Reply tone as judged by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// What the classifier concluded about one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentJudgment {
    pub sentiment: Sentiment,
    /// The availability mention, verbatim, when one was found.
    pub availability_phrase: Option<String>,
}

impl IntentJudgment {
    /// The do-nothing verdict used when classification fails.
    fn undecided() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            availability_phrase: None,
        }
    }
}

// ── Classifier ──────────────────────────────────────────────────────

/// Classifies reply intent through the completion seam, with the
/// date sweep as a deterministic safety net.
pub struct IntentClassifier {
    llm: Arc<dyn TextCompletion>,
    availability: Regex,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self {
            llm,
            availability: Regex::new(AVAILABILITY_PATTERN).unwrap(),
        }
    }

    /// Judge one reply. Infallible: a dead backend or malformed output
    /// yields a neutral verdict, and the date sweep still runs.
    pub async fn classify(&self, reply_text: &str) -> IntentJudgment {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(INTENT_SYSTEM_PROMPT),
            ChatMessage::user(format!("Email reply:\n{reply_text}")),
        ])
        .with_temperature(INTENT_TEMPERATURE)
        .with_max_tokens(INTENT_MAX_TOKENS);

        let judgment = match self.llm.complete(request).await {
            Ok(response) => parse_intent_response(&response.content),
            Err(e) => {
                warn!(error = %e, "Intent call failed; treating the reply as neutral");
                IntentJudgment::undecided()
            }
        };

        self.sweep_for_dates(judgment, reply_text)
    }

    /// Fill a missing availability phrase from the raw text. A hit also
    /// forces the sentiment positive: a named slot outranks whatever
    /// tone the classifier assigned.
    fn sweep_for_dates(&self, mut judgment: IntentJudgment, reply_text: &str) -> IntentJudgment {
        if judgment.availability_phrase.is_none()
            && let Some(m) = self.availability.find(reply_text)
        {
            debug!(phrase = m.as_str(), "Date sweep found an availability mention");
            judgment.availability_phrase = Some(m.as_str().to_string());
            judgment.sentiment = Sentiment::Positive;
        }
        judgment
    }
}

// ── Prompt construction ─────────────────────────────────────────────

const INTENT_SYSTEM_PROMPT: &str = "\
You are analyzing an email reply to a business outreach message.\n\
Classify the sender's sentiment about taking a call:\n\
- \"positive\": interested, proposes or accepts a time\n\
- \"negative\": declines or asks to stop\n\
- \"neutral\": anything else (questions, deferrals, ambiguity)\n\
If the reply mentions a concrete day or time, quote it verbatim in \
\"availability\"; otherwise use null.\n\
Return ONLY a JSON object like:\n\
{\"sentiment\": \"positive\", \"availability\": \"Tuesday at 10am\"}";

// ── Response parsing ────────────────────────────────────────────────

/// The JSON shape the classifier asks the model for.
#[derive(Debug, Deserialize)]
struct IntentPayload {
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    availability: Option<String>,
}

/// Decode a verdict from model output. Anything unusable degrades to
/// the neutral verdict rather than erroring.
fn parse_intent_response(raw: &str) -> IntentJudgment {
    let Ok(payload) = serde_json::from_str::<IntentPayload>(&extract_json_object(raw)) else {
        warn!("Intent output not a sentiment/availability object");
        return IntentJudgment::undecided();
    };

    let sentiment = match payload.sentiment.trim().to_lowercase().as_str() {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };

    // Models sometimes return the string "null" or "" instead of an
    // actual null; both carry no availability.
    let availability_phrase = payload
        .availability
        .filter(|phrase| !is_sentinel(phrase));

    IntentJudgment {
        sentiment,
        availability_phrase,
    }
}
