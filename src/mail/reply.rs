//! Reply hygiene — quote stripping, noise detection, preview truncation.
//!
//! Inbound replies arrive with quoted history, autoresponder boilerplate,
//! and sharing-notification noise. Everything here is pure string work;
//! no LLM calls.

use regex::Regex;

/// Reply bodies equal to one of these (after trimming and lowercasing)
/// carry no content and are treated as absent.
const SENTINEL_VALUES: [&str; 4] = ["none", "null", "", "no reply"];

/// Strip quoted text from an email body.
///
/// Removes:
/// - Lines starting with `>` (quoted reply lines)
/// - Everything after an "On ... wrote:" attribution line
/// - Everything after a "--- Original Message ---" separator
pub fn strip_quoted_text(body: &str) -> String {
    let mut result = Vec::new();
    let mut skip_rest = false;

    for line in body.lines() {
        if skip_rest {
            break;
        }

        let trimmed = line.trim();

        // Skip quoted lines (> prefix)
        if trimmed.starts_with('>') {
            continue;
        }

        // Detect "On <date> <person> wrote:" attribution line
        if trimmed.starts_with("On ") && trimmed.ends_with("wrote:") {
            skip_rest = true;
            continue;
        }

        if trimmed.starts_with("---") && trimmed.contains("Original Message") {
            skip_rest = true;
            continue;
        }

        result.push(line);
    }

    // Trim trailing blank lines
    while result.last().is_some_and(|l| l.trim().is_empty()) {
        result.pop();
    }

    result.join("\n")
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip quoted history and normalize whitespace in one pass.
pub fn clean_reply(body: &str) -> String {
    collapse_whitespace(&strip_quoted_text(body))
}

/// Check whether a cleaned body is a contentless placeholder.
pub fn is_sentinel(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    SENTINEL_VALUES.contains(&lowered.as_str())
}

/// Truncate text to a bounded preview, on a character boundary.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ── Noise filter ────────────────────────────────────────────────────

/// Detects automated messages that look like replies but aren't.
///
/// A matched body is treated as "no message yet" so the reply watcher
/// keeps polling instead of surfacing machine-generated text.
pub struct NoiseFilter {
    patterns: Vec<Regex>,
}

impl NoiseFilter {
    /// Create a filter with the default automated-message signatures.
    pub fn default_signatures() -> Self {
        let patterns = vec![
            // Document-sharing notifications
            Regex::new(r"(?i)google drive").unwrap(),
            Regex::new(r"(?i)requests access").unwrap(),
            // Autoresponders
            Regex::new(r"(?i)out of office").unwrap(),
            Regex::new(r"(?i)autoreply").unwrap(),
        ];
        Self { patterns }
    }

    /// Create an empty filter (for testing).
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add a custom signature.
    pub fn add_signature(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.patterns.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Check whether a cleaned body is noise (or a contentless sentinel).
    pub fn is_noise(&self, body: &str) -> bool {
        if is_sentinel(body) {
            return true;
        }
        self.patterns.iter().any(|p| p.is_match(body))
    }
}
