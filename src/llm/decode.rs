//! Lenient extraction of structured data from model output.
//!
//! Completion backends are asked for strict JSON but routinely wrap it in
//! markdown fences or surrounding prose. These helpers pull the JSON out
//! before handing it to serde; callers decide what to do when even that
//! fails.

/// Extract a JSON object from model output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    extract_json_value(text, '{', '}')
}

/// Extract a JSON array from model output (handles markdown wrapping).
pub fn extract_json_array(text: &str) -> String {
    extract_json_value(text, '[', ']')
}

/// Strip markdown fence lines, keeping the inner text as-is.
///
/// Unlike the extractors above this makes no structural claim about the
/// result; it is the right cleanup when the fallback is to use the raw
/// text verbatim.
pub fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn extract_json_value(text: &str, open: char, close: char) -> String {
    let trimmed = text.trim();

    // Already bare JSON
    if trimmed.starts_with(open) {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with(open) {
                return inner.to_string();
            }
        }
    }

    // Try to find value bounds in surrounding prose
    if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_object_direct() {
        let input = r#"{"sentiment": "positive"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_object_from_markdown_block() {
        let input = "```json\n{\"sentiment\": \"neutral\"}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("neutral"));
    }

    #[test]
    fn extract_object_from_unlabeled_block() {
        let input = "```\n{\"subject\": \"Hello\"}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("Hello"));
    }

    #[test]
    fn extract_object_embedded_in_text() {
        let input = "My assessment: {\"sentiment\": \"negative\"} based on the wording.";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }

    #[test]
    fn extract_object_no_json_passthrough() {
        let input = "no structure here";
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_array_direct() {
        let input = r#"[{"company_name": "Acme", "intent_score": 0.9}]"#;
        assert_eq!(extract_json_array(input), input);
    }

    #[test]
    fn extract_array_from_markdown_block() {
        let input = "Here are the scores:\n```json\n[{\"company_name\": \"Acme\"}]\n```";
        let result = extract_json_array(input);
        assert!(result.starts_with('['));
        assert!(result.contains("Acme"));
    }

    #[test]
    fn extract_array_embedded_in_text() {
        let input = "Scores: [0.1, 0.8, 0.5] — ranked as requested.";
        let result = extract_json_array(input);
        assert_eq!(result, "[0.1, 0.8, 0.5]");
    }

    #[test]
    fn strip_fences_removes_fence_lines_only() {
        let input = "```json\nSubject: hello\n\nBody text.\n```";
        assert_eq!(strip_fences(input), "Subject: hello\n\nBody text.");
    }

    #[test]
    fn strip_fences_leaves_plain_text_untouched() {
        assert_eq!(strip_fences("  just prose  "), "just prose");
    }
}
