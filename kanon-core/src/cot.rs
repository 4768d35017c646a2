//! Chain-of-thought detection and trimming
//!
//! Models often narrate their reasoning before the payload. The filter
//! spots that narration and hands the extractor the smallest reasonable
//! window: the suffix starting at the most explicit answer marker found.

use regex::Regex;
use std::sync::LazyLock;

static REASONING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)let me think|step by step|reasoning:|thinking:|analysis:|therefore|in conclusion",
    )
    .unwrap()
});

static LEADING_FIRST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*first\s*,").unwrap());

static HERE_IS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)here\s+is\s+the\s+json[^:\r\n]*:").unwrap());

static OUTPUT_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)output\s+json[^:\r\n]*:").unwrap());

static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:final\s+)?answer\s*:").unwrap());

/// Check whether the text contains reasoning prose
pub fn contains_reasoning(text: &str) -> bool {
    REASONING_RE.is_match(text) || LEADING_FIRST_RE.is_match(text)
}

/// Trim reasoning prose, returning the payload window and whether
/// anything was trimmed
///
/// Anchors are tried in priority order: an explicit "here is the JSON"
/// marker, an "output JSON" marker, an "answer:" marker, the first code
/// fence, the first `{`. Textual markers are consumed; structural anchors
/// are kept. With no anchor the input comes back unchanged.
pub fn trim_reasoning(text: &str) -> (&str, bool) {
    if !contains_reasoning(text) {
        return (text, false);
    }

    for marker in [&*HERE_IS_RE, &*OUTPUT_JSON_RE, &*ANSWER_RE] {
        if let Some(found) = marker.find(text) {
            return (&text[found.end()..], true);
        }
    }

    if let Some(fence) = text.find("```") {
        return (&text[fence..], fence > 0);
    }

    if let Some(brace) = text.find('{') {
        return (&text[brace..], brace > 0);
    }

    (text, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_markers() {
        assert!(contains_reasoning("Let me think about this."));
        assert!(contains_reasoning("We solve this step by step."));
        assert!(contains_reasoning("Reasoning: the value must be null"));
        assert!(contains_reasoning("Therefore the answer is 4."));
        assert!(contains_reasoning("First, we list the inputs."));
        assert!(!contains_reasoning(r#"{"plain": true}"#));
    }

    #[test]
    fn test_leading_first_only_matches_at_start() {
        assert!(contains_reasoning("First, consider the schema."));
        assert!(!contains_reasoning("The first, and only, value."));
    }

    #[test]
    fn test_trims_at_output_json_marker() {
        let text = "Let me think... Therefore the output JSON is:\n```json\n{\"answer\":\"hi\"}\n```";
        let (payload, trimmed) = trim_reasoning(text);
        assert!(trimmed);
        assert!(payload.trim_start().starts_with("```json"));
    }

    #[test]
    fn test_trims_at_answer_marker() {
        let text = "Thinking: lots of prose here.\nFinal answer: {\"x\": 1}";
        let (payload, trimmed) = trim_reasoning(text);
        assert!(trimmed);
        assert_eq!(payload.trim(), r#"{"x": 1}"#);
    }

    #[test]
    fn test_falls_back_to_first_fence() {
        let text = "Step by step we arrive at:\n```\n{\"x\": 1}\n```";
        let (payload, trimmed) = trim_reasoning(text);
        assert!(trimmed);
        assert!(payload.starts_with("```"));
    }

    #[test]
    fn test_falls_back_to_first_brace() {
        let text = "In conclusion the result {\"x\": 1} stands.";
        let (payload, trimmed) = trim_reasoning(text);
        assert!(trimmed);
        assert!(payload.starts_with('{'));
    }

    #[test]
    fn test_no_anchor_returns_input() {
        let text = "Therefore nothing structured follows at all.";
        let (payload, trimmed) = trim_reasoning(text);
        assert!(!trimmed);
        assert_eq!(payload, text);
    }

    #[test]
    fn test_plain_payload_untouched() {
        let text = r#"{"answer": 4}"#;
        let (payload, trimmed) = trim_reasoning(text);
        assert!(!trimmed);
        assert_eq!(payload, text);
    }
}
