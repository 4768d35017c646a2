//! Lenient JSON extraction from noisy model output
//!
//! Converts response text into one or more dynamic values by walking a
//! ladder of strategies, cheapest first:
//!
//! 1. strict parse, when the text already looks like a JSON value
//! 2. fenced code blocks (recursing into a single qualifying block)
//! 3. a scan for JSON objects/arrays embedded in prose
//! 4. repair rewrites (trailing commas, quote style, bare keys)
//! 5. completion of truncated input
//! 6. the raw text as a string value
//!
//! Each strategy aborts the ladder on first success. Typographic quotes
//! are normalized for recognition only: input that parses as-is comes
//! back byte-exact, and so does the string fallback.

mod repair;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::options::ParseOptions;
use crate::outcome::Fix;

/// Why extraction gave up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Every strategy rejected the input and the string fallback was off
    #[error("no JSON value could be recovered from the response")]
    NoValue,

    /// Fenced blocks nested past the recursion limit
    #[error("recursion depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

/// What the extractor recovered
#[derive(Debug, Clone)]
pub struct Extraction {
    /// One or more recovered values, in document order
    pub candidates: Vec<Value>,
    /// A fenced-block branch produced the value
    pub from_markdown: bool,
    /// Closing delimiters were invented, or the fallback was taken on an
    /// incomplete stream
    pub is_partial: bool,
    /// Ordered repair tags
    pub fixes: Vec<Fix>,
}

/// Strategy-ladder extractor
///
/// One extractor serves one input; construct it per call.
pub struct Extractor<'a> {
    options: &'a ParseOptions,
    fixes: Vec<Fix>,
    from_markdown: bool,
    partial: bool,
}

impl<'a> Extractor<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            fixes: Vec::new(),
            from_markdown: false,
            partial: false,
        }
    }

    /// Run the ladder over the input
    pub fn extract(mut self, text: &str) -> Result<Extraction, ExtractError> {
        let candidates = self.recover(text, 0)?;
        Ok(Extraction {
            candidates,
            from_markdown: self.from_markdown,
            is_partial: self.partial,
            fixes: self.fixes,
        })
    }

    fn recover(&mut self, text: &str, depth: usize) -> Result<Vec<Value>, ExtractError> {
        if depth > self.options.max_extract_depth {
            return Err(ExtractError::DepthExceeded(self.options.max_extract_depth));
        }

        // Strict parse on the pristine text first, so valid JSON carrying
        // typographic quotes inside string values survives byte-exact.
        if let Some(value) = direct_parse(text) {
            return Ok(vec![value]);
        }

        let normalized = (self.options.normalize_unicode_quotes && has_smart_quotes(text))
            .then(|| normalize_smart_quotes(text));
        if let Some(replaced) = normalized.as_deref() {
            if let Some(value) = direct_parse(replaced) {
                self.record_fix(Fix::NormalizedUnicodeQuotes);
                debug!("direct parse succeeded after quote normalization");
                return Ok(vec![value]);
            }
        }
        let work = normalized.as_deref().unwrap_or(text);

        if self.options.allow_markdown_json {
            if let Some(values) = self.from_fences(text, depth)? {
                return Ok(values);
            }
        }

        if self.options.find_all_json_objects {
            if let Some(values) = self.from_scan(work) {
                if normalized.is_some() {
                    self.record_fix(Fix::NormalizedUnicodeQuotes);
                }
                return Ok(values);
            }
        }

        if self.options.allow_fixes {
            if let Some(value) = self.from_repair(work) {
                if normalized.is_some() {
                    self.record_fix(Fix::NormalizedUnicodeQuotes);
                }
                return Ok(vec![value]);
            }
            if let Some(value) = self.from_completion(work) {
                if normalized.is_some() {
                    self.record_fix(Fix::NormalizedUnicodeQuotes);
                }
                return Ok(vec![value]);
            }
        }

        if self.options.allow_as_string {
            debug!("extraction fell back to a raw string value");
            self.partial = self.options.allow_partials;
            return Ok(vec![Value::String(text.to_string())]);
        }

        Err(ExtractError::NoValue)
    }

    /// Strategy 2: fenced code blocks
    fn from_fences(
        &mut self,
        text: &str,
        depth: usize,
    ) -> Result<Option<Vec<Value>>, ExtractError> {
        let qualifying: Vec<Fence<'_>> = fenced_blocks(text)
            .into_iter()
            .filter(Fence::qualifies)
            .collect();

        match qualifying.len() {
            0 => Ok(None),
            1 => match self.recover(qualifying[0].body.trim(), depth + 1) {
                Ok(values) => {
                    self.from_markdown = true;
                    debug!("extracted value from a fenced block");
                    Ok(Some(values))
                }
                Err(ExtractError::NoValue) => Ok(None),
                Err(depth_err) => Err(depth_err),
            },
            _ => {
                let strict: Vec<Value> = qualifying
                    .iter()
                    .filter_map(|fence| self.strict_or_normalized(fence.body))
                    .collect();
                if !strict.is_empty() {
                    self.from_markdown = true;
                    debug!(blocks = strict.len(), "extracted values from fenced blocks");
                    return Ok(Some(strict));
                }

                if self.options.allow_fixes {
                    let repaired: Vec<Value> = qualifying
                        .iter()
                        .filter_map(|fence| repair::parse_repaired(fence.body))
                        .collect();
                    if !repaired.is_empty() {
                        self.record_fix(Fix::AppliedAutoFixes);
                        self.from_markdown = true;
                        warn!(
                            blocks = repaired.len(),
                            "applied auto-fixes inside fenced blocks"
                        );
                        return Ok(Some(repaired));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Strategy 3: embedded objects and arrays
    ///
    /// The candidate regex does not nest: an object containing `}` inside
    /// a nested object is cut short and recovered by the repair ladder or
    /// a fence instead.
    fn from_scan(&mut self, text: &str) -> Option<Vec<Value>> {
        static CANDIDATE_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\{[\s\S]*?\}|\[[\s\S]*?\]").unwrap());

        let mut values = Vec::new();
        let mut repaired_any = false;
        for found in CANDIDATE_RE.find_iter(text) {
            if let Ok(value) = serde_json::from_str(found.as_str()) {
                values.push(value);
            } else if self.options.allow_fixes {
                if let Some(value) = repair::parse_repaired(found.as_str()) {
                    values.push(value);
                    repaired_any = true;
                }
            }
        }

        if values.is_empty() {
            return None;
        }
        if repaired_any {
            self.record_fix(Fix::AppliedAutoFixes);
        }
        debug!(candidates = values.len(), "extracted embedded JSON values");
        Some(values)
    }

    /// Strategy 4: repair rewrites over the whole window
    fn from_repair(&mut self, text: &str) -> Option<Value> {
        let value = repair::parse_repaired(text)?;
        self.record_fix(Fix::AppliedAutoFixes);
        warn!("applied auto-fixes to malformed JSON");
        Some(value)
    }

    /// Strategy 5: close a truncated stream and re-parse
    fn from_completion(&mut self, text: &str) -> Option<Value> {
        let (window, stripped_fence) = strip_open_fence(text);
        let completed = repair::complete(window.trim())?;

        let value = match serde_json::from_str(&completed) {
            Ok(value) => value,
            Err(_) => {
                let value = repair::parse_repaired(&completed)?;
                self.record_fix(Fix::AppliedAutoFixes);
                value
            }
        };

        self.record_fix(Fix::ExtractedPartial);
        self.partial = true;
        if stripped_fence {
            self.from_markdown = true;
        }
        warn!("completed a truncated JSON stream");
        Some(value)
    }

    /// Strict parse with a quote-normalized second chance
    fn strict_or_normalized(&mut self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Some(value);
        }
        if self.options.normalize_unicode_quotes && has_smart_quotes(trimmed) {
            if let Ok(value) = serde_json::from_str(&normalize_smart_quotes(trimmed)) {
                self.record_fix(Fix::NormalizedUnicodeQuotes);
                return Some(value);
            }
        }
        None
    }

    fn record_fix(&mut self, fix: Fix) {
        if !self.fixes.contains(&fix) {
            self.fixes.push(fix);
        }
    }
}

/// A fenced code block with its language tag
struct Fence<'t> {
    tag: &'t str,
    body: &'t str,
}

impl Fence<'_> {
    fn qualifies(&self) -> bool {
        matches!(
            self.tag.to_ascii_lowercase().as_str(),
            "json" | "javascript" | "js" | ""
        ) || looks_like_json(self.body.trim())
    }
}

fn fenced_blocks(text: &str) -> Vec<Fence<'_>> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"```([A-Za-z0-9_+-]*)[^\S\r\n]*\r?\n?([\s\S]*?)```").unwrap()
    });

    FENCE_RE
        .captures_iter(text)
        .map(|caps| Fence {
            tag: caps.get(1).map_or("", |m| m.as_str()),
            body: caps.get(2).map_or("", |m| m.as_str()),
        })
        .collect()
}

/// Window into an unterminated fenced block, if the text opens one
fn strip_open_fence(text: &str) -> (&str, bool) {
    if let Some(idx) = text.find("```") {
        let rest = &text[idx + 3..];
        if !rest.contains("```") {
            if let Some(newline) = rest.find('\n') {
                return (&rest[newline + 1..], true);
            }
        }
    }
    (text, false)
}

fn direct_parse(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !looks_like_json(trimmed) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Cheap shape check: delimiter pair at the ends, or a bare literal
fn looks_like_json(trimmed: &str) -> bool {
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"'))
        || trimmed == "true"
        || trimmed == "false"
        || trimmed == "null"
        || (!trimmed.is_empty()
            && trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '-')
            && trimmed.parse::<f64>().is_ok())
}

const SMART_QUOTES: [char; 4] = ['\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

fn has_smart_quotes(text: &str) -> bool {
    text.chars().any(|c| SMART_QUOTES.contains(&c))
}

fn normalize_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str) -> Extraction {
        let options = ParseOptions::default();
        Extractor::new(&options).extract(text).unwrap()
    }

    #[test]
    fn test_direct_object() {
        let out = extract(r#"{"name":"test","count":5}"#);
        assert_eq!(out.candidates, vec![json!({"name":"test","count":5})]);
        assert!(out.fixes.is_empty());
        assert!(!out.from_markdown);
        assert!(!out.is_partial);
    }

    #[test]
    fn test_direct_literals() {
        assert_eq!(extract("true").candidates, vec![json!(true)]);
        assert_eq!(extract("null").candidates, vec![json!(null)]);
        assert_eq!(extract("-3.5").candidates, vec![json!(-3.5)]);
        assert_eq!(extract(r#""hi""#).candidates, vec![json!("hi")]);
    }

    #[test]
    fn test_fenced_block() {
        let out = extract("```json\n{\"value\": true}\n```");
        assert_eq!(out.candidates, vec![json!({"value": true})]);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let out = extract("Here you go:\n```json\n{\"x\": 1}\n```\nAnything else?");
        assert_eq!(out.candidates, vec![json!({"x": 1})]);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_untagged_fence_qualifies() {
        let out = extract("```\n{\"x\": 1}\n```");
        assert_eq!(out.candidates, vec![json!({"x": 1})]);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_multiple_fenced_blocks() {
        let out = extract("```json\n{\"a\": 1}\n```\nand\n```json\n{\"b\": 2}\n```");
        assert_eq!(out.candidates, vec![json!({"a": 1}), json!({"b": 2})]);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_embedded_object_in_prose() {
        let out = extract(r#"The result is {"key": "value"} and that's it."#);
        assert_eq!(out.candidates, vec![json!({"key": "value"})]);
        assert!(!out.from_markdown);
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let out = extract(r#"{"a":1,"b":2,}"#);
        assert_eq!(out.candidates, vec![json!({"a":1,"b":2})]);
        assert!(out.fixes.contains(&Fix::AppliedAutoFixes));
    }

    #[test]
    fn test_smart_quotes_normalized_when_needed() {
        let out = extract("{\u{201C}action\u{201D}:\u{201C}diagnostics\u{201D}}");
        assert_eq!(out.candidates, vec![json!({"action": "diagnostics"})]);
        assert_eq!(out.fixes, vec![Fix::NormalizedUnicodeQuotes]);
    }

    #[test]
    fn test_smart_quotes_preserved_in_valid_json() {
        let text = "{\"command\":\"echo {\u{201C}action\u{201D}: \u{201C}diagnostics\u{201D}}\"}";
        let out = extract(text);
        assert_eq!(
            out.candidates[0]["command"],
            json!("echo {\u{201C}action\u{201D}: \u{201C}diagnostics\u{201D}}")
        );
        assert!(out.fixes.is_empty());
    }

    #[test]
    fn test_truncated_stream_completed() {
        let out = extract(r#"{"items":["a","b""#);
        assert_eq!(out.candidates, vec![json!({"items":["a","b"]})]);
        assert!(out.is_partial);
        assert!(out.fixes.contains(&Fix::ExtractedPartial));
    }

    #[test]
    fn test_truncated_fenced_stream_completed() {
        let out = extract("```json\n{\"items\": [1, 2");
        assert_eq!(out.candidates, vec![json!({"items": [1, 2]})]);
        assert!(out.is_partial);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_string_fallback() {
        let out = extract("no structure here at all");
        assert_eq!(out.candidates, vec![json!("no structure here at all")]);
        assert!(!out.is_partial);
    }

    #[test]
    fn test_fallback_disabled_fails() {
        let options = ParseOptions {
            allow_as_string: false,
            ..Default::default()
        };
        let err = Extractor::new(&options)
            .extract("no structure here at all")
            .unwrap_err();
        assert_eq!(err, ExtractError::NoValue);
    }

    #[test]
    fn test_fallback_returns_original_despite_smart_quotes() {
        let text = "she said \u{201C}hello\u{201D} and left";
        let out = extract(text);
        assert_eq!(out.candidates, vec![json!(text)]);
    }

    #[test]
    fn test_fence_tag_case_insensitive() {
        let out = extract("```JSON\n{\"x\": 1}\n```");
        assert_eq!(out.candidates, vec![json!({"x": 1})]);
        assert!(out.from_markdown);
    }

    #[test]
    fn test_single_quoted_and_bare_keys() {
        let out = extract(r#"{'name': "x", age: 3}"#);
        assert_eq!(out.candidates, vec![json!({"name": "x", "age": 3})]);
        assert!(out.fixes.contains(&Fix::AppliedAutoFixes));
    }
}
