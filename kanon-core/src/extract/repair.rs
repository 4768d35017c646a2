//! Deterministic repair rewrites for almost-JSON
//!
//! The rewrites are intentionally scoped to the three mistakes models
//! actually make: trailing commas, single-quoted keys and bare keys.
//! Anything beyond that belongs to a failing test first.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

static SINGLE_QUOTED_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^'\r\n]*)'(\s*:)").unwrap());

static BARE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)(\s*:)").unwrap());

/// Apply the repair rewrites in order: drop trailing commas, requote
/// single-quoted keys, quote bare keys
pub(crate) fn rewrite(input: &str) -> String {
    let pass = TRAILING_COMMA_RE.replace_all(input, "$1");
    let pass = SINGLE_QUOTED_KEY_RE.replace_all(&pass, r#""$1"$2"#);
    let pass = BARE_KEY_RE.replace_all(&pass, r#"$1"$2"$3"#);
    pass.into_owned()
}

/// Rewrite and strict-parse in one step
pub(crate) fn parse_repaired(text: &str) -> Option<Value> {
    serde_json::from_str(&rewrite(text.trim())).ok()
}

/// Close an unterminated string, then unclosed braces and brackets
/// innermost-first
///
/// Returns `None` when the input is already balanced, so the caller can
/// tell "nothing to complete" apart from "completion produced text".
pub(crate) fn complete(text: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for c in text.chars() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return None;
    }

    let mut out = String::with_capacity(text.len() + stack.len() + 1);
    out.push_str(text);
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    Some(out)
}
