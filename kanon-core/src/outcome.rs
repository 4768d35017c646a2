//! Parse result envelope
//!
//! Wraps the coerced value with the diagnostics and provenance a caller
//! needs to decide whether to trust it: per-path issues, partiality, the
//! repairs the extractor applied and (optionally) the coercion trace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KanonError;

/// A single problem found while aligning a value to a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    /// Dotted/bracketed location, e.g. `items[2].price`; empty at the root
    pub path: String,
    /// Human-readable description of the problem
    pub message: String,
}

impl ParseIssue {
    /// Create an issue at the given path
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A lossy conversion recorded during coercion
///
/// Unlike a [`ParseIssue`], a coercion changed the value but did not
/// count against the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coercion {
    /// Location of the converted value
    pub path: String,
    /// What was done, e.g. `parsed string to number`
    pub note: String,
}

impl Coercion {
    /// Create a trace entry at the given path
    pub fn new(path: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            note: note.into(),
        }
    }
}

/// Repair applied by the extractor before a value was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fix {
    /// Typographic quotes were replaced with ASCII quotes
    NormalizedUnicodeQuotes,
    /// Trailing commas, quote style or bare keys were rewritten
    AppliedAutoFixes,
    /// Unclosed braces/brackets were completed
    ExtractedPartial,
}

/// Provenance metadata for a parse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseMeta {
    /// Exact original response text
    pub raw: String,
    /// The extractor took a fenced-block branch
    pub from_markdown: bool,
    /// The chain-of-thought filter actually trimmed the input
    pub chain_of_thought_filtered: bool,
    /// Ordered repair tags from the extractor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
    /// Ordered coercion trace, populated only when tracing is enabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coercions: Vec<Coercion>,
}

/// Result of aligning a model response to a schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parsed {
    /// True when the issue list is empty after coercion
    pub success: bool,
    /// The coerced value, best-effort even when issues were found
    pub value: Value,
    /// Ordered list of problems found during coercion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ParseIssue>,
    /// The result is incomplete (truncated input or absent required fields)
    pub is_partial: bool,
    /// Provenance metadata
    pub meta: ParseMeta,
}

impl Parsed {
    /// Check whether coercion finished without issues
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The coerced value when the parse succeeded
    pub fn value(&self) -> Option<&Value> {
        self.success.then_some(&self.value)
    }

    /// Number of issues found during coercion
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Deserialize the coerced value into a caller type
    ///
    /// Fails with [`KanonError::Validation`] when the parse carried
    /// issues, so a caller never silently consumes a non-conforming value.
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> crate::error::Result<T> {
        if !self.success {
            return Err(KanonError::Validation(self.errors));
        }
        Ok(serde_json::from_value(self.value)?)
    }
}
