//! Parse configuration

use serde::{Deserialize, Serialize};

/// Configuration for a parse run
///
/// The defaults are tuned for typical model output: markdown fences,
/// trailing commas and smart quotes are all tolerated out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Extract JSON from fenced code blocks
    pub allow_markdown_json: bool,
    /// Apply deterministic repair rewrites to malformed JSON
    pub allow_fixes: bool,
    /// Fall back to returning the raw input as a string value
    pub allow_as_string: bool,
    /// Scan prose for embedded JSON objects and arrays
    pub find_all_json_objects: bool,
    /// Replace typographic quotes with their ASCII counterparts
    pub normalize_unicode_quotes: bool,
    /// Recursion limit for the extractor
    pub max_extract_depth: usize,
    /// Recursion limit for the coercer
    pub max_coerce_depth: usize,
    /// Accept incomplete input and propagate partiality
    pub allow_partials: bool,
    /// Fill missing fields from schema defaults
    pub use_defaults: bool,
    /// Disable lossy scalar conversions (string to number, boolean to
    /// number, float truncation, stringification)
    pub strict: bool,
    /// Record a coercion trace in the result metadata
    pub track_coercions: bool,
    /// Strip chain-of-thought prose before extraction
    pub filter_chain_of_thought: bool,
    /// Keep every extractor candidate instead of selecting the best fit
    pub return_all_candidates: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_markdown_json: true,
            allow_fixes: true,
            allow_as_string: true,
            find_all_json_objects: true,
            normalize_unicode_quotes: true,
            max_extract_depth: 100,
            max_coerce_depth: 50,
            allow_partials: false,
            use_defaults: true,
            strict: false,
            track_coercions: false,
            filter_chain_of_thought: true,
            return_all_candidates: false,
        }
    }
}

impl ParseOptions {
    /// Create a config for parsing a possibly truncated stream
    pub fn partial() -> Self {
        Self {
            allow_partials: true,
            allow_as_string: true,
            ..Default::default()
        }
    }

    /// Create a config with lossy scalar coercion disabled
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    /// Enable the coercion trace
    pub fn with_trace(mut self) -> Self {
        self.track_coercions = true;
        self
    }
}
