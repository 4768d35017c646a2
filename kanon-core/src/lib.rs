//! # Kanon - Schema-Aligned Parsing for LLM Output
//!
//! Kanon extracts a typed value from the free-form text a model produced,
//! given a declarative schema describing the expected value. It tolerates
//! what models actually emit: prose around the payload, fenced code
//! blocks, trailing commas, unquoted keys, smart quotes and truncated
//! streams - and reports precisely why a value does not conform when it
//! cannot be aligned.
//!
//! ## Quick Start
//!
//! ```rust
//! use kanon_core::prelude::*;
//!
//! let schema = Schema::object([
//!     ("answer", Schema::string()),
//!     ("confidence", Schema::number()),
//! ]);
//!
//! let response = "```json\n{\"answer\": \"42\", \"confidence\": \"0.9\"}\n```";
//! let result = parse(response, &schema, &ParseOptions::default());
//!
//! assert!(result.success);
//! assert_eq!(result.value["answer"], "42");
//! assert_eq!(result.value["confidence"], 0.9);
//! assert!(result.meta.from_markdown);
//! ```
//!
//! ## Architecture
//!
//! A parse is a linear pipeline over pure stages:
//! - **filter** ([`cot`]): strip chain-of-thought prose down to the payload
//! - **extract** ([`extract`]): recover dynamic values via a strategy ladder
//! - **coerce**: walk the value against the schema, accumulating issues
//!   and a trace instead of failing fast
//!
//! Schemas are immutable during a parse and cheaply shared by reference;
//! every entry point is a pure function of its inputs.

pub mod cot;
pub mod error;
pub mod extract;
pub mod options;
pub mod outcome;
pub mod render;
pub mod schema;

mod coerce;

use serde_json::Value;
use tracing::debug;

use crate::coerce::{coerce_value, CoerceOutcome};
use crate::error::{KanonError, Result};
use crate::extract::{ExtractError, Extraction, Extractor};
use crate::options::ParseOptions;
use crate::outcome::{ParseIssue, ParseMeta, Parsed};
use crate::schema::Schema;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a model response against a schema
///
/// Always returns an envelope: on failure the value is best-effort and
/// the issue list says what went wrong. When the extractor recovered
/// several candidate values, the one that coerces with the fewest issues
/// is selected unless `return_all_candidates` keeps them all.
pub fn parse(response: &str, schema: &Schema, options: &ParseOptions) -> Parsed {
    let (filtered_payload, filtered) = filter_stage(response, options);

    let extraction = match Extractor::new(options).extract(filtered_payload) {
        Ok(extraction) => extraction,
        Err(err) => return extraction_failure(response, filtered, err),
    };

    if extraction.candidates.len() == 1 || options.return_all_candidates {
        let value = collapse_candidates(extraction.candidates.clone());
        let outcome = coerce_value(schema, &value, options);
        return package(response, filtered, &extraction, outcome);
    }

    // several candidates: keep the one that fits the schema best
    let best = extraction
        .candidates
        .iter()
        .map(|candidate| coerce_value(schema, candidate, options))
        .min_by_key(|outcome| outcome.errors.len())
        .expect("extractor returned at least one candidate");
    package(response, filtered, &extraction, best)
}

/// Parse a possibly incomplete response, accepting whatever is present
///
/// Identical to [`parse`] with `allow_partials` and `allow_as_string`
/// forced on.
pub fn parse_partial(response: &str, schema: &Schema, options: &ParseOptions) -> Parsed {
    let options = ParseOptions {
        allow_partials: true,
        allow_as_string: true,
        ..options.clone()
    };
    parse(response, schema, &options)
}

/// Parse every extractor candidate separately
pub fn parse_all_candidates(
    response: &str,
    schema: &Schema,
    options: &ParseOptions,
) -> Vec<Parsed> {
    let (filtered_payload, filtered) = filter_stage(response, options);

    let extraction = match Extractor::new(options).extract(filtered_payload) {
        Ok(extraction) => extraction,
        Err(err) => return vec![extraction_failure(response, filtered, err)],
    };

    extraction
        .candidates
        .iter()
        .map(|candidate| {
            let outcome = coerce_value(schema, candidate, options);
            package(response, filtered, &extraction, outcome)
        })
        .collect()
}

/// Parse every candidate and keep the one with the fewest issues
///
/// Earlier candidates win ties.
pub fn parse_best_candidate(response: &str, schema: &Schema, options: &ParseOptions) -> Parsed {
    parse_all_candidates(response, schema, options)
        .into_iter()
        .min_by_key(Parsed::error_count)
        .expect("at least one candidate result")
}

/// Parse and deserialize into a caller type in one step
///
/// Fails when the parse carried issues, so the caller never silently
/// consumes a non-conforming value.
pub fn parse_typed<T: serde::de::DeserializeOwned>(
    response: &str,
    schema: &Schema,
    options: &ParseOptions,
) -> Result<T> {
    parse(response, schema, options).into_typed()
}

fn filter_stage<'t>(response: &'t str, options: &ParseOptions) -> (&'t str, bool) {
    if !options.filter_chain_of_thought {
        return (response, false);
    }
    let (payload, filtered) = cot::trim_reasoning(response);
    if filtered {
        debug!("chain-of-thought prose trimmed before extraction");
    }
    (payload, filtered)
}

fn collapse_candidates(mut candidates: Vec<Value>) -> Value {
    if candidates.len() == 1 {
        candidates.remove(0)
    } else {
        Value::Array(candidates)
    }
}

fn package(
    raw: &str,
    filtered: bool,
    extraction: &Extraction,
    outcome: CoerceOutcome,
) -> Parsed {
    Parsed {
        success: outcome.errors.is_empty(),
        value: outcome.value,
        errors: outcome.errors,
        is_partial: extraction.is_partial || outcome.is_partial,
        meta: ParseMeta {
            raw: raw.to_string(),
            from_markdown: extraction.from_markdown,
            chain_of_thought_filtered: filtered,
            fixes: extraction.fixes.clone(),
            coercions: outcome.coercions,
        },
    }
}

fn extraction_failure(raw: &str, filtered: bool, err: ExtractError) -> Parsed {
    let message = match err {
        ExtractError::NoValue => KanonError::ExtractionFailed.to_string(),
        ExtractError::DepthExceeded(limit) => KanonError::DepthExceeded(limit).to_string(),
    };
    Parsed {
        success: false,
        value: Value::Null,
        errors: vec![ParseIssue::new("", message)],
        is_partial: false,
        meta: ParseMeta {
            raw: raw.to_string(),
            chain_of_thought_filtered: filtered,
            ..Default::default()
        },
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{KanonError, Result};
    pub use crate::extract::{ExtractError, Extraction, Extractor};
    pub use crate::options::ParseOptions;
    pub use crate::outcome::{Coercion, Fix, ParseIssue, ParseMeta, Parsed};
    pub use crate::render::type_hint;
    pub use crate::schema::{Additional, NumberBounds, Schema, SchemaKind};
    pub use crate::{parse, parse_all_candidates, parse_best_candidate, parse_partial, parse_typed};
}
