//! Lossy scalar coercion and constraint validation
//!
//! Conversions here change the value and are recorded in the trace;
//! constraint violations are errors but never reject the converted value.
//! With `strict` enabled the lossy conversions are suppressed and shape
//! mismatches become errors.

use regex::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

use super::{kind_of, Coercer};
use crate::schema::NumberBounds;

impl Coercer<'_> {
    pub(super) fn coerce_string(
        &mut self,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<&str>,
        format: Option<&str>,
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        let text = match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if !self.options.strict => {
                self.note(path, "stringified number");
                Some(n.to_string())
            }
            Value::Bool(b) if !self.options.strict => {
                self.note(path, "stringified boolean");
                Some(b.to_string())
            }
            Value::Array(_) | Value::Object(_) if !self.options.strict => {
                self.note(path, "JSON-encoded value as string");
                serde_json::to_string(value).ok()
            }
            _ => None,
        };

        match text {
            Some(text) => {
                self.check_string_facets(min_length, max_length, pattern, format, &text, path);
                Some(Value::String(text))
            }
            None => {
                self.error(path, format!("expected string, got {}", kind_of(value)));
                Some(value.clone())
            }
        }
    }

    pub(super) fn check_string_facets(
        &mut self,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<&str>,
        format: Option<&str>,
        text: &str,
        path: &str,
    ) {
        let length = text.chars().count();
        if let Some(min) = min_length {
            if length < min {
                self.error(path, format!("length {length} is below minimum {min}"));
            }
        }
        if let Some(max) = max_length {
            if length > max {
                self.error(path, format!("length {length} is above maximum {max}"));
            }
        }
        if let Some(pattern) = pattern {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(text) {
                        self.error(path, format!("does not match pattern `{pattern}`"));
                    }
                }
                Err(_) => self.error(path, format!("invalid pattern `{pattern}` in schema")),
            }
        }
        if let Some(format) = format {
            if let Some(re) = format_regex(format) {
                if !re.is_match(text) {
                    self.error(path, format!("does not match format `{format}`"));
                }
            }
        }
    }

    pub(super) fn coerce_number(
        &mut self,
        bounds: &NumberBounds,
        integer: bool,
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        let target = if integer { "integer" } else { "number" };

        let number = match value {
            Value::Number(n) => {
                if integer {
                    if let Some(whole) = n.as_i64() {
                        NumberValue::Int(whole)
                    } else if let Some(float) = n.as_f64() {
                        if self.options.strict {
                            self.error(path, format!("expected integer, got {float}"));
                            return Some(value.clone());
                        }
                        let truncated = float.trunc() as i64;
                        self.note(path, format!("truncated {float} to {truncated}"));
                        NumberValue::Int(truncated)
                    } else {
                        self.error(path, "expected integer, got an unrepresentable number");
                        return Some(value.clone());
                    }
                } else {
                    match n.as_f64() {
                        Some(float) => NumberValue::Float(float),
                        None => {
                            self.error(path, "expected number, got an unrepresentable number");
                            return Some(value.clone());
                        }
                    }
                }
            }
            Value::String(s) if !self.options.strict => {
                let trimmed = s.trim();
                let parsed = if integer {
                    trimmed
                        .parse::<i64>()
                        .map(NumberValue::Int)
                        .or_else(|_| trimmed.parse::<f64>().map(|f| NumberValue::Int(f.trunc() as i64)))
                        .ok()
                } else {
                    trimmed.parse::<f64>().map(NumberValue::Float).ok()
                };
                match parsed {
                    Some(parsed) => {
                        self.note(path, "parsed string to number");
                        parsed
                    }
                    None => {
                        self.error(path, format!("cannot parse string as {target}"));
                        return Some(value.clone());
                    }
                }
            }
            Value::Bool(b) if !self.options.strict => {
                self.note(path, "converted boolean to number");
                if integer {
                    NumberValue::Int(i64::from(*b))
                } else {
                    NumberValue::Float(f64::from(u8::from(*b)))
                }
            }
            other => {
                self.error(path, format!("expected {target}, got {}", kind_of(other)));
                return Some(other.clone());
            }
        };

        self.check_bounds(bounds, number.as_f64(), path);

        match number {
            NumberValue::Int(i) => Some(Value::Number(Number::from(i))),
            NumberValue::Float(f) => match Number::from_f64(f) {
                Some(n) => Some(Value::Number(n)),
                None => {
                    self.error(path, format!("{f} is not a representable number"));
                    Some(Value::Null)
                }
            },
        }
    }

    fn check_bounds(&mut self, bounds: &NumberBounds, number: f64, path: &str) {
        if bounds.is_empty() {
            return;
        }
        if let Some(min) = bounds.minimum {
            if number < min {
                self.error(path, format!("{number} is below minimum {min}"));
            }
        }
        if let Some(max) = bounds.maximum {
            if number > max {
                self.error(path, format!("{number} is above maximum {max}"));
            }
        }
        if let Some(min) = bounds.exclusive_minimum {
            if number <= min {
                self.error(path, format!("{number} is not above exclusive minimum {min}"));
            }
        }
        if let Some(max) = bounds.exclusive_maximum {
            if number >= max {
                self.error(path, format!("{number} is not below exclusive maximum {max}"));
            }
        }
        if let Some(step) = bounds.multiple_of {
            if step != 0.0 {
                let remainder = (number % step).abs();
                if remainder > 1e-9 && (step.abs() - remainder) > 1e-9 {
                    self.error(path, format!("{number} is not a multiple of {step}"));
                }
            }
        }
    }

    pub(super) fn coerce_boolean(&mut self, value: &Value, path: &str) -> Option<Value> {
        match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) if !self.options.strict => {
                match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" => {
                        self.note(path, "interpreted string as boolean");
                        Some(Value::Bool(true))
                    }
                    "false" | "0" | "no" | "" => {
                        self.note(path, "interpreted string as boolean");
                        Some(Value::Bool(false))
                    }
                    _ => {
                        self.error(path, format!("cannot interpret `{s}` as boolean"));
                        Some(value.clone())
                    }
                }
            }
            Value::Number(n) if !self.options.strict => {
                self.note(path, "interpreted number as boolean");
                Some(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)))
            }
            other => {
                self.error(path, format!("expected boolean, got {}", kind_of(other)));
                Some(other.clone())
            }
        }
    }

    pub(super) fn coerce_literal(
        &mut self,
        expected: &Value,
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        if value == expected {
            return Some(value.clone());
        }
        if let (Some(have), Some(want)) = (scalar_text(value), scalar_text(expected)) {
            if have == want {
                self.note(path, "substituted typed literal value");
                return Some(expected.clone());
            }
        }
        self.error(path, format!("expected literal {expected}"));
        Some(value.clone())
    }

    pub(super) fn coerce_enum(
        &mut self,
        values: &[Value],
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        if values.contains(value) {
            return Some(value.clone());
        }
        if let Some(have) = scalar_text(value) {
            let needle = have.to_lowercase();
            for candidate in values {
                if let Some(text) = scalar_text(candidate) {
                    if text.to_lowercase() == needle {
                        self.note(path, "matched enum value case-insensitively");
                        return Some(candidate.clone());
                    }
                }
            }
        }
        let allowed = values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.error(path, format!("expected one of [{allowed}]"));
        Some(value.clone())
    }
}

enum NumberValue {
    Int(i64),
    Float(f64),
}

impl NumberValue {
    fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int(i) => *i as f64,
            NumberValue::Float(f) => *f,
        }
    }
}

/// Scalar stringification used for literal/enum fallback matching
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn format_regex(format: &str) -> Option<&'static Regex> {
    static DATE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
    static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:[Zz]|[+-]\d{2}:\d{2})?$")
            .unwrap()
    });
    static EMAIL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
    static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .unwrap()
    });
    static URI_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").unwrap());

    match format {
        "date" => Some(&DATE_RE),
        "date-time" => Some(&DATE_TIME_RE),
        "email" => Some(&EMAIL_RE),
        "uuid" => Some(&UUID_RE),
        "uri" | "url" => Some(&URI_RE),
        // unknown formats are not validated
        _ => None,
    }
}
