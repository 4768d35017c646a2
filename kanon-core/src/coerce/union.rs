//! Union variant selection
//!
//! Alternatives are tried in declared order against private buffers. The
//! first alternative that coerces without errors wins outright; otherwise
//! the one with the fewest errors is kept, earlier alternatives winning
//! ties. A cheap shape pre-filter keeps obviously inadmissible
//! alternatives out of the expensive walk.

use serde_json::Value;
use tracing::debug;

use super::Coercer;
use crate::schema::{Schema, SchemaKind};

impl Coercer<'_> {
    pub(super) fn coerce_union(
        &mut self,
        variants: &[Schema],
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        if variants.is_empty() {
            self.error(path, "union schema has no alternatives");
            return Some(value.clone());
        }

        let admissible: Vec<&Schema> = variants
            .iter()
            .filter(|variant| can_handle(variant, value))
            .collect();
        // with nothing admissible, fall back to trying every alternative
        let pool: Vec<&Schema> = if admissible.is_empty() {
            variants.iter().collect()
        } else {
            admissible
        };

        let mut best: Option<(Coercer<'_>, Option<Value>)> = None;
        for variant in pool {
            let mut attempt = Coercer::new(self.options);
            let result = attempt.coerce(variant, Some(value), path, depth + 1);

            if attempt.errors.is_empty() {
                debug!(variant = variant.type_name(), "union alternative matched");
                self.coercions.extend(attempt.coercions);
                self.partial |= attempt.partial;
                return result;
            }

            let beats_best = best
                .as_ref()
                .map_or(true, |(held, _)| attempt.errors.len() < held.errors.len());
            if beats_best {
                best = Some((attempt, result));
            }
        }

        let (chosen, result) = best.expect("non-empty union pool");
        let error_count = chosen.errors.len();
        self.errors.extend(chosen.errors);
        self.coercions.extend(chosen.coercions);
        self.partial |= chosen.partial;
        self.note(
            path,
            format!("selected union alternative carrying {error_count} error(s)"),
        );
        result
    }
}

/// Single-layer admissibility check: does the alternative's tag admit the
/// input's dynamic shape?
fn can_handle(schema: &Schema, value: &Value) -> bool {
    match (&schema.kind, value) {
        (SchemaKind::Any | SchemaKind::Ref { .. }, _) => true,
        (SchemaKind::Optional { .. }, Value::Null) => true,
        (SchemaKind::Optional { inner }, other) => can_handle(inner, other),
        (SchemaKind::Null, Value::Null) => true,
        (SchemaKind::String { .. }, Value::String(_)) => true,
        (SchemaKind::Integer { .. } | SchemaKind::Number { .. }, Value::Number(_)) => true,
        (SchemaKind::Boolean, Value::Bool(_)) => true,
        (
            SchemaKind::Object { .. } | SchemaKind::Record { .. } | SchemaKind::Intersect { .. },
            Value::Object(_),
        ) => true,
        (SchemaKind::Array { .. } | SchemaKind::Tuple { .. }, Value::Array(_)) => true,
        (SchemaKind::Literal { value: expected }, other) => expected == other,
        (SchemaKind::Enum { values }, other) => values.contains(other),
        (SchemaKind::Union { variants }, other) => {
            variants.iter().any(|variant| can_handle(variant, other))
        }
        _ => false,
    }
}
