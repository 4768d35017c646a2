//! Schema-directed coercion of dynamic values
//!
//! The walk dispatches on the schema tag and accumulates every problem it
//! finds instead of stopping at the first: the caller always gets a
//! best-effort value alongside the full diagnostic list. Lossy
//! conversions are recorded as trace entries, not errors.

mod scalar;
mod union;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::extract::Extractor;
use crate::options::ParseOptions;
use crate::outcome::{Coercion, ParseIssue};
use crate::schema::{Additional, Schema, SchemaKind};

/// Everything a coercion walk produced
#[derive(Debug)]
pub(crate) struct CoerceOutcome {
    pub value: Value,
    pub errors: Vec<ParseIssue>,
    pub coercions: Vec<Coercion>,
    pub is_partial: bool,
}

/// Walk a dynamic value against a schema
pub(crate) fn coerce_value(
    schema: &Schema,
    value: &Value,
    options: &ParseOptions,
) -> CoerceOutcome {
    let mut walker = Coercer::new(options);
    let coerced = walker.coerce(schema, Some(value), "", 0);
    debug!(
        errors = walker.errors.len(),
        partial = walker.partial,
        "coercion walk finished"
    );
    CoerceOutcome {
        value: coerced.unwrap_or(Value::Null),
        errors: walker.errors,
        coercions: walker.coercions,
        is_partial: walker.partial,
    }
}

/// Stateful walker threading the error list and trace through the tree
struct Coercer<'a> {
    options: &'a ParseOptions,
    errors: Vec<ParseIssue>,
    coercions: Vec<Coercion>,
    partial: bool,
}

impl<'a> Coercer<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
            coercions: Vec::new(),
            partial: false,
        }
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ParseIssue::new(path, message));
    }

    fn note(&mut self, path: &str, note: impl Into<String>) {
        if self.options.track_coercions {
            self.coercions.push(Coercion::new(path, note));
        }
    }

    /// Coerce `value` (None = absent) at `path`; None out means "leave
    /// the position absent"
    fn coerce(
        &mut self,
        schema: &Schema,
        value: Option<&Value>,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        if depth > self.options.max_coerce_depth {
            self.error(
                path,
                format!(
                    "recursion depth limit of {} exceeded",
                    self.options.max_coerce_depth
                ),
            );
            return value.cloned();
        }

        if matches!(value, None | Some(Value::Null)) {
            return self.coerce_nullish(schema, value, path);
        }
        let value = value.expect("non-null value");

        match &schema.kind {
            SchemaKind::Any => Some(value.clone()),
            SchemaKind::Ref { name } => {
                self.note(path, format!("unresolved reference `{name}`, value passed through"));
                Some(value.clone())
            }
            SchemaKind::Optional { inner } => self.coerce(inner, Some(value), path, depth + 1),
            SchemaKind::Null => {
                self.error(path, format!("expected null, got {}", kind_of(value)));
                Some(value.clone())
            }
            SchemaKind::String {
                min_length,
                max_length,
                pattern,
                format,
            } => self.coerce_string(
                *min_length,
                *max_length,
                pattern.as_deref(),
                format.as_deref(),
                value,
                path,
            ),
            SchemaKind::Integer { bounds } => self.coerce_number(bounds, true, value, path),
            SchemaKind::Number { bounds } => self.coerce_number(bounds, false, value, path),
            SchemaKind::Boolean => self.coerce_boolean(value, path),
            SchemaKind::Literal { value: expected } => {
                self.coerce_literal(expected, value, path)
            }
            SchemaKind::Enum { values } => self.coerce_enum(values, value, path),
            SchemaKind::Array { items } => self.coerce_array(items, value, path, depth),
            SchemaKind::Tuple {
                items,
                additional_items,
            } => self.coerce_tuple(items, additional_items, value, path, depth),
            SchemaKind::Object {
                properties,
                required,
                additional_properties,
            } => self.coerce_object(properties, required, additional_properties, value, path, depth),
            SchemaKind::Record { keys, values } => {
                self.coerce_record(keys, values, value, path, depth)
            }
            SchemaKind::Intersect { parts } => self.coerce_intersect(parts, value, path, depth),
            SchemaKind::Union { variants } => self.coerce_union(variants, value, path, depth),
        }
    }

    /// Null and absent inputs, before tag dispatch
    fn coerce_nullish(
        &mut self,
        schema: &Schema,
        value: Option<&Value>,
        path: &str,
    ) -> Option<Value> {
        match &schema.kind {
            // absence stays absent, explicit null stays null
            SchemaKind::Optional { .. } => value.map(|_| Value::Null),
            SchemaKind::Null | SchemaKind::Any | SchemaKind::Ref { .. } => Some(Value::Null),
            SchemaKind::Union { variants } if variants.iter().any(Schema::allows_null) => {
                Some(Value::Null)
            }
            _ => {
                if self.options.allow_partials {
                    self.partial = true;
                    return Some(Value::Null);
                }
                let got = if value.is_none() { "nothing" } else { "null" };
                self.error(
                    path,
                    format!("expected {}, got {}", schema.type_name(), got),
                );
                Some(Value::Null)
            }
        }
    }

    fn coerce_array(
        &mut self,
        items: &Schema,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let elements: Vec<Value> = match value {
            Value::Array(list) => list.clone(),
            other => {
                self.note(path, "wrapped single value in an array");
                vec![other.clone()]
            }
        };

        if elements.is_empty() && self.options.allow_partials {
            self.partial = true;
        }

        let mut out = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let element_path = join_index(path, index);
            if let Some(coerced) = self.coerce(items, Some(element), &element_path, depth + 1) {
                out.push(coerced);
            }
        }
        Some(Value::Array(out))
    }

    fn coerce_tuple(
        &mut self,
        items: &[Schema],
        additional_items: &Additional,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let elements = match value {
            Value::Array(list) => list,
            other => {
                self.error(path, format!("expected tuple, got {}", kind_of(other)));
                return Some(other.clone());
            }
        };

        let mut out = Vec::with_capacity(elements.len().max(items.len()));
        for (index, item_schema) in items.iter().enumerate() {
            let element_path = join_index(path, index);
            match elements.get(index) {
                Some(element) => {
                    if let Some(coerced) =
                        self.coerce(item_schema, Some(element), &element_path, depth + 1)
                    {
                        out.push(coerced);
                    }
                }
                None => {
                    if self.options.use_defaults {
                        if let Some(default) = &item_schema.default {
                            self.note(&element_path, "applied schema default");
                            out.push(default.clone());
                            continue;
                        }
                    }
                    if item_schema.is_optional() {
                        continue;
                    }
                    if self.options.allow_partials {
                        self.partial = true;
                        continue;
                    }
                    self.error(&element_path, "missing tuple element");
                }
            }
        }

        for (index, element) in elements.iter().enumerate().skip(items.len()) {
            let element_path = join_index(path, index);
            match additional_items {
                Additional::Allowed(true) => out.push(element.clone()),
                Additional::Allowed(false) => {
                    self.note(&element_path, "dropped extra tuple element");
                }
                Additional::Schema(schema) => {
                    if let Some(coerced) =
                        self.coerce(schema, Some(element), &element_path, depth + 1)
                    {
                        out.push(coerced);
                    }
                }
            }
        }

        Some(Value::Array(out))
    }

    fn coerce_object(
        &mut self,
        properties: &IndexMap<String, Schema>,
        required: &[String],
        additional: &Additional,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        match value {
            Value::Object(map) => {
                self.coerce_object_map(properties, required, additional, map, path, depth)
            }
            Value::Array(items) => {
                self.note(path, "wrapped array as an index-keyed object");
                let map: Map<String, Value> = items
                    .iter()
                    .enumerate()
                    .map(|(index, element)| (index.to_string(), element.clone()))
                    .collect();
                self.coerce_object_map(properties, required, additional, &map, path, depth)
            }
            Value::String(text) if !self.options.strict => {
                match Extractor::new(self.options).extract(text) {
                    Ok(extraction) if extraction.candidates.len() == 1 => {
                        if let Value::Object(map) = &extraction.candidates[0] {
                            self.note(path, "parsed embedded JSON string as an object");
                            self.partial |= extraction.is_partial;
                            return self.coerce_object_map(
                                properties, required, additional, map, path, depth,
                            );
                        }
                        self.error(path, "expected object, got string");
                        Some(value.clone())
                    }
                    _ => {
                        self.error(path, "expected object, got string");
                        Some(value.clone())
                    }
                }
            }
            other => {
                self.error(path, format!("expected object, got {}", kind_of(other)));
                Some(other.clone())
            }
        }
    }

    fn coerce_object_map(
        &mut self,
        properties: &IndexMap<String, Schema>,
        required: &[String],
        additional: &Additional,
        map: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let mut out = Map::new();
        let mut missing_required = false;

        for (name, field_schema) in properties {
            let field_path = join_field(path, name);
            match map.get(name) {
                Some(dynamic) => {
                    if let Some(coerced) =
                        self.coerce(field_schema, Some(dynamic), &field_path, depth + 1)
                    {
                        out.insert(name.clone(), coerced);
                    }
                }
                None => {
                    if self.options.use_defaults {
                        if let Some(default) = &field_schema.default {
                            self.note(&field_path, "applied schema default");
                            out.insert(name.clone(), default.clone());
                            continue;
                        }
                    }
                    if field_schema.is_optional() || !required.contains(name) {
                        continue;
                    }
                    if self.options.allow_partials {
                        missing_required = true;
                        continue;
                    }
                    self.error(&field_path, "missing required field");
                }
            }
        }

        for (name, dynamic) in map {
            if properties.contains_key(name) {
                continue;
            }
            let field_path = join_field(path, name);
            match additional {
                Additional::Allowed(true) => {
                    out.insert(name.clone(), dynamic.clone());
                }
                Additional::Allowed(false) => {
                    self.note(&field_path, "dropped undeclared field");
                }
                Additional::Schema(schema) => {
                    if let Some(coerced) =
                        self.coerce(schema, Some(dynamic), &field_path, depth + 1)
                    {
                        out.insert(name.clone(), coerced);
                    }
                }
            }
        }

        if missing_required {
            self.partial = true;
        }
        Some(Value::Object(out))
    }

    fn coerce_record(
        &mut self,
        keys: &Schema,
        values: &Schema,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                self.error(path, format!("expected object, got {}", kind_of(other)));
                return Some(other.clone());
            }
        };

        let mut out = Map::new();
        for (key, dynamic) in map {
            let entry_path = join_field(path, key);
            if let SchemaKind::String {
                min_length,
                max_length,
                pattern,
                format,
            } = &keys.kind
            {
                self.check_string_facets(
                    *min_length,
                    *max_length,
                    pattern.as_deref(),
                    format.as_deref(),
                    key,
                    &entry_path,
                );
            }
            if let Some(coerced) = self.coerce(values, Some(dynamic), &entry_path, depth + 1) {
                out.insert(key.clone(), coerced);
            }
        }
        Some(Value::Object(out))
    }

    /// Shallow-merge the object parts into one synthetic object schema
    fn coerce_intersect(
        &mut self,
        parts: &[Schema],
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let mut properties: IndexMap<String, Schema> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();
        let mut additional = Additional::default();

        for part in parts {
            match &part.kind {
                SchemaKind::Object {
                    properties: part_properties,
                    required: part_required,
                    additional_properties,
                } => {
                    for (name, schema) in part_properties {
                        properties.insert(name.clone(), schema.clone());
                    }
                    for name in part_required {
                        if !required.contains(name) {
                            required.push(name.clone());
                        }
                    }
                    if additional_properties.is_denied() || additional_properties.schema().is_some()
                    {
                        additional = additional_properties.clone();
                    }
                }
                _ => self.error(
                    path,
                    format!(
                        "intersect part must be an object schema, found {}",
                        part.type_name()
                    ),
                ),
            }
        }

        self.coerce_object(&properties, &required, &additional, value, path, depth)
    }
}

fn join_field(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Dynamic-shape name for diagnostics
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
