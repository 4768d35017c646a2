//! Declarative schema model
//!
//! A [`Schema`] is a tree of tagged nodes describing the shape a parsed
//! value must take. Schemas are plain data: they serialize to and from
//! JSON (internally tagged on `type`), so they can live in files next to
//! the prompts that reference them. Nothing in the library ever mutates
//! a schema — the coercer only reads through shared references.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema node plus the metadata every node may carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type constructor
    #[serde(flatten)]
    pub kind: SchemaKind,

    /// Fallback value for a missing field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Human-readable description, surfaced by the prompt renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Numeric range constraints shared by integer and number nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

impl NumberBounds {
    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.exclusive_minimum.is_none()
            && self.exclusive_maximum.is_none()
            && self.multiple_of.is_none()
    }
}

/// Whether undeclared object fields / extra tuple elements are kept
///
/// Serializes as JSON `true` / `false` or as a schema, mirroring the
/// JSON Schema convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Additional {
    /// `true` keeps extras unchanged, `false` drops them
    Allowed(bool),
    /// Extras are coerced against this schema
    Schema(Box<Schema>),
}

impl Default for Additional {
    fn default() -> Self {
        Additional::Allowed(true)
    }
}

impl Additional {
    /// Extras are explicitly rejected
    pub fn is_denied(&self) -> bool {
        matches!(self, Additional::Allowed(false))
    }

    /// The schema extras are coerced against, if one was declared
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Additional::Schema(schema) => Some(schema),
            Additional::Allowed(_) => None,
        }
    }
}

/// The closed set of type constructors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaKind {
    /// UTF-8 string with optional length/pattern/format constraints
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<std::string::String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<std::string::String>,
    },

    /// Whole number; fractional inputs are truncated toward zero
    Integer {
        #[serde(flatten)]
        bounds: NumberBounds,
    },

    /// IEEE 754 double
    Number {
        #[serde(flatten)]
        bounds: NumberBounds,
    },

    Boolean,

    Null,

    /// Accepts any dynamic value unchanged
    Any,

    /// A single scalar constant
    Literal { value: Value },

    /// Ordered set of scalar constants
    Enum { values: Vec<Value> },

    /// Homogeneous list
    Array { items: Box<Schema> },

    /// Fixed-position sequence
    Tuple {
        items: Vec<Schema>,
        #[serde(default, skip_serializing_if = "is_default_additional")]
        additional_items: Additional,
    },

    /// Ordered field map with a required-name set
    Object {
        properties: IndexMap<std::string::String, Schema>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<std::string::String>,
        #[serde(default, skip_serializing_if = "is_default_additional")]
        additional_properties: Additional,
    },

    /// Uniform string-keyed map
    Record {
        keys: Box<Schema>,
        values: Box<Schema>,
    },

    /// Ordered alternatives; earlier wins ties
    Union { variants: Vec<Schema> },

    /// Object schemas merged field-wise
    Intersect { parts: Vec<Schema> },

    /// Absence and explicit null both allowed
    Optional { inner: Box<Schema> },

    /// Textual pointer, coerces as `Any`
    Ref { name: std::string::String },
}

fn is_default_additional(additional: &Additional) -> bool {
    *additional == Additional::Allowed(true)
}

impl Schema {
    fn from_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            default: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::from_kind(SchemaKind::String {
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
        })
    }

    pub fn integer() -> Self {
        Self::from_kind(SchemaKind::Integer {
            bounds: NumberBounds::default(),
        })
    }

    pub fn number() -> Self {
        Self::from_kind(SchemaKind::Number {
            bounds: NumberBounds::default(),
        })
    }

    pub fn boolean() -> Self {
        Self::from_kind(SchemaKind::Boolean)
    }

    pub fn null() -> Self {
        Self::from_kind(SchemaKind::Null)
    }

    pub fn any() -> Self {
        Self::from_kind(SchemaKind::Any)
    }

    /// A single scalar constant
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_kind(SchemaKind::Literal {
            value: value.into(),
        })
    }

    /// An ordered set of scalar constants
    pub fn enumeration<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::from_kind(SchemaKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn array(items: Schema) -> Self {
        Self::from_kind(SchemaKind::Array {
            items: Box::new(items),
        })
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Self::from_kind(SchemaKind::Tuple {
            items: items.into_iter().collect(),
            additional_items: Additional::default(),
        })
    }

    /// An object schema; every non-`Optional` field becomes required
    pub fn object<K: Into<std::string::String>>(
        fields: impl IntoIterator<Item = (K, Schema)>,
    ) -> Self {
        let properties: IndexMap<std::string::String, Schema> = fields
            .into_iter()
            .map(|(name, schema)| (name.into(), schema))
            .collect();
        let required = properties
            .iter()
            .filter(|(_, schema)| !schema.is_optional())
            .map(|(name, _)| name.clone())
            .collect();
        Self::from_kind(SchemaKind::Object {
            properties,
            required,
            additional_properties: Additional::default(),
        })
    }

    /// A string-keyed map with uniform value schema
    pub fn record(values: Schema) -> Self {
        Self::from_kind(SchemaKind::Record {
            keys: Box::new(Schema::string()),
            values: Box::new(values),
        })
    }

    /// A record with an explicit (constrained) key schema
    pub fn record_with_keys(keys: Schema, values: Schema) -> Self {
        Self::from_kind(SchemaKind::Record {
            keys: Box::new(keys),
            values: Box::new(values),
        })
    }

    pub fn union(variants: impl IntoIterator<Item = Schema>) -> Self {
        Self::from_kind(SchemaKind::Union {
            variants: variants.into_iter().collect(),
        })
    }

    pub fn intersect(parts: impl IntoIterator<Item = Schema>) -> Self {
        Self::from_kind(SchemaKind::Intersect {
            parts: parts.into_iter().collect(),
        })
    }

    pub fn optional(inner: Schema) -> Self {
        Self::from_kind(SchemaKind::Optional {
            inner: Box::new(inner),
        })
    }

    /// A textual pointer to a schema defined elsewhere
    pub fn reference(name: impl Into<std::string::String>) -> Self {
        Self::from_kind(SchemaKind::Ref { name: name.into() })
    }

    /// Attach a fallback value for a missing field
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attach a human-readable description
    pub fn describe(mut self, text: impl Into<std::string::String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Set the minimum string length; no-op on non-string nodes
    pub fn min_length(mut self, value: usize) -> Self {
        if let SchemaKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(value);
        }
        self
    }

    /// Set the maximum string length; no-op on non-string nodes
    pub fn max_length(mut self, value: usize) -> Self {
        if let SchemaKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(value);
        }
        self
    }

    /// Set the string regex pattern; no-op on non-string nodes
    pub fn pattern(mut self, value: impl Into<std::string::String>) -> Self {
        if let SchemaKind::String { pattern, .. } = &mut self.kind {
            *pattern = Some(value.into());
        }
        self
    }

    /// Set the string format name; no-op on non-string nodes
    pub fn format(mut self, value: impl Into<std::string::String>) -> Self {
        if let SchemaKind::String { format, .. } = &mut self.kind {
            *format = Some(value.into());
        }
        self
    }

    /// Set the inclusive lower bound; no-op on non-numeric nodes
    pub fn minimum(mut self, value: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.minimum = Some(value);
        }
        self
    }

    /// Set the inclusive upper bound; no-op on non-numeric nodes
    pub fn maximum(mut self, value: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.maximum = Some(value);
        }
        self
    }

    /// Set the exclusive lower bound; no-op on non-numeric nodes
    pub fn exclusive_minimum(mut self, value: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.exclusive_minimum = Some(value);
        }
        self
    }

    /// Set the exclusive upper bound; no-op on non-numeric nodes
    pub fn exclusive_maximum(mut self, value: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.exclusive_maximum = Some(value);
        }
        self
    }

    /// Require the value to be a multiple of `value`; no-op on non-numeric nodes
    pub fn multiple_of(mut self, value: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.multiple_of = Some(value);
        }
        self
    }

    /// Set the policy for undeclared object fields; no-op elsewhere
    pub fn additional_properties(mut self, policy: Additional) -> Self {
        if let SchemaKind::Object {
            additional_properties,
            ..
        } = &mut self.kind
        {
            *additional_properties = policy;
        }
        self
    }

    /// Set the policy for extra tuple elements; no-op elsewhere
    pub fn additional_items(mut self, policy: Additional) -> Self {
        if let SchemaKind::Tuple {
            additional_items, ..
        } = &mut self.kind
        {
            *additional_items = policy;
        }
        self
    }

    fn bounds_mut(&mut self) -> Option<&mut NumberBounds> {
        match &mut self.kind {
            SchemaKind::Integer { bounds } | SchemaKind::Number { bounds } => Some(bounds),
            _ => None,
        }
    }

    /// True for `Optional` nodes: absence is not an error
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SchemaKind::Optional { .. })
    }

    /// True when an explicit null is acceptable at this position
    pub fn allows_null(&self) -> bool {
        match &self.kind {
            SchemaKind::Null
            | SchemaKind::Any
            | SchemaKind::Optional { .. }
            | SchemaKind::Ref { .. } => true,
            SchemaKind::Union { variants } => variants.iter().any(Schema::allows_null),
            _ => false,
        }
    }

    /// Short name of the type constructor, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String { .. } => "string",
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Number { .. } => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Null => "null",
            SchemaKind::Any => "any",
            SchemaKind::Literal { .. } => "literal",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Union { .. } => "union",
            SchemaKind::Intersect { .. } => "intersect",
            SchemaKind::Optional { .. } => "optional",
            SchemaKind::Ref { .. } => "ref",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_builder_marks_required() {
        let schema = Schema::object([
            ("name", Schema::string()),
            ("nickname", Schema::optional(Schema::string())),
            ("age", Schema::integer()),
        ]);

        match &schema.kind {
            SchemaKind::Object {
                properties,
                required,
                ..
            } => {
                assert_eq!(properties.len(), 3);
                assert_eq!(required, &["name".to_string(), "age".to_string()]);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let schema = Schema::object([
            (
                "count",
                Schema::integer().minimum(0.0).describe("item count"),
            ),
            ("tags", Schema::array(Schema::string())),
        ])
        .additional_properties(Additional::Allowed(false));

        let text = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn test_schema_file_form() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "min_length": 1 },
                "score": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
            },
            "required": ["name"]
        }))
        .unwrap();

        match &schema.kind {
            SchemaKind::Object { properties, .. } => {
                assert!(matches!(
                    properties["name"].kind,
                    SchemaKind::String {
                        min_length: Some(1),
                        ..
                    }
                ));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_additional_untagged_forms() {
        let denied: Additional = serde_json::from_value(json!(false)).unwrap();
        assert!(denied.is_denied());

        let schema: Additional =
            serde_json::from_value(json!({ "type": "string" })).unwrap();
        assert!(schema.schema().is_some());
    }

    #[test]
    fn test_allows_null() {
        assert!(Schema::null().allows_null());
        assert!(Schema::optional(Schema::string()).allows_null());
        assert!(Schema::union([Schema::string(), Schema::null()]).allows_null());
        assert!(!Schema::union([Schema::string(), Schema::integer()]).allows_null());
        assert!(!Schema::string().allows_null());
    }

    #[test]
    fn test_defaults_survive_roundtrip() {
        let schema = Schema::string().with_default("n/a");
        let text = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(back.default, Some(json!("n/a")));
    }
}
