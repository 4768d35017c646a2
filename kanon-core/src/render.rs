//! Prompt-side schema rendering
//!
//! The writing half of schema-aligned parsing: a human-readable type hint
//! placed in the prompt so the model is biased toward conforming output.
//! The parser consumes none of this - it is plain text for the model.

use crate::schema::{Schema, SchemaKind};

/// Render a schema as a prompt block with a fenced type hint
pub fn type_hint(schema: &Schema) -> String {
    format!(
        "Answer in JSON using this schema:\n```json\n{}\n```",
        hint(schema, 0)
    )
}

fn hint(schema: &Schema, indent: usize) -> String {
    let rendered = match &schema.kind {
        SchemaKind::String { format, .. } => match format {
            Some(format) => format!("string ({format})"),
            None => "string".to_string(),
        },
        SchemaKind::Integer { .. } => "int".to_string(),
        SchemaKind::Number { .. } => "float".to_string(),
        SchemaKind::Boolean => "bool".to_string(),
        SchemaKind::Null => "null".to_string(),
        SchemaKind::Any => "any".to_string(),
        SchemaKind::Literal { value } => value.to_string(),
        SchemaKind::Enum { values } => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | "),
        SchemaKind::Array { items } => format!("{}[]", hint(items, indent)),
        SchemaKind::Tuple { items, .. } => {
            let rendered: Vec<String> = items.iter().map(|item| hint(item, indent)).collect();
            format!("[{}]", rendered.join(", "))
        }
        SchemaKind::Object { properties, .. } => {
            let pad = "  ".repeat(indent + 1);
            let mut lines = Vec::with_capacity(properties.len());
            for (name, field) in properties {
                let mut line = format!("{pad}\"{name}\": {}", hint(field, indent + 1));
                if let Some(description) = &field.description {
                    line.push_str(&format!("  // {description}"));
                }
                lines.push(line);
            }
            format!("{{\n{}\n{}}}", lines.join(",\n"), "  ".repeat(indent))
        }
        SchemaKind::Record { values, .. } => {
            format!("{{ string: {} }}", hint(values, indent))
        }
        SchemaKind::Union { variants } => variants
            .iter()
            .map(|variant| hint(variant, indent))
            .collect::<Vec<_>>()
            .join(" or "),
        SchemaKind::Intersect { parts } => parts
            .iter()
            .map(|part| hint(part, indent))
            .collect::<Vec<_>>()
            .join(" & "),
        SchemaKind::Optional { inner } => format!("{} or null", hint(inner, indent)),
        SchemaKind::Ref { name } => name.clone(),
    };
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_hints() {
        assert!(type_hint(&Schema::string()).contains("string"));
        assert!(type_hint(&Schema::integer()).contains("int"));
        assert!(type_hint(&Schema::boolean()).contains("bool"));
    }

    #[test]
    fn test_hint_is_fenced() {
        let hint = type_hint(&Schema::string());
        assert!(hint.contains("```json\n"));
        assert!(hint.ends_with("```"));
    }

    #[test]
    fn test_object_hint_lists_fields() {
        let schema = Schema::object([
            ("name", Schema::string().describe("display name")),
            ("age", Schema::optional(Schema::integer())),
        ]);
        let hint = type_hint(&schema);
        assert!(hint.contains("\"name\": string"));
        assert!(hint.contains("// display name"));
        assert!(hint.contains("\"age\": int or null"));
    }

    #[test]
    fn test_enum_hint() {
        let schema = Schema::enumeration(["red", "green"]);
        assert!(type_hint(&schema).contains(r#""red" | "green""#));
    }

    #[test]
    fn test_array_and_union_hints() {
        let schema = Schema::array(Schema::union([Schema::string(), Schema::integer()]));
        assert!(type_hint(&schema).contains("string or int[]"));
    }

    #[test]
    fn test_nested_object_indents() {
        let schema = Schema::object([(
            "inner",
            Schema::object([("x", Schema::number())]),
        )]);
        let hint = type_hint(&schema);
        assert!(hint.contains("\"inner\": {\n"));
        assert!(hint.contains("    \"x\": float"));
    }
}
