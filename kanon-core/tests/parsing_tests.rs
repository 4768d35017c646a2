//! End-to-end parsing tests
//!
//! These drive the whole pipeline (filter, extractor, coercer) through the
//! public entry points with the kind of responses models actually produce.

use kanon_core::prelude::*;
use serde_json::json;

fn defaults() -> ParseOptions {
    ParseOptions::default()
}

#[test]
fn test_plain_json() {
    let schema = Schema::object([("name", Schema::string()), ("count", Schema::integer())]);
    let result = parse(r#"{"name":"test","count":5}"#, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!({"name": "test", "count": 5}));
    assert!(result.meta.fixes.is_empty());
    assert!(!result.meta.from_markdown);
    assert!(!result.is_partial);
}

#[test]
fn test_fenced_json() {
    let schema = Schema::object([("value", Schema::boolean())]);
    let result = parse("```json\n{\"value\": true}\n```", &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value["value"], json!(true));
    assert!(result.meta.from_markdown);
}

#[test]
fn test_trailing_comma_repaired() {
    let schema = Schema::object([("a", Schema::integer()), ("b", Schema::integer())]);
    let result = parse(r#"{"a":1,"b":2,}"#, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!({"a": 1, "b": 2}));
    assert!(result.meta.fixes.contains(&Fix::AppliedAutoFixes));
}

#[test]
fn test_smart_quotes_in_malformed_json() {
    let schema = Schema::object([("action", Schema::string()), ("file", Schema::string())]);
    let response = "{\u{201C}action\u{201D}:\u{201C}diagnostics\u{201D},\u{201C}file\u{201D}:\u{201C}x.ts\u{201D}}";
    let result = parse(response, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!({"action": "diagnostics", "file": "x.ts"}));
    assert!(result.meta.fixes.contains(&Fix::NormalizedUnicodeQuotes));
}

#[test]
fn test_smart_quotes_inside_valid_string_preserved() {
    let schema = Schema::object([("command", Schema::string())]);
    let inner = "echo {\u{201C}action\u{201D}: \u{201C}diagnostics\u{201D}}";
    let response = format!("{{\"command\":\"{inner}\"}}");
    let result = parse(&response, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value["command"].as_str(), Some(inner));
    assert!(!result.meta.fixes.contains(&Fix::NormalizedUnicodeQuotes));
}

#[test]
fn test_chain_of_thought_wrapped_json() {
    let schema = Schema::object([("answer", Schema::string())]);
    let response =
        "Let me think... Therefore the output JSON is:\n```json\n{\"answer\":\"hi\"}\n```";
    let result = parse(response, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value["answer"], json!("hi"));
    assert!(result.meta.chain_of_thought_filtered);
    assert_eq!(result.meta.raw, response);
}

#[test]
fn test_partial_stream() {
    let schema = Schema::object([("items", Schema::array(Schema::string()))]);
    let result = parse_partial(r#"{"items":["a","b"#, &schema, &defaults());

    assert!(result.is_partial);
    let items = result.value["items"].as_array().unwrap();
    assert!(items.len() <= 2);
    assert_eq!(items[0], json!("a"));
}

#[test]
fn test_partial_monotonicity() {
    let schema = Schema::object([("items", Schema::array(Schema::string()))]);

    let shorter = parse_partial(r#"{"items":["a""#, &schema, &defaults());
    let longer = parse_partial(r#"{"items":["a","b""#, &schema, &defaults());

    let short_items = shorter.value["items"].as_array().unwrap().len();
    let long_items = longer.value["items"].as_array().unwrap().len();
    assert!(long_items >= short_items);
}

#[test]
fn test_scalar_coercion_with_trace() {
    let schema = Schema::object([("count", Schema::integer())]);
    let result = parse(r#"{"count":"42"}"#, &schema, &defaults().with_trace());

    assert!(result.success);
    assert_eq!(result.value["count"], json!(42));
    assert!(result
        .meta
        .coercions
        .iter()
        .any(|c| c.note == "parsed string to number"));
}

#[test]
fn test_trace_absent_by_default() {
    let schema = Schema::object([("count", Schema::integer())]);
    let result = parse(r#"{"count":"42"}"#, &schema, &defaults());
    assert!(result.meta.coercions.is_empty());
}

#[test]
fn test_out_of_range_number() {
    let schema = Schema::object([("age", Schema::number().minimum(0.0))]);
    let result = parse(r#"{"age":-5}"#, &schema, &defaults());

    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|issue| issue.path == "age" && issue.message.contains("minimum")));
}

#[test]
fn test_idempotence_for_valid_values() {
    let schema = Schema::object([
        ("name", Schema::string()),
        ("count", Schema::integer()),
        ("tags", Schema::array(Schema::string())),
    ]);
    let value = json!({"name": "x", "count": 3, "tags": ["a", "b"]});

    let result = parse(&serde_json::to_string(&value).unwrap(), &schema, &defaults());
    assert!(result.success);
    assert_eq!(result.value, value);
}

#[test]
fn test_fence_peeling_preserves_result() {
    let schema = Schema::object([("name", Schema::string()), ("count", Schema::integer())]);
    let value = json!({"name": "x", "count": 3});
    let serialized = serde_json::to_string(&value).unwrap();

    let bare = parse(&serialized, &schema, &defaults());
    let fenced = parse(&format!("```json\n{serialized}\n```"), &schema, &defaults());

    assert!(bare.success && fenced.success);
    assert_eq!(bare.value, fenced.value);
    assert!(!bare.meta.from_markdown);
    assert!(fenced.meta.from_markdown);
}

#[test]
fn test_union_order_stability() {
    // both alternatives coerce the input with zero errors
    let schema = Schema::object([(
        "id",
        Schema::union([Schema::string(), Schema::any()]),
    )]);
    let result = parse(r#"{"id":"abc"}"#, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value["id"], json!("abc"));
}

#[test]
fn test_union_picks_fitting_variant() {
    let schema = Schema::object([(
        "payload",
        Schema::union([
            Schema::object([("kind", Schema::literal("user")), ("name", Schema::string())]),
            Schema::object([("kind", Schema::literal("group")), ("members", Schema::integer())]),
        ]),
    )]);
    let result = parse(
        r#"{"payload": {"kind": "group", "members": "4"}}"#,
        &schema,
        &defaults(),
    );

    assert!(result.success);
    assert_eq!(result.value["payload"], json!({"kind": "group", "members": 4}));
}

#[test]
fn test_required_coverage() {
    let schema = Schema::object([("a", Schema::string()), ("b", Schema::string())]);
    let result = parse(r#"{"a":"x"}"#, &schema, &defaults());

    assert!(!result.success);
    assert!(result.errors.iter().any(|issue| issue.path == "b"));
}

#[test]
fn test_multiple_candidates_best_fit_selected() {
    let schema = Schema::object([("a", Schema::integer())]);
    let response = "```json\n{\"b\": 2}\n```\nor maybe\n```json\n{\"a\": 1}\n```";
    let result = parse(response, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!({"a": 1}));
}

#[test]
fn test_parse_all_candidates() {
    let schema = Schema::object([("a", Schema::integer())]);
    let response = "```json\n{\"a\": 1}\n```\nand\n```json\n{\"b\": 2}\n```";
    let results = parse_all_candidates(response, &schema, &defaults());

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
}

#[test]
fn test_parse_best_candidate() {
    let schema = Schema::object([("a", Schema::integer())]);
    let response = "```json\n{\"b\": 2}\n```\nand\n```json\n{\"a\": 1}\n```";
    let best = parse_best_candidate(response, &schema, &defaults());

    assert!(best.success);
    assert_eq!(best.value, json!({"a": 1}));
}

#[test]
fn test_extraction_failure_with_fallback_disabled() {
    let schema = Schema::object([("a", Schema::integer())]);
    let options = ParseOptions {
        allow_as_string: false,
        ..Default::default()
    };
    let result = parse("nothing structured here", &schema, &options);

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, "");
}

#[test]
fn test_parse_typed() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Item {
        name: String,
        count: i64,
    }

    let schema = Schema::object([("name", Schema::string()), ("count", Schema::integer())]);
    let item: Item = parse_typed(
        "```json\n{\"name\": \"widget\", \"count\": \"7\"}\n```",
        &schema,
        &defaults(),
    )
    .unwrap();

    assert_eq!(
        item,
        Item {
            name: "widget".to_string(),
            count: 7
        }
    );
}

#[test]
fn test_parse_typed_rejects_nonconforming() {
    let schema = Schema::object([("count", Schema::integer())]);
    let err = parse_typed::<serde_json::Value>(r#"{"count": "many"}"#, &schema, &defaults())
        .unwrap_err();
    assert!(matches!(err, KanonError::Validation(_)));
}

#[test]
fn test_defaults_fill_missing_fields() {
    let schema = Schema::object([
        ("name", Schema::string()),
        ("lang", Schema::string().with_default("en")),
    ]);
    let result = parse(r#"{"name": "x"}"#, &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!({"name": "x", "lang": "en"}));
}

#[test]
fn test_raw_text_preserved_in_meta() {
    let schema = Schema::any();
    let response = "  {\"x\": 1}  ";
    let result = parse(response, &schema, &defaults());
    assert_eq!(result.meta.raw, response);
}

#[test]
fn test_string_fallback_for_prose_answer() {
    let schema = Schema::string();
    let result = parse("The capital of France is Paris.", &schema, &defaults());

    assert!(result.success);
    assert_eq!(result.value, json!("The capital of France is Paris."));
}

#[test]
fn test_filter_disabled_leaves_prose() {
    let schema = Schema::object([("answer", Schema::string())]);
    let options = ParseOptions {
        filter_chain_of_thought: false,
        ..Default::default()
    };
    let response = "Let me think. Answer:\n{\"answer\": \"hi\"}";
    let result = parse(response, &schema, &options);

    // the scan strategy still finds the object, but nothing was trimmed
    assert!(result.success);
    assert!(!result.meta.chain_of_thought_filtered);
}
