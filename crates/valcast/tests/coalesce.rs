//! Integration tests for the coalescer registry and union resolution.

use std::sync::Arc;

use serde_json::json;
use valcast::{
    register, CoalesceError, Field, ScalarBuilder, StructBuilder, Tag, TypeRef, ROOT,
};

fn scalar(types: impl IntoIterator<Item = TypeRef>) -> std::sync::Arc<valcast::SchemaNode> {
    ScalarBuilder::of(types).freeze()
}

// ── Union ordering ───────────────────────────────────────────────────────

#[test]
fn union_order_is_semantically_significant() {
    let float_first = scalar([Tag::Float.into(), Tag::Integer.into()]);
    let int_first = scalar([Tag::Integer.into(), Tag::Float.into()]);
    assert_eq!(float_first.validate(&json!("18")).value, json!(18.0));
    assert_eq!(int_first.validate(&json!("18")).value, json!(18));
}

#[test]
fn quick_match_returns_an_exactly_typed_value_verbatim() {
    // 18 is concretely an integer, so the earlier Float candidate must not
    // reinterpret it.
    let float_first = scalar([Tag::Float.into(), Tag::Integer.into()]);
    assert_eq!(float_first.validate(&json!(18)).value, json!(18));
    // 18.5 is concretely a float and stays one under either order.
    let int_first = scalar([Tag::Integer.into(), Tag::Float.into()]);
    assert_eq!(int_first.validate(&json!(18.5)).value, json!(18.5));
}

#[test]
fn nullable_union_accepts_null_but_plain_integer_does_not() {
    let nullable = scalar([Tag::Integer.into(), Tag::Null.into()]);
    assert!(nullable.validate(&json!(null)).is_ok());
    assert_eq!(nullable.validate(&json!(null)).value, json!(null));
    assert!(nullable.validate(&json!("4")).is_ok());

    let plain = scalar([Tag::Integer.into()]);
    assert!(!plain.validate(&json!(null)).is_ok());
}

#[test]
fn exhausted_union_names_every_candidate() {
    let schema = scalar([Tag::Integer.into(), Tag::Boolean.into()]);
    let result = schema.validate(&json!([1]));
    assert_eq!(
        result.errors.get(ROOT),
        Some(&["does not match any candidate type [integer, boolean]".into()][..])
    );
}

// ── Built-in converters ──────────────────────────────────────────────────

#[test]
fn string_converter_renders_scalars() {
    let schema = scalar([Tag::String.into()]);
    assert_eq!(schema.validate(&json!("x")).value, json!("x"));
    assert_eq!(schema.validate(&json!(42)).value, json!("42"));
    assert_eq!(schema.validate(&json!(true)).value, json!("true"));
    assert!(!schema.validate(&json!({})).is_ok());
}

#[test]
fn integer_converter_parses_and_truncates_whole_floats() {
    let schema = scalar([Tag::Integer.into()]);
    assert_eq!(schema.validate(&json!(" 7 ")).value, json!(7));
    assert_eq!(schema.validate(&json!(7.0)).value, json!(7));
    assert!(!schema.validate(&json!(7.5)).is_ok());
    assert!(!schema.validate(&json!("7.5")).is_ok());
}

#[test]
fn integer_converter_rejects_floats_at_the_i64_boundary() {
    let schema = scalar([Tag::Integer.into()]);
    // 2^63 is representable as f64 but not as i64; the cast would saturate.
    assert!(!schema.validate(&json!(9.223372036854776e18)).is_ok());
    assert!(!schema.validate(&json!(1.8446744073709552e19)).is_ok());
    // -2^63 is exactly i64::MIN and converts cleanly.
    assert_eq!(
        schema.validate(&json!(-9.223372036854776e18)).value,
        json!(i64::MIN)
    );
}

#[test]
fn boolean_converter_accepts_numbers_and_the_token_table() {
    let schema = scalar([Tag::Boolean.into()]);
    assert_eq!(schema.validate(&json!(true)).value, json!(true));
    assert_eq!(schema.validate(&json!(0)).value, json!(false));
    assert_eq!(schema.validate(&json!(2)).value, json!(true));
    for token in ["yes", "Y", "on", "1", "TRUE", "t"] {
        assert_eq!(schema.validate(&json!(token)).value, json!(true), "{token}");
    }
    for token in ["no", "N", "off", "0", "False", "f"] {
        assert_eq!(schema.validate(&json!(token)).value, json!(false), "{token}");
    }
    assert!(!schema.validate(&json!("maybe")).is_ok());
}

#[test]
fn datetime_converter_normalizes_to_rfc3339() {
    let schema = scalar([Tag::DateTime.into()]);
    let parsed = schema.validate(&json!("2024-05-01T10:30:00Z"));
    assert!(parsed.is_ok());
    assert_eq!(parsed.value, json!("2024-05-01T10:30:00+00:00"));
    let epoch = schema.validate(&json!(0));
    assert_eq!(epoch.value, json!("1970-01-01T00:00:00+00:00"));
    assert!(!schema.validate(&json!("yesterday")).is_ok());
}

#[test]
fn date_converter_accepts_dates_and_timestamps() {
    let schema = scalar([Tag::Date.into()]);
    assert_eq!(schema.validate(&json!("2024-05-01")).value, json!("2024-05-01"));
    assert_eq!(
        schema.validate(&json!("2024-05-01T10:30:00Z")).value,
        json!("2024-05-01")
    );
    assert!(!schema.validate(&json!(20240501)).is_ok());
}

#[test]
fn null_converter_accepts_null_and_empty_string() {
    let schema = scalar([Tag::Null.into()]);
    assert_eq!(schema.validate(&json!(null)).value, json!(null));
    assert_eq!(schema.validate(&json!("")).value, json!(null));
    assert!(!schema.validate(&json!("null")).is_ok());
}

#[test]
fn symbol_converter_accepts_nonempty_identifiers_only() {
    let schema = scalar([Tag::Symbol.into()]);
    assert_eq!(schema.validate(&json!("pending")).value, json!("pending"));
    assert!(!schema.validate(&json!("")).is_ok());
    assert!(!schema.validate(&json!(3)).is_ok());
}

#[test]
fn raw_passes_anything_through_untouched() {
    let schema = scalar([Tag::Raw.into()]);
    let input = json!({"deep": [1, {"ly": null}]});
    let result = schema.validate(&input);
    assert!(result.is_ok());
    assert_eq!(result.value, input);
}

// ── Parameterized map/seq candidates ─────────────────────────────────────

#[test]
fn seq_of_coalesces_each_element() {
    let schema = scalar([TypeRef::seq_of(vec![Tag::Integer.into()])]);
    assert_eq!(schema.validate(&json!(["1", 2])).value, json!([1, 2]));
    let bad = schema.validate(&json!(["1", "x"]));
    assert!(bad.errors.get("1").is_some());
}

#[test]
fn map_of_coalesces_each_value() {
    let schema = scalar([TypeRef::map_of(vec![Tag::Boolean.into()])]);
    let result = schema.validate(&json!({"a": "yes", "b": 0}));
    assert_eq!(result.value, json!({"a": true, "b": false}));
    let bad = schema.validate(&json!({"a": "maybe"}));
    assert!(bad.errors.get("a").is_some());
}

#[test]
fn map_with_delegates_the_whole_map_to_a_nested_node() {
    let point = StructBuilder::new()
        .field(Field::new("x", Tag::Integer).required())
        .freeze()
        .unwrap();
    let schema = scalar([TypeRef::map_with(point)]);
    assert!(schema.validate(&json!({"x": "4"})).is_ok());
    let bad = schema.validate(&json!({}));
    assert_eq!(bad.errors.get("x"), Some(&["is required".into()][..]));
}

#[test]
fn plain_map_and_seq_pass_through() {
    let map = scalar([Tag::Map.into()]);
    assert_eq!(map.validate(&json!({"k": 1})).value, json!({"k": 1}));
    assert!(!map.validate(&json!(1)).is_ok());
    let seq = scalar([Tag::Seq.into()]);
    assert_eq!(seq.validate(&json!([1, "two"])).value, json!([1, "two"]));
    assert!(!seq.validate(&json!("nope")).is_ok());
}

// ── Registry extension ───────────────────────────────────────────────────

#[test]
fn registered_custom_converter_participates_in_coalescion() {
    register(
        Tag::Custom("upper".into()),
        Arc::new(|value, _, _, _| match value.as_str() {
            Some(s) => Ok(json!(s.to_uppercase())),
            None => Err(CoalesceError::InvalidType("upper".into())),
        }),
    );
    let schema = scalar([TypeRef::tag(Tag::Custom("upper".into()))]);
    assert_eq!(schema.validate(&json!("abc")).value, json!("ABC"));
    let result = schema.validate(&json!(4));
    assert_eq!(
        result.errors.get(ROOT),
        Some(&["does not match type upper".into()][..])
    );
}

#[test]
fn unregistered_tag_falls_back_to_the_exact_type_check() {
    let schema = scalar([TypeRef::tag(Tag::Custom("made-up".into()))]);
    let result = schema.validate(&json!("anything"));
    assert_eq!(
        result.errors.get(ROOT),
        Some(&["does not match type made-up".into()][..])
    );
}
