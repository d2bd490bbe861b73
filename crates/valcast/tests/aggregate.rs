//! Integration tests for same-kind schema aggregation.

use serde_json::json;
use valcast::{
    Field, ListBuilder, ScalarBuilder, SchemaError, SelectBuilder, StructBuilder, Tag, TypeRef,
};

#[test]
fn merged_struct_keeps_both_sides_rules_and_fields() {
    let a = StructBuilder::new()
        .field(
            Field::new("age", Tag::Integer)
                .required()
                .rule("must be major", |v, _| v.as_i64().is_some_and(|n| n >= 18)),
        )
        .freeze()
        .unwrap();
    let b = StructBuilder::new()
        .field(Field::union("content", [Tag::String.into(), Tag::Map.into()]).required())
        .freeze()
        .unwrap();
    let merged = a.merged_with(&b).unwrap();

    let ok = merged.validate(&json!({"age": 25, "content": "x"}));
    assert!(ok.is_ok());
    assert_eq!(ok.value, json!({"age": 25, "content": "x"}));

    let minor = merged.validate(&json!({"age": 16, "content": "x"}));
    assert_eq!(minor.errors.to_value(), json!({"age": ["must be major"]}));
}

#[test]
fn shared_field_unions_types_and_chains_rules_left_then_right() {
    let a = StructBuilder::new()
        .field(
            Field::new("size", Tag::Integer)
                .required()
                .rule("too small", |v, _| v.as_i64().is_some_and(|n| n >= 2)),
        )
        .freeze()
        .unwrap();
    let b = StructBuilder::new()
        .field(
            Field::new("size", Tag::Float)
                .rule("too big", |v, _| v.as_f64().is_some_and(|n| n <= 10.0)),
        )
        .freeze()
        .unwrap();
    let merged = a.merged_with(&b).unwrap();

    // One field remains, typed [integer, float].
    let fields = merged.fields().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].candidates().len(), 2);

    let small = merged.validate(&json!({"size": 1}));
    assert_eq!(small.errors.to_value(), json!({"size": ["too small"]}));
    let big = merged.validate(&json!({"size": 11}));
    assert_eq!(big.errors.to_value(), json!({"size": ["too big"]}));
    assert!(merged.validate(&json!({"size": 5})).is_ok());
}

#[test]
fn shared_field_option_bag_is_right_biased() {
    let a = StructBuilder::new()
        .field(Field::new("n", Tag::Integer).label("left").meta("unit", json!("mm")))
        .freeze()
        .unwrap();
    let b = StructBuilder::new()
        .field(Field::new("n", Tag::Integer).label("right").describe("a number"))
        .freeze()
        .unwrap();
    let merged = a.merged_with(&b).unwrap();
    let field = &merged.fields().unwrap()[0];
    assert_eq!(field.options().label.as_deref(), Some("right"));
    assert_eq!(field.options().description.as_deref(), Some("a number"));
    assert_eq!(field.options().meta.get("unit"), Some(&json!("mm")));
}

#[test]
fn fields_unique_to_the_right_side_are_appended() {
    let a = StructBuilder::new()
        .field(Field::new("x", Tag::Integer).required())
        .freeze()
        .unwrap();
    let b = StructBuilder::new()
        .field(Field::new("y", Tag::Integer).required())
        .freeze()
        .unwrap();
    let merged = a.merged_with(&b).unwrap();
    let names: Vec<&str> = merged.fields().unwrap().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["x", "y"]);
}

#[test]
fn scalar_merge_unions_and_deduplicates_candidates() {
    let a = ScalarBuilder::of([Tag::Integer.into(), Tag::Null.into()]).freeze();
    let b = ScalarBuilder::of([Tag::Integer.into(), Tag::String.into()]).freeze();
    let merged = a.merged_with(&b).unwrap();
    let names: Vec<String> = merged
        .candidates()
        .unwrap()
        .iter()
        .map(TypeRef::describe)
        .collect();
    assert_eq!(names, ["integer", "null", "string"]);
}

#[test]
fn list_merge_concatenates_candidates_and_pipelines() {
    let a = ListBuilder::of([Tag::Integer.into()])
        .rule("left gate", |v, _| v.as_array().is_some_and(|x| x.len() < 4))
        .freeze();
    let b = ListBuilder::of([Tag::String.into()])
        .rule("right gate", |v, _| {
            v.as_array().is_some_and(|x| !x.is_empty())
        })
        .freeze();
    let merged = a.merged_with(&b).unwrap();
    assert!(merged.validate(&json!([1, "two"])).is_ok());
    let empty = merged.validate(&json!([]));
    assert_eq!(empty.errors.to_value(), json!({"": ["right gate"]}));
    let long = merged.validate(&json!([1, 2, 3, 4]));
    assert_eq!(long.errors.to_value(), json!({"": ["left gate"]}));
}

#[test]
fn select_merge_unions_per_arm() {
    let a = SelectBuilder::new()
        .arm("n", [Tag::Integer.into()])
        .freeze();
    let b = SelectBuilder::new()
        .arm("n", [Tag::Null.into()])
        .arm("s", [Tag::String.into()])
        .freeze();
    let merged = a.merged_with(&b).unwrap();
    let arms = merged.arms().unwrap();
    assert_eq!(arms.get("n").unwrap().len(), 2);
    assert!(arms.contains_key("s"));
}

#[test]
fn aggregating_mismatched_kinds_is_a_definition_time_error() {
    let s = StructBuilder::new()
        .field(Field::new("x", Tag::Integer))
        .freeze()
        .unwrap();
    let l = ListBuilder::of([Tag::Integer.into()]).freeze();
    let err = s.merged_with(&l).unwrap_err();
    assert_eq!(
        err,
        SchemaError::KindMismatch {
            left: "struct",
            right: "list"
        }
    );
}
