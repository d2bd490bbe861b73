//! Integration tests for structural subtyping.

use serde_json::json;
use valcast::{Field, ListBuilder, ScalarBuilder, SelectBuilder, StructBuilder, Tag, TypeRef};

fn named_aged() -> std::sync::Arc<valcast::SchemaNode> {
    StructBuilder::new()
        .field(Field::new("name", Tag::String).required())
        .field(Field::new("age", Tag::Integer).required())
        .freeze()
        .unwrap()
}

#[test]
fn wider_struct_is_a_subtype_of_the_narrower_one() {
    let a = named_aged();
    let b = StructBuilder::new()
        .field(Field::new("name", Tag::String).required())
        .field(Field::new("age", Tag::Integer).required())
        .field(Field::new("email", Tag::String))
        .freeze()
        .unwrap();
    assert!(b.is_subtype_of(&a));
    assert!(!a.is_subtype_of(&b));
    assert!(b.is_strict_subtype_of(&a));
}

#[test]
fn subtyping_is_structural_not_nominal() {
    let a = named_aged();
    let c = named_aged(); // independently defined, identical shape
    assert!(c.is_subtype_of(&a));
    assert!(a.is_subtype_of(&c));
    assert!(!a.is_strict_subtype_of(&c));
}

#[test]
fn subtyping_is_reflexive() {
    let a = named_aged();
    assert!(a.is_subtype_of(&a));
    assert!(!a.is_strict_subtype_of(&a));
}

#[test]
fn struct_field_types_are_checked_recursively() {
    let narrow_inner = StructBuilder::new()
        .field(Field::new("id", Tag::Integer).required())
        .freeze()
        .unwrap();
    let wide_inner = StructBuilder::new()
        .field(Field::new("id", Tag::Integer).required())
        .field(Field::new("tag", Tag::String))
        .freeze()
        .unwrap();
    let a = StructBuilder::new()
        .field(Field::new("item", TypeRef::node(wide_inner)).required())
        .freeze()
        .unwrap();
    let b = StructBuilder::new()
        .field(Field::new("item", TypeRef::node(narrow_inner)).required())
        .freeze()
        .unwrap();
    assert!(a.is_subtype_of(&b));
    assert!(!b.is_subtype_of(&a));
}

#[test]
fn cross_kind_comparison_is_false() {
    let s = named_aged();
    let l = ListBuilder::of([Tag::String.into()]).freeze();
    assert!(!s.is_subtype_of(&l));
    assert!(!l.is_subtype_of(&s));
}

#[test]
fn list_candidates_must_be_covered_and_empty_is_vacuous() {
    let narrow = ListBuilder::of([Tag::Integer.into()]).freeze();
    let wide = ListBuilder::of([Tag::Integer.into(), Tag::String.into()]).freeze();
    let empty = ListBuilder::of(Vec::<TypeRef>::new()).freeze();
    assert!(narrow.is_subtype_of(&wide));
    assert!(!wide.is_subtype_of(&narrow));
    assert!(empty.is_subtype_of(&narrow));
    assert!(!narrow.is_subtype_of(&empty));
}

#[test]
fn raw_covers_any_candidate() {
    let anything = ListBuilder::of([Tag::Raw.into()]).freeze();
    let ints = ListBuilder::of([Tag::Integer.into()]).freeze();
    assert!(ints.is_subtype_of(&anything));
    assert!(!anything.is_subtype_of(&ints));
}

#[test]
fn scalar_subtype_requires_covering_the_parents_candidates() {
    // A accepts everything B names (and more), so A <= B.
    let a = ScalarBuilder::of([Tag::Integer.into(), Tag::Float.into()]).freeze();
    let b = ScalarBuilder::of([Tag::Integer.into()]).freeze();
    assert!(a.is_subtype_of(&b));
    assert!(!b.is_subtype_of(&a));
}

#[test]
fn scalar_compares_against_a_single_raw_tag() {
    let a = ScalarBuilder::of([Tag::Integer.into(), Tag::Null.into()]).freeze();
    assert!(a.is_subtype_of_tag(&Tag::Integer));
    assert!(!a.is_subtype_of_tag(&Tag::String));
    let s = named_aged();
    assert!(!s.is_subtype_of_tag(&Tag::Map));
}

#[test]
fn select_arms_must_exist_with_covering_candidates() {
    let a = SelectBuilder::new()
        .arm("n", [Tag::Integer.into()])
        .freeze();
    let b = SelectBuilder::new()
        .arm("n", [Tag::Integer.into(), Tag::Float.into()])
        .arm("s", [Tag::String.into()])
        .freeze();
    assert!(a.is_subtype_of(&b));
    assert!(!b.is_subtype_of(&a));
}

#[test]
fn recursive_schemas_compare_without_diverging() {
    let make = || {
        StructBuilder::freeze_recursive(|this| {
            StructBuilder::new()
                .field(Field::new("name", Tag::String).required())
                .field(Field::new("children", TypeRef::seq_of(vec![this])))
        })
        .unwrap()
    };
    let a = make();
    let b = make();
    assert!(a.is_subtype_of(&b));
    assert!(a.is_subtype_of(&a));
    // Sanity: the recursive node still validates.
    let ok = a.validate(&json!({"name": "n", "children": [{"name": "m"}]}));
    assert!(ok.is_ok());
}
