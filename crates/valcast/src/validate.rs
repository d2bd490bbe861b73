//! The validation engine — one function per node kind, plus the planned
//! struct path.
//!
//! Every function returns a fresh [`Validation`]; child failures are merged
//! into the parent accumulator under the owning key, so error paths are
//! composed without any mutable path stack.

use serde_json::{Map, Value};

use crate::coalesce::coalesce;
use crate::error::{CoalesceError, Errors, Validation, ROOT};
use crate::field::Field;
use crate::locals::Locals;
use crate::pipeline::Pipeline;
use crate::plan::{MissingPolicy, StructPlan};
use crate::schema::{
    selector_key, DictSchema, ListSchema, ScalarSchema, SchemaNode, SelectSchema, StructSchema,
};

/// Caller-side validation switches.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Record "is not allowed" for input keys not claimed by any field of a
    /// struct that does not pass unknowns through.
    pub strict: bool,
}

impl ValidateOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

pub(crate) fn validate_node(
    node: &SchemaNode,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    match node {
        SchemaNode::Struct(s) => validate_struct(s, input, locals, options),
        SchemaNode::List(s) => validate_list(s, input, locals, options),
        SchemaNode::Dict(s) => validate_dict(s, input, locals, options),
        SchemaNode::Scalar(s) => validate_scalar(s, input, locals, options),
        SchemaNode::Select(s) => validate_select(s, input, locals, options),
    }
}

fn root_failure(input: &Value, message: &str) -> Validation {
    let mut errors = Errors::new();
    errors.add(ROOT, message);
    Validation {
        value: input.clone(),
        errors,
    }
}

// ---------------------------------------------------------------------
// Struct

fn validate_struct(
    s: &StructSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    match &s.plan {
        Some(plan) => validate_struct_planned(s, plan, input, locals, options),
        None => validate_struct_generic(s, input, locals, options),
    }
}

/// Generic path: derives each field's policy on the fly. Kept as the
/// semantic reference the compiled plan is checked against.
fn validate_struct_generic(
    s: &StructSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let Some(obj) = input.as_object() else {
        return root_failure(input, "must be a map");
    };
    let mut output = Map::new();
    let mut errors = Errors::new();
    let mut locals = locals.clone();
    for field in &s.fields {
        // Resolved per field: a field without a selector source must not
        // see a sibling's discriminator.
        locals.selector = field
            .selector_source()
            .and_then(|source| output.get(source).cloned());
        match obj.get(field.source_key()) {
            Some(raw) => apply_field(field, raw, &mut output, &mut errors, &locals, options),
            None => match field.default() {
                Some(default) => {
                    let produced = default.produce();
                    apply_field(field, &produced, &mut output, &mut errors, &locals, options);
                }
                None if field.is_required() => errors.add(field.name(), "is required"),
                None => {}
            },
        }
    }
    let claimed = |key: &str| s.fields.iter().any(|f| f.source_key() == key);
    finish_struct(s, obj, output, errors, &locals, options, claimed)
}

/// Planned path: executes the precompiled step list. Must stay
/// observationally identical to the generic path above.
fn validate_struct_planned(
    s: &StructSchema,
    plan: &StructPlan,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let Some(obj) = input.as_object() else {
        return root_failure(input, "must be a map");
    };
    let mut output = Map::new();
    let mut errors = Errors::new();
    let mut locals = locals.clone();
    for step in &plan.steps {
        let field = &s.fields[step.field_index];
        locals.selector = step
            .selector_source
            .as_deref()
            .and_then(|source| output.get(source).cloned());
        match obj.get(&step.source_key) {
            Some(raw) => apply_field(field, raw, &mut output, &mut errors, &locals, options),
            None => match &step.missing {
                MissingPolicy::Default(default) => {
                    let produced = default.produce();
                    apply_field(field, &produced, &mut output, &mut errors, &locals, options);
                }
                MissingPolicy::Required => errors.add(field.name(), "is required"),
                MissingPolicy::Skip => {}
            },
        }
    }
    let claimed = |key: &str| plan.claimed_keys.contains(key);
    finish_struct(s, obj, output, errors, &locals, options, claimed)
}

/// Coalesces one field's raw value and runs its rule chain. Rule failures
/// land at the field name (or the rule's explicit keys) in the caller's
/// accumulator; the produced value is kept in the output either way, since
/// a failing step never alters it.
fn apply_field(
    field: &Field,
    raw: &Value,
    output: &mut Map<String, Value>,
    errors: &mut Errors,
    locals: &Locals,
    options: &ValidateOptions,
) {
    match coalesce(raw, field.candidates(), locals, options) {
        Ok(mut value) => {
            field
                .rules()
                .run(&mut value, Some(field.name()), Some(output), locals, errors);
            output.insert(field.name().to_string(), value);
        }
        Err(CoalesceError::Nested(child)) => errors.combine(field.name(), child),
        Err(e) => errors.add(field.name(), e.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_struct(
    s: &StructSchema,
    obj: &Map<String, Value>,
    mut output: Map<String, Value>,
    mut errors: Errors,
    locals: &Locals,
    options: &ValidateOptions,
    claimed: impl Fn(&str) -> bool,
) -> Validation {
    if s.allow_unknown {
        for (key, value) in obj {
            if !claimed(key) && !output.contains_key(key) {
                output.insert(key.clone(), value.clone());
            }
        }
    } else if options.strict {
        for key in obj.keys() {
            if !claimed(key) {
                errors.add(key, "is not allowed");
            }
        }
    }
    let mut value = Value::Object(output);
    if errors.is_empty() {
        s.pipeline.run(&mut value, None, None, locals, &mut errors);
    }
    Validation { value, errors }
}

// ---------------------------------------------------------------------
// List / Dict / Scalar / Select

fn validate_list(
    s: &ListSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let Some(items) = input.as_array() else {
        return root_failure(input, "must be a sequence");
    };
    let mut output = Vec::with_capacity(items.len());
    let mut errors = Errors::new();
    for (index, item) in items.iter().enumerate() {
        match coalesce(item, &s.types, locals, options) {
            Ok(value) => output.push(value),
            Err(CoalesceError::Nested(child)) => errors.combine(&index.to_string(), child),
            Err(e) => errors.add(&index.to_string(), e.to_string()),
        }
    }
    let mut value = Value::Array(output);
    if errors.is_empty() {
        s.pipeline.run(&mut value, None, None, locals, &mut errors);
    }
    Validation { value, errors }
}

fn validate_dict(
    s: &DictSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let Some(entries) = input.as_object() else {
        return root_failure(input, "must be a map");
    };
    let mut output = Map::new();
    let mut errors = Errors::new();
    let mut seen = std::collections::HashSet::new();
    for (key, raw) in entries {
        let canonical = key.trim().to_string();
        // Two input keys collapsing to one canonical key is ambiguous;
        // the first occurrence wins and the collision is recorded.
        if !seen.insert(canonical.clone()) {
            errors.add(&canonical, "is duplicated");
            continue;
        }
        match coalesce(raw, &s.types, locals, options) {
            Ok(value) => {
                output.insert(canonical, value);
            }
            Err(CoalesceError::Nested(child)) => errors.combine(&canonical, child),
            Err(e) => errors.add(&canonical, e.to_string()),
        }
    }
    let mut value = Value::Object(output);
    if errors.is_empty() {
        s.pipeline.run(&mut value, None, None, locals, &mut errors);
    }
    Validation { value, errors }
}

fn validate_scalar(
    s: &ScalarSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    coalesce_at_root(&s.types, &s.pipeline, input, locals, options)
}

fn validate_select(
    s: &SelectSchema,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let Some(selector) = locals.selector() else {
        return root_failure(input, "selector not provided");
    };
    let key = selector_key(selector);
    let types = match s.arms.get(&key).or(s.otherwise.as_ref()) {
        Some(types) => types,
        None => {
            return root_failure(
                input,
                &format!("selector `{key}` is not valid for this schema"),
            )
        }
    };
    coalesce_at_root(types, &s.pipeline, input, locals, options)
}

fn coalesce_at_root(
    types: &[crate::coalesce::TypeRef],
    pipeline: &Pipeline,
    input: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Validation {
    let mut errors = Errors::new();
    let mut value = match coalesce(input, types, locals, options) {
        Ok(value) => value,
        Err(CoalesceError::Nested(child)) => {
            errors.combine(ROOT, child);
            return Validation {
                value: input.clone(),
                errors,
            };
        }
        Err(e) => {
            errors.add(ROOT, e.to_string());
            return Validation {
                value: input.clone(),
                errors,
            };
        }
    };
    pipeline.run(&mut value, None, None, locals, &mut errors);
    Validation { value, errors }
}
