//! Schema aggregation — combining two same-kind nodes into one.
//!
//! Struct fields union by name (shared names merge per
//! [`crate::field::Field::merged_with`]), candidate lists union, pipelines
//! concatenate left-then-right. Aggregating different kinds is a
//! definition-time error.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::coalesce::TypeRef;
use crate::error::SchemaError;
use crate::plan;
use crate::schema::builder::check_fields;
use crate::schema::{
    DictSchema, ListSchema, ScalarSchema, SchemaNode, SelectSchema, StructSchema,
};

pub(crate) fn merge(a: &SchemaNode, b: &SchemaNode) -> Result<Arc<SchemaNode>, SchemaError> {
    let merged = match (a, b) {
        (SchemaNode::Struct(sa), SchemaNode::Struct(sb)) => merge_structs(sa, sb)?,
        (SchemaNode::List(sa), SchemaNode::List(sb)) => SchemaNode::List(ListSchema {
            types: concat_types(&sa.types, &sb.types),
            pipeline: sa.pipeline.clone().concat(&sb.pipeline),
        }),
        (SchemaNode::Dict(sa), SchemaNode::Dict(sb)) => SchemaNode::Dict(DictSchema {
            types: concat_types(&sa.types, &sb.types),
            pipeline: sa.pipeline.clone().concat(&sb.pipeline),
        }),
        (SchemaNode::Scalar(sa), SchemaNode::Scalar(sb)) => SchemaNode::Scalar(ScalarSchema {
            types: union_types(&sa.types, &sb.types),
            pipeline: sa.pipeline.clone().concat(&sb.pipeline),
        }),
        (SchemaNode::Select(sa), SchemaNode::Select(sb)) => merge_selects(sa, sb),
        _ => {
            return Err(SchemaError::KindMismatch {
                left: a.kind(),
                right: b.kind(),
            })
        }
    };
    Ok(Arc::new(merged))
}

fn merge_structs(a: &StructSchema, b: &StructSchema) -> Result<SchemaNode, SchemaError> {
    let mut fields = a.fields.clone();
    for fb in &b.fields {
        match fields.iter().position(|fa| fa.name() == fb.name()) {
            Some(index) => fields[index] = fields[index].merged_with(fb),
            None => fields.push(fb.clone()),
        }
    }
    check_fields(&fields)?;
    let plan = Some(plan::compile(&fields));
    Ok(SchemaNode::Struct(StructSchema {
        fields,
        allow_unknown: a.allow_unknown || b.allow_unknown,
        pipeline: a.pipeline.clone().concat(&b.pipeline),
        plan,
    }))
}

fn merge_selects(a: &SelectSchema, b: &SelectSchema) -> SchemaNode {
    let mut arms: IndexMap<String, Vec<TypeRef>> = a.arms.clone();
    for (key, types) in &b.arms {
        match arms.get_mut(key) {
            Some(existing) => *existing = union_types(existing, types),
            None => {
                arms.insert(key.clone(), types.clone());
            }
        }
    }
    let otherwise = match (&a.otherwise, &b.otherwise) {
        (Some(oa), Some(ob)) => Some(union_types(oa, ob)),
        (Some(oa), None) => Some(oa.clone()),
        (None, ob) => ob.clone(),
    };
    SchemaNode::Select(SelectSchema {
        arms,
        otherwise,
        pipeline: a.pipeline.clone().concat(&b.pipeline),
    })
}

fn concat_types(a: &[TypeRef], b: &[TypeRef]) -> Vec<TypeRef> {
    let mut types = a.to_vec();
    types.extend(b.iter().cloned());
    types
}

/// Declaration-order union with duplicates from the right side dropped.
fn union_types(a: &[TypeRef], b: &[TypeRef]) -> Vec<TypeRef> {
    let mut types = a.to_vec();
    for t in b {
        if !types.contains(t) {
            types.push(t.clone());
        }
    }
    types
}
