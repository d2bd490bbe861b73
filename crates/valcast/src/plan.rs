//! Compiled struct execution plan.
//!
//! Freezing a struct converts the generic per-field branching into a flat
//! ordered step list with each field's source key, missing-value policy,
//! and selector wiring already resolved, plus a precomputed claimed-key set
//! for O(1) extraneous-key detection. The planned path must stay
//! observationally identical to the generic path, including error text and
//! ordering; it exists purely to remove per-call dispatch overhead.

use std::collections::HashSet;

use log::trace;

use crate::field::{Field, FieldDefault};

/// What to do when a field's source key is absent from the input.
#[derive(Debug, Clone)]
pub(crate) enum MissingPolicy {
    Required,
    Default(FieldDefault),
    Skip,
}

/// One precompiled field application.
#[derive(Debug, Clone)]
pub(crate) struct FieldStep {
    /// Index into the struct's field list (candidates, rules, name).
    pub field_index: usize,
    pub source_key: String,
    pub missing: MissingPolicy,
    pub selector_source: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct StructPlan {
    pub steps: Vec<FieldStep>,
    /// Source keys claimed by any field.
    pub claimed_keys: HashSet<String>,
}

pub(crate) fn compile(fields: &[Field]) -> StructPlan {
    let steps = fields
        .iter()
        .enumerate()
        .map(|(field_index, field)| FieldStep {
            field_index,
            source_key: field.source_key().to_string(),
            missing: match field.default() {
                Some(default) => MissingPolicy::Default(default.clone()),
                None if field.is_required() => MissingPolicy::Required,
                None => MissingPolicy::Skip,
            },
            selector_source: field.selector_source().map(str::to_string),
        })
        .collect::<Vec<_>>();
    let claimed_keys = steps.iter().map(|s| s.source_key.clone()).collect();
    trace!("compiled struct plan with {} field steps", steps.len());
    StructPlan {
        steps,
        claimed_keys,
    }
}
