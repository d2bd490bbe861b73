//! Builders — the mutable pre-freeze form of every node kind.
//!
//! Construction is two-phase: builders accumulate fields, candidates, and
//! pipeline steps, then `freeze()` produces an immutable `Arc<SchemaNode>`.
//! Freezing a struct also compiles its execution plan. Malformed
//! definitions (duplicate fields, a selector source naming a field that is
//! not declared earlier) fail at freeze time, not at validation time.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{
    DictSchema, ListSchema, ScalarSchema, SchemaNode, SelectSchema, StructSchema,
};
use crate::coalesce::TypeRef;
use crate::error::SchemaError;
use crate::field::Field;
use crate::pipeline::{CheckCtx, Flow, Pipeline, Reporter};
use crate::plan;

/// Builder for struct nodes.
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    fields: Vec<Field>,
    allow_unknown: bool,
    pipeline: Pipeline,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Lets unknown input keys pass through verbatim.
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    /// Appends a rule to the struct-level pipeline (runs over the whole
    /// produced map when field validation was clean).
    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.rule(message, pred);
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.transform(func);
        self
    }

    /// Freezes into an immutable node with a compiled execution plan.
    pub fn freeze(self) -> Result<Arc<SchemaNode>, SchemaError> {
        self.build(true).map(Arc::new)
    }

    /// Freezes without compiling a plan, leaving the generic per-field
    /// interpreter in charge. Planned and unplanned structs validate
    /// identically; this form exists for differential testing of the two
    /// paths.
    pub fn freeze_uncompiled(self) -> Result<Arc<SchemaNode>, SchemaError> {
        self.build(false).map(Arc::new)
    }

    /// Freezes a self-referential struct. The closure receives a
    /// [`TypeRef`] standing for the node being built, usable anywhere a
    /// candidate type goes (e.g. a `children` list of the same schema).
    pub fn freeze_recursive<F>(configure: F) -> Result<Arc<SchemaNode>, SchemaError>
    where
        F: FnOnce(TypeRef) -> StructBuilder,
    {
        let mut failure = None;
        let node = Arc::new_cyclic(|weak| {
            match configure(TypeRef::Link(weak.clone())).build(true) {
                Ok(node) => node,
                Err(e) => {
                    failure = Some(e);
                    SchemaNode::Struct(StructSchema {
                        fields: Vec::new(),
                        allow_unknown: false,
                        pipeline: Pipeline::new(),
                        plan: None,
                    })
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(node),
        }
    }

    fn build(self, compiled: bool) -> Result<SchemaNode, SchemaError> {
        check_fields(&self.fields)?;
        let plan = compiled.then(|| plan::compile(&self.fields));
        Ok(SchemaNode::Struct(StructSchema {
            fields: self.fields,
            allow_unknown: self.allow_unknown,
            pipeline: self.pipeline,
            plan,
        }))
    }
}

/// Definition-time shape checks shared by freeze and aggregation.
pub(crate) fn check_fields(fields: &[Field]) -> Result<(), SchemaError> {
    for (index, field) in fields.iter().enumerate() {
        if fields[..index].iter().any(|f| f.name() == field.name()) {
            return Err(SchemaError::DuplicateField(field.name().to_string()));
        }
        if let Some(source) = field.selector_source() {
            if !fields[..index].iter().any(|f| f.name() == source) {
                return Err(SchemaError::UnknownSelectorSource(source.to_string()));
            }
        }
    }
    Ok(())
}

/// Builder for list nodes.
#[derive(Debug, Clone, Default)]
pub struct ListBuilder {
    types: Vec<TypeRef>,
    pipeline: Pipeline,
}

impl ListBuilder {
    /// List accepting the given candidate types for every element.
    pub fn of(types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            types: types.into_iter().collect(),
            pipeline: Pipeline::new(),
        }
    }

    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.rule(message, pred);
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.transform(func);
        self
    }

    pub fn freeze(self) -> Arc<SchemaNode> {
        Arc::new(SchemaNode::List(ListSchema {
            types: self.types,
            pipeline: self.pipeline,
        }))
    }
}

/// Builder for dict nodes.
#[derive(Debug, Clone, Default)]
pub struct DictBuilder {
    types: Vec<TypeRef>,
    pipeline: Pipeline,
}

impl DictBuilder {
    /// Dict accepting the given candidate types for every value.
    pub fn of(types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            types: types.into_iter().collect(),
            pipeline: Pipeline::new(),
        }
    }

    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.rule(message, pred);
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.transform(func);
        self
    }

    pub fn freeze(self) -> Arc<SchemaNode> {
        Arc::new(SchemaNode::Dict(DictSchema {
            types: self.types,
            pipeline: self.pipeline,
        }))
    }
}

/// Builder for scalar nodes.
#[derive(Debug, Clone, Default)]
pub struct ScalarBuilder {
    types: Vec<TypeRef>,
    pipeline: Pipeline,
}

impl ScalarBuilder {
    pub fn of(types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            types: types.into_iter().collect(),
            pipeline: Pipeline::new(),
        }
    }

    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.rule(message, pred);
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.transform(func);
        self
    }

    pub fn freeze(self) -> Arc<SchemaNode> {
        Arc::new(SchemaNode::Scalar(ScalarSchema {
            types: self.types,
            pipeline: self.pipeline,
        }))
    }
}

/// Builder for select nodes.
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    arms: IndexMap<String, Vec<TypeRef>>,
    otherwise: Option<Vec<TypeRef>>,
    pipeline: Pipeline,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate types applied when the discriminator equals `key`.
    pub fn arm(
        mut self,
        key: impl Into<String>,
        types: impl IntoIterator<Item = TypeRef>,
    ) -> Self {
        self.arms.insert(key.into(), types.into_iter().collect());
        self
    }

    /// Catch-all candidates for discriminator values with no declared arm.
    pub fn otherwise(mut self, types: impl IntoIterator<Item = TypeRef>) -> Self {
        self.otherwise = Some(types.into_iter().collect());
        self
    }

    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.rule(message, pred);
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.transform(func);
        self
    }

    pub fn freeze(self) -> Arc<SchemaNode> {
        Arc::new(SchemaNode::Select(SelectSchema {
            arms: self.arms,
            otherwise: self.otherwise,
            pipeline: self.pipeline,
        }))
    }
}
