//! The schema node model — one closed polymorphic family covering struct,
//! list, dict, scalar, and select nodes.
//!
//! Nodes are assembled by the builders in [`builder`] and become immutable
//! `Arc<SchemaNode>` values on freeze. A frozen node may be validated
//! concurrently from multiple threads: `validate` allocates its own locals,
//! accumulator, and output per call and never mutates node state.

pub mod builder;

use indexmap::IndexMap;
use serde_json::Value;

use crate::coalesce::{Tag, TypeRef};
use crate::error::Validation;
use crate::field::Field;
use crate::locals::Locals;
use crate::pipeline::Pipeline;
use crate::plan::StructPlan;
use crate::validate::{validate_node, ValidateOptions};

/// Ordered list of named fields over a key-value input.
#[derive(Debug, Clone)]
pub struct StructSchema {
    pub(crate) fields: Vec<Field>,
    /// Unknown input keys pass through verbatim instead of being rejected.
    pub(crate) allow_unknown: bool,
    pub(crate) pipeline: Pipeline,
    /// Compiled execution plan; present once the struct is frozen.
    pub(crate) plan: Option<StructPlan>,
}

/// Homogeneous sequence; every element is coalesced against the candidates.
#[derive(Debug, Clone)]
pub struct ListSchema {
    pub(crate) types: Vec<TypeRef>,
    pub(crate) pipeline: Pipeline,
}

/// Open key-value map; every value is coalesced against the candidates and
/// keys are normalized to their canonical (trimmed) form. Input keys that
/// collapse to the same canonical key are an error on the later occurrence.
#[derive(Debug, Clone)]
pub struct DictSchema {
    pub(crate) types: Vec<TypeRef>,
    pub(crate) pipeline: Pipeline,
}

/// Single value coalesced against the candidates.
#[derive(Debug, Clone)]
pub struct ScalarSchema {
    pub(crate) types: Vec<TypeRef>,
    pub(crate) pipeline: Pipeline,
}

/// Discriminated candidate selection: the resolved selector value picks
/// which arm's candidate list applies, with an optional catch-all arm.
#[derive(Debug, Clone)]
pub struct SelectSchema {
    pub(crate) arms: IndexMap<String, Vec<TypeRef>>,
    pub(crate) otherwise: Option<Vec<TypeRef>>,
    pub(crate) pipeline: Pipeline,
}

/// The unified enum covering all schema node kinds.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Struct(StructSchema),
    List(ListSchema),
    Dict(DictSchema),
    Scalar(ScalarSchema),
    Select(SelectSchema),
}

impl SchemaNode {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Scalar(_) => "scalar",
            Self::Select(_) => "select",
        }
    }

    /// Validates `input` with empty locals and default options.
    pub fn validate(&self, input: &Value) -> Validation {
        self.validate_with(input, Locals::new(), &ValidateOptions::default())
    }

    /// Full validation entrypoint. `locals` is taken by value — each call
    /// owns its copy, so concurrent validations never share mutable state.
    pub fn validate_with(
        &self,
        input: &Value,
        locals: Locals,
        options: &ValidateOptions,
    ) -> Validation {
        validate_node(self, input, &locals, options)
    }

    // ------------------------------------------------------------------
    // Read-only traversal surface for external collaborators (value-object
    // builders, interchange exporters). Cycle detection is the caller's
    // job, keyed on node identity (`Arc::as_ptr`).

    /// Ordered field list, for struct nodes.
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Struct(s) => Some(&s.fields),
            _ => None,
        }
    }

    /// Candidate type list, for list/dict/scalar nodes.
    pub fn candidates(&self) -> Option<&[TypeRef]> {
        match self {
            Self::List(s) => Some(&s.types),
            Self::Dict(s) => Some(&s.types),
            Self::Scalar(s) => Some(&s.types),
            _ => None,
        }
    }

    /// Discriminator arms, for select nodes.
    pub fn arms(&self) -> Option<&IndexMap<String, Vec<TypeRef>>> {
        match self {
            Self::Select(s) => Some(&s.arms),
            _ => None,
        }
    }

    /// Catch-all candidate list, for select nodes.
    pub fn otherwise(&self) -> Option<&[TypeRef]> {
        match self {
            Self::Select(s) => s.otherwise.as_deref(),
            _ => None,
        }
    }

    pub fn allows_unknown_keys(&self) -> bool {
        matches!(self, Self::Struct(s) if s.allow_unknown)
    }

    // ------------------------------------------------------------------
    // Structural relations

    /// Reflexive structural subtyping: shape-based, same-kind only, with
    /// coinductive handling of recursive schema graphs.
    pub fn is_subtype_of(&self, other: &SchemaNode) -> bool {
        crate::subtype::is_subtype(self, other, &mut Default::default())
    }

    /// Strict (irreflexive) structural subtyping.
    pub fn is_strict_subtype_of(&self, other: &SchemaNode) -> bool {
        self.is_subtype_of(other) && !other.is_subtype_of(self)
    }

    /// Compares a scalar node against a single raw tag, treated as a
    /// singleton candidate set. Always false for other kinds.
    pub fn is_subtype_of_tag(&self, tag: &Tag) -> bool {
        crate::subtype::scalar_covers_tag(self, tag)
    }

    /// Same-kind aggregation: fields union by name, candidate lists union,
    /// pipelines concatenate left-then-right. Mismatched kinds are a
    /// definition-time error.
    pub fn merged_with(
        &self,
        other: &SchemaNode,
    ) -> Result<std::sync::Arc<SchemaNode>, crate::error::SchemaError> {
        crate::merge::merge(self, other)
    }
}

/// Canonical arm-table key for a discriminator value: strings verbatim,
/// other scalars via their JSON rendering.
pub(crate) fn selector_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
