//! Type coalescion — the registry of converters and the ordered-candidate
//! resolution algorithm.
//!
//! A candidate type is either a [`Tag`] resolved through the process-wide
//! converter registry, or a nested schema node validated recursively. Unions
//! are ordered: declaration order is observable behavior, `[Float, Integer]`
//! coerces a numeric string to a float even though Integer is "more
//! specific", because Float is tried first.

pub mod builtin;

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use log::debug;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::CoalesceError;
use crate::locals::Locals;
use crate::schema::SchemaNode;
use crate::validate::ValidateOptions;

/// Identifier of a registered converter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    String,
    Integer,
    Float,
    Boolean,
    /// Interned identifier — like `String` but restricted to symbolic names.
    Symbol,
    /// RFC 3339 timestamp, normalized to its text form.
    DateTime,
    /// Calendar date, normalized to `YYYY-MM-DD`.
    Date,
    /// Accepts `null` or the empty string; produces `null`.
    Null,
    /// Open key-value map passthrough, optionally recursing via options.
    Map,
    /// Open sequence passthrough, optionally recursing via options.
    Seq,
    /// Unconditional passthrough.
    Raw,
    /// Application-registered converter.
    Custom(String),
}

impl Tag {
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Symbol => "symbol",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Null => "null",
            Self::Map => "map",
            Self::Seq => "seq",
            Self::Raw => "raw",
            Self::Custom(name) => name,
        }
    }

    /// Exact runtime-type check used by the union quick-match and by the
    /// fallback converter. Tags without a concrete JSON representation
    /// (datetime, symbol, raw, custom) never match exactly.
    pub(crate) fn matches_exactly(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Map => value.is_object(),
            Self::Seq => value.is_array(),
            _ => false,
        }
    }
}

/// Options handed to a converter alongside the value.
///
/// The `map`/`seq` converters use these to recurse: `with` validates the
/// whole map against a nested node, `of` coalesces each element/value
/// against a candidate list.
#[derive(Clone, Default)]
pub struct CoalesceOpts {
    pub with: Option<Arc<SchemaNode>>,
    pub of: Option<Vec<TypeRef>>,
}

impl CoalesceOpts {
    fn is_empty(&self) -> bool {
        self.with.is_none() && self.of.is_none()
    }
}

impl std::fmt::Debug for CoalesceOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalesceOpts")
            .field("with", &self.with.as_ref().map(|n| n.kind()))
            .field("of", &self.of)
            .finish()
    }
}

/// One candidate type in a declaration-ordered union.
#[derive(Clone)]
pub enum TypeRef {
    /// A registered converter, with optional recursion options.
    Tag(Tag, CoalesceOpts),
    /// A nested schema node; coalescion delegates to its `validate`.
    Node(Arc<SchemaNode>),
    /// Back-reference to an enclosing node, for self-referential schemas.
    Link(Weak<SchemaNode>),
}

impl TypeRef {
    /// Plain tagged candidate without converter options.
    pub fn tag(tag: Tag) -> Self {
        Self::Tag(tag, CoalesceOpts::default())
    }

    pub fn node(node: Arc<SchemaNode>) -> Self {
        Self::Node(node)
    }

    /// `map` candidate whose whole value is validated by a nested node.
    pub fn map_with(node: Arc<SchemaNode>) -> Self {
        Self::Tag(
            Tag::Map,
            CoalesceOpts {
                with: Some(node),
                of: None,
            },
        )
    }

    /// `map` candidate whose values are coalesced against `of`.
    pub fn map_of(of: Vec<TypeRef>) -> Self {
        Self::Tag(
            Tag::Map,
            CoalesceOpts {
                with: None,
                of: Some(of),
            },
        )
    }

    /// `seq` candidate whose elements are coalesced against `of`.
    pub fn seq_of(of: Vec<TypeRef>) -> Self {
        Self::Tag(
            Tag::Seq,
            CoalesceOpts {
                with: None,
                of: Some(of),
            },
        )
    }

    /// Name used in union-failure messages and schema descriptions.
    pub fn describe(&self) -> String {
        match self {
            Self::Tag(tag, _) => tag.name().to_string(),
            Self::Node(node) => node.kind().to_string(),
            Self::Link(_) => "self".to_string(),
        }
    }

    fn matches_exactly(&self, value: &Value) -> bool {
        match self {
            // Tags carrying recursion options imply a structural pass, so
            // they never satisfy the no-conversion quick-match.
            Self::Tag(tag, opts) => opts.is_empty() && tag.matches_exactly(value),
            Self::Node(_) | Self::Link(_) => false,
        }
    }
}

impl std::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag(tag, opts) if opts.is_empty() => write!(f, "Tag({})", tag.name()),
            Self::Tag(tag, opts) => write!(f, "Tag({}, {opts:?})", tag.name()),
            Self::Node(node) => write!(f, "Node({})", node.kind()),
            Self::Link(_) => write!(f, "Link"),
        }
    }
}

impl PartialEq for TypeRef {
    /// Identity-flavored equality: tags compare structurally, nested nodes
    /// by pointer. Used to deduplicate candidate lists during aggregation.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tag(a, ao), Self::Tag(b, bo)) => {
                a == b
                    && match (&ao.with, &bo.with) {
                        (None, None) => true,
                        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
                        _ => false,
                    }
                    && ao.of == bo.of
            }
            (Self::Node(a), Self::Node(b)) => Arc::ptr_eq(a, b),
            (Self::Link(a), Self::Link(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Tag> for TypeRef {
    fn from(tag: Tag) -> Self {
        Self::tag(tag)
    }
}

impl From<Arc<SchemaNode>> for TypeRef {
    fn from(node: Arc<SchemaNode>) -> Self {
        Self::Node(node)
    }
}

/// A registered conversion function.
///
/// Either returns the coerced value or signals [`CoalesceError`]; the error
/// is always caught at the point of coalescion.
pub type Converter = Arc<
    dyn Fn(&Value, &CoalesceOpts, &Locals, &ValidateOptions) -> Result<Value, CoalesceError>
        + Send
        + Sync,
>;

static REGISTRY: Lazy<RwLock<HashMap<Tag, Converter>>> =
    Lazy::new(|| RwLock::new(builtin::defaults()));

/// Installs (or overwrites) a converter for a tag.
///
/// This is process-lifetime configuration: registration belongs in startup
/// code, before concurrent validation begins. The table is behind a
/// read-write lock so a stray late registration cannot corrupt it.
pub fn register(tag: Tag, converter: Converter) {
    debug!("registering coalescer for tag `{}`", tag.name());
    REGISTRY
        .write()
        .expect("coalescer registry poisoned")
        .insert(tag, converter);
}

fn lookup(tag: &Tag) -> Option<Converter> {
    REGISTRY
        .read()
        .expect("coalescer registry poisoned")
        .get(tag)
        .cloned()
}

/// Coalesces `value` against an ordered candidate list.
///
/// Single candidate: direct conversion (or nested validation). Union:
/// quick-match first — when the input's concrete runtime type equals
/// exactly one candidate, the value is returned verbatim so an
/// already-correctly-typed value is never reinterpreted as an earlier,
/// also-matching member. Otherwise candidates are tried strictly in
/// declaration order; the first success wins and failures are swallowed.
/// An empty candidate list passes the value through untouched.
pub fn coalesce(
    value: &Value,
    types: &[TypeRef],
    locals: &Locals,
    options: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match types {
        [] => Ok(value.clone()),
        [single] => coalesce_one(value, single, locals, options),
        union => {
            let mut exact = union.iter().filter(|t| t.matches_exactly(value));
            if exact.next().is_some() && exact.next().is_none() {
                return Ok(value.clone());
            }
            for candidate in union {
                if let Ok(out) = coalesce_one(value, candidate, locals, options) {
                    return Ok(out);
                }
            }
            let names: Vec<String> = union.iter().map(TypeRef::describe).collect();
            Err(CoalesceError::NoCandidate(names.join(", ")))
        }
    }
}

fn coalesce_one(
    value: &Value,
    candidate: &TypeRef,
    locals: &Locals,
    options: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    match candidate {
        TypeRef::Tag(tag, opts) => match lookup(tag) {
            Some(converter) => converter(value, opts, locals, options),
            // Fallback converter: exact-type membership check.
            None => {
                if tag.matches_exactly(value) {
                    Ok(value.clone())
                } else {
                    Err(CoalesceError::InvalidType(tag.name().to_string()))
                }
            }
        },
        TypeRef::Node(node) => delegate(node, value, locals, options),
        TypeRef::Link(weak) => match weak.upgrade() {
            Some(node) => delegate(&node, value, locals, options),
            None => Err(CoalesceError::Failed(
                "recursive schema link is no longer alive".to_string(),
            )),
        },
    }
}

pub(crate) fn delegate(
    node: &SchemaNode,
    value: &Value,
    locals: &Locals,
    options: &ValidateOptions,
) -> Result<Value, CoalesceError> {
    let result = node.validate_with(value, locals.clone(), options);
    if result.is_ok() {
        Ok(result.value)
    } else {
        Err(CoalesceError::Nested(result.errors))
    }
}
