//! Per-call validation context.

use indexmap::IndexMap;
use serde_json::Value;

/// Ephemeral context threaded through one `validate()` call tree.
///
/// Holds the caller-supplied variable bag (readable from rule predicates
/// and `%{name}` message substitution) and, while a selector-typed field is
/// being validated, the resolved discriminator value. Cloned at the top of
/// every `validate()` invocation, so concurrent validations never share
/// mutable state.
///
/// Error paths are composed by merging child accumulators under a prefix
/// rather than via a mutable path stack, so Locals carries no path state.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    vars: IndexMap<String, Value>,
    pub(crate) selector: Option<Value>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a caller variable, chaining-style.
    pub fn var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// The discriminator value resolved for the selector field currently
    /// being validated, if any.
    pub fn selector(&self) -> Option<&Value> {
        self.selector.as_ref()
    }
}
