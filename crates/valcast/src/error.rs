//! Error accumulation and the failure taxonomy.
//!
//! Per-input failures (bad shapes, coercion misses, rule violations) are
//! collected into an [`Errors`] accumulator and never escape `validate()`.
//! Definition-time mistakes ([`SchemaError`]) are returned eagerly by the
//! builders, since they are programmer errors rather than bad input.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::locals::Locals;

/// Path key under which root-level messages are recorded.
///
/// Child accumulators merged via [`Errors::combine`] replace this key with
/// the prefix itself, so a nested node's root error lands at the nesting key.
pub const ROOT: &str = "";

/// Ordered, path-keyed collector of validation failures.
///
/// Keys are dot-joined, root-relative paths (`"address.street"`, `"items.2"`);
/// each key holds its messages in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Errors {
    entries: IndexMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded messages across all paths.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Appends a message under the given path.
    pub fn add(&mut self, path: &str, message: impl Into<String>) {
        self.entries
            .entry(path.to_string())
            .or_default()
            .push(message.into());
    }

    /// Appends the same message under each of the given paths.
    pub fn add_at(&mut self, paths: &[String], message: &str) {
        for path in paths {
            self.add(path, message);
        }
    }

    /// Merges a child accumulator's entries under `prefix`.
    ///
    /// A child entry at [`ROOT`] is re-keyed to `prefix` itself; any other
    /// child path is joined as `prefix.child`.
    pub fn combine(&mut self, prefix: &str, child: Errors) {
        for (path, messages) in child.entries {
            let key = if path.is_empty() {
                prefix.to_string()
            } else if prefix.is_empty() {
                path
            } else {
                format!("{prefix}.{path}")
            };
            self.entries.entry(key).or_default().extend(messages);
        }
    }

    /// Messages recorded at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Iterates `(path, messages)` pairs in recording order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Renders the accumulator as a JSON object (`path -> [messages]`).
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (path, messages) in &self.entries {
            map.insert(
                path.clone(),
                Value::Array(messages.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(map)
    }
}

static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{(\w+)\}").expect("substitution pattern"));

/// Expands `%{name}` placeholders in a message against the Locals vars.
///
/// Unknown names are left verbatim so a typo is visible in the output.
pub(crate) fn interpolate(message: &str, locals: &Locals) -> String {
    if !message.contains("%{") {
        return message.to_string();
    }
    SUBSTITUTION
        .replace_all(message, |caps: &regex::Captures<'_>| {
            match locals.get(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Failure signalled by a converter when a value cannot be interpreted as
/// the requested type. Always caught at the point of coalescion and turned
/// into an [`Errors`] entry.
#[derive(Debug, Error)]
pub enum CoalesceError {
    /// The exact-type fallback check failed.
    #[error("does not match type {0}")]
    InvalidType(String),
    /// A converter rejected the value.
    #[error("{0}")]
    Failed(String),
    /// Every member of an ordered union failed.
    #[error("does not match any candidate type [{0}]")]
    NoCandidate(String),
    /// A nested schema node rejected the value; its own error map is
    /// carried back so the caller can merge it under the owning path.
    #[error("nested schema rejected the value")]
    Nested(Errors),
}

/// Definition-time error raised while building or combining schemas.
///
/// These are fatal by design: they represent programmer error, not input.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("cannot merge schema kinds `{left}` and `{right}`")]
    KindMismatch {
        left: &'static str,
        right: &'static str,
    },
    #[error("selector source `{0}` must name a previously declared field")]
    UnknownSelectorSource(String),
    #[error("duplicate field `{0}`")]
    DuplicateField(String),
}

/// Outcome of one `validate()` call: the produced value plus every failure
/// recorded along the way. Success iff `errors` is empty.
#[derive(Debug, Clone)]
pub struct Validation {
    pub value: Value,
    pub errors: Errors,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The validated value, or the error map if anything failed.
    pub fn into_result(self) -> Result<Value, Errors> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(self.errors)
        }
    }
}
