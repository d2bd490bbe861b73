//! Struct fields — named, typed slots with defaults, rules, and options.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::coalesce::TypeRef;
use crate::pipeline::{CheckCtx, Flow, Pipeline, Reporter};

/// Default applied when a field's source key is absent from the input.
#[derive(Clone)]
pub enum FieldDefault {
    /// Literal value inserted as-is.
    Value(Value),
    /// Zero-argument producer evaluated once per validation.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    pub(crate) fn produce(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl std::fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "Value({v})"),
            Self::Producer(_) => write!(f, "Producer"),
        }
    }
}

/// Open option bag carried by every field.
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub label: Option<String>,
    pub description: Option<String>,
    /// Extensible metadata for external consumers (exporters, doc tooling).
    pub meta: IndexMap<String, Value>,
}

/// One named slot of a struct schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    from: Option<String>,
    types: Vec<TypeRef>,
    required: bool,
    default: Option<FieldDefault>,
    rules: Pipeline,
    options: FieldOptions,
    selector_source: Option<String>,
}

impl Field {
    /// Field with a single candidate type. Fields are optional until
    /// [`Field::required`] is called.
    pub fn new(name: impl Into<String>, type_: impl Into<TypeRef>) -> Self {
        Self::union(name, [type_.into()])
    }

    /// Field typed as an ordered union of candidates; order determines
    /// coercion precedence.
    pub fn union(name: impl Into<String>, types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            name: name.into(),
            from: None,
            types: types.into_iter().collect(),
            required: false,
            default: None,
            rules: Pipeline::new(),
            options: FieldOptions::default(),
            selector_source: None,
        }
    }

    /// Remaps the input key this field reads from (output name unchanged).
    pub fn from(mut self, source_key: impl Into<String>) -> Self {
        self.from = Some(source_key.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Value(value));
        self
    }

    /// Default produced lazily, once per validation.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Producer(Arc::new(producer)));
        self
    }

    /// Appends a rule to the field-local chain.
    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.rules = self.rules.rule(message, pred);
        self
    }

    /// Rule reporting under explicit sibling keys.
    pub fn rule_at<F>(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
        message: impl Into<String>,
        pred: F,
    ) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.rules = self.rules.rule_at(keys, message, pred);
        self
    }

    /// Appends a transform to the field-local chain.
    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.rules = self.rules.transform(func);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = Some(label.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.meta.insert(key.into(), value);
        self
    }

    /// Names an earlier sibling field whose produced output feeds this
    /// field's selector.
    pub fn select_on(mut self, source_field: impl Into<String>) -> Self {
        self.selector_source = Some(source_field.into());
        self
    }

    // ------------------------------------------------------------------
    // Read-only traversal surface

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input key this field reads from; defaults to the output name.
    pub fn source_key(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.name)
    }

    pub fn candidates(&self) -> &[TypeRef] {
        &self.types
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn selector_source(&self) -> Option<&str> {
        self.selector_source.as_deref()
    }

    pub(crate) fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    pub(crate) fn rules(&self) -> &Pipeline {
        &self.rules
    }

    /// Aggregation merge: `self` is the left field, `other` the right.
    ///
    /// Candidate types union (deduplicated), option bag is right-biased,
    /// the rule chain is left-then-right. Presence-style settings (source
    /// remap, default, selector source, required flag) take the right side
    /// when it sets them.
    pub(crate) fn merged_with(&self, other: &Field) -> Field {
        let mut types = self.types.clone();
        for t in &other.types {
            if !types.contains(t) {
                types.push(t.clone());
            }
        }
        let mut meta = self.options.meta.clone();
        meta.extend(other.options.meta.clone());
        Field {
            name: self.name.clone(),
            from: other.from.clone().or_else(|| self.from.clone()),
            types,
            required: self.required || other.required,
            default: other.default.clone().or_else(|| self.default.clone()),
            rules: self.rules.clone().concat(&other.rules),
            options: FieldOptions {
                label: other.options.label.clone().or_else(|| self.options.label.clone()),
                description: other
                    .options
                    .description
                    .clone()
                    .or_else(|| self.options.description.clone()),
                meta,
            },
            selector_source: other
                .selector_source
                .clone()
                .or_else(|| self.selector_source.clone()),
        }
    }
}
