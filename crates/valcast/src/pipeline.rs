//! Post-processor pipelines — ordered rule/transform chains attached to a
//! node or field.
//!
//! Steps run in declaration order. A step that reports any error stops the
//! remainder of its own chain (and only its own chain), and the value is
//! left as it was going into the failing step. A chain runs only when the
//! owner's structural validation produced zero errors.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{interpolate, Errors, ROOT};
use crate::locals::Locals;

/// What a transform asks the chain to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Skip the remaining steps of this chain, without error.
    Halt,
}

/// Read-only context handed to rule predicates.
pub struct CheckCtx<'a> {
    /// The sibling output accumulated so far, when the rule is attached to
    /// a struct field. Node-level pipelines see `None`.
    pub output: Option<&'a serde_json::Map<String, Value>>,
    pub locals: &'a Locals,
}

/// Error-reporting handle handed to transforms.
#[derive(Debug, Default)]
pub struct Reporter {
    reported: Vec<(Option<String>, String)>,
}

impl Reporter {
    /// Reports a failure under the owning key.
    pub fn error(&mut self, message: impl Into<String>) {
        self.reported.push((None, message.into()));
    }

    /// Reports a failure under an explicit sibling key.
    pub fn error_at(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.reported.push((Some(key.into()), message.into()));
    }

    fn is_clean(&self) -> bool {
        self.reported.is_empty()
    }
}

type Predicate = Arc<dyn Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync>;
type TransformFn = Arc<dyn Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync>;

/// Predicate step: on failure, appends its message under the owning key(s)
/// without altering the value.
#[derive(Clone)]
pub struct Rule {
    message: String,
    /// Explicit sibling keys to report under; empty means the owning key.
    keys: Vec<String>,
    pred: Predicate,
}

/// Value-rewriting step.
#[derive(Clone)]
pub struct Transform {
    func: TransformFn,
}

#[derive(Clone)]
pub enum Step {
    Rule(Rule),
    Transform(Transform),
}

/// Ordered chain of rule/transform steps.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn rule<F>(mut self, message: impl Into<String>, pred: F) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.steps.push(Step::Rule(Rule {
            message: message.into(),
            keys: Vec::new(),
            pred: Arc::new(pred),
        }));
        self
    }

    /// Rule whose failure message is recorded under each of `keys` instead
    /// of the owning key.
    pub fn rule_at<F>(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
        message: impl Into<String>,
        pred: F,
    ) -> Self
    where
        F: Fn(&Value, &CheckCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.steps.push(Step::Rule(Rule {
            message: message.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            pred: Arc::new(pred),
        }));
        self
    }

    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut Value, &mut Reporter) -> Flow + Send + Sync + 'static,
    {
        self.steps.push(Step::Transform(Transform {
            func: Arc::new(func),
        }));
        self
    }

    /// This chain followed by `other`'s steps; used by schema aggregation.
    pub(crate) fn concat(mut self, other: &Pipeline) -> Self {
        self.steps.extend(other.steps.iter().cloned());
        self
    }

    /// Runs the chain over `value`, recording failures into `errors`.
    ///
    /// `owner` is the key failures attach to (`None` means the node root).
    pub(crate) fn run(
        &self,
        value: &mut Value,
        owner: Option<&str>,
        output: Option<&serde_json::Map<String, Value>>,
        locals: &Locals,
        errors: &mut Errors,
    ) {
        for step in &self.steps {
            match step {
                Step::Rule(rule) => {
                    let ctx = CheckCtx { output, locals };
                    if !(rule.pred)(value, &ctx) {
                        let message = interpolate(&rule.message, locals);
                        if rule.keys.is_empty() {
                            errors.add(owner.unwrap_or(ROOT), message);
                        } else {
                            errors.add_at(&rule.keys, &message);
                        }
                        return;
                    }
                }
                Step::Transform(transform) => {
                    // Transforms run on a scratch copy committed only on a
                    // clean pass, so a failing step leaves the value as it
                    // was going in.
                    let mut scratch = value.clone();
                    let mut reporter = Reporter::default();
                    let flow = (transform.func)(&mut scratch, &mut reporter);
                    if !reporter.is_clean() {
                        for (key, message) in reporter.reported {
                            match key {
                                Some(k) => errors.add(&k, message),
                                None => errors.add(owner.unwrap_or(ROOT), message),
                            }
                        }
                        return;
                    }
                    *value = scratch;
                    if flow == Flow::Halt {
                        return;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self
            .steps
            .iter()
            .map(|s| match s {
                Step::Rule(_) => "rule",
                Step::Transform(_) => "transform",
            })
            .collect();
        write!(f, "Pipeline({})", kinds.join(" -> "))
    }
}
