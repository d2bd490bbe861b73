//! `valcast` — runtime data-validation and coercion engine.
//!
//! Given a schema node and an untyped input value (maps, sequences,
//! scalars), validation produces either a normalized, type-correct output
//! or a structured multi-path error report. Inputs come from decoded,
//! in-memory value trees (requests, configuration, persisted records);
//! parsing wire formats is out of scope.
//!
//! ```
//! use serde_json::json;
//! use valcast::{Field, StructBuilder, Tag};
//!
//! let person = StructBuilder::new()
//!     .field(Field::new("name", Tag::String).required())
//!     .field(
//!         Field::new("age", Tag::Integer)
//!             .required()
//!             .rule("must be 18 or older", |v, _| {
//!                 v.as_i64().is_some_and(|n| n >= 18)
//!             }),
//!     )
//!     .freeze()
//!     .unwrap();
//!
//! let result = person.validate(&json!({"name": "John", "age": "30"}));
//! assert!(result.is_ok());
//! assert_eq!(result.value, json!({"name": "John", "age": 30}));
//! ```

pub mod coalesce;
pub mod error;
pub mod field;
pub mod locals;
pub mod pipeline;
pub mod schema;

mod merge;
mod plan;
mod subtype;
mod validate;

// Re-export the most commonly used types at crate root
pub use coalesce::{coalesce, register, CoalesceOpts, Converter, Tag, TypeRef};
pub use error::{CoalesceError, Errors, SchemaError, Validation, ROOT};
pub use field::{Field, FieldDefault, FieldOptions};
pub use locals::Locals;
pub use pipeline::{CheckCtx, Flow, Pipeline, Reporter};
pub use schema::builder::{
    DictBuilder, ListBuilder, ScalarBuilder, SelectBuilder, StructBuilder,
};
pub use schema::SchemaNode;
pub use validate::ValidateOptions;
