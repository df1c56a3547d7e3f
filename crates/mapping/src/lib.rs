//! Declarative mapping from UI-shaped form data to provider input payloads.
//!
//! A [`MappingSchema`] is an ordered list of rules. Each rule reads a raw
//! value (constant, source path(s) or file reference), optionally gated by a
//! [`Condition`], runs it through a [`Transform`] pipeline and writes the
//! result at a target path of the output object.

pub mod condition;
pub mod engine;
pub mod error;
pub mod functions;
pub mod path;
pub mod schema;
pub mod transforms;
mod value;

pub use condition::{eval_condition, Condition};
pub use engine::{build_api_input, MappingEngine};
pub use error::{CustomFnError, MappingError, Result};
pub use functions::{CustomFn, FunctionRegistry};
pub use path::{get_by_path, parse_path, set_by_path};
pub use schema::{FileRef, MappingRule, MappingSchema, Source};
pub use transforms::{apply_transforms, Transform, TransformContext, TransformKind};
