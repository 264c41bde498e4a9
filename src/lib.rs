//! Schema-driven document loader with hierarchical validation diagnostics.
//!
//! Already-parsed JSON [`Document`]s are loaded into strongly typed values.
//! Scalars and containers come with loaders out of the box; structs describe
//! their fields once through an [`ObjectSchema`] and become loadable with
//! [`json_object_loader!`]. Loading never stops at the first problem: every
//! error is collected into [`ValidationErrors`] with the exact path of the
//! offending field, and can be rendered as
//!
//! ```text
//! <prefix>: [field:<path> error:<message>; ...]
//! ```
//!
//! The [`rbac`] module is a complete consumer: a recursive authorization
//! policy tree validated during load and compiled into an evaluatable engine.
pub mod document;
pub mod duration;
pub mod errors;
pub mod gates;
pub mod load;
pub mod loader;
pub mod path_de;
pub mod rbac;
pub mod schema;

pub use once_cell;

pub use document::{Document, Kind};
pub use duration::Duration;
pub use errors::{FieldError, PathSegment, ScopedField, ValidationErrors, ValidationStatus};
pub use gates::{AllEnabled, GateContext, GateSet};
pub use load::{load, load_from_document, load_from_str, load_object_field, LoadError};
pub use loader::{Load, Loader};
pub use path_de::DocumentError;
pub use schema::{JsonObject, ObjectSchema, SchemaBuilder};
