//! Loader capability and per-type registry.
//!
//! Every loadable type names exactly one loader instance through
//! [`Load::LOADER`]. Containers and object schemas reach their element and
//! field types through that constant, so dispatch is resolved at compile time
//! per type and no runtime registry or reflection is involved.
//!
//! - Scalars: `String`, `bool`, `i32`, `i64`, `u32`, `u64`, `f32`, `f64`,
//!   [`Duration`](crate::duration::Duration), [`Document`].
//! - Containers: `Vec<T>`, string-keyed `BTreeMap`/`HashMap`/`IndexMap`,
//!   `Option<T>`, `Box<T>`, `Arc<T>`.
//! - Objects: anything implementing [`JsonObject`](crate::schema::JsonObject),
//!   registered with [`json_object_loader!`](crate::json_object_loader).
pub mod container;
pub mod scalar;

use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;

/// Converts a document value into `T`, in place.
///
/// Loaders hold no per-call state: the only writes go to `dst` and `errors`.
pub trait Loader<T>: Sync {
    fn load_into(
        &self,
        doc: &Document,
        gates: &dyn GateContext,
        dst: &mut T,
        errors: &mut ValidationErrors,
    );
}

/// A type with a registered loader.
pub trait Load: Default + Sized + 'static {
    const LOADER: &'static dyn Loader<Self>;

    /// Loads into a fresh default value.
    fn load(doc: &Document, gates: &dyn GateContext, errors: &mut ValidationErrors) -> Self {
        let mut out = Self::default();
        Self::LOADER.load_into(doc, gates, &mut out, errors);
        out
    }
}
