//! Top-level load API.
use thiserror::Error;

use crate::document::{Document, Object};
use crate::errors::{PathSegment, ValidationErrors, ValidationStatus};
use crate::gates::GateContext;
use crate::loader::Load;
use crate::path_de::{self, DocumentError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Invalid(#[from] ValidationStatus),
}

/// Loads `T` from `doc`, returning the value together with every diagnostic.
///
/// The value is returned even when errors were recorded; it then holds
/// whatever could be loaded.
pub fn load<T: Load>(doc: &Document, gates: &dyn GateContext) -> (T, ValidationErrors) {
    let mut errors = ValidationErrors::new();
    let value = T::load(doc, gates, &mut errors);
    tracing::trace!(target_type = std::any::type_name::<T>(), errors = errors.len(), "loaded document");
    (value, errors)
}

/// Loads `T`, failing with the rendered diagnostics under `error_prefix`.
pub fn load_from_document<T: Load>(doc: &Document, gates: &dyn GateContext, error_prefix: &str) -> Result<T, LoadError> {
    let (value, errors) = load::<T>(doc, gates);
    errors.status(error_prefix)?;
    Ok(value)
}

/// Parses JSON text, then loads `T` from it.
pub fn load_from_str<T: Load>(text: &str, gates: &dyn GateContext, error_prefix: &str) -> Result<T, LoadError> {
    let doc = path_de::document_from_str(text)?;
    load_from_document(&doc, gates, error_prefix)
}

/// Loads one field of `object` under a `.<name>` scope.
///
/// Absent or null fields yield `None` (and `field not present` when
/// `required`); so does a field whose load recorded errors.
pub fn load_object_field<T: Load>(
    object: &Object,
    gates: &dyn GateContext,
    name: &str,
    errors: &mut ValidationErrors,
    required: bool,
) -> Option<T> {
    let mut scope = errors.scoped_field(PathSegment::Field(name));
    let value = match object.get(name) {
        Some(value) if !value.is_null() => value,
        _ => {
            if required {
                scope.add_error("field not present");
            }
            return None;
        }
    };
    let before = scope.len();
    let out = T::load(value, gates, &mut scope);
    if scope.len() > before {
        return None;
    }
    Some(out)
}
