//! Object schemas and the object materializer.
//!
//! A type becomes loadable from a JSON object by implementing [`JsonObject`]:
//! it describes its fields once with [`ObjectSchema::builder`] and may add a
//! [`JsonObject::post_load`] hook for cross-field checks. The schema is built
//! lazily on first use and then shared read-only by every load.
//!
//! ```
//! use json_loader::once_cell::sync::Lazy;
//! use json_loader::{json_object_loader, JsonObject, ObjectSchema};
//!
//! #[derive(Debug, Default)]
//! struct Backend {
//!     host: String,
//!     port: Option<u32>,
//! }
//!
//! impl JsonObject for Backend {
//!     fn schema() -> &'static ObjectSchema<Self> {
//!         static SCHEMA: Lazy<ObjectSchema<Backend>> = Lazy::new(|| {
//!             ObjectSchema::<Backend>::builder()
//!                 .required("host", |b| &mut b.host)
//!                 .optional("port", |b| &mut b.port)
//!                 .build()
//!         });
//!         &SCHEMA
//!     }
//! }
//!
//! json_object_loader!(Backend);
//! ```
use std::any::type_name;
use std::marker::PhantomData;

use crate::document::{Document, Object};
use crate::errors::{PathSegment, ValidationErrors};
use crate::gates::GateContext;
use crate::loader::{Load, Loader};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A struct loaded field-by-field from a JSON object.
pub trait JsonObject: Default + 'static {
    fn schema() -> &'static ObjectSchema<Self>;

    /// Runs after the fields of an object-shaped input were loaded, even if
    /// some of them reported errors. `doc` is the original object.
    fn post_load(&mut self, _doc: &Document, _gates: &dyn GateContext, _errors: &mut ValidationErrors) {}
}

/// Declaration-ordered field list for `T`. Immutable once built.
pub struct ObjectSchema<T> {
    fields: Vec<FieldDescriptor<T>>,
}

pub struct FieldDescriptor<T> {
    name: &'static str,
    required: bool,
    gate: Option<&'static str>,
    slot: Box<dyn FieldSlot<T>>,
}

/// Type-erased "load this field's value into its place in `T`".
trait FieldSlot<T>: Send + Sync {
    fn load(&self, doc: &Document, gates: &dyn GateContext, dst: &mut T, errors: &mut ValidationErrors);
}

struct Field<T, F: 'static> {
    access: fn(&mut T) -> &mut F,
    loader: &'static dyn Loader<F>,
}

impl<T, F: 'static> FieldSlot<T> for Field<T, F> {
    fn load(&self, doc: &Document, gates: &dyn GateContext, dst: &mut T, errors: &mut ValidationErrors) {
        self.loader.load_into(doc, gates, (self.access)(dst), errors);
    }
}

pub struct SchemaBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl<T: 'static> ObjectSchema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor<T>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn is_required(&self) -> bool {
        self.required
    }
    pub fn gate(&self) -> Option<&'static str> {
        self.gate
    }
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn required<F: Load>(self, name: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.field(name, true, None, access)
    }

    pub fn optional<F: Load>(self, name: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.field(name, false, None, access)
    }

    /// Required unless `gate` is disabled, in which case the field is skipped.
    pub fn required_gated<F: Load>(self, name: &'static str, gate: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.field(name, true, Some(gate), access)
    }

    pub fn optional_gated<F: Load>(self, name: &'static str, gate: &'static str, access: fn(&mut T) -> &mut F) -> Self {
        self.field(name, false, Some(gate), access)
    }

    /// Re-declaring a name replaces the earlier descriptor in its original slot.
    pub fn field<F: Load>(
        mut self,
        name: &'static str,
        required: bool,
        gate: Option<&'static str>,
        access: fn(&mut T) -> &mut F,
    ) -> Self {
        let descriptor = FieldDescriptor {
            name,
            required,
            gate,
            slot: Box::new(Field { access, loader: F::LOADER }),
        };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = descriptor,
            None => self.fields.push(descriptor),
        }
        self
    }

    pub fn build(self) -> ObjectSchema<T> {
        tracing::debug!(target_type = type_name::<T>(), fields = self.fields.len(), "built object schema");
        ObjectSchema { fields: self.fields }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MATERIALIZER
// ————————————————————————————————————————————————————————————————————————————

impl<T: 'static> ObjectSchema<T> {
    /// Loads every declared field, in declaration order, from `object`.
    pub fn load_fields(&self, object: &Object, gates: &dyn GateContext, dst: &mut T, errors: &mut ValidationErrors) {
        for field in &self.fields {
            if let Some(gate) = field.gate {
                if !gates.is_enabled(gate) {
                    continue;
                }
            }
            let mut scope = errors.scoped_field(PathSegment::Field(field.name));
            match object.get(field.name) {
                Some(value) if !value.is_null() => field.slot.load(value, gates, dst, &mut scope),
                _ => {
                    if field.required {
                        scope.add_error("field not present");
                    }
                }
            }
        }
    }
}

/// Loader for any [`JsonObject`].
pub struct ObjectLoader<T>(PhantomData<fn() -> T>);

impl<T> ObjectLoader<T> {
    pub const NEW: Self = ObjectLoader(PhantomData);
}

impl<T: JsonObject> Loader<T> for ObjectLoader<T> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut T, errors: &mut ValidationErrors) {
        let Some(object) = doc.as_object() else {
            errors.add_error("is not an object");
            return;
        };
        T::schema().load_fields(object, gates, dst, errors);
        dst.post_load(doc, gates, errors);
    }
}

/// Registers [`ObjectLoader`] as the loader of one or more [`JsonObject`] types.
#[macro_export]
macro_rules! json_object_loader {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Load for $ty {
                const LOADER: &'static dyn $crate::Loader<Self> =
                    &$crate::schema::ObjectLoader::<$ty>::NEW;
            }
        )+
    };
}

// ------------------------------- Tests ------------------------------------ //
