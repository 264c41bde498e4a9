use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Load, Loader};
use crate::document::Document;
use crate::errors::{PathSegment, ValidationErrors};
use crate::gates::GateContext;

// ------------------------------ Sequences --------------------------------- //

/// JSON array → `Vec<T>`. Every index gets an element, even when its own load
/// reported errors.
pub struct SequenceLoader<T>(PhantomData<fn() -> T>);

impl<T> SequenceLoader<T> {
    pub const NEW: Self = SequenceLoader(PhantomData);
}

impl<T: Load> Loader<Vec<T>> for SequenceLoader<T> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut Vec<T>, errors: &mut ValidationErrors) {
        let Some(items) = doc.as_array() else {
            errors.add_error("is not an array");
            return;
        };
        dst.reserve(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut scope = errors.scoped_field(PathSegment::Index(i));
            dst.push(T::default());
            if let Some(slot) = dst.last_mut() {
                T::LOADER.load_into(item, gates, slot, &mut scope);
            }
        }
    }
}

impl<T: Load> Load for Vec<T> {
    const LOADER: &'static dyn Loader<Self> = &SequenceLoader::<T>::NEW;
}

// ----------------------------- Keyed maps --------------------------------- //

/// String-keyed map targets.
pub trait KeyedMap<V>: Default {
    /// Slot for `key`, inserting a default value if needed.
    fn entry_slot(&mut self, key: &str) -> &mut V;
}

impl<V: Default> KeyedMap<V> for BTreeMap<String, V> {
    fn entry_slot(&mut self, key: &str) -> &mut V {
        self.entry(key.to_string()).or_default()
    }
}

impl<V: Default> KeyedMap<V> for HashMap<String, V> {
    fn entry_slot(&mut self, key: &str) -> &mut V {
        self.entry(key.to_string()).or_default()
    }
}

impl<V: Default> KeyedMap<V> for IndexMap<String, V> {
    fn entry_slot(&mut self, key: &str) -> &mut V {
        self.entry(key.to_string()).or_default()
    }
}

/// JSON object → keyed map, visited in the document's own key order.
pub struct MapLoader<M, V>(PhantomData<fn() -> (M, V)>);

impl<M, V> MapLoader<M, V> {
    pub const NEW: Self = MapLoader(PhantomData);
}

impl<M: KeyedMap<V>, V: Load> Loader<M> for MapLoader<M, V> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut M, errors: &mut ValidationErrors) {
        let Some(object) = doc.as_object() else {
            errors.add_error("is not an object");
            return;
        };
        for (key, value) in object {
            let mut scope = errors.scoped_field(PathSegment::Key(key));
            V::LOADER.load_into(value, gates, dst.entry_slot(key), &mut scope);
        }
    }
}

impl<V: Load> Load for BTreeMap<String, V> {
    const LOADER: &'static dyn Loader<Self> = &MapLoader::<Self, V>::NEW;
}

impl<V: Load> Load for HashMap<String, V> {
    const LOADER: &'static dyn Loader<Self> = &MapLoader::<Self, V>::NEW;
}

impl<V: Load> Load for IndexMap<String, V> {
    const LOADER: &'static dyn Loader<Self> = &MapLoader::<Self, V>::NEW;
}

// ------------------------------- Wrappers --------------------------------- //
//
// Each wrapper loads a fresh inner value. If that load recorded any error the
// wrapper is reset (absent for `Option`, default for `Box`/`Arc`); the errors
// themselves stay recorded.

pub struct OptionalLoader<T>(PhantomData<fn() -> T>);

impl<T> OptionalLoader<T> {
    pub const NEW: Self = OptionalLoader(PhantomData);
}

impl<T: Load> Loader<Option<T>> for OptionalLoader<T> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut Option<T>, errors: &mut ValidationErrors) {
        let before = errors.len();
        let value = T::load(doc, gates, errors);
        *dst = if errors.len() > before { None } else { Some(value) };
    }
}

impl<T: Load> Load for Option<T> {
    const LOADER: &'static dyn Loader<Self> = &OptionalLoader::<T>::NEW;
}

pub struct BoxLoader<T>(PhantomData<fn() -> T>);

impl<T> BoxLoader<T> {
    pub const NEW: Self = BoxLoader(PhantomData);
}

impl<T: Load> Loader<Box<T>> for BoxLoader<T> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut Box<T>, errors: &mut ValidationErrors) {
        let before = errors.len();
        let value = T::load(doc, gates, errors);
        *dst = if errors.len() > before { Box::default() } else { Box::new(value) };
    }
}

impl<T: Load> Load for Box<T> {
    const LOADER: &'static dyn Loader<Self> = &BoxLoader::<T>::NEW;
}

pub struct SharedLoader<T>(PhantomData<fn() -> T>);

impl<T> SharedLoader<T> {
    pub const NEW: Self = SharedLoader(PhantomData);
}

impl<T: Load> Loader<Arc<T>> for SharedLoader<T> {
    fn load_into(&self, doc: &Document, gates: &dyn GateContext, dst: &mut Arc<T>, errors: &mut ValidationErrors) {
        let before = errors.len();
        let value = T::load(doc, gates, errors);
        *dst = if errors.len() > before { Arc::default() } else { Arc::new(value) };
    }
}

impl<T: Load> Load for Arc<T> {
    const LOADER: &'static dyn Loader<Self> = &SharedLoader::<T>::NEW;
}

// ------------------------------- Tests ------------------------------------ //
