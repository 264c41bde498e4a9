//! Gate context: feature keys that can switch individual schema fields off.
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::document::Document;
use crate::load::{load_from_document, LoadError};

pub trait GateContext {
    /// Keys the context does not know about are enabled.
    fn is_enabled(&self, key: &str) -> bool;
}

/// Every key enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEnabled;

impl GateContext for AllEnabled {
    fn is_enabled(&self, _key: &str) -> bool {
        true
    }
}

/// Explicit per-key overrides on top of "enabled".
#[derive(Debug, Clone, Default)]
pub struct GateSet {
    overrides: HashMap<String, bool>,
}

impl GateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, enabled: bool) -> Self {
        self.set(key, enabled);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, enabled: bool) {
        self.overrides.insert(key.into(), enabled);
    }

    /// Reads `{ "<key>": <bool>, ... }`.
    pub fn from_document(doc: &Document) -> Result<Self, LoadError> {
        let map: IndexMap<String, bool> =
            load_from_document(doc, &AllEnabled, "errors validating gates")?;
        Ok(map.into_iter().collect())
    }
}

impl GateContext for GateSet {
    fn is_enabled(&self, key: &str) -> bool {
        self.overrides.get(key).copied().unwrap_or(true)
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for GateSet {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        let mut out = GateSet::new();
        for (k, enabled) in iter {
            out.set(k, enabled);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_enabled() {
        let gates = GateSet::new().with("off", false).with("on", true);
        assert!(!gates.is_enabled("off"));
        assert!(gates.is_enabled("on"));
        assert!(gates.is_enabled("never-mentioned"));
        assert!(AllEnabled.is_enabled("anything"));
    }

    #[test]
    fn loads_from_document() {
        let doc = Document::from(json!({"a": false, "b": true}));
        let gates = GateSet::from_document(&doc).unwrap();
        assert!(!gates.is_enabled("a"));
        assert!(gates.is_enabled("b"));
    }

    #[test]
    fn rejects_non_boolean_gate() {
        let doc = Document::from(json!({"a": "no"}));
        let err = GateSet::from_document(&doc).unwrap_err();
        assert_eq!(err.to_string(),
                   r#"errors validating gates: [field:["a"] error:is not a boolean]"#);
    }
}
