//! Validation diagnostics.
//!
//! [`ValidationErrors`] collects every problem found while loading a document
//! instead of stopping at the first one. Each error is tagged with the path of
//! the field being loaded when it was recorded; the path is a stack of
//! segments pushed and popped as the loader descends:
//!
//! - object field → `.name`
//! - sequence element → `[3]`
//! - map entry → `["key"]`
//!
//! Rendering is explicit and on demand via [`ValidationErrors::message`] or
//! [`ValidationErrors::status`]:
//!
//! ```text
//! errors validating JSON: [field:.a error:is not a string; field:.b[0] error:field not present]
//! ```
use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered accumulator of (path, message) pairs, owned by one load call.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    fields: Vec<String>,
    errors: Vec<FieldError>,
}

/// The rendered form of a non-empty [`ValidationErrors`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationStatus {
    message: String,
}

impl ValidationStatus {
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A single path segment.
#[derive(Debug, Clone, Copy)]
pub enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
    Key(&'a str),
}

impl fmt::Display for PathSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(key) => write!(f, "[\"{key}\"]"),
        }
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `segment` for the lifetime of the returned guard.
    ///
    /// The guard derefs to the accumulator, so nested loads take `&mut guard`.
    /// Dropping it pops the segment on every exit path.
    pub fn scoped_field(&mut self, segment: impl fmt::Display) -> ScopedField<'_> {
        self.push_field(segment);
        ScopedField { errors: self }
    }

    pub fn push_field(&mut self, segment: impl fmt::Display) {
        self.fields.push(segment.to_string());
    }

    pub fn pop_field(&mut self) {
        self.fields.pop();
    }

    /// Records `message` at the current path.
    pub fn add_error(&mut self, message: impl Into<String>) {
        let field = self.current_path();
        self.errors.push(FieldError { field, message: message.into() });
    }

    /// Whether an error was recorded at exactly the current path.
    pub fn field_has_errors(&self) -> bool {
        let path = self.current_path();
        self.errors.iter().any(|e| e.field == path)
    }

    pub fn current_path(&self) -> String {
        self.fields.concat()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn ok(&self) -> bool {
        self.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `"<prefix>: [field:<path> error:<msg>; ...]"` in recording order.
    pub fn message(&self, prefix: &str) -> String {
        let body = self
            .errors
            .iter()
            .map(|e| format!("field:{} error:{}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        format!("{prefix}: [{body}]")
    }

    pub fn status(&self, prefix: &str) -> Result<(), ValidationStatus> {
        if self.is_empty() {
            return Ok(());
        }
        Err(ValidationStatus { message: self.message(prefix) })
    }
}

/// Guard returned by [`ValidationErrors::scoped_field`].
pub struct ScopedField<'a> {
    errors: &'a mut ValidationErrors,
}

impl Deref for ScopedField<'_> {
    type Target = ValidationErrors;

    fn deref(&self) -> &ValidationErrors {
        self.errors
    }
}

impl DerefMut for ScopedField<'_> {
    fn deref_mut(&mut self) -> &mut ValidationErrors {
        self.errors
    }
}

impl Drop for ScopedField<'_> {
    fn drop(&mut self) {
        self.errors.pop_field();
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_errors_have_empty_path() {
        let mut errors = ValidationErrors::new();
        errors.add_error("is not an object");
        assert_eq!(errors.message("errors validating JSON"),
                   "errors validating JSON: [field: error:is not an object]");
    }

    #[test]
    fn segments_concatenate_left_to_right() {
        let mut errors = ValidationErrors::new();
        {
            let mut policies = errors.scoped_field(PathSegment::Field("policies"));
            let mut entry = policies.scoped_field(PathSegment::Key("allow-all"));
            let mut index = entry.scoped_field(PathSegment::Index(2));
            index.add_error("boom");
        }
        let first = errors.iter().next().unwrap();
        assert_eq!(first.field, r#".policies["allow-all"][2]"#);
        assert_eq!(errors.current_path(), "");
    }

    #[test]
    fn guard_pops_on_early_return() {
        fn visit(errors: &mut ValidationErrors, fail: bool) {
            let mut scope = errors.scoped_field(".x");
            if fail {
                scope.add_error("early");
                return;
            }
            scope.add_error("late");
        }
        let mut errors = ValidationErrors::new();
        visit(&mut errors, true);
        visit(&mut errors, false);
        errors.add_error("root");
        let paths: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(paths, [".x", ".x", ""]);
    }

    #[test]
    fn status_keeps_order_and_duplicates() {
        let mut errors = ValidationErrors::new();
        assert!(errors.status("p").is_ok());
        errors.scoped_field(".b").add_error("second");
        errors.scoped_field(".a").add_error("first");
        errors.scoped_field(".b").add_error("second");
        let status = errors.status("p").unwrap_err();
        assert_eq!(status.to_string(),
                   "p: [field:.b error:second; field:.a error:first; field:.b error:second]");
        assert_eq!(errors.len(), 3);
        assert!(!errors.ok());
    }

    #[test]
    fn field_has_errors_matches_exact_path() {
        let mut errors = ValidationErrors::new();
        let mut outer = errors.scoped_field(".outer");
        outer.scoped_field(".inner").add_error("bad");
        assert!(!outer.field_has_errors());
        outer.add_error("also bad");
        assert!(outer.field_has_errors());
    }
}
