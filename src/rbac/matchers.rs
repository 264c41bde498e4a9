//! Leaf matcher configs shared by permissions and principals.
use once_cell::sync::Lazy;

use super::{count_populated, expect_exactly_one};
use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;
use crate::json_object_loader;
use crate::schema::{JsonObject, ObjectSchema};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafeRegex {
    pub regex: String,
}

/// Exactly one of `exact`, `prefix`, `suffix`, `contains`, `safe_regex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringMatch {
    pub exact: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub contains: Option<String>,
    pub safe_regex: Option<SafeRegex>,
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeMatch {
    pub start: i64,
    pub end: i64,
}

/// Header `name` plus exactly one way of matching its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMatch {
    pub name: String,
    pub exact_match: Option<String>,
    pub safe_regex_match: Option<SafeRegex>,
    pub range_match: Option<RangeMatch>,
    pub present_match: Option<bool>,
    pub prefix_match: Option<String>,
    pub suffix_match: Option<String>,
    pub contains_match: Option<String>,
    pub invert_match: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMatch {
    pub path: StringMatch,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CidrRange {
    pub address_prefix: String,
    pub prefix_len: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub invert: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Authenticated {
    pub principal_name: Option<StringMatch>,
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMAS
// ————————————————————————————————————————————————————————————————————————————

impl JsonObject for SafeRegex {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<SafeRegex>> = Lazy::new(|| {
            ObjectSchema::<SafeRegex>::builder()
                .required("regex", |r| &mut r.regex)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for StringMatch {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<StringMatch>> = Lazy::new(|| {
            ObjectSchema::<StringMatch>::builder()
                .optional("exact", |m| &mut m.exact)
                .optional("prefix", |m| &mut m.prefix)
                .optional("suffix", |m| &mut m.suffix)
                .optional("contains", |m| &mut m.contains)
                .optional("safe_regex", |m| &mut m.safe_regex)
                .optional("ignore_case", |m| &mut m.ignore_case)
                .build()
        });
        &SCHEMA
    }

    fn post_load(&mut self, _: &Document, _: &dyn GateContext, errors: &mut ValidationErrors) {
        let found = [
            self.exact.is_some(),
            self.prefix.is_some(),
            self.suffix.is_some(),
            self.contains.is_some(),
            self.safe_regex.is_some(),
        ];
        expect_exactly_one("string matcher", count_populated(&found), errors);
    }
}

impl JsonObject for RangeMatch {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<RangeMatch>> = Lazy::new(|| {
            ObjectSchema::<RangeMatch>::builder()
                .required("start", |r| &mut r.start)
                .required("end", |r| &mut r.end)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for HeaderMatch {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<HeaderMatch>> = Lazy::new(|| {
            ObjectSchema::<HeaderMatch>::builder()
                .required("name", |h| &mut h.name)
                .optional("exact_match", |h| &mut h.exact_match)
                .optional("safe_regex_match", |h| &mut h.safe_regex_match)
                .optional("range_match", |h| &mut h.range_match)
                .optional("present_match", |h| &mut h.present_match)
                .optional("prefix_match", |h| &mut h.prefix_match)
                .optional("suffix_match", |h| &mut h.suffix_match)
                .optional("contains_match", |h| &mut h.contains_match)
                .optional("invert_match", |h| &mut h.invert_match)
                .build()
        });
        &SCHEMA
    }

    fn post_load(&mut self, _: &Document, _: &dyn GateContext, errors: &mut ValidationErrors) {
        let found = [
            self.exact_match.is_some(),
            self.safe_regex_match.is_some(),
            self.range_match.is_some(),
            self.present_match.is_some(),
            self.prefix_match.is_some(),
            self.suffix_match.is_some(),
            self.contains_match.is_some(),
        ];
        expect_exactly_one("header matcher", count_populated(&found), errors);
    }
}

impl JsonObject for PathMatch {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<PathMatch>> = Lazy::new(|| {
            ObjectSchema::<PathMatch>::builder()
                .required("path", |p| &mut p.path)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for CidrRange {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<CidrRange>> = Lazy::new(|| {
            ObjectSchema::<CidrRange>::builder()
                .required("address_prefix", |c| &mut c.address_prefix)
                .optional("prefix_len", |c| &mut c.prefix_len)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for Metadata {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Metadata>> = Lazy::new(|| {
            ObjectSchema::<Metadata>::builder()
                .optional("invert", |m| &mut m.invert)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for Authenticated {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Authenticated>> = Lazy::new(|| {
            ObjectSchema::<Authenticated>::builder()
                .optional("principal_name", |a| &mut a.principal_name)
                .build()
        });
        &SCHEMA
    }
}

json_object_loader!(
    SafeRegex,
    StringMatch,
    RangeMatch,
    HeaderMatch,
    PathMatch,
    CidrRange,
    Metadata,
    Authenticated,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::AllEnabled;
    use crate::load::load;
    use serde_json::json;

    fn messages<T: crate::Load>(v: serde_json::Value) -> (T, String) {
        let (out, errors) = load::<T>(&Document::from(v), &AllEnabled);
        (out, errors.message("errors"))
    }

    #[test]
    fn string_match_needs_exactly_one() {
        let (m, rendered) = messages::<StringMatch>(json!({"prefix": "/api", "ignore_case": true}));
        assert_eq!(rendered, "errors: []");
        assert_eq!(m.prefix.as_deref(), Some("/api"));
        assert!(m.ignore_case);

        let (_, rendered) = messages::<StringMatch>(json!({"ignore_case": true}));
        assert_eq!(rendered, "errors: [field: error:expected exactly one string matcher type, found 0]");
        let (_, rendered) = messages::<StringMatch>(json!({"exact": "a", "safe_regex": {"regex": "b"}}));
        assert_eq!(rendered, "errors: [field: error:expected exactly one string matcher type, found 2]");
    }

    #[test]
    fn header_match_reports_nested_paths() {
        let (_, rendered) = messages::<HeaderMatch>(json!({
            "range_match": {"start": "x"},
            "invert_match": "yes"
        }));
        assert_eq!(rendered, concat!(
            "errors: [field:.name error:field not present; ",
            "field:.range_match.start error:failed to parse number; ",
            "field:.range_match.end error:field not present; ",
            "field:.invert_match error:is not a boolean; ",
            "field: error:expected exactly one header matcher type, found 0]",
        ));
    }

    #[test]
    fn header_present_match() {
        let (h, rendered) = messages::<HeaderMatch>(json!({"name": "x-user", "present_match": true}));
        assert_eq!(rendered, "errors: []");
        assert_eq!(h.present_match, Some(true));
    }

    #[test]
    fn cidr_prefix_len_accepts_string_numbers() {
        let (c, rendered) = messages::<CidrRange>(json!({"address_prefix": "10.0.0.0", "prefix_len": "8"}));
        assert_eq!(rendered, "errors: []");
        assert_eq!(c.prefix_len, Some(8));
    }
}
