//! Recursive permission / principal trees.
//!
//! Each node populates exactly one alternative. `and_*`/`or_*` hold sibling
//! nodes and `not_*` owns a single child, so the structure is always a tree.
use once_cell::sync::Lazy;

use super::{count_populated, expect_exactly_one};
use super::matchers::{Authenticated, CidrRange, HeaderMatch, Metadata, PathMatch, StringMatch};
use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;
use crate::json_object_loader;
use crate::schema::{JsonObject, ObjectSchema};

/// What a request must look like.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Permission {
    /// Present means "match everything", whatever the value.
    pub any: Option<bool>,
    pub header: Option<HeaderMatch>,
    pub url_path: Option<PathMatch>,
    pub destination_ip: Option<CidrRange>,
    pub destination_port: Option<u32>,
    pub metadata: Option<Metadata>,
    pub requested_server_name: Option<StringMatch>,
    pub and_rules: Vec<Permission>,
    pub or_rules: Vec<Permission>,
    pub not_rule: Option<Box<Permission>>,
}

/// Who is making the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    pub any: Option<bool>,
    pub authenticated: Option<Authenticated>,
    pub source_ip: Option<CidrRange>,
    pub direct_remote_ip: Option<CidrRange>,
    pub remote_ip: Option<CidrRange>,
    pub header: Option<HeaderMatch>,
    pub url_path: Option<PathMatch>,
    pub metadata: Option<Metadata>,
    pub and_ids: Vec<Principal>,
    pub or_ids: Vec<Principal>,
    pub not_id: Option<Box<Principal>>,
}

impl Permission {
    pub fn populated_alternatives(&self) -> usize {
        let slots = [
            self.any.is_some(),
            self.header.is_some(),
            self.url_path.is_some(),
            self.destination_ip.is_some(),
            self.destination_port.is_some(),
            self.metadata.is_some(),
            self.requested_server_name.is_some(),
            !self.and_rules.is_empty(),
            !self.or_rules.is_empty(),
            self.not_rule.is_some(),
        ];
        count_populated(&slots)
    }
}

impl Principal {
    pub fn populated_alternatives(&self) -> usize {
        let slots = [
            self.any.is_some(),
            self.authenticated.is_some(),
            self.source_ip.is_some(),
            self.direct_remote_ip.is_some(),
            self.remote_ip.is_some(),
            self.header.is_some(),
            self.url_path.is_some(),
            self.metadata.is_some(),
            !self.and_ids.is_empty(),
            !self.or_ids.is_empty(),
            self.not_id.is_some(),
        ];
        count_populated(&slots)
    }
}

impl JsonObject for Permission {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Permission>> = Lazy::new(|| {
            ObjectSchema::<Permission>::builder()
                .optional("any", |p| &mut p.any)
                .optional("header", |p| &mut p.header)
                .optional("url_path", |p| &mut p.url_path)
                .optional("destination_ip", |p| &mut p.destination_ip)
                .optional("destination_port", |p| &mut p.destination_port)
                .optional("metadata", |p| &mut p.metadata)
                .optional("requested_server_name", |p| &mut p.requested_server_name)
                .optional("and_rules", |p| &mut p.and_rules)
                .optional("or_rules", |p| &mut p.or_rules)
                .optional("not_rule", |p| &mut p.not_rule)
                .build()
        });
        &SCHEMA
    }

    fn post_load(&mut self, _: &Document, _: &dyn GateContext, errors: &mut ValidationErrors) {
        expect_exactly_one("permission", self.populated_alternatives(), errors);
    }
}

impl JsonObject for Principal {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Principal>> = Lazy::new(|| {
            ObjectSchema::<Principal>::builder()
                .optional("any", |p| &mut p.any)
                .optional("authenticated", |p| &mut p.authenticated)
                .optional("source_ip", |p| &mut p.source_ip)
                .optional("direct_remote_ip", |p| &mut p.direct_remote_ip)
                .optional("remote_ip", |p| &mut p.remote_ip)
                .optional("header", |p| &mut p.header)
                .optional("url_path", |p| &mut p.url_path)
                .optional("metadata", |p| &mut p.metadata)
                .optional("and_ids", |p| &mut p.and_ids)
                .optional("or_ids", |p| &mut p.or_ids)
                .optional("not_id", |p| &mut p.not_id)
                .build()
        });
        &SCHEMA
    }

    fn post_load(&mut self, _: &Document, _: &dyn GateContext, errors: &mut ValidationErrors) {
        expect_exactly_one("principal", self.populated_alternatives(), errors);
    }
}

json_object_loader!(Permission, Principal);

// ------------------------------- Tests ------------------------------------ //
