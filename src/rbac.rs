//! RBAC filter configuration.
//!
//! ```text
//! RbacConfig { rbacPolicy: [RbacPolicy] }
//! RbacPolicy { rules?, filter_name }            absent rules → no enforcement
//! Rules      { action, policies?, audit_condition? }
//! Policy     { permissions: [Permission], principals: [Principal] }
//! ```
//!
//! Loading validates the structure (including the exactly-one-of trees in
//! [`tree`]); [`RbacConfig::compile`] turns a valid config into engines.
pub mod compile;
pub mod engine;
pub mod matchers;
pub mod tree;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;
use crate::json_object_loader;
use crate::schema::{JsonObject, ObjectSchema};

pub use compile::CompileError;
pub use engine::{Action, Decision, Engine, RequestContext};
pub use tree::{Permission, Principal};

/// Gate key for `Rules.audit_condition`.
pub const AUDIT_LOGGING_GATE: &str = "rbac_audit_logging";

/// Prefix used when rendering RBAC load errors.
pub const ERROR_PREFIX: &str = "errors validating filter config";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RbacConfig {
    pub policies: Vec<RbacPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RbacPolicy {
    pub rules: Option<Rules>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules {
    pub action: i32,
    pub policies: IndexMap<String, Policy>,
    pub audit_condition: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Policy {
    pub permissions: Vec<Permission>,
    pub principals: Vec<Principal>,
}

pub(crate) fn count_populated(slots: &[bool]) -> usize {
    slots.iter().filter(|x| **x).count()
}

pub(crate) fn expect_exactly_one(kind: &str, found: usize, errors: &mut ValidationErrors) {
    if found != 1 {
        errors.add_error(format!("expected exactly one {kind} type, found {found}"));
    }
}

impl JsonObject for RbacConfig {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<RbacConfig>> = Lazy::new(|| {
            ObjectSchema::<RbacConfig>::builder()
                .required("rbacPolicy", |c| &mut c.policies)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for RbacPolicy {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<RbacPolicy>> = Lazy::new(|| {
            ObjectSchema::<RbacPolicy>::builder()
                .optional("rules", |p| &mut p.rules)
                .required("filter_name", |p| &mut p.name)
                .build()
        });
        &SCHEMA
    }
}

impl JsonObject for Rules {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Rules>> = Lazy::new(|| {
            ObjectSchema::<Rules>::builder()
                .required("action", |r| &mut r.action)
                .optional("policies", |r| &mut r.policies)
                .optional_gated("audit_condition", AUDIT_LOGGING_GATE, |r| &mut r.audit_condition)
                .build()
        });
        &SCHEMA
    }

    fn post_load(&mut self, _: &Document, _: &dyn GateContext, errors: &mut ValidationErrors) {
        if Action::from_code(self.action).is_none() {
            errors.scoped_field(".action").add_error("unknown action");
        }
        if let Some(condition) = self.audit_condition {
            if condition > 3 {
                errors.scoped_field(".audit_condition").add_error("must be in the range [0, 3]");
            }
        }
    }
}

impl JsonObject for Policy {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Policy>> = Lazy::new(|| {
            ObjectSchema::<Policy>::builder()
                .required("permissions", |p| &mut p.permissions)
                .required("principals", |p| &mut p.principals)
                .build()
        });
        &SCHEMA
    }
}

json_object_loader!(RbacConfig, RbacPolicy, Rules, Policy);

impl RbacConfig {
    /// Compiles every enforcing policy, in order.
    pub fn compile(&self) -> Result<Vec<Engine>, CompileError> {
        let mut engines = Vec::new();
        for policy in &self.policies {
            if let Some(engine) = compile::compile_rbac_policy(policy)? {
                engines.push(engine);
            }
        }
        Ok(engines)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{AllEnabled, GateSet};
    use crate::load::load_from_document;
    use serde_json::json;

    fn config(v: serde_json::Value, gates: &dyn GateContext) -> Result<RbacConfig, String> {
        load_from_document::<RbacConfig>(&Document::from(v), gates, ERROR_PREFIX).map_err(|e| e.to_string())
    }

    #[test]
    fn full_config_loads() {
        let cfg = config(json!({"rbacPolicy": [
            {"filter_name": "no-rules"},
            {"filter_name": "allow-admins", "rules": {
                "action": 0,
                "policies": {
                    "admins": {
                        "permissions": [{"any": true}],
                        "principals": [{"authenticated": {"principal_name": {"suffix": ".admin"}}}]
                    }
                }
            }}
        ]}), &AllEnabled).unwrap();
        assert_eq!(cfg.policies.len(), 2);
        assert!(cfg.policies[0].rules.is_none());
        assert_eq!(cfg.policies[1].name, "allow-admins");
        let rules = cfg.policies[1].rules.as_ref().unwrap();
        assert_eq!(rules.action, 0);
        assert_eq!(rules.policies["admins"].permissions[0].any, Some(true));
    }

    #[test]
    fn nested_errors_render_full_paths() {
        let err = config(json!({"rbacPolicy": [{"filter_name": "f", "rules": {
            "action": 2,
            "policies": {"p1": {"permissions": [{}]}}
        }}]}), &AllEnabled).unwrap_err();
        assert_eq!(err, concat!(
            "errors validating filter config: [",
            "field:.rbacPolicy[0].rules.policies[\"p1\"].permissions[0] error:expected exactly one permission type, found 0; ",
            "field:.rbacPolicy[0].rules.policies[\"p1\"].principals error:field not present; ",
            "field:.rbacPolicy[0].rules.action error:unknown action]",
        ));
    }

    #[test]
    fn action_must_be_allow_or_deny() {
        let err = config(json!({"rbacPolicy": [{"filter_name": "f", "rules": {"action": -1}}]}), &AllEnabled).unwrap_err();
        assert_eq!(err, "errors validating filter config: [field:.rbacPolicy[0].rules.action error:unknown action]");

        let err = config(json!({"rbacPolicy": [{"filter_name": "f", "rules": {"action": "allow"}}]}), &AllEnabled).unwrap_err();
        assert_eq!(err, "errors validating filter config: [field:.rbacPolicy[0].rules.action error:failed to parse number]");

        let cfg = config(json!({"rbacPolicy": [{"filter_name": "f", "rules": {"action": "1"}}]}), &AllEnabled).unwrap();
        assert_eq!(cfg.policies[0].rules.as_ref().unwrap().action, 1);
    }

    #[test]
    fn filter_name_is_required() {
        let err = config(json!({"rbacPolicy": [{}, {"filter_name": "ok"}]}), &AllEnabled).unwrap_err();
        assert_eq!(err, "errors validating filter config: [field:.rbacPolicy[0].filter_name error:field not present]");

        let err = config(json!({"rbacPolicy": [{"rules": {"action": 5}}]}), &AllEnabled).unwrap_err();
        assert_eq!(err, concat!(
            "errors validating filter config: [",
            "field:.rbacPolicy[0].rules.action error:unknown action; ",
            "field:.rbacPolicy[0].filter_name error:field not present]",
        ));
    }

    #[test]
    fn audit_condition_is_gated() {
        let doc = json!({"rbacPolicy": [{"filter_name": "f", "rules": {"action": 1, "audit_condition": 7}}]});
        let gates = GateSet::new().with(AUDIT_LOGGING_GATE, false);
        let cfg = config(doc.clone(), &gates).unwrap();
        assert_eq!(cfg.policies[0].rules.as_ref().unwrap().audit_condition, None);

        let err = config(doc, &AllEnabled).unwrap_err();
        assert_eq!(err, "errors validating filter config: [field:.rbacPolicy[0].rules.audit_condition error:must be in the range [0, 3]]");
    }

    #[test]
    fn missing_policy_list() {
        let err = config(json!({}), &AllEnabled).unwrap_err();
        assert_eq!(err, "errors validating filter config: [field:.rbacPolicy error:field not present]");
    }
}
