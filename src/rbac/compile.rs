//! Validated config tree → [`Engine`].
//!
//! Pure functions over already-loaded values. Loading guarantees the
//! exactly-one-of shape, so the errors here cover only what loading cannot
//! check: regex syntax, address syntax and range bounds.
use std::net::IpAddr;

use regex::Regex;
use thiserror::Error;

use super::engine::{
    Action, AuditCondition, CidrMatcher, CompiledPolicy, Engine, HeaderMatcher, HeaderPattern, PermissionRule,
    PrincipalRule, StringMatcher, StringPattern,
};
use super::matchers::{CidrRange, HeaderMatch, StringMatch};
use super::tree::{Permission, Principal};
use super::{Policy, RbacPolicy, Rules};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid CIDR address {0:?}")]
    InvalidCidr(String),
    #[error("invalid range header matcher [{start}, {end})")]
    InvalidRange { start: i64, end: i64 },
    #[error("{0} has no alternative populated")]
    EmptyNode(&'static str),
    #[error("invalid action {0}")]
    InvalidAction(i32),
    #[error("invalid audit condition {0}")]
    InvalidAuditCondition(u32),
}

/// `None` when the policy carries no rules (no enforcement).
pub fn compile_rbac_policy(policy: &RbacPolicy) -> Result<Option<Engine>, CompileError> {
    let Some(rules) = &policy.rules else {
        return Ok(None);
    };
    let name = &policy.name;
    match compile_rules(name, rules) {
        Ok(engine) => {
            tracing::debug!(engine = %name, policies = engine.policies.len(), "compiled rbac engine");
            Ok(Some(engine))
        }
        Err(err) => {
            tracing::debug!(engine = %name, error = %err, "rbac compile failed");
            Err(err)
        }
    }
}

pub fn compile_rules(name: &str, rules: &Rules) -> Result<Engine, CompileError> {
    let action = Action::from_code(rules.action).ok_or(CompileError::InvalidAction(rules.action))?;
    let audit_condition = match rules.audit_condition {
        None => AuditCondition::None,
        Some(code) => AuditCondition::from_code(code).ok_or(CompileError::InvalidAuditCondition(code))?,
    };
    let policies = rules
        .policies
        .iter()
        .map(|(name, policy)| compile_policy(name, policy))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Engine { name: name.to_string(), action, audit_condition, policies })
}

pub fn compile_policy(name: &str, policy: &Policy) -> Result<CompiledPolicy, CompileError> {
    Ok(CompiledPolicy {
        name: name.to_string(),
        permissions: policy.permissions.iter().map(compile_permission).collect::<Result<_, _>>()?,
        principals: policy.principals.iter().map(compile_principal).collect::<Result<_, _>>()?,
    })
}

pub fn compile_permission(p: &Permission) -> Result<PermissionRule, CompileError> {
    if p.any.is_some() {
        return Ok(PermissionRule::Any);
    }
    if let Some(h) = &p.header {
        return Ok(PermissionRule::Header(compile_header(h)?));
    }
    if let Some(path) = &p.url_path {
        return Ok(PermissionRule::Path(compile_string(&path.path)?));
    }
    if let Some(cidr) = &p.destination_ip {
        return Ok(PermissionRule::DestinationIp(compile_cidr(cidr)?));
    }
    if let Some(port) = p.destination_port {
        return Ok(PermissionRule::DestinationPort(port));
    }
    if let Some(m) = &p.metadata {
        return Ok(PermissionRule::Metadata { invert: m.invert });
    }
    if let Some(m) = &p.requested_server_name {
        return Ok(PermissionRule::RequestedServerName(compile_string(m)?));
    }
    if !p.and_rules.is_empty() {
        return Ok(PermissionRule::And(p.and_rules.iter().map(compile_permission).collect::<Result<_, _>>()?));
    }
    if !p.or_rules.is_empty() {
        return Ok(PermissionRule::Or(p.or_rules.iter().map(compile_permission).collect::<Result<_, _>>()?));
    }
    if let Some(rule) = &p.not_rule {
        return Ok(PermissionRule::Not(Box::new(compile_permission(rule)?)));
    }
    Err(CompileError::EmptyNode("permission"))
}

pub fn compile_principal(p: &Principal) -> Result<PrincipalRule, CompileError> {
    if p.any.is_some() {
        return Ok(PrincipalRule::Any);
    }
    if let Some(a) = &p.authenticated {
        // without a principal name every peer matches, authenticated or not
        return Ok(match &a.principal_name {
            Some(name) => PrincipalRule::Authenticated(compile_string(name)?),
            None => PrincipalRule::Any,
        });
    }
    if let Some(cidr) = &p.source_ip {
        return Ok(PrincipalRule::SourceIp(compile_cidr(cidr)?));
    }
    if let Some(cidr) = &p.direct_remote_ip {
        return Ok(PrincipalRule::DirectRemoteIp(compile_cidr(cidr)?));
    }
    if let Some(cidr) = &p.remote_ip {
        return Ok(PrincipalRule::RemoteIp(compile_cidr(cidr)?));
    }
    if let Some(h) = &p.header {
        return Ok(PrincipalRule::Header(compile_header(h)?));
    }
    if let Some(path) = &p.url_path {
        return Ok(PrincipalRule::Path(compile_string(&path.path)?));
    }
    if let Some(m) = &p.metadata {
        return Ok(PrincipalRule::Metadata { invert: m.invert });
    }
    if !p.and_ids.is_empty() {
        return Ok(PrincipalRule::And(p.and_ids.iter().map(compile_principal).collect::<Result<_, _>>()?));
    }
    if !p.or_ids.is_empty() {
        return Ok(PrincipalRule::Or(p.or_ids.iter().map(compile_principal).collect::<Result<_, _>>()?));
    }
    if let Some(id) = &p.not_id {
        return Ok(PrincipalRule::Not(Box::new(compile_principal(id)?)));
    }
    Err(CompileError::EmptyNode("principal"))
}

fn anchored_regex(pattern: &str) -> Result<Regex, CompileError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|source| CompileError::InvalidRegex { pattern: pattern.to_string(), source })
}

pub fn compile_string(m: &StringMatch) -> Result<StringMatcher, CompileError> {
    let pattern = if let Some(s) = &m.exact {
        StringPattern::Exact(s.clone())
    } else if let Some(s) = &m.prefix {
        StringPattern::Prefix(s.clone())
    } else if let Some(s) = &m.suffix {
        StringPattern::Suffix(s.clone())
    } else if let Some(s) = &m.contains {
        StringPattern::Contains(s.clone())
    } else if let Some(re) = &m.safe_regex {
        StringPattern::Regex(anchored_regex(&re.regex)?)
    } else {
        return Err(CompileError::EmptyNode("string matcher"));
    };
    Ok(StringMatcher::new(pattern, m.ignore_case))
}

pub fn compile_header(h: &HeaderMatch) -> Result<HeaderMatcher, CompileError> {
    let value = |pattern| HeaderPattern::Value(StringMatcher::new(pattern, false));
    let pattern = if let Some(s) = &h.exact_match {
        value(StringPattern::Exact(s.clone()))
    } else if let Some(re) = &h.safe_regex_match {
        value(StringPattern::Regex(anchored_regex(&re.regex)?))
    } else if let Some(r) = &h.range_match {
        if r.start >= r.end {
            return Err(CompileError::InvalidRange { start: r.start, end: r.end });
        }
        HeaderPattern::Range { start: r.start, end: r.end }
    } else if let Some(present) = h.present_match {
        HeaderPattern::Present(present)
    } else if let Some(s) = &h.prefix_match {
        value(StringPattern::Prefix(s.clone()))
    } else if let Some(s) = &h.suffix_match {
        value(StringPattern::Suffix(s.clone()))
    } else if let Some(s) = &h.contains_match {
        value(StringPattern::Contains(s.clone()))
    } else {
        return Err(CompileError::EmptyNode("header matcher"));
    };
    Ok(HeaderMatcher::new(&h.name, pattern, h.invert_match))
}

pub fn compile_cidr(c: &CidrRange) -> Result<CidrMatcher, CompileError> {
    let address: IpAddr = c
        .address_prefix
        .trim()
        .parse()
        .map_err(|_| CompileError::InvalidCidr(c.address_prefix.clone()))?;
    Ok(CidrMatcher::new(address, c.prefix_len.unwrap_or(0)))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::gates::AllEnabled;
    use crate::load::load_from_document;
    use crate::rbac::engine::RequestContext;
    use crate::rbac::matchers::{RangeMatch, SafeRegex};
    use crate::rbac::RbacConfig;
    use serde_json::json;

    fn permission(v: serde_json::Value) -> Permission {
        load_from_document::<Permission>(&Document::from(v), &AllEnabled, "p").unwrap()
    }

    #[test]
    fn regex_is_fully_anchored() {
        let m = compile_string(&StringMatch {
            safe_regex: Some(SafeRegex { regex: "/api/[a-z]+".into() }),
            ..Default::default()
        })
        .unwrap();
        assert!(m.matches("/api/users"));
        assert!(!m.matches("/api/users/1"));
        assert!(!m.matches("x/api/users"));
    }

    #[test]
    fn bad_inputs_are_compile_errors() {
        let err = compile_string(&StringMatch {
            safe_regex: Some(SafeRegex { regex: "(".into() }),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, CompileError::InvalidRegex { .. }));

        let err = compile_cidr(&CidrRange { address_prefix: "10.0.0".into(), prefix_len: Some(8) }).unwrap_err();
        assert_eq!(err.to_string(), "invalid CIDR address \"10.0.0\"");

        let err = compile_header(&HeaderMatch {
            name: "x".into(),
            range_match: Some(RangeMatch { start: 5, end: 5 }),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid range header matcher [5, 5)");

        let err = compile_permission(&Permission::default()).unwrap_err();
        assert_eq!(err.to_string(), "permission has no alternative populated");
    }

    #[test]
    fn loaded_tree_compiles_and_evaluates() {
        let p = permission(json!({"or_rules": [
            {"url_path": {"path": {"prefix": "/ADMIN", "ignore_case": true}}},
            {"and_rules": [
                {"destination_port": 8443},
                {"not_rule": {"header": {"name": "x-debug", "present_match": true}}}
            ]}
        ]}));
        let rule = compile_permission(&p).unwrap();
        assert!(rule.matches(&RequestContext::new().with_path("/admin/users")));
        let ip: std::net::IpAddr = "10.0.0.1".parse().unwrap();
        assert!(rule.matches(&RequestContext::new().with_destination(ip, 8443)));
        assert!(!rule.matches(&RequestContext::new().with_destination(ip, 8443).with_header("X-Debug", "1")));
    }

    #[test]
    fn authenticated_without_name_matches_everyone() {
        let p = load_from_document::<Principal>(&Document::from(json!({"authenticated": {}})), &AllEnabled, "p").unwrap();
        let rule = compile_principal(&p).unwrap();
        assert!(matches!(rule, PrincipalRule::Any));
        assert!(rule.matches(&RequestContext::new()));
        assert!(rule.matches(&RequestContext::new().with_principal("spiffe://any")));

        let p = load_from_document::<Principal>(
            &Document::from(json!({"authenticated": {"principal_name": {"exact": "spiffe://a"}}})),
            &AllEnabled,
            "p",
        )
        .unwrap();
        let rule = compile_principal(&p).unwrap();
        assert!(!rule.matches(&RequestContext::new()));
        assert!(rule.matches(&RequestContext::new().with_principal("spiffe://a")));
    }

    #[test]
    fn config_without_rules_has_no_engine() {
        let cfg = load_from_document::<RbacConfig>(
            &Document::from(json!({"rbacPolicy": [
                {"filter_name": "off"},
                {"filter_name": "deny-all", "rules": {"action": 1, "audit_condition": 1, "policies": {
                    "everything": {"permissions": [{"any": true}], "principals": [{"any": true}]}
                }}}
            ]})),
            &AllEnabled,
            "p",
        )
        .unwrap();
        let engines = cfg.compile().unwrap();
        assert_eq!(engines.len(), 1);
        assert_eq!(engines[0].name, "deny-all");
        assert_eq!(engines[0].action, Action::Deny);
        assert_eq!(engines[0].audit_condition, AuditCondition::OnDeny);
        let decision = engines[0].evaluate(&RequestContext::new());
        assert!(!decision.allowed);
        assert_eq!(decision.matched_policy.as_deref(), Some("everything"));
    }
}
