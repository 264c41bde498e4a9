//! Compiled, evaluatable RBAC rules.
//!
//! Built from a validated config by [`super::compile`]; immutable afterwards,
//! so one [`Engine`] can be shared across threads and evaluated concurrently.
use std::fmt;
use std::net::IpAddr;

use regex::Regex;

// ————————————————————————————————————————————————————————————————————————————
// REQUEST
// ————————————————————————————————————————————————————————————————————————————

/// Everything a rule may look at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Lowercase name → value; repeated names are joined with `,` on lookup.
    pub headers: Vec<(String, String)>,
    pub path: String,
    pub requested_server_name: String,
    pub destination_ip: Option<IpAddr>,
    pub destination_port: Option<u32>,
    pub source_ip: Option<IpAddr>,
    pub direct_remote_ip: Option<IpAddr>,
    pub remote_ip: Option<IpAddr>,
    pub authenticated: bool,
    /// Peer identities (URI SANs first, then DNS SANs).
    pub principal_names: Vec<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_destination(mut self, ip: IpAddr, port: u32) -> Self {
        self.destination_ip = Some(ip);
        self.destination_port = Some(port);
        self
    }

    /// Sets source, direct remote and remote address at once.
    pub fn with_peer(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self.direct_remote_ip = Some(ip);
        self.remote_ip = Some(ip);
        self
    }

    pub fn with_principal(mut self, name: impl Into<String>) -> Self {
        self.authenticated = true;
        self.principal_names.push(name.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let values: Vec<&str> = self
            .headers
            .iter()
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.join(","))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MATCHERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum StringPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct StringMatcher {
    pattern: StringPattern,
    ignore_case: bool,
}

impl StringMatcher {
    /// `ignore_case` does not apply to regexes. Regexes must already be anchored.
    pub fn new(pattern: StringPattern, ignore_case: bool) -> Self {
        let pattern = match pattern {
            StringPattern::Exact(s) if ignore_case => StringPattern::Exact(s.to_lowercase()),
            StringPattern::Prefix(s) if ignore_case => StringPattern::Prefix(s.to_lowercase()),
            StringPattern::Suffix(s) if ignore_case => StringPattern::Suffix(s.to_lowercase()),
            StringPattern::Contains(s) if ignore_case => StringPattern::Contains(s.to_lowercase()),
            other => other,
        };
        StringMatcher { pattern, ignore_case }
    }

    pub fn pattern(&self) -> &StringPattern {
        &self.pattern
    }

    pub fn matches(&self, value: &str) -> bool {
        if let StringPattern::Regex(re) = &self.pattern {
            return re.is_match(value);
        }
        let lowered;
        let value = if self.ignore_case {
            lowered = value.to_lowercase();
            lowered.as_str()
        } else {
            value
        };
        match &self.pattern {
            StringPattern::Exact(s) => value == s,
            StringPattern::Prefix(s) => value.starts_with(s.as_str()),
            StringPattern::Suffix(s) => value.ends_with(s.as_str()),
            StringPattern::Contains(s) => value.contains(s.as_str()),
            StringPattern::Regex(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum HeaderPattern {
    Value(StringMatcher),
    /// `start <= value < end`, value parsed as a signed integer.
    Range { start: i64, end: i64 },
    Present(bool),
}

#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
    pattern: HeaderPattern,
    invert: bool,
}

impl HeaderMatcher {
    pub fn new(name: &str, pattern: HeaderPattern, invert: bool) -> Self {
        HeaderMatcher { name: name.to_ascii_lowercase(), pattern, invert }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An absent header never matches, inverted or not, unless the pattern is
    /// a presence check.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let value = ctx.header(&self.name);
        let matched = match (&self.pattern, value) {
            (HeaderPattern::Present(want), value) => value.is_some() == *want,
            (_, None) => return false,
            (HeaderPattern::Range { start, end }, Some(v)) => v
                .trim()
                .parse::<i64>()
                .is_ok_and(|n| *start <= n && n < *end),
            (HeaderPattern::Value(m), Some(v)) => m.matches(&v),
        };
        matched != self.invert
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrMatcher {
    base: IpAddr,
    prefix_len: u32,
}

impl CidrMatcher {
    /// `prefix_len` is clamped to the address width; `base` is masked.
    pub fn new(address: IpAddr, prefix_len: u32) -> Self {
        let prefix_len = match address {
            IpAddr::V4(_) => prefix_len.min(32),
            IpAddr::V6(_) => prefix_len.min(128),
        };
        CidrMatcher { base: mask(address, prefix_len), prefix_len }
    }

    pub fn matches(&self, ip: Option<IpAddr>) -> bool {
        let Some(ip) = ip else { return false };
        if ip.is_ipv4() != self.base.is_ipv4() {
            return false;
        }
        mask(ip, self.prefix_len) == self.base
    }
}

impl fmt::Display for CidrMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

fn mask(ip: IpAddr, prefix_len: u32) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let m = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            IpAddr::V4((bits & m).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let m = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            IpAddr::V6((bits & m).into())
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RULES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum PermissionRule {
    Any,
    Header(HeaderMatcher),
    Path(StringMatcher),
    DestinationIp(CidrMatcher),
    DestinationPort(u32),
    Metadata { invert: bool },
    RequestedServerName(StringMatcher),
    And(Vec<PermissionRule>),
    Or(Vec<PermissionRule>),
    Not(Box<PermissionRule>),
}

impl PermissionRule {
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        match self {
            PermissionRule::Any => true,
            PermissionRule::Header(h) => h.matches(ctx),
            PermissionRule::Path(m) => m.matches(&ctx.path),
            PermissionRule::DestinationIp(c) => c.matches(ctx.destination_ip),
            PermissionRule::DestinationPort(p) => ctx.destination_port == Some(*p),
            PermissionRule::Metadata { invert } => *invert,
            PermissionRule::RequestedServerName(m) => m.matches(&ctx.requested_server_name),
            PermissionRule::And(rules) => rules.iter().all(|r| r.matches(ctx)),
            PermissionRule::Or(rules) => rules.iter().any(|r| r.matches(ctx)),
            PermissionRule::Not(rule) => !rule.matches(ctx),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PrincipalRule {
    Any,
    /// Authenticated peer whose name matches.
    Authenticated(StringMatcher),
    SourceIp(CidrMatcher),
    DirectRemoteIp(CidrMatcher),
    RemoteIp(CidrMatcher),
    Header(HeaderMatcher),
    Path(StringMatcher),
    Metadata { invert: bool },
    And(Vec<PrincipalRule>),
    Or(Vec<PrincipalRule>),
    Not(Box<PrincipalRule>),
}

impl PrincipalRule {
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        match self {
            PrincipalRule::Any => true,
            PrincipalRule::Authenticated(m) => {
                if !ctx.authenticated {
                    return false;
                }
                if ctx.principal_names.is_empty() {
                    return m.matches("");
                }
                ctx.principal_names.iter().any(|n| m.matches(n))
            }
            PrincipalRule::SourceIp(c) => c.matches(ctx.source_ip),
            PrincipalRule::DirectRemoteIp(c) => c.matches(ctx.direct_remote_ip),
            PrincipalRule::RemoteIp(c) => c.matches(ctx.remote_ip),
            PrincipalRule::Header(h) => h.matches(ctx),
            PrincipalRule::Path(m) => m.matches(&ctx.path),
            PrincipalRule::Metadata { invert } => *invert,
            PrincipalRule::And(ids) => ids.iter().all(|r| r.matches(ctx)),
            PrincipalRule::Or(ids) => ids.iter().any(|r| r.matches(ctx)),
            PrincipalRule::Not(id) => !id.matches(ctx),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub name: String,
    pub permissions: Vec<PermissionRule>,
    pub principals: Vec<PrincipalRule>,
}

impl CompiledPolicy {
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        self.permissions.iter().any(|p| p.matches(ctx)) && self.principals.iter().any(|p| p.matches(ctx))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENGINE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    Deny,
}

impl Action {
    pub fn from_code(code: i32) -> Option<Action> {
        match code {
            0 => Some(Action::Allow),
            1 => Some(Action::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditCondition {
    #[default]
    None,
    OnDeny,
    OnAllow,
    OnDenyAndAllow,
}

impl AuditCondition {
    pub fn from_code(code: u32) -> Option<AuditCondition> {
        match code {
            0 => Some(AuditCondition::None),
            1 => Some(AuditCondition::OnDeny),
            2 => Some(AuditCondition::OnAllow),
            3 => Some(AuditCondition::OnDenyAndAllow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Name of the policy that produced the decision, if one matched.
    pub matched_policy: Option<String>,
}

impl Decision {
    fn allow(matched_policy: Option<String>) -> Self {
        Decision { allowed: true, matched_policy }
    }

    fn deny(matched_policy: Option<String>) -> Self {
        Decision { allowed: false, matched_policy }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub name: String,
    pub action: Action,
    pub audit_condition: AuditCondition,
    pub policies: Vec<CompiledPolicy>,
}

impl Engine {
    pub fn evaluate(&self, ctx: &RequestContext) -> Decision {
        let matched = self.policies.iter().find(|p| p.matches(ctx)).map(|p| p.name.clone());
        let decision = match (self.action, matched) {
            (Action::Allow, Some(name)) => Decision::allow(Some(name)),
            (Action::Allow, None) => Decision::deny(None),
            (Action::Deny, Some(name)) => Decision::deny(Some(name)),
            (Action::Deny, None) => Decision::allow(None),
        };
        tracing::trace!(
            engine = %self.name,
            allowed = decision.allowed,
            matched_policy = ?decision.matched_policy,
            "rbac decision"
        );
        decision
    }

    pub fn should_audit(&self, decision: &Decision) -> bool {
        match self.audit_condition {
            AuditCondition::None => false,
            AuditCondition::OnDeny => !decision.allowed,
            AuditCondition::OnAllow => decision.allowed,
            AuditCondition::OnDenyAndAllow => true,
        }
    }
}

/// Runs `engines` in order; the first deny wins. No engines allows.
pub fn authorize(engines: &[Engine], ctx: &RequestContext) -> Decision {
    let mut last = Decision::allow(None);
    for engine in engines {
        let decision = engine.evaluate(ctx);
        if !decision.allowed {
            return decision;
        }
        last = decision;
    }
    last
}

// ------------------------------- Tests ------------------------------------ //
