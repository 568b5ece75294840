//! Bucket policy documents and their evaluation.
//!
//! Statements are evaluated in document order. A matching `Deny` ends the
//! evaluation; a matching `Allow` is remembered; with no match the outcome is
//! [`PolicyDecision::Neutral`] and ACLs decide.

use std::collections::HashMap;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::Deserialize;
use serde_json::Value;
use wildmatch::WildMatch;

use crate::error::{S3ServiceError, S3ServiceResult};

const RESOURCE_PREFIX: &str = "arn:aws:s3:::";
const SUPPORTED_VERSIONS: [&str; 2] = ["2012-10-17", "2008-10-17"];

/// Outcome of evaluating a policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// A statement allowed the request and none denied it.
    Allow,
    /// A statement denied the request.
    Deny,
    /// No statement applied.
    Neutral,
}

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Grant.
    Allow,
    /// Refuse, overriding any grant.
    Deny,
}

/// Who a statement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Everyone, anonymous callers included.
    Any,
    /// The listed account ids.
    Accounts(Vec<String>),
}

/// Condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    /// Exact string match.
    StringEquals,
    /// No exact string match.
    StringNotEquals,
    /// Case-insensitive match.
    StringEqualsIgnoreCase,
    /// No case-insensitive match.
    StringNotEqualsIgnoreCase,
    /// `*`/`?` pattern match.
    StringLike,
    /// No pattern match.
    StringNotLike,
    /// Source address inside a CIDR.
    IpAddress,
    /// Source address outside every CIDR.
    NotIpAddress,
    /// Boolean equality.
    Bool,
    /// `==`.
    NumericEquals,
    /// `!=`.
    NumericNotEquals,
    /// `<`.
    NumericLessThan,
    /// `<=`.
    NumericLessThanEquals,
    /// `>`.
    NumericGreaterThan,
    /// `>=`.
    NumericGreaterThanEquals,
}

impl ConditionOperator {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "StringEquals" => Self::StringEquals,
            "StringNotEquals" => Self::StringNotEquals,
            "StringEqualsIgnoreCase" => Self::StringEqualsIgnoreCase,
            "StringNotEqualsIgnoreCase" => Self::StringNotEqualsIgnoreCase,
            "StringLike" => Self::StringLike,
            "StringNotLike" => Self::StringNotLike,
            "IpAddress" => Self::IpAddress,
            "NotIpAddress" => Self::NotIpAddress,
            "Bool" => Self::Bool,
            "NumericEquals" => Self::NumericEquals,
            "NumericNotEquals" => Self::NumericNotEquals,
            "NumericLessThan" => Self::NumericLessThan,
            "NumericLessThanEquals" => Self::NumericLessThanEquals,
            "NumericGreaterThan" => Self::NumericGreaterThan,
            "NumericGreaterThanEquals" => Self::NumericGreaterThanEquals,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::NumericEquals
                | Self::NumericNotEquals
                | Self::NumericLessThan
                | Self::NumericLessThanEquals
                | Self::NumericGreaterThan
                | Self::NumericGreaterThanEquals
        )
    }
}

/// One `operator: { key: values }` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Operator.
    pub operator: ConditionOperator,
    /// Context key such as `aws:SourceIp`.
    pub key: String,
    /// Policy-side values; any may match.
    pub values: Vec<String>,
    ip_nets: Vec<IpNet>,
}

impl Condition {
    fn new(operator: ConditionOperator, key: String, values: Vec<String>) -> S3ServiceResult<Self> {
        let mut ip_nets = Vec::new();
        if matches!(operator, ConditionOperator::IpAddress | ConditionOperator::NotIpAddress) {
            for value in &values {
                let net = value
                    .parse::<IpNet>()
                    .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
                    .map_err(|_| malformed(format!("invalid CIDR in condition: {value}")))?;
                ip_nets.push(net);
            }
        }
        if operator.is_numeric() && values.iter().any(|v| v.parse::<f64>().is_err()) {
            return Err(malformed(format!("non-numeric value for {key}")));
        }
        Ok(Self {
            operator,
            key,
            values,
            ip_nets,
        })
    }

    /// Whether the request values satisfy this condition.
    #[must_use]
    pub fn matches(&self, context: &HashMap<String, Vec<String>>) -> bool {
        let actual = lookup(context, &self.key);
        let any = |f: &dyn Fn(&str, &str) -> bool| {
            actual
                .iter()
                .any(|a| self.values.iter().any(|v| f(a.as_str(), v.as_str())))
        };
        match self.operator {
            ConditionOperator::StringEquals => any(&|a, v| a == v),
            ConditionOperator::StringNotEquals => !any(&|a, v| a == v),
            ConditionOperator::StringEqualsIgnoreCase => any(&|a, v| a.eq_ignore_ascii_case(v)),
            ConditionOperator::StringNotEqualsIgnoreCase => {
                !any(&|a, v| a.eq_ignore_ascii_case(v))
            }
            ConditionOperator::StringLike => any(&|a, v| WildMatch::new(v).matches(a)),
            ConditionOperator::StringNotLike => !any(&|a, v| WildMatch::new(v).matches(a)),
            ConditionOperator::IpAddress => self.ip_matches(actual),
            ConditionOperator::NotIpAddress => !self.ip_matches(actual),
            ConditionOperator::Bool => any(&|a, v| a.eq_ignore_ascii_case(v)),
            ConditionOperator::NumericEquals => self.numeric(actual, |a, v| (a - v).abs() < f64::EPSILON),
            ConditionOperator::NumericNotEquals => {
                !self.numeric(actual, |a, v| (a - v).abs() < f64::EPSILON)
            }
            ConditionOperator::NumericLessThan => self.numeric(actual, |a, v| a < v),
            ConditionOperator::NumericLessThanEquals => self.numeric(actual, |a, v| a <= v),
            ConditionOperator::NumericGreaterThan => self.numeric(actual, |a, v| a > v),
            ConditionOperator::NumericGreaterThanEquals => self.numeric(actual, |a, v| a >= v),
        }
    }

    fn ip_matches(&self, actual: &[String]) -> bool {
        actual
            .iter()
            .filter_map(|a| a.parse::<IpAddr>().ok())
            .any(|ip| self.ip_nets.iter().any(|net| net.contains(&ip)))
    }

    fn numeric(&self, actual: &[String], cmp: impl Fn(f64, f64) -> bool) -> bool {
        actual.iter().filter_map(|a| a.parse::<f64>().ok()).any(|a| {
            self.values
                .iter()
                .filter_map(|v| v.parse::<f64>().ok())
                .any(|v| cmp(a, v))
        })
    }
}

/// Context values for `key`, matched case-insensitively.
fn lookup<'a>(context: &'a HashMap<String, Vec<String>>, key: &str) -> &'a [String] {
    context
        .get(key)
        .or_else(|| {
            context
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map_or(&[], Vec::as_slice)
}

/// A parsed policy statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement id.
    pub sid: Option<String>,
    /// Allow or deny.
    pub effect: Effect,
    /// Who it applies to.
    pub principal: Principal,
    /// Action patterns such as `s3:Get*`.
    pub actions: Vec<String>,
    /// Resource ARN patterns.
    pub resources: Vec<String>,
    /// Conditions that must all hold.
    pub conditions: Vec<Condition>,
}

/// Inputs to policy evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRequest<'a> {
    /// Caller account id; empty for anonymous callers.
    pub account: &'a str,
    /// Policy action, e.g. `s3:GetObject`.
    pub action: &'a str,
    /// Bucket name.
    pub bucket: &'a str,
    /// Object key for object operations.
    pub object: Option<&'a str>,
    /// Request context values.
    pub condition_values: &'a HashMap<String, Vec<String>>,
}

impl Statement {
    fn applies_to(&self, request: &PolicyRequest<'_>) -> bool {
        let principal_ok = match &self.principal {
            Principal::Any => true,
            Principal::Accounts(ids) => {
                !request.account.is_empty() && ids.iter().any(|id| id == request.account)
            }
        };
        if !principal_ok {
            return false;
        }
        let action_ok = self
            .actions
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(request.action));
        if !action_ok {
            return false;
        }
        let resource = match request.object {
            Some(key) => format!("{RESOURCE_PREFIX}{}/{key}", request.bucket),
            None => format!("{RESOURCE_PREFIX}{}", request.bucket),
        };
        let resource_ok = self
            .resources
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(&resource));
        resource_ok && self.conditions.iter().all(|c| c.matches(request.condition_values))
    }
}

/// A validated bucket policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPolicy {
    /// Language version.
    pub version: String,
    /// Policy id.
    pub id: Option<String>,
    /// Statements in document order.
    pub statements: Vec<Statement>,
}

// ---------------------------------------------------------------------------
// JSON shape
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPolicy {
    version: Option<String>,
    id: Option<String>,
    statement: OneOrMany<RawStatement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStatement {
    sid: Option<String>,
    effect: String,
    principal: Option<Value>,
    action: Option<OneOrMany<String>>,
    resource: Option<OneOrMany<String>>,
    condition: Option<HashMap<String, HashMap<String, Value>>>,
}

fn malformed(message: impl Into<String>) -> S3ServiceError {
    S3ServiceError::MalformedPolicy {
        message: message.into(),
    }
}

fn value_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(value_strings).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn parse_principal(value: Option<Value>) -> S3ServiceResult<Principal> {
    let value = value.ok_or_else(|| malformed("statement has no Principal"))?;
    let ids = match &value {
        Value::String(s) if s == "*" => return Ok(Principal::Any),
        Value::Object(map) => map
            .get("AWS")
            .map(value_strings)
            .ok_or_else(|| malformed("unsupported principal type"))?,
        _ => return Err(malformed("invalid Principal")),
    };
    if ids.iter().any(|id| id == "*") {
        return Ok(Principal::Any);
    }
    let accounts = ids
        .iter()
        .map(|id| {
            // arn:aws:iam::<account>:root or a bare account id.
            id.strip_prefix("arn:aws:iam::")
                .and_then(|rest| rest.split(':').next())
                .unwrap_or(id)
                .to_owned()
        })
        .collect();
    Ok(Principal::Accounts(accounts))
}

impl BucketPolicy {
    /// Parse and validate a policy attached to `bucket`.
    pub fn parse(json: &str, bucket: &str) -> S3ServiceResult<Self> {
        let raw: RawPolicy =
            serde_json::from_str(json).map_err(|e| malformed(format!("invalid policy JSON: {e}")))?;
        let version = raw.version.unwrap_or_else(|| SUPPORTED_VERSIONS[0].to_owned());
        if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
            return Err(malformed(format!("unsupported policy version: {version}")));
        }

        let raw_statements = raw.statement.into_vec();
        if raw_statements.is_empty() {
            return Err(malformed("policy has no statements"));
        }
        let mut statements = Vec::with_capacity(raw_statements.len());
        for raw in raw_statements {
            statements.push(Self::parse_statement(raw, bucket)?);
        }
        Ok(Self {
            version,
            id: raw.id,
            statements,
        })
    }

    fn parse_statement(raw: RawStatement, bucket: &str) -> S3ServiceResult<Statement> {
        let effect = match raw.effect.as_str() {
            "Allow" => Effect::Allow,
            "Deny" => Effect::Deny,
            other => return Err(malformed(format!("invalid effect: {other}"))),
        };
        let principal = parse_principal(raw.principal)?;

        let actions = raw.action.map(OneOrMany::into_vec).unwrap_or_default();
        if actions.is_empty() {
            return Err(malformed("statement has no Action"));
        }
        if let Some(bad) = actions.iter().find(|a| *a != "*" && !a.starts_with("s3:")) {
            return Err(malformed(format!("invalid action: {bad}")));
        }

        let resources = raw.resource.map(OneOrMany::into_vec).unwrap_or_default();
        if resources.is_empty() {
            return Err(malformed("statement has no Resource"));
        }
        for resource in &resources {
            let target = resource
                .strip_prefix(RESOURCE_PREFIX)
                .ok_or_else(|| malformed(format!("invalid resource: {resource}")))?;
            let resource_bucket = target.split('/').next().unwrap_or_default();
            if !WildMatch::new(resource_bucket).matches(bucket) {
                return Err(malformed(format!(
                    "resource {resource} does not belong to bucket {bucket}"
                )));
            }
        }

        let mut conditions = Vec::new();
        for (operator_name, entries) in raw.condition.unwrap_or_default() {
            let operator = ConditionOperator::parse(&operator_name)
                .ok_or_else(|| malformed(format!("unsupported condition: {operator_name}")))?;
            for (key, value) in entries {
                conditions.push(Condition::new(operator, key, value_strings(&value))?);
            }
        }

        Ok(Statement {
            sid: raw.sid,
            effect,
            principal,
            actions,
            resources,
            conditions,
        })
    }

    /// Evaluate the statements for one request.
    #[must_use]
    pub fn evaluate(&self, request: &PolicyRequest<'_>) -> PolicyDecision {
        let mut decision = PolicyDecision::Neutral;
        for statement in &self.statements {
            if !statement.applies_to(request) {
                continue;
            }
            match statement.effect {
                Effect::Deny => return PolicyDecision::Deny,
                Effect::Allow => decision = PolicyDecision::Allow,
            }
        }
        decision
    }
}
