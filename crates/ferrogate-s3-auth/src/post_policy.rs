//! Browser form uploads (`POST` with `multipart/form-data`).
//!
//! The form carries a base64 JSON `Policy` plus a signature over it. V2 forms
//! sign with `Signature` (HMAC-SHA1), V4 forms with `X-Amz-Signature`. Once the
//! signature checks out, every policy condition is matched against the form
//! fields. Field names are compared in canonical header form, so `$key`
//! refers to the `Key` field.

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::authenticator::Authenticator;
use crate::credentials::Credential;
use crate::error::AuthError;
use crate::sigv2::verify_signature;
use crate::sigv4::{
    CredentialScope, ISO8601_FORMAT, SCOPE_DATE_FORMAT, SIGN_V4_ALGORITHM, compute_signature,
    derive_signing_key,
};

static EQ_FIELDS_V2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?i)(Acl|Bucket|Cache-Control|Content-Type|Content-Disposition|Content-Encoding|Expires\
         |Key|Success_action_redirect|Redirect|Success_action_status|X-Amz-Meta-.+)$",
    )
    .expect("valid V2 eq field regex")
});
static STARTS_WITH_FIELDS_V2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?i)(Acl|Cache-Control|Content-Type|Content-Disposition|Content-Encoding|Expires|Key\
         |Success_action_redirect|Redirect|X-Amz-Meta-.+)$",
    )
    .expect("valid V2 starts-with field regex")
});
static IGNORED_FIELDS_V2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^(?i)(Awsaccesskeyid|Signature|File|Policy|Bucket|X-Ignore-.+)$")
        .expect("valid V2 ignored field regex")
});

/// Whether each well-known V4 condition key accepts `starts-with`.
const STARTS_WITH_CONDS_V4: &[(&str, bool)] = &[
    ("$acl", true),
    ("$bucket", false),
    ("$cache-control", true),
    ("$content-type", true),
    ("$content-disposition", true),
    ("$content-encoding", true),
    ("$expires", true),
    ("$key", true),
    ("$success_action_redirect", true),
    ("$redirect", true),
    ("$success_action_status", false),
    ("$x-amz-algorithm", false),
    ("$x-amz-credential", false),
    ("$x-amz-date", false),
];

/// Canonical header form of a field name: `x-amz-meta-foo` becomes
/// `X-Amz-Meta-Foo`, `AWSAccessKeyId` becomes `Awsaccesskeyid`.
#[must_use]
pub fn canonical_form_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Re-key form fields by [`canonical_form_key`]. Later duplicates win.
#[must_use]
pub fn canonicalize_form<I, K, V>(fields: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    fields
        .into_iter()
        .map(|(k, v)| (canonical_form_key(k.as_ref()), v.into()))
        .collect()
}

/// Which rule set authenticates a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostPolicyType {
    /// No `Policy` field.
    Anonymous,
    /// `Policy` plus `Signature`.
    SignedV2,
    /// `Policy` plus `X-Amz-Algorithm: AWS4-HMAC-SHA256`.
    SignedV4,
    /// A `Policy` without a recognised signature scheme.
    Unknown,
}

impl PostPolicyType {
    /// Classify a canonicalized form.
    #[must_use]
    pub fn detect(form: &HashMap<String, String>) -> Self {
        if !form.contains_key("Policy") {
            return Self::Anonymous;
        }
        if form.contains_key("Signature") {
            return Self::SignedV2;
        }
        if form.get("X-Amz-Algorithm").map(String::as_str) == Some(SIGN_V4_ALGORITHM) {
            return Self::SignedV4;
        }
        Self::Unknown
    }
}

/// A condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    /// Exact match.
    Eq,
    /// Prefix match.
    StartsWith,
}

impl ConditionOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::StartsWith => "starts-with",
        }
    }

    fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::StartsWith => actual.starts_with(expected),
        }
    }
}

/// One `eq` or `starts-with` condition. `key` is lowercase with its `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyCondition {
    /// Operator.
    pub op: ConditionOp,
    /// Lowercased field reference, e.g. `$key`.
    pub key: String,
    /// Expected value or prefix.
    pub value: String,
}

impl PolicyCondition {
    fn form_name(&self) -> String {
        canonical_form_key(self.key.trim_start_matches('$'))
    }

    fn failed(&self) -> AuthError {
        AuthError::PolicyConditionFailed(format!(
            "[{}, {}, {}]",
            self.op.as_str(),
            self.key,
            self.value
        ))
    }
}

/// A decoded POST policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPolicy {
    /// When the policy stops being accepted.
    pub expiration: DateTime<Utc>,
    /// Field conditions in document order.
    pub conditions: Vec<PolicyCondition>,
    /// Inclusive `content-length-range` bounds on the file part.
    pub content_length_range: Option<(u64, u64)>,
}

impl PostPolicy {
    /// Decode the base64 `Policy` field and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedPost`] when the field is not base64 or
    /// the document does not parse.
    pub fn decode(encoded: &str) -> Result<Self, AuthError> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|_| AuthError::MalformedPost("policy is not valid base64".to_owned()))?;
        let json = std::str::from_utf8(&raw)
            .map_err(|_| AuthError::MalformedPost("policy is not UTF-8".to_owned()))?;
        Self::parse(json)
    }

    /// Parse a policy JSON document.
    ///
    /// Conditions are either `{"field": "value"}` maps (exact matches) or
    /// three-element arrays: `["eq" | "starts-with", "$field", "value"]` or
    /// `["content-length-range", min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedPost`] for any structural problem.
    pub fn parse(json: &str) -> Result<Self, AuthError> {
        let doc: Value = serde_json::from_str(json)
            .map_err(|e| AuthError::MalformedPost(format!("invalid policy JSON: {e}")))?;
        let expiration = doc
            .get("expiration")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::MalformedPost("policy has no expiration".to_owned()))?;
        let expiration = DateTime::parse_from_rfc3339(expiration)
            .map_err(|_| AuthError::MalformedPost(format!("invalid expiration: {expiration}")))?
            .with_timezone(&Utc);

        let mut policy = Self {
            expiration,
            conditions: Vec::new(),
            content_length_range: None,
        };
        let conditions = match doc.get("conditions") {
            None | Some(Value::Null) => return Ok(policy),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(AuthError::MalformedPost(
                    "policy conditions must be an array".to_owned(),
                ));
            }
        };

        for condition in conditions {
            match condition {
                Value::Object(map) => {
                    for (k, v) in map {
                        let value = v.as_str().ok_or_else(|| {
                            AuthError::MalformedPost(format!("non-string value for condition {k}"))
                        })?;
                        policy.conditions.push(PolicyCondition {
                            op: ConditionOp::Eq,
                            key: format!("${}", k.to_ascii_lowercase()),
                            value: value.to_owned(),
                        });
                    }
                }
                Value::Array(items) if items.len() == 3 => policy.push_array_condition(items)?,
                other => {
                    return Err(AuthError::MalformedPost(format!(
                        "malformed policy condition: {other}"
                    )));
                }
            }
        }
        Ok(policy)
    }

    fn push_array_condition(&mut self, items: &[Value]) -> Result<(), AuthError> {
        let op = items[0].as_str().map(str::to_ascii_lowercase);
        match op.as_deref() {
            Some(op @ ("eq" | "starts-with")) => {
                let (Some(key), Some(value)) = (items[1].as_str(), items[2].as_str()) else {
                    return Err(AuthError::MalformedPost(format!(
                        "non-string value in condition [{op}, ...]"
                    )));
                };
                let key = key.to_ascii_lowercase();
                let op = if op == "eq" {
                    ConditionOp::Eq
                } else {
                    ConditionOp::StartsWith
                };
                let condition = PolicyCondition {
                    op,
                    key,
                    value: value.to_owned(),
                };
                if !condition.key.starts_with('$') {
                    return Err(condition.failed());
                }
                self.conditions.push(condition);
                Ok(())
            }
            Some("content-length-range") => {
                let min = json_to_u64(&items[1])?;
                let max = json_to_u64(&items[2])?;
                self.content_length_range = Some((min, max));
                Ok(())
            }
            _ => Err(AuthError::MalformedPost(format!(
                "unknown policy condition: {}",
                items[0]
            ))),
        }
    }

    /// Reject the policy at or after its expiration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PolicyExpired`].
    pub fn check_expiration(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if self.expiration > now {
            Ok(())
        } else {
            Err(AuthError::PolicyExpired)
        }
    }

    /// Match every condition against the form using the rule set of
    /// `policy_type`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PolicyConditionFailed`] for the first unmet
    /// condition, an operator the field does not allow, or (V2) a form
    /// field no condition covers.
    pub fn check_conditions(
        &self,
        form: &HashMap<String, String>,
        policy_type: PostPolicyType,
    ) -> Result<(), AuthError> {
        match policy_type {
            PostPolicyType::SignedV2 => self.check_conditions_v2(form),
            _ => self.check_conditions_v4(form),
        }
    }

    fn check_conditions_v2(&self, form: &HashMap<String, String>) -> Result<(), AuthError> {
        for condition in &self.conditions {
            let name = condition.form_name();
            let allowed = match condition.op {
                ConditionOp::Eq => EQ_FIELDS_V2.is_match(&name),
                ConditionOp::StartsWith => STARTS_WITH_FIELDS_V2.is_match(&name),
            };
            let actual = form.get(&name).map_or("", String::as_str);
            if !allowed || !condition.op.matches(actual, &condition.value) {
                return Err(condition.failed());
            }
        }
        for name in form.keys() {
            if IGNORED_FIELDS_V2.is_match(name) {
                continue;
            }
            if !self.conditions.iter().any(|c| c.form_name() == *name) {
                return Err(AuthError::PolicyConditionFailed(format!(
                    "Extra input fields: {name}"
                )));
            }
        }
        Ok(())
    }

    fn check_conditions_v4(&self, form: &HashMap<String, String>) -> Result<(), AuthError> {
        for condition in &self.conditions {
            let starts_with_allowed = STARTS_WITH_CONDS_V4
                .iter()
                .find(|(key, _)| *key == condition.key)
                .map(|(_, allowed)| *allowed);
            if condition.op == ConditionOp::StartsWith && starts_with_allowed == Some(false) {
                return Err(condition.failed());
            }
            let actual = form.get(&condition.form_name()).map_or("", String::as_str);
            if !condition.op.matches(actual, &condition.value) {
                return Err(condition.failed());
            }
        }
        Ok(())
    }

    /// Enforce `content-length-range` on the uploaded file size.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EntityTooSmall`] or [`AuthError::EntityTooLarge`].
    pub fn check_content_length(&self, len: u64) -> Result<(), AuthError> {
        match self.content_length_range {
            Some((min, _)) if len < min => Err(AuthError::EntityTooSmall),
            Some((_, max)) if len > max => Err(AuthError::EntityTooLarge),
            _ => Ok(()),
        }
    }
}

fn json_to_u64(value: &Value) -> Result<u64, AuthError> {
    let bound = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    bound.ok_or_else(|| AuthError::MalformedPost(format!("invalid content-length-range bound: {value}")))
}

/// Outcome of verifying a form upload.
#[derive(Debug, Clone)]
pub struct PostAuthResult {
    /// Which rule set applied.
    pub policy_type: PostPolicyType,
    /// The signer; `None` for anonymous forms.
    pub credential: Option<Credential>,
}

/// Verify a canonicalized form: signature, expiration, conditions and the
/// file size.
///
/// The caller adds the target bucket as the `Bucket` field before calling.
/// Anonymous forms pass through without checks; the caller decides whether
/// the bucket accepts them.
///
/// # Errors
///
/// Returns [`AuthError::MalformedPost`] for an unknown scheme or bad policy,
/// [`AuthError::MissingField`] for absent signature fields, and the
/// signature, expiration, condition and size errors of the steps above.
pub async fn verify_post_policy(
    form: &HashMap<String, String>,
    file_len: u64,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<PostAuthResult, AuthError> {
    let policy_type = PostPolicyType::detect(form);
    debug!(?policy_type, "verifying POST form");

    let credential = match policy_type {
        PostPolicyType::Anonymous => {
            return Ok(PostAuthResult {
                policy_type,
                credential: None,
            });
        }
        PostPolicyType::Unknown => {
            return Err(AuthError::MalformedPost(
                "unrecognised POST signature scheme".to_owned(),
            ));
        }
        PostPolicyType::SignedV2 => verify_signature_v2(form, authenticator, now).await?,
        PostPolicyType::SignedV4 => verify_signature_v4(form, authenticator, now).await?,
    };

    let policy = PostPolicy::decode(required(form, "Policy")?)?;
    policy.check_expiration(now)?;
    policy.check_conditions(form, policy_type)?;
    policy.check_content_length(file_len)?;

    Ok(PostAuthResult {
        policy_type,
        credential: Some(credential),
    })
}

async fn verify_signature_v2(
    form: &HashMap<String, String>,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<Credential, AuthError> {
    let access_key = required(form, "Awsaccesskeyid")?;
    let credential = authenticator
        .resolve_credential(access_key, form.get("X-Amz-Security-Token").map(String::as_str), now)
        .await?;
    let signature = required(form, "Signature")?;
    let policy = required(form, "Policy")?;
    verify_signature(&credential.secret_key, policy, signature)?;
    Ok(credential)
}

async fn verify_signature_v4(
    form: &HashMap<String, String>,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<Credential, AuthError> {
    let scope = CredentialScope::parse(required(form, "X-Amz-Credential")?)?;
    let date = required(form, "X-Amz-Date")?;
    let date = NaiveDateTime::parse_from_str(date, ISO8601_FORMAT)
        .map_err(|_| AuthError::MalformedDate(date.to_owned()))?
        .and_utc();

    let credential = authenticator
        .resolve_credential(
            &scope.access_key,
            form.get("X-Amz-Security-Token").map(String::as_str),
            now,
        )
        .await?;
    let signing_key = derive_signing_key(
        &credential.secret_key,
        &date.format(SCOPE_DATE_FORMAT).to_string(),
        &scope.region,
        &scope.service,
    );
    let expected = compute_signature(&signing_key, required(form, "Policy")?);
    let provided = required(form, "X-Amz-Signature")?;
    if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        return Err(AuthError::SignatureDoesNotMatch);
    }
    Ok(credential)
}

fn required<'a>(form: &'a HashMap<String, String>, name: &str) -> Result<&'a str, AuthError> {
    form.get(name)
        .map(String::as_str)
        .ok_or_else(|| AuthError::MissingField(name.to_owned()))
}
