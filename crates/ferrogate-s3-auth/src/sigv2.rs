//! AWS Signature Version 2 verification, header and presigned forms.
//!
//! ```text
//! Authorization: AWS <AWSAccessKeyId>:<Signature>
//! Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))
//!
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```
//!
//! Presigned V2 URLs carry `AWSAccessKeyId`, `Expires` (epoch seconds) and
//! `Signature`; `Expires` takes the place of `Date` in the string to sign.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::authenticator::{AuthResult, Authenticator};
use crate::canonical::parse_query;
use crate::error::AuthError;
use crate::sigv4::{check_clock_skew, header_str, parse_request_date};

type HmacSha1 = Hmac<Sha1>;

/// Query parameters that are part of the canonicalized resource, in emission order.
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Check whether an `Authorization` header uses the SigV2 form.
#[must_use]
pub fn is_sigv2(auth_header: &str) -> bool {
    auth_header.starts_with("AWS ")
}

/// Verify a header-signed SigV2 request.
///
/// # Errors
///
/// Returns an [`AuthError`] if the header is malformed, the date is missing or
/// skewed, the access key is unknown, or the signature does not match.
pub async fn verify_sigv2(
    parts: &http::request::Parts,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let auth_header = header_str(parts, "authorization").ok_or(AuthError::MissingAuthHeader)?;
    let (access_key, provided) = parse_sigv2_header(auth_header)?;

    let (date_value, amz_date) = match header_str(parts, "x-amz-date") {
        Some(v) => (v, true),
        None => (
            header_str(parts, "date").ok_or_else(|| AuthError::MissingHeader("date".to_owned()))?,
            false,
        ),
    };
    check_clock_skew(parse_request_date(date_value)?, now)?;

    let credential = authenticator.resolve_credential(access_key, None, now).await?;
    debug!(access_key, "verifying SigV2 signature");

    let date_slot = if amz_date { "" } else { date_value };
    let string_to_sign = build_string_to_sign(parts, date_slot, authenticator);
    verify_signature(&credential.secret_key, &string_to_sign, provided)?;

    Ok(AuthResult {
        credential,
        region: None,
        streaming: None,
    })
}

/// Verify a presigned SigV2 request.
///
/// # Errors
///
/// Returns [`AuthError::MissingQueryParam`] for absent parameters,
/// [`AuthError::MalformedExpires`] for a non-numeric `Expires`,
/// [`AuthError::RequestExpired`] once `now` is past `Expires`, and
/// [`AuthError::SignatureDoesNotMatch`] on mismatch.
pub async fn verify_presigned_v2(
    parts: &http::request::Parts,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let params: BTreeMap<String, String> = parse_query(parts.uri.query().unwrap_or(""))
        .into_iter()
        .collect();
    let param = |name: &str| {
        params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
    };
    let access_key = param("AWSAccessKeyId")?;
    let expires = param("Expires")?;
    let signature = param("Signature")?;

    let credential = authenticator.resolve_credential(access_key, None, now).await?;

    let expires_at: i64 = expires
        .parse()
        .map_err(|_| AuthError::MalformedExpires(expires.to_owned()))?;
    if now.timestamp() > expires_at {
        return Err(AuthError::RequestExpired);
    }

    let string_to_sign = build_string_to_sign(parts, expires, authenticator);
    verify_signature(&credential.secret_key, &string_to_sign, signature)?;

    Ok(AuthResult {
        credential,
        region: None,
        streaming: None,
    })
}

/// Base64 HMAC-SHA1 of `data`.
///
/// POST policy V2 signatures use the same primitive over the base64 policy.
#[must_use]
pub fn compute_sigv2_signature(secret_key: &str, data: &str) -> String {
    BASE64.encode(hmac_sha1(secret_key.as_bytes(), data.as_bytes()))
}

/// Compare a base64 signature against the expected HMAC in constant time.
pub(crate) fn verify_signature(
    secret_key: &str,
    string_to_sign: &str,
    provided: &str,
) -> Result<(), AuthError> {
    let provided = BASE64
        .decode(provided)
        .map_err(|_| AuthError::SignatureDoesNotMatch)?;
    let expected = hmac_sha1(secret_key.as_bytes(), string_to_sign.as_bytes());
    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        debug!(string_to_sign = ?string_to_sign, "SigV2 signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

fn parse_sigv2_header(header: &str) -> Result<(&str, &str), AuthError> {
    let rest = header
        .strip_prefix("AWS ")
        .ok_or(AuthError::InvalidAuthHeader)?;
    let (access_key, signature) = rest.split_once(':').ok_or(AuthError::InvalidAuthHeader)?;
    if access_key.is_empty() || signature.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok((access_key, signature))
}

fn build_string_to_sign(
    parts: &http::request::Parts,
    date_slot: &str,
    authenticator: &Authenticator,
) -> String {
    let method = parts.method.as_str();
    let content_md5 = header_str(parts, "content-md5").unwrap_or("");
    let content_type = header_str(parts, "content-type").unwrap_or("");
    let amz_headers = build_canonicalized_amz_headers(parts);
    let resource = build_canonicalized_resource(parts, authenticator);
    format!("{method}\n{content_md5}\n{content_type}\n{date_slot}\n{amz_headers}{resource}")
}

/// Lowercase, sorted `x-amz-*` headers, one `name:v1,v2\n` line each.
fn build_canonicalized_amz_headers(parts: &http::request::Parts) -> String {
    let mut amz_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in &parts.headers {
        if name.as_str().starts_with("x-amz-") {
            amz_headers
                .entry(name.as_str())
                .or_default()
                .push(value.to_str().unwrap_or("").trim());
        }
    }

    amz_headers
        .iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect()
}

/// `/bucket` for virtual-host requests, the escaped path, then the
/// whitelisted sub-resources.
fn build_canonicalized_resource(
    parts: &http::request::Parts,
    authenticator: &Authenticator,
) -> String {
    let mut resource = String::new();
    let host = header_str(parts, "host")
        .map(ToOwned::to_owned)
        .or_else(|| parts.uri.authority().map(ToString::to_string))
        .unwrap_or_default();
    if let Some(bucket) = authenticator.virtual_host_bucket(&host) {
        resource.push('/');
        resource.push_str(bucket);
    }
    resource.push_str(parts.uri.path());

    let query = parse_query(parts.uri.query().unwrap_or(""));
    let sub: Vec<String> = SUB_RESOURCES
        .iter()
        .flat_map(|name| {
            query
                .iter()
                .filter(move |(k, _)| k == name)
                .map(move |(_, v)| {
                    if v.is_empty() {
                        (*name).to_owned()
                    } else {
                        format!("{name}={v}")
                    }
                })
        })
        .collect();
    if !sub.is_empty() {
        resource.push('?');
        resource.push_str(&sub.join("&"));
    }
    resource
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha1::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
