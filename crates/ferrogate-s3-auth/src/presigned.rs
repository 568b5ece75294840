//! Presigned URL verification for AWS Signature Version 4.
//!
//! Presigned URLs carry the signature in query parameters:
//!
//! - `X-Amz-Algorithm` - must be `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/s3/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic timestamp
//! - `X-Amz-Expires` - validity in seconds, at most seven days
//! - `X-Amz-SignedHeaders` - semicolon-separated signed header names
//! - `X-Amz-Signature` - hex signature
//!
//! The payload hash is always `UNSIGNED-PAYLOAD`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::authenticator::{AuthResult, Authenticator};
use crate::canonical::{
    build_canonical_headers, build_canonical_query_string, build_canonical_uri,
    build_signed_headers_string, parse_query,
};
use crate::error::AuthError;
use crate::sigv4::{
    CredentialScope, ISO8601_FORMAT, SIGN_V4_ALGORITHM, UNSIGNED_PAYLOAD, build_string_to_sign,
    check_signed_headers, collect_signed_header_values, compute_signature, derive_signing_key,
    hash_payload, header_str, parse_request_date,
};

/// Longest validity a presigned URL may declare: seven days.
pub const MAX_PRESIGN_EXPIRES_SECS: i64 = 7 * 24 * 3600;

/// Parsed presigned URL parameters.
#[derive(Debug, Clone)]
pub struct ParsedPresignedParams {
    /// The credential scope.
    pub credential: CredentialScope,
    /// The signing time.
    pub date: DateTime<Utc>,
    /// Validity in seconds.
    pub expires: i64,
    /// Signed header names.
    pub signed_headers: Vec<String>,
    /// Hex signature.
    pub signature: String,
    /// `X-Amz-Security-Token`, if present.
    pub security_token: Option<String>,
}

/// Parse presigned URL query parameters.
///
/// # Errors
///
/// Returns [`AuthError::MissingQueryParam`] for an absent parameter,
/// [`AuthError::UnsupportedAlgorithm`] for another algorithm,
/// [`AuthError::MalformedDate`] or [`AuthError::MalformedExpires`] for bad
/// values, and [`AuthError::InvalidCredential`] for a bad credential.
pub fn parse_presigned_params(query: &str) -> Result<ParsedPresignedParams, AuthError> {
    let params: HashMap<String, String> = parse_query(query).into_iter().collect();

    let algorithm = get_required_param(&params, "X-Amz-Algorithm")?;
    if algorithm != SIGN_V4_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let credential = CredentialScope::parse(get_required_param(&params, "X-Amz-Credential")?)?;
    let date = parse_request_date(get_required_param(&params, "X-Amz-Date")?)?;
    let expires_str = get_required_param(&params, "X-Amz-Expires")?;
    let expires: i64 = expires_str
        .parse()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| AuthError::MalformedExpires(expires_str.to_owned()))?;
    let signed_headers = get_required_param(&params, "X-Amz-SignedHeaders")?
        .split(';')
        .map(ToOwned::to_owned)
        .collect();
    let signature = get_required_param(&params, "X-Amz-Signature")?.to_owned();

    Ok(ParsedPresignedParams {
        credential,
        date,
        expires,
        signed_headers,
        signature,
        security_token: params.get("X-Amz-Security-Token").cloned(),
    })
}

/// Reject URLs declaring more than seven days or used after `date + expires`.
///
/// # Errors
///
/// Returns [`AuthError::ExpiresTooLarge`] or [`AuthError::RequestExpired`].
pub fn check_expiration(
    date: DateTime<Utc>,
    expires: i64,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    if expires > MAX_PRESIGN_EXPIRES_SECS {
        return Err(AuthError::ExpiresTooLarge);
    }
    if now - date > chrono::Duration::seconds(expires) {
        return Err(AuthError::RequestExpired);
    }
    Ok(())
}

/// Verify a presigned SigV4 request.
///
/// # Errors
///
/// Returns an [`AuthError`] when parameters are missing or malformed, the URL
/// has expired, the access key is unknown, or the signature does not match.
pub async fn verify_presigned(
    parts: &http::request::Parts,
    authenticator: &Authenticator,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let query = parts.uri.query().unwrap_or("");
    let parsed = parse_presigned_params(query)?;

    debug!(
        access_key = %parsed.credential.access_key,
        region = %parsed.credential.region,
        expires = parsed.expires,
        "verifying presigned URL"
    );

    let token = parsed
        .security_token
        .as_deref()
        .or_else(|| header_str(parts, "x-amz-security-token"));
    let credential = authenticator
        .resolve_credential(&parsed.credential.access_key, token, now)
        .await?;

    check_expiration(parsed.date, parsed.expires, now)?;
    check_signed_headers(parts, &parsed.signed_headers, false)?;

    let signed_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let header_pairs = collect_signed_header_values(parts, &signed_refs)?;
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n\n{}\n{UNSIGNED_PAYLOAD}",
        parts.method.as_str(),
        build_canonical_uri(parts.uri.path()),
        build_canonical_query_string(query, &["X-Amz-Signature"]),
        build_canonical_headers(&header_pairs, &signed_refs),
        build_signed_headers_string(&signed_refs),
    );
    debug!(canonical_request, "built presigned canonical request");

    let scope = parsed.credential.scope();
    let string_to_sign = build_string_to_sign(
        &parsed.date.format(ISO8601_FORMAT).to_string(),
        &scope,
        &hash_payload(canonical_request.as_bytes()),
    );
    let signing_key = derive_signing_key(
        &credential.secret_key,
        &parsed.credential.date,
        &parsed.credential.region,
        &parsed.credential.service,
    );
    let expected = compute_signature(&signing_key, &string_to_sign);

    if !bool::from(parsed.signature.as_bytes().ct_eq(expected.as_bytes())) {
        debug!(expected = %expected, provided = %parsed.signature, "presigned signature mismatch");
        return Err(AuthError::SignatureDoesNotMatch);
    }

    Ok(AuthResult {
        credential,
        region: Some(parsed.credential.region),
        streaming: None,
    })
}

fn get_required_param<'a>(
    params: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, AuthError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}
