//! Shared helpers for the operation handlers.
//!
//! Provides id generation, range parsing, conditional-request evaluation,
//! etag arithmetic, continuation tokens and copy-source parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use ferrogate_s3_model::input::Preconditions;
use md5::{Digest, Md5};
use percent_encoding::percent_decode_str;
use rand::RngExt;
use uuid::Uuid;

use crate::error::S3ServiceError;

// ---------------------------------------------------------------------------
// ID generation
// ---------------------------------------------------------------------------

/// Generate a random upload id: 64 hex characters.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::utils::generate_upload_id;
///
/// let id = generate_upload_id();
/// assert_eq!(id.len(), 64);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn generate_upload_id() -> String {
    let mut buf = [0u8; 32];
    rand::rng().fill(&mut buf);
    hex::encode(buf)
}

/// Generate a request id (UUID v4 without dashes).
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Parse a `Range` header against an object of `content_length` bytes.
///
/// Accepts `bytes=a-b`, `bytes=a-` and `bytes=-n`. Returns the inclusive
/// `(start, end)` pair with `end` clamped to the last byte. A suffix longer
/// than the object selects the whole object.
///
/// # Errors
///
/// [`S3ServiceError::InvalidRange`] when the header is malformed or no byte
/// of the object is selected.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::utils::parse_range_header;
///
/// assert_eq!(parse_range_header("bytes=0-4", 11).unwrap(), (0, 4));
/// assert_eq!(parse_range_header("bytes=6-", 11).unwrap(), (6, 10));
/// assert_eq!(parse_range_header("bytes=-5", 11).unwrap(), (6, 10));
/// ```
pub fn parse_range_header(range: &str, content_length: u64) -> Result<(u64, u64), S3ServiceError> {
    let spec = range
        .trim()
        .strip_prefix("bytes=")
        .ok_or(S3ServiceError::InvalidRange)?;
    let (first, last) = spec.split_once('-').ok_or(S3ServiceError::InvalidRange)?;
    let number = |s: &str| s.trim().parse::<u64>().map_err(|_| S3ServiceError::InvalidRange);

    if content_length == 0 {
        return Err(S3ServiceError::InvalidRange);
    }
    let last_byte = content_length - 1;

    if first.trim().is_empty() {
        let suffix = number(last)?;
        if suffix == 0 {
            return Err(S3ServiceError::InvalidRange);
        }
        return Ok((content_length.saturating_sub(suffix), last_byte));
    }

    let start = number(first)?;
    if start > last_byte {
        return Err(S3ServiceError::InvalidRange);
    }
    let end = if last.trim().is_empty() {
        last_byte
    } else {
        let end = number(last)?;
        if end < start {
            return Err(S3ServiceError::InvalidRange);
        }
        end.min(last_byte)
    };
    Ok((start, end))
}

/// Parse `x-amz-copy-source-range`, which must be `bytes=a-b` and lie
/// inside the source object.
pub fn parse_copy_source_range(
    range: &str,
    content_length: u64,
) -> Result<(u64, u64), S3ServiceError> {
    let spec = range.trim().strip_prefix("bytes=").ok_or_else(|| {
        S3ServiceError::invalid_argument("The x-amz-copy-source-range value must be of the form bytes=first-last")
    })?;
    let parsed = spec
        .split_once('-')
        .and_then(|(a, b)| Some((a.parse::<u64>().ok()?, b.parse::<u64>().ok()?)));
    let Some((start, end)) = parsed else {
        return Err(S3ServiceError::invalid_argument(
            "The x-amz-copy-source-range value must be of the form bytes=first-last",
        ));
    };
    if start > end || end >= content_length {
        return Err(S3ServiceError::InvalidRange);
    }
    Ok((start, end))
}

// ---------------------------------------------------------------------------
// Conditional requests
// ---------------------------------------------------------------------------

fn normalize_etag(etag: &str) -> String {
    etag.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_ascii_lowercase()
}

/// Compare two etags ignoring quotes and case.
#[must_use]
pub fn etags_match(a: &str, b: &str) -> bool {
    normalize_etag(a) == normalize_etag(b)
}

/// Whether an `If-Match` value (possibly a list, possibly `*`) matches.
#[must_use]
pub fn is_valid_if_match(etag: &str, if_match: &str) -> bool {
    if_match
        .split(',')
        .any(|candidate| candidate.trim() == "*" || etags_match(candidate, etag))
}

/// Whether an `If-None-Match` value lets the request through.
#[must_use]
pub fn is_valid_if_none_match(etag: &str, if_none_match: &str) -> bool {
    !is_valid_if_match(etag, if_none_match)
}

/// HTTP dates carry whole seconds only.
fn whole_seconds(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

/// Evaluate GET/HEAD conditionals.
///
/// `If-Match` and `If-Unmodified-Since` fail with 412; `If-None-Match` and
/// `If-Modified-Since` fail with 304. A passing `If-Match` masks
/// `If-Unmodified-Since`, and a present `If-None-Match` masks
/// `If-Modified-Since`.
pub fn check_preconditions(
    pre: &Preconditions,
    etag: &str,
    last_modified: DateTime<Utc>,
) -> Result<(), S3ServiceError> {
    let modified = whole_seconds(last_modified);
    match &pre.if_match {
        Some(if_match) => {
            if !is_valid_if_match(etag, if_match) {
                return Err(S3ServiceError::PreconditionFailed);
            }
        }
        None => {
            if pre
                .if_unmodified_since
                .is_some_and(|since| modified > whole_seconds(since))
            {
                return Err(S3ServiceError::PreconditionFailed);
            }
        }
    }
    match &pre.if_none_match {
        Some(if_none_match) => {
            if !is_valid_if_none_match(etag, if_none_match) {
                return Err(S3ServiceError::NotModified);
            }
        }
        None => {
            if pre
                .if_modified_since
                .is_some_and(|since| modified <= whole_seconds(since))
            {
                return Err(S3ServiceError::NotModified);
            }
        }
    }
    Ok(())
}

/// Evaluate `x-amz-copy-source-if-*`; every failure is a 412.
pub fn check_copy_preconditions(
    pre: &Preconditions,
    etag: &str,
    last_modified: DateTime<Utc>,
) -> Result<(), S3ServiceError> {
    check_preconditions(pre, etag, last_modified).map_err(|err| match err {
        S3ServiceError::NotModified => S3ServiceError::PreconditionFailed,
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Etags
// ---------------------------------------------------------------------------

/// Hex MD5 of a body.
#[must_use]
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Etag of a completed multipart upload: the MD5 of the concatenated binary
/// part MD5s, suffixed with the part count.
///
/// ```
/// use ferrogate_s3_core::utils::multipart_etag;
///
/// let etag = multipart_etag(["5eb63bbbe01eeed093cb22bb8f5acdc3"]).unwrap();
/// assert!(etag.ends_with("-1"));
/// ```
pub fn multipart_etag<'a>(
    part_etags: impl IntoIterator<Item = &'a str>,
) -> Result<String, S3ServiceError> {
    let mut hasher = Md5::new();
    let mut count = 0usize;
    for etag in part_etags {
        let raw = hex::decode(normalize_etag(etag))
            .map_err(|_| S3ServiceError::Internal(anyhow::anyhow!("stored part etag is not hex: {etag}")))?;
        hasher.update(raw);
        count += 1;
    }
    Ok(format!("{}-{count}", hex::encode(hasher.finalize())))
}

// ---------------------------------------------------------------------------
// Continuation tokens
// ---------------------------------------------------------------------------

/// Encode a ListObjectsV2 continuation token.
#[must_use]
pub fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a ListObjectsV2 continuation token.
pub fn decode_continuation_token(token: &str) -> Result<String, S3ServiceError> {
    let bytes = BASE64_STANDARD
        .decode(token)
        .map_err(|_| S3ServiceError::invalid_argument("The continuation token provided is incorrect"))?;
    String::from_utf8(bytes)
        .map_err(|_| S3ServiceError::invalid_argument("The continuation token provided is incorrect"))
}

// ---------------------------------------------------------------------------
// Copy source
// ---------------------------------------------------------------------------

/// Parse `x-amz-copy-source`: `[/]bucket/key[?versionId=id]`.
///
/// The path is percent-decoded exactly once.
///
/// ```
/// use ferrogate_s3_core::utils::parse_copy_source;
///
/// let (bucket, key, version) = parse_copy_source("/src/a%2Bb.txt?versionId=v1").unwrap();
/// assert_eq!((bucket.as_str(), key.as_str()), ("src", "a+b.txt"));
/// assert_eq!(version.as_deref(), Some("v1"));
/// ```
pub fn parse_copy_source(source: &str) -> Result<(String, String, Option<String>), S3ServiceError> {
    let invalid = || S3ServiceError::invalid_argument("Copy Source must mention the source bucket and key: sourcebucket/sourcekey");

    let (path, version_id) = match source.split_once('?') {
        Some((path, query)) => {
            let version = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("versionId="))
                .map(str::to_owned)
                .ok_or_else(invalid)?;
            (path, Some(version))
        }
        None => (source, None),
    };

    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| invalid())?;
    let trimmed = decoded.strip_prefix('/').unwrap_or(&decoded);
    let (bucket, key) = trimmed.split_once('/').ok_or_else(invalid)?;
    if bucket.is_empty() || key.is_empty() {
        return Err(invalid());
    }
    Ok((bucket.to_owned(), key.to_owned(), version_id))
}
