//! HTTP request to S3 input struct decoding.
//!
//! This module provides the [`FromS3Request`] trait and one implementation per
//! operation input. Field sources follow the field docs of the input structs:
//! - `HTTP header: x-amz-xxx` - request headers
//! - `HTTP query: name` - query parameters
//! - `HTTP label (URI path)` - the bucket/key from routing
//! - `HTTP payload body` - the request body (XML, JSON or raw bytes)
//! - `HTTP prefix headers: x-amz-meta-` - all `x-amz-meta-*` headers
//!
//! Values that are present but unparseable fail the request here, before the
//! service core runs.

use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use ferrogate_s3_model::request::StreamingBlob;
use ferrogate_s3_model::types::{
    AccessControlPolicy, CannedAcl, CorsConfiguration, Delete, LifecycleConfiguration,
    LoggingStatus, MetadataDirective, ServerSideEncryption, ServerSideEncryptionConfiguration,
    StorageClass, WebsiteConfiguration,
};
use ferrogate_s3_xml::{
    CompleteMultipartUpload, CreateBucketConfiguration, RestoreRequest, S3Deserialize,
    VersioningConfiguration, from_xml,
};

use crate::multipart::{MultipartForm, extract_boundary, parse_multipart};

/// Trait for extracting an S3 input struct from HTTP request components.
pub trait FromS3Request: Sized {
    /// Extract the input from HTTP request parts.
    ///
    /// # Arguments
    /// - `parts` - The HTTP request head (method, URI, headers, extensions).
    /// - `bucket` - The resolved bucket name, if any.
    /// - `key` - The resolved object key, if any.
    /// - `query_params` - Parsed query parameters from the URI.
    /// - `body` - The request body, already de-chunked for streaming uploads.
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` if required fields are missing or field values
    /// cannot be parsed.
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error>;
}

// ---------------------------------------------------------------------------
// Helper functions for extracting typed values from HTTP request parts
// ---------------------------------------------------------------------------

/// Extract a header value as a string.
pub fn header_str(parts: &http::request::Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Extract a header value and parse it into a type implementing `FromStr`.
pub fn header_parse<T: FromStr>(parts: &http::request::Parts, name: &str) -> Option<T> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Extract a header value and parse it as an HTTP date timestamp.
pub fn header_timestamp(parts: &http::request::Parts, name: &str) -> Option<DateTime<Utc>> {
    let value = parts.headers.get(name)?.to_str().ok()?;
    parse_http_date(value)
}

/// Parse an HTTP date string: RFC 3339, RFC 2822 or the IMF-fixdate form.
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT") {
        return Some(dt.and_utc());
    }
    None
}

/// Get a query parameter value by name.
#[must_use]
pub fn query_param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Get a non-empty query parameter value by name.
fn query_nonempty(params: &[(String, String)], name: &str) -> Option<String> {
    query_param(params, name).filter(|v| !v.is_empty())
}

/// Parse an integer query parameter; a present but non-numeric value is an
/// `InvalidArgument`.
fn query_int<T: FromStr>(params: &[(String, String)], name: &str) -> Result<Option<T>, S3Error> {
    query_param(params, name)
        .map(|v| {
            v.trim().parse().map_err(|_| {
                S3Error::invalid_argument(format!("Provided {name} not an integer or within integer range"))
                    .with_detail("ArgumentName", name)
                    .with_detail("ArgumentValue", v.clone())
            })
        })
        .transpose()
}

/// Collect all `x-amz-meta-*` headers. Header names arrive lowercased.
pub fn collect_metadata(parts: &http::request::Parts) -> HashMap<String, String> {
    parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            let meta_key = name.as_str().strip_prefix("x-amz-meta-")?;
            Some((meta_key.to_owned(), value.to_str().ok()?.to_owned()))
        })
        .collect()
}

fn require_bucket(bucket: Option<&str>) -> Result<String, S3Error> {
    bucket.map(ToOwned::to_owned).ok_or_else(|| {
        S3Error::with_message(S3ErrorCode::InvalidRequest, "Bucket name is required")
    })
}

fn require_key(key: Option<&str>) -> Result<String, S3Error> {
    key.map(ToOwned::to_owned)
        .ok_or_else(|| S3Error::with_message(S3ErrorCode::InvalidRequest, "Object key is required"))
}

/// Parse an XML body into a typed value.
fn parse_xml_body<T: S3Deserialize>(body: &Bytes) -> Result<T, S3Error> {
    from_xml(body).map_err(|e| S3Error::malformed_xml(format!("Failed to parse XML body: {e}")))
}

/// Parse an XML body that may be absent.
fn parse_optional_xml_body<T: S3Deserialize>(body: &Bytes) -> Result<Option<T>, S3Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    parse_xml_body(body).map(Some)
}

fn canned_acl(value: Option<String>) -> Result<Option<CannedAcl>, S3Error> {
    value
        .map(|v| {
            CannedAcl::parse(&v)
                .ok_or_else(|| S3Error::invalid_argument(format!("Invalid canned ACL: {v}")))
        })
        .transpose()
}

fn storage_class(value: Option<String>) -> Result<Option<StorageClass>, S3Error> {
    value
        .map(|v| {
            StorageClass::parse(&v).ok_or_else(|| {
                S3Error::with_message(
                    S3ErrorCode::InvalidStorageClass,
                    format!("The storage class you specified is not valid: {v}"),
                )
            })
        })
        .transpose()
}

fn server_side_encryption(value: Option<String>) -> Result<Option<ServerSideEncryption>, S3Error> {
    value
        .map(|v| {
            ServerSideEncryption::parse(&v).ok_or_else(|| {
                S3Error::invalid_argument(format!("Server side encryption specified is not valid: {v}"))
            })
        })
        .transpose()
}

/// SSE-C headers under `prefix` (`x-amz-` or `x-amz-copy-source-`).
fn sse_customer_with(
    lookup: impl Fn(&str) -> Option<String>,
    prefix: &str,
) -> ferrogate_s3_model::input::SseCustomerKey {
    ferrogate_s3_model::input::SseCustomerKey {
        algorithm: lookup(&format!("{prefix}server-side-encryption-customer-algorithm")),
        key: lookup(&format!("{prefix}server-side-encryption-customer-key")),
        key_md5: lookup(&format!("{prefix}server-side-encryption-customer-key-md5")),
    }
}

fn sse_customer(parts: &http::request::Parts, prefix: &str) -> ferrogate_s3_model::input::SseCustomerKey {
    sse_customer_with(|name| header_str(parts, name), prefix)
}

fn sse_request(parts: &http::request::Parts) -> Result<ferrogate_s3_model::input::SseRequest, S3Error> {
    Ok(ferrogate_s3_model::input::SseRequest {
        server_side_encryption: server_side_encryption(header_str(
            parts,
            "x-amz-server-side-encryption",
        ))?,
        kms_key_id: header_str(parts, "x-amz-server-side-encryption-aws-kms-key-id"),
        customer: sse_customer(parts, "x-amz-"),
    })
}

fn content_headers(parts: &http::request::Parts) -> ferrogate_s3_model::input::ContentHeaders {
    ferrogate_s3_model::input::ContentHeaders {
        content_type: header_str(parts, "content-type"),
        cache_control: header_str(parts, "cache-control"),
        content_disposition: header_str(parts, "content-disposition"),
        content_encoding: header_str(parts, "content-encoding"),
        content_language: header_str(parts, "content-language"),
        expires: header_str(parts, "expires"),
        website_redirect_location: header_str(parts, "x-amz-website-redirect-location"),
    }
}

/// `response-*` query overrides of GetObject.
fn response_overrides(query: &[(String, String)]) -> ferrogate_s3_model::input::ContentHeaders {
    ferrogate_s3_model::input::ContentHeaders {
        content_type: query_nonempty(query, "response-content-type"),
        cache_control: query_nonempty(query, "response-cache-control"),
        content_disposition: query_nonempty(query, "response-content-disposition"),
        content_encoding: query_nonempty(query, "response-content-encoding"),
        content_language: query_nonempty(query, "response-content-language"),
        expires: query_nonempty(query, "response-expires"),
        website_redirect_location: None,
    }
}

/// Conditional headers under `prefix` (`""` or `x-amz-copy-source-`).
fn preconditions(parts: &http::request::Parts, prefix: &str) -> ferrogate_s3_model::input::Preconditions {
    ferrogate_s3_model::input::Preconditions {
        if_match: header_str(parts, &format!("{prefix}if-match")),
        if_none_match: header_str(parts, &format!("{prefix}if-none-match")),
        if_modified_since: header_timestamp(parts, &format!("{prefix}if-modified-since")),
        if_unmodified_since: header_timestamp(parts, &format!("{prefix}if-unmodified-since")),
    }
}

/// Decoded payload length: `x-amz-decoded-content-length` for chunk-signed
/// uploads, otherwise `Content-Length`.
fn content_length(parts: &http::request::Parts) -> Option<u64> {
    header_parse(parts, "x-amz-decoded-content-length")
        .or_else(|| header_parse(parts, "content-length"))
}

fn required_part_number(query: &[(String, String)]) -> Result<i32, S3Error> {
    query_int(query, "partNumber")?
        .ok_or_else(|| S3Error::invalid_argument("partNumber is required"))
}

fn required_upload_id(query: &[(String, String)]) -> Result<String, S3Error> {
    query_param(query, "uploadId").ok_or_else(|| S3Error::no_such_upload(""))
}

// ---------------------------------------------------------------------------
// Bucket inputs
// ---------------------------------------------------------------------------

#[allow(clippy::wildcard_imports)]
use ferrogate_s3_model::input::*;

macro_rules! impl_bucket_only_input {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromS3Request for $ty {
                fn from_s3_request(
                    _parts: &http::request::Parts,
                    bucket: Option<&str>,
                    _key: Option<&str>,
                    _query_params: &[(String, String)],
                    _body: Bytes,
                ) -> Result<Self, S3Error> {
                    Ok(Self {
                        bucket: require_bucket(bucket)?,
                    })
                }
            }
        )+
    };
}

impl_bucket_only_input!(
    HeadBucketInput,
    DeleteBucketInput,
    GetBucketLocationInput,
    GetBucketAclInput,
    GetBucketVersioningInput,
    GetBucketCorsInput,
    DeleteBucketCorsInput,
    GetBucketLifecycleInput,
    DeleteBucketLifecycleInput,
    GetBucketPolicyInput,
    DeleteBucketPolicyInput,
    GetBucketWebsiteInput,
    DeleteBucketWebsiteInput,
    GetBucketEncryptionInput,
    DeleteBucketEncryptionInput,
    GetBucketLoggingInput,
);

impl FromS3Request for ListBucketsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        _bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {})
    }
}

impl FromS3Request for CreateBucketInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let configuration: Option<CreateBucketConfiguration> = parse_optional_xml_body(&body)?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            location_constraint: configuration.and_then(|c| c.location_constraint),
        })
    }
}

impl FromS3Request for DeleteObjectsInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            delete: parse_xml_body::<Delete>(&body)?,
            content_md5: header_str(parts, "content-md5"),
        })
    }
}

impl FromS3Request for PutBucketAclInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            access_control_policy: parse_optional_xml_body::<AccessControlPolicy>(&body)?,
        })
    }
}

impl FromS3Request for PutBucketVersioningInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let configuration: VersioningConfiguration = parse_xml_body(&body)?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            status: configuration.status,
        })
    }
}

impl FromS3Request for PutBucketCorsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            cors_configuration: parse_xml_body::<CorsConfiguration>(&body)?,
        })
    }
}

impl FromS3Request for PutBucketLifecycleInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            lifecycle_configuration: parse_xml_body::<LifecycleConfiguration>(&body)?,
        })
    }
}

impl FromS3Request for PutBucketPolicyInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let policy = String::from_utf8(body.to_vec()).map_err(|_| {
            S3Error::with_message(S3ErrorCode::MalformedPolicy, "Policy document is not valid UTF-8")
        })?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            policy,
        })
    }
}

impl FromS3Request for PutBucketWebsiteInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            website_configuration: parse_xml_body::<WebsiteConfiguration>(&body)?,
        })
    }
}

impl FromS3Request for PutBucketEncryptionInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            server_side_encryption_configuration: parse_optional_xml_body::<
                ServerSideEncryptionConfiguration,
            >(&body)?,
        })
    }
}

impl FromS3Request for PutBucketLoggingInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            bucket_logging_status: parse_optional_xml_body::<LoggingStatus>(&body)?
                .unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Listing inputs
// ---------------------------------------------------------------------------

impl FromS3Request for ListObjectsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            prefix: query_param(query_params, "prefix"),
            delimiter: query_nonempty(query_params, "delimiter"),
            marker: query_nonempty(query_params, "marker"),
            max_keys: query_int(query_params, "max-keys")?,
            encoding_type: query_param(query_params, "encoding-type"),
        })
    }
}

impl FromS3Request for ListObjectsV2Input {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            prefix: query_param(query_params, "prefix"),
            delimiter: query_nonempty(query_params, "delimiter"),
            continuation_token: query_nonempty(query_params, "continuation-token"),
            start_after: query_nonempty(query_params, "start-after"),
            max_keys: query_int(query_params, "max-keys")?,
            fetch_owner: query_param(query_params, "fetch-owner")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            encoding_type: query_param(query_params, "encoding-type"),
        })
    }
}

impl FromS3Request for ListObjectVersionsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            prefix: query_param(query_params, "prefix"),
            delimiter: query_nonempty(query_params, "delimiter"),
            key_marker: query_nonempty(query_params, "key-marker"),
            version_id_marker: query_nonempty(query_params, "version-id-marker"),
            max_keys: query_int(query_params, "max-keys")?,
            encoding_type: query_param(query_params, "encoding-type"),
        })
    }
}

impl FromS3Request for ListMultipartUploadsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            prefix: query_param(query_params, "prefix"),
            delimiter: query_nonempty(query_params, "delimiter"),
            key_marker: query_nonempty(query_params, "key-marker"),
            upload_id_marker: query_nonempty(query_params, "upload-id-marker"),
            max_uploads: query_int(query_params, "max-uploads")?,
        })
    }
}

impl FromS3Request for ListPartsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            upload_id: required_upload_id(query_params)?,
            part_number_marker: query_int(query_params, "part-number-marker")?,
            max_parts: query_int(query_params, "max-parts")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Multipart inputs
// ---------------------------------------------------------------------------

impl FromS3Request for CreateMultipartUploadInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            content: content_headers(parts),
            metadata: collect_metadata(parts),
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            storage_class: storage_class(header_str(parts, "x-amz-storage-class"))?,
            sse: sse_request(parts)?,
        })
    }
}

impl FromS3Request for UploadPartInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            upload_id: required_upload_id(query_params)?,
            part_number: required_part_number(query_params)?,
            body: StreamingBlob::new(body),
            content_length: content_length(parts),
            content_md5: header_str(parts, "content-md5"),
            sse_customer: sse_customer(parts, "x-amz-"),
        })
    }
}

impl FromS3Request for UploadPartCopyInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            upload_id: required_upload_id(query_params)?,
            part_number: required_part_number(query_params)?,
            copy_source: header_str(parts, "x-amz-copy-source").unwrap_or_default(),
            copy_source_range: header_str(parts, "x-amz-copy-source-range"),
            copy_source_preconditions: preconditions(parts, "x-amz-copy-source-"),
            copy_source_sse_customer: sse_customer(parts, "x-amz-copy-source-"),
            sse_customer: sse_customer(parts, "x-amz-"),
        })
    }
}

impl FromS3Request for CompleteMultipartUploadInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let document: CompleteMultipartUpload = parse_xml_body(&body)?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            upload_id: required_upload_id(query_params)?,
            parts: document.parts,
        })
    }
}

impl FromS3Request for AbortMultipartUploadInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            upload_id: required_upload_id(query_params)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Object inputs
// ---------------------------------------------------------------------------

impl FromS3Request for PutObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            body: StreamingBlob::new(body),
            content_length: content_length(parts),
            content_md5: header_str(parts, "content-md5"),
            content: content_headers(parts),
            metadata: collect_metadata(parts),
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            storage_class: storage_class(header_str(parts, "x-amz-storage-class"))?,
            sse: sse_request(parts)?,
        })
    }
}

/// Also decodes `HeadObjectInput`, which is the same type.
impl FromS3Request for GetObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            version_id: query_nonempty(query_params, "versionId"),
            range: header_str(parts, "range"),
            preconditions: preconditions(parts, ""),
            response_overrides: response_overrides(query_params),
            sse_customer: sse_customer(parts, "x-amz-"),
        })
    }
}

impl FromS3Request for CopyObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        let metadata_directive = header_str(parts, "x-amz-metadata-directive")
            .map(|v| {
                MetadataDirective::parse(&v).ok_or_else(|| {
                    S3Error::invalid_argument(format!("Unknown metadata directive: {v}"))
                })
            })
            .transpose()?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            copy_source: header_str(parts, "x-amz-copy-source").unwrap_or_default(),
            metadata_directive,
            copy_source_preconditions: preconditions(parts, "x-amz-copy-source-"),
            copy_source_sse_customer: sse_customer(parts, "x-amz-copy-source-"),
            content: content_headers(parts),
            metadata: collect_metadata(parts),
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            storage_class: storage_class(header_str(parts, "x-amz-storage-class"))?,
            sse: sse_request(parts)?,
        })
    }
}

impl FromS3Request for DeleteObjectInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            version_id: query_nonempty(query_params, "versionId"),
        })
    }
}

impl FromS3Request for RenameObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            rename_source: header_str(parts, "x-amz-rename-source").unwrap_or_default(),
        })
    }
}

impl FromS3Request for AppendObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let position = query_int(query_params, "position")?
            .ok_or_else(|| S3Error::invalid_argument("position is required for append"))?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            position,
            body: StreamingBlob::new(body),
            content_length: content_length(parts),
            content_md5: header_str(parts, "content-md5"),
            content: content_headers(parts),
            metadata: collect_metadata(parts),
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            storage_class: storage_class(header_str(parts, "x-amz-storage-class"))?,
            sse: sse_request(parts)?,
        })
    }
}

impl FromS3Request for GetObjectAclInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            version_id: query_nonempty(query_params, "versionId"),
        })
    }
}

impl FromS3Request for PutObjectAclInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            version_id: query_nonempty(query_params, "versionId"),
            acl: canned_acl(header_str(parts, "x-amz-acl"))?,
            access_control_policy: parse_optional_xml_body::<AccessControlPolicy>(&body)?,
        })
    }
}

impl FromS3Request for PutObjectMetaInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
        _body: Bytes,
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            content: content_headers(parts),
            metadata: collect_metadata(parts),
        })
    }
}

impl FromS3Request for RestoreObjectInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let request: RestoreRequest = parse_xml_body(&body)?;
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            version_id: query_nonempty(query_params, "versionId"),
            days: request.days,
        })
    }
}

// ---------------------------------------------------------------------------
// Form upload
// ---------------------------------------------------------------------------

/// Decodes a form upload. The auth stage leaves the parsed form in the
/// request extensions; without it the body is parsed here.
impl FromS3Request for PostObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, S3Error> {
        let form = match parts.extensions.get::<MultipartForm>() {
            Some(form) => form.clone(),
            None => {
                let content_type = header_str(parts, "content-type").unwrap_or_default();
                parse_multipart(&body, &extract_boundary(&content_type)?)?
            }
        };
        post_object_input(require_bucket(bucket)?, form)
    }
}

fn post_object_input(bucket: String, form: MultipartForm) -> Result<PostObjectInput, S3Error> {
    let fields = &form.fields;
    let field = |name: &str| fields.get(name).cloned();

    let key_template = field("Key").filter(|k| !k.is_empty()).ok_or_else(|| {
        S3Error::with_message(
            S3ErrorCode::MalformedPOSTRequest,
            "Bucket POST must contain a field named 'key'",
        )
    })?;
    let key = match &form.file_name {
        Some(name) => key_template.replace("${filename}", name),
        None => key_template,
    };

    let metadata = fields
        .iter()
        .filter_map(|(name, value)| {
            name.strip_prefix("X-Amz-Meta-")
                .map(|k| (k.to_ascii_lowercase(), value.clone()))
        })
        .collect();

    let content = ContentHeaders {
        content_type: field("Content-Type").or_else(|| form.file_content_type.clone()),
        cache_control: field("Cache-Control"),
        content_disposition: field("Content-Disposition"),
        content_encoding: field("Content-Encoding"),
        content_language: field("Content-Language"),
        expires: field("Expires"),
        website_redirect_location: field("X-Amz-Website-Redirect-Location"),
    };

    let sse = SseRequest {
        server_side_encryption: server_side_encryption(field("X-Amz-Server-Side-Encryption"))?,
        kms_key_id: field("X-Amz-Server-Side-Encryption-Aws-Kms-Key-Id"),
        customer: sse_customer_with(
            |name| fields.get(&ferrogate_s3_auth::post_policy::canonical_form_key(name)).cloned(),
            "x-amz-",
        ),
    };

    let success_action_status = field("Success_action_status")
        .and_then(|s| s.trim().parse::<u16>().ok())
        .filter(|s| matches!(s, 200 | 201 | 204));
    let success_action_redirect = field("Success_action_redirect")
        .or_else(|| field("Redirect"))
        .filter(|r| !r.is_empty());

    Ok(PostObjectInput {
        bucket,
        key,
        body: StreamingBlob::new(form.file_data),
        content,
        metadata,
        acl: canned_acl(field("Acl"))?,
        storage_class: storage_class(field("X-Amz-Storage-Class"))?,
        sse,
        success_action_status,
        success_action_redirect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(method: http::Method, uri: &str, headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_should_decode_put_object_headers() {
        let p = parts(
            http::Method::PUT,
            "/b/k",
            &[
                ("content-type", "text/plain"),
                ("content-length", "11"),
                ("x-amz-meta-color", "blue"),
                ("x-amz-acl", "public-read"),
                ("x-amz-storage-class", "STANDARD_IA"),
                ("x-amz-server-side-encryption", "AES256"),
            ],
        );
        let input =
            PutObjectInput::from_s3_request(&p, Some("b"), Some("k"), &[], Bytes::from("hello world"))
                .unwrap();
        assert_eq!(input.content_length, Some(11));
        assert_eq!(input.content.content_type.as_deref(), Some("text/plain"));
        assert_eq!(input.metadata.get("color").map(String::as_str), Some("blue"));
        assert_eq!(input.acl, Some(CannedAcl::PublicRead));
        assert_eq!(input.storage_class, Some(StorageClass::StandardIa));
        assert_eq!(input.sse.server_side_encryption, Some(ServerSideEncryption::Aes256));
        assert_eq!(input.body.len(), 11);
    }

    #[test]
    fn test_should_prefer_decoded_content_length() {
        let p = parts(
            http::Method::PUT,
            "/b/k",
            &[("content-length", "300"), ("x-amz-decoded-content-length", "66")],
        );
        let input = PutObjectInput::from_s3_request(&p, Some("b"), Some("k"), &[], Bytes::new()).unwrap();
        assert_eq!(input.content_length, Some(66));
    }

    #[test]
    fn test_should_reject_unknown_enum_headers() {
        let p = parts(http::Method::PUT, "/b/k", &[("x-amz-storage-class", "DEEP_FREEZE")]);
        let err = PutObjectInput::from_s3_request(&p, Some("b"), Some("k"), &[], Bytes::new()).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidStorageClass);

        let p = parts(http::Method::PUT, "/b/k", &[("x-amz-acl", "bucket-owner-full-controll")]);
        let err = PutObjectInput::from_s3_request(&p, Some("b"), Some("k"), &[], Bytes::new()).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_should_decode_get_object_overrides_and_preconditions() {
        let p = parts(
            http::Method::GET,
            "/b/k",
            &[
                ("range", "bytes=5-20"),
                ("if-none-match", "\"abc\""),
                ("if-modified-since", "Sun, 06 Nov 1994 08:49:37 GMT"),
                ("x-amz-server-side-encryption-customer-algorithm", "AES256"),
            ],
        );
        let q = query(&[("versionId", "v1"), ("response-content-type", "image/png")]);
        let input = GetObjectInput::from_s3_request(&p, Some("b"), Some("k"), &q, Bytes::new()).unwrap();
        assert_eq!(input.version_id.as_deref(), Some("v1"));
        assert_eq!(input.range.as_deref(), Some("bytes=5-20"));
        assert_eq!(input.preconditions.if_none_match.as_deref(), Some("\"abc\""));
        assert!(input.preconditions.if_modified_since.is_some());
        assert_eq!(input.response_overrides.content_type.as_deref(), Some("image/png"));
        assert_eq!(input.sse_customer.algorithm.as_deref(), Some("AES256"));
    }

    #[test]
    fn test_should_decode_copy_source_headers() {
        let p = parts(
            http::Method::PUT,
            "/b/k",
            &[
                ("x-amz-copy-source", "/src/a%20b"),
                ("x-amz-metadata-directive", "REPLACE"),
                ("x-amz-copy-source-if-match", "\"e\""),
            ],
        );
        let input = CopyObjectInput::from_s3_request(&p, Some("b"), Some("k"), &[], Bytes::new()).unwrap();
        assert_eq!(input.copy_source, "/src/a%20b");
        assert_eq!(input.metadata_directive, Some(MetadataDirective::Replace));
        assert_eq!(input.copy_source_preconditions.if_match.as_deref(), Some("\"e\""));
    }

    #[test]
    fn test_should_require_append_position() {
        let p = parts(http::Method::POST, "/b/k?append", &[]);
        let err = AppendObjectInput::from_s3_request(&p, Some("b"), Some("k"), &query(&[("append", "")]), Bytes::new())
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidArgument);

        let q = query(&[("append", ""), ("position", "42")]);
        let input = AppendObjectInput::from_s3_request(&p, Some("b"), Some("k"), &q, Bytes::new()).unwrap();
        assert_eq!(input.position, 42);
    }

    #[test]
    fn test_should_reject_non_numeric_max_keys() {
        let p = parts(http::Method::GET, "/b", &[]);
        let err = ListObjectsInput::from_s3_request(&p, Some("b"), None, &query(&[("max-keys", "ten")]), Bytes::new())
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_should_decode_create_bucket_location() {
        let p = parts(http::Method::PUT, "/b", &[]);
        let body = Bytes::from(
            "<CreateBucketConfiguration><LocationConstraint>us-east-1</LocationConstraint></CreateBucketConfiguration>",
        );
        let input = CreateBucketInput::from_s3_request(&p, Some("b"), None, &[], body).unwrap();
        assert_eq!(input.location_constraint.as_deref(), Some("us-east-1"));

        let input = CreateBucketInput::from_s3_request(&p, Some("b"), None, &[], Bytes::new()).unwrap();
        assert!(input.location_constraint.is_none());
    }

    #[test]
    fn test_should_reject_malformed_xml_body() {
        let p = parts(http::Method::PUT, "/b?versioning", &[]);
        let err = PutBucketVersioningInput::from_s3_request(&p, Some("b"), None, &[], Bytes::from("<oops"))
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedXML);
    }

    #[test]
    fn test_should_decode_post_object_form() {
        let body = crate::multipart::tests::form_body(
            "BOUND",
            &[
                ("key", "uploads/${filename}"),
                ("acl", "public-read"),
                ("x-amz-meta-Owner", "me"),
                ("success_action_status", "201"),
            ],
            b"png bytes",
        );
        let p = parts(
            http::Method::POST,
            "/b",
            &[("content-type", "multipart/form-data; boundary=BOUND")],
        );
        let input = PostObjectInput::from_s3_request(&p, Some("b"), None, &[], Bytes::from(body)).unwrap();
        assert_eq!(input.key, "uploads/cat.png");
        assert_eq!(input.acl, Some(CannedAcl::PublicRead));
        assert_eq!(input.metadata.get("owner").map(String::as_str), Some("me"));
        assert_eq!(input.content.content_type.as_deref(), Some("image/png"));
        assert_eq!(input.success_action_status, Some(201));
        assert_eq!(input.body.data.as_ref(), b"png bytes");
    }

    #[test]
    fn test_should_ignore_invalid_success_action_status() {
        let form = MultipartForm {
            fields: HashMap::from([
                ("Key".to_owned(), "k".to_owned()),
                ("Success_action_status".to_owned(), "302".to_owned()),
            ]),
            ..MultipartForm::default()
        };
        let input = post_object_input("b".to_owned(), form).unwrap();
        assert_eq!(input.success_action_status, None);
    }
}
