//! S3 request routing: virtual hosting resolution and operation identification.
//!
//! The [`S3Router`] maps incoming HTTP requests to S3 operations by examining:
//!
//! - The HTTP method (GET, PUT, DELETE, POST, HEAD)
//! - Whether a bucket name is present (from the Host header or path)
//! - Whether an object key is present (from the URI path)
//! - Query parameters that identify sub-resources (e.g., `?versioning`, `?append`)
//! - Specific headers (`x-amz-copy-source`, `x-amz-rename-source`)
//!
//! Sub-resources the gateway does not serve (`?notification`, `?tagging`,
//! `?torrent`, ...) are rejected here with `NotImplemented`, before any
//! authentication work happens.

use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use ferrogate_s3_model::operations::S3Operation;
use http::Method;
use percent_encoding::percent_decode_str;

/// Bucket sub-resources that exist in S3 but are not served.
const UNSUPPORTED_BUCKET_RESOURCES: [&str; 4] =
    ["notification", "replication", "tagging", "requestPayment"];

/// Object sub-resources that exist in S3 but are not served.
const UNSUPPORTED_OBJECT_RESOURCES: [&str; 1] = ["torrent"];

/// Configuration for S3 request routing.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// Base domains for virtual-hosted-style requests (e.g., `s3.localhost`).
    pub domains: Vec<String>,
    /// Whether to enable virtual-hosted-style bucket addressing.
    pub virtual_hosting: bool,
}

/// The result of routing an HTTP request to an S3 operation.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The resolved bucket name, if any.
    pub bucket: Option<String>,
    /// The resolved object key, if any.
    pub key: Option<String>,
    /// The identified S3 operation.
    pub operation: S3Operation,
    /// Parsed query parameters from the request URI.
    pub query_params: Vec<(String, String)>,
    /// True when the bucket came from the `Host` header.
    pub virtual_host: bool,
}

impl S3Router {
    /// Create a new router for the given domains.
    #[must_use]
    pub fn new(domains: Vec<String>, virtual_hosting: bool) -> Self {
        Self {
            domains,
            virtual_hosting,
        }
    }

    /// Resolve an HTTP request to a routing context containing the identified S3 operation.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotAllowed` for methods that have no meaning on the
    /// addressed resource and `NotImplemented` for unsupported sub-resources.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, S3Error> {
        let query_params = parse_query_params(req.uri().query().unwrap_or(""));
        let (bucket, key, virtual_host) = self.locate(req);

        let operation = identify_operation(
            req.method(),
            bucket.as_ref(),
            key.as_ref(),
            &query_params,
            req.headers(),
        )?;

        Ok(RoutingContext {
            bucket,
            key,
            operation,
            query_params,
            virtual_host,
        })
    }

    /// Bucket and key addressed by a request, and whether the bucket came
    /// from the Host header. Works for any method, including `OPTIONS`.
    #[must_use]
    pub fn locate<B>(&self, req: &http::Request<B>) -> (Option<String>, Option<String>, bool) {
        let virtual_bucket = if self.virtual_hosting {
            extract_virtual_host_bucket(req.headers(), &self.domains)
        } else {
            None
        };

        let path = req.uri().path();
        match virtual_bucket {
            Some(vhost_bucket) => {
                // The whole path is the key.
                let raw_key = path.strip_prefix('/').unwrap_or(path);
                let key = (!raw_key.is_empty()).then(|| decode_uri_component(raw_key));
                (Some(vhost_bucket), key, true)
            }
            None => {
                let (bucket, key) = parse_path(path);
                (bucket, key, false)
            }
        }
    }
}

/// Extract the bucket name from a virtual-hosted-style Host header.
///
/// With domain `s3.localhost`, the host `mybucket.s3.localhost:8080` yields
/// `mybucket`.
fn extract_virtual_host_bucket(headers: &http::HeaderMap, domains: &[String]) -> Option<String> {
    let host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())?;
    let host_without_port = host.split(':').next().unwrap_or(host);

    domains.iter().find_map(|domain| {
        host_without_port
            .strip_suffix(domain.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|bucket| !bucket.is_empty())
            .map(str::to_owned)
    })
}

/// Parse the URI path into an optional bucket and optional key.
///
/// Path format: `/{bucket}` or `/{bucket}/{key...}`
fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, None);
    }

    match trimmed.split_once('/') {
        Some((bucket, key_raw)) => {
            let key = (!key_raw.is_empty()).then(|| decode_uri_component(key_raw));
            (Some(decode_uri_component(bucket)), key)
        }
        None => (Some(decode_uri_component(trimmed)), None),
    }
}

/// Decode a percent-encoded URI component.
pub(crate) fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into key-value pairs.
pub(crate) fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_uri_component(k), decode_uri_component(v)),
            None => (decode_uri_component(pair), String::new()),
        })
        .collect()
}

fn query_has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn has_header(headers: &http::HeaderMap, name: &str) -> bool {
    headers.contains_key(name)
}

fn identify_operation(
    method: &Method,
    bucket: Option<&String>,
    key: Option<&String>,
    query: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, S3Error> {
    match (bucket, key) {
        (None, _) => identify_service_operation(method),
        (Some(_), None) => {
            if let Some(resource) = UNSUPPORTED_BUCKET_RESOURCES
                .iter()
                .find(|r| query_has_key(query, r))
            {
                return Err(S3Error::not_implemented(format!("?{resource}")));
            }
            match *method {
                Method::GET => Ok(identify_bucket_get(query)),
                Method::PUT => Ok(identify_bucket_put(query)),
                Method::DELETE => Ok(identify_bucket_delete(query)),
                Method::POST => Ok(identify_bucket_post(query)),
                Method::HEAD => Ok(S3Operation::HeadBucket),
                _ => Err(S3Error::method_not_allowed(method.as_str())),
            }
        }
        (Some(_), Some(_)) => {
            if let Some(resource) = UNSUPPORTED_OBJECT_RESOURCES
                .iter()
                .find(|r| query_has_key(query, r))
            {
                return Err(S3Error::not_implemented(format!("?{resource}")));
            }
            match *method {
                Method::GET => Ok(identify_object_get(query)),
                Method::PUT => Ok(identify_object_put(query, headers)),
                Method::DELETE => Ok(identify_object_delete(query)),
                Method::POST => identify_object_post(query),
                Method::HEAD => Ok(S3Operation::HeadObject),
                _ => Err(S3Error::method_not_allowed(method.as_str())),
            }
        }
    }
}

/// Requests without a bucket: only `GET /` (ListBuckets) is meaningful.
fn identify_service_operation(method: &Method) -> Result<S3Operation, S3Error> {
    if *method == Method::GET {
        Ok(S3Operation::ListBuckets)
    } else {
        Err(S3Error::with_message(
            S3ErrorCode::MethodNotAllowed,
            "The specified method is not allowed against this resource.",
        )
        .with_resource("/"))
    }
}

fn identify_bucket_get(query: &[(String, String)]) -> S3Operation {
    const TABLE: [(&str, S3Operation); 11] = [
        ("location", S3Operation::GetBucketLocation),
        ("versioning", S3Operation::GetBucketVersioning),
        ("encryption", S3Operation::GetBucketEncryption),
        ("cors", S3Operation::GetBucketCors),
        ("lifecycle", S3Operation::GetBucketLifecycle),
        ("policy", S3Operation::GetBucketPolicy),
        ("logging", S3Operation::GetBucketLogging),
        ("website", S3Operation::GetBucketWebsite),
        ("acl", S3Operation::GetBucketAcl),
        ("uploads", S3Operation::ListMultipartUploads),
        ("versions", S3Operation::ListObjectVersions),
    ];
    if query_value(query, "list-type") == Some("2") {
        return S3Operation::ListObjectsV2;
    }
    lookup(&TABLE, query).unwrap_or(S3Operation::ListObjects)
}

fn identify_bucket_put(query: &[(String, String)]) -> S3Operation {
    const TABLE: [(&str, S3Operation); 8] = [
        ("versioning", S3Operation::PutBucketVersioning),
        ("encryption", S3Operation::PutBucketEncryption),
        ("cors", S3Operation::PutBucketCors),
        ("lifecycle", S3Operation::PutBucketLifecycle),
        ("policy", S3Operation::PutBucketPolicy),
        ("logging", S3Operation::PutBucketLogging),
        ("website", S3Operation::PutBucketWebsite),
        ("acl", S3Operation::PutBucketAcl),
    ];
    lookup(&TABLE, query).unwrap_or(S3Operation::CreateBucket)
}

fn identify_bucket_delete(query: &[(String, String)]) -> S3Operation {
    const TABLE: [(&str, S3Operation); 5] = [
        ("encryption", S3Operation::DeleteBucketEncryption),
        ("cors", S3Operation::DeleteBucketCors),
        ("lifecycle", S3Operation::DeleteBucketLifecycle),
        ("policy", S3Operation::DeleteBucketPolicy),
        ("website", S3Operation::DeleteBucketWebsite),
    ];
    lookup(&TABLE, query).unwrap_or(S3Operation::DeleteBucket)
}

fn identify_bucket_post(query: &[(String, String)]) -> S3Operation {
    if query_has_key(query, "delete") {
        S3Operation::DeleteObjects
    } else {
        S3Operation::PostObject
    }
}

fn identify_object_get(query: &[(String, String)]) -> S3Operation {
    if query_has_key(query, "acl") {
        S3Operation::GetObjectAcl
    } else if query_has_key(query, "uploadId") {
        S3Operation::ListParts
    } else {
        S3Operation::GetObject
    }
}

fn identify_object_put(query: &[(String, String)], headers: &http::HeaderMap) -> S3Operation {
    if query_has_key(query, "acl") {
        return S3Operation::PutObjectAcl;
    }
    if query_has_key(query, "meta") {
        return S3Operation::PutObjectMeta;
    }
    if query_has_key(query, "partNumber") && query_has_key(query, "uploadId") {
        return if has_header(headers, "x-amz-copy-source") {
            S3Operation::UploadPartCopy
        } else {
            S3Operation::UploadPart
        };
    }
    if has_header(headers, "x-amz-copy-source") {
        return S3Operation::CopyObject;
    }
    if has_header(headers, "x-amz-rename-source") {
        return S3Operation::RenameObject;
    }
    S3Operation::PutObject
}

fn identify_object_delete(query: &[(String, String)]) -> S3Operation {
    if query_has_key(query, "uploadId") {
        S3Operation::AbortMultipartUpload
    } else {
        S3Operation::DeleteObject
    }
}

fn identify_object_post(query: &[(String, String)]) -> Result<S3Operation, S3Error> {
    if query_has_key(query, "uploads") {
        Ok(S3Operation::CreateMultipartUpload)
    } else if query_has_key(query, "uploadId") {
        Ok(S3Operation::CompleteMultipartUpload)
    } else if query_has_key(query, "append") {
        Ok(S3Operation::AppendObject)
    } else if query_has_key(query, "restore") {
        Ok(S3Operation::RestoreObject)
    } else {
        Err(S3Error::method_not_allowed("POST"))
    }
}

fn lookup(table: &[(&str, S3Operation)], query: &[(String, String)]) -> Option<S3Operation> {
    table
        .iter()
        .find(|(name, _)| query_has_key(query, name))
        .map(|(_, op)| *op)
}
