//! S3 output struct to HTTP response encoding.
//!
//! This module provides the [`IntoS3Response`] trait and implementations for converting
//! typed outputs from `ferrogate-s3-model` into HTTP responses with the appropriate
//! status code, headers, and body.
//!
//! Response categories:
//! - **Header-only**: write operations that return metadata in response headers.
//! - **XML body**: list operations and configuration getters.
//! - **Object body**: `GetObject` streams the payload.
//! - **Mixed**: `CopyObject` and `UploadPartCopy` return an XML body and headers.

use bytes::Bytes;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::output::SseResponse;
use ferrogate_s3_model::types::StorageClass;
use ferrogate_s3_xml::{S3Serialize, to_xml};
use http::header::HeaderValue;

use crate::body::S3ResponseBody;

/// Trait for converting an S3 output struct into an HTTP response.
pub trait IntoS3Response {
    /// Convert this output into an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` if the response cannot be constructed (e.g., XML
    /// serialization fails).
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error>;
}

// ---------------------------------------------------------------------------
// Helper functions for building responses
// ---------------------------------------------------------------------------

/// Set an optional header on a response builder if the value is `Some`.
fn set_optional_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<&str>,
) -> http::response::Builder {
    if let Some(v) = value {
        if let Ok(hv) = HeaderValue::from_str(v) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Set an HTTP date header from a `DateTime<Utc>`.
fn set_timestamp_header(
    builder: http::response::Builder,
    name: &str,
    value: &chrono::DateTime<chrono::Utc>,
) -> http::response::Builder {
    builder.header(name, value.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Set metadata prefix headers from a `HashMap`.
fn set_metadata_headers(
    mut builder: http::response::Builder,
    metadata: &std::collections::HashMap<String, String>,
) -> http::response::Builder {
    for (key, value) in metadata {
        let header_name = format!("x-amz-meta-{key}");
        if let Ok(hv) = HeaderValue::from_str(value) {
            builder = builder.header(header_name, hv);
        }
    }
    builder
}

/// Server-side encryption headers.
fn set_sse_headers(builder: http::response::Builder, sse: &SseResponse) -> http::response::Builder {
    let mut builder = set_optional_header(
        builder,
        "x-amz-server-side-encryption",
        sse.server_side_encryption.as_ref().map(|s| s.as_str()),
    );
    builder = set_optional_header(
        builder,
        "x-amz-server-side-encryption-aws-kms-key-id",
        sse.kms_key_id.as_deref(),
    );
    builder = set_optional_header(
        builder,
        "x-amz-server-side-encryption-customer-algorithm",
        sse.customer_algorithm.as_deref(),
    );
    set_optional_header(
        builder,
        "x-amz-server-side-encryption-customer-key-MD5",
        sse.customer_key_md5.as_deref(),
    )
}

/// Build a response from a builder, converting build errors to `S3Error`.
fn build_response(
    builder: http::response::Builder,
    body: S3ResponseBody,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    builder
        .body(body)
        .map_err(|e| S3Error::internal_error(format!("failed to build HTTP response: {e}")))
}

fn xml_body<T: S3Serialize>(root: &str, value: &T) -> Result<S3ResponseBody, S3Error> {
    to_xml(root, value)
        .map(S3ResponseBody::from_xml)
        .map_err(|e| S3Error::internal_error(format!("failed to serialize {root}: {e}")))
}

fn xml_response<T: S3Serialize>(
    builder: http::response::Builder,
    root: &str,
    value: &T,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    build_response(
        builder.header("Content-Type", "application/xml"),
        xml_body(root, value)?,
    )
}

/// An empty response with the given status.
///
/// # Errors
///
/// Never fails for valid status codes.
pub fn empty_response(status: http::StatusCode) -> Result<http::Response<S3ResponseBody>, S3Error> {
    build_response(http::Response::builder().status(status), S3ResponseBody::empty())
}

impl IntoS3Response for () {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        empty_response(http::StatusCode::OK)
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

#[allow(clippy::wildcard_imports)] // All output types are used in IntoS3Response impls below.
use ferrogate_s3_model::output::*;

// --- Bucket operations ---

impl IntoS3Response for CreateBucketOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = http::Response::builder().status(http::StatusCode::OK);
        let builder = set_optional_header(builder, "Location", Some(&self.location));
        build_response(builder, S3ResponseBody::empty())
    }
}

impl IntoS3Response for ListBucketsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response(http::Response::builder(), "ListAllMyBucketsResult", &self)
    }
}

impl IntoS3Response for DeleteObjectsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response(http::Response::builder(), "DeleteResult", &self)
    }
}

impl IntoS3Response for GetBucketPolicyOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = http::Response::builder()
            .status(http::StatusCode::OK)
            .header("Content-Type", "application/json");
        build_response(builder, S3ResponseBody::from_string(self.policy))
    }
}

/// Outputs that render as a single XML document under a fixed root element.
macro_rules! impl_xml_body_response {
    ($($ty:ty => $root:literal),+ $(,)?) => {
        $(
            impl IntoS3Response for $ty {
                fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
                    xml_response(http::Response::builder(), $root, &self)
                }
            }
        )+
    };
}

impl_xml_body_response!(
    GetBucketLocationOutput => "LocationConstraint",
    GetAclOutput => "AccessControlPolicy",
    GetBucketVersioningOutput => "VersioningConfiguration",
    GetBucketCorsOutput => "CORSConfiguration",
    GetBucketLifecycleOutput => "LifecycleConfiguration",
    GetBucketWebsiteOutput => "WebsiteConfiguration",
    GetBucketEncryptionOutput => "ServerSideEncryptionConfiguration",
    GetBucketLoggingOutput => "BucketLoggingStatus",
    ListObjectsOutput => "ListBucketResult",
    ListObjectsV2Output => "ListBucketResult",
    ListObjectVersionsOutput => "ListVersionsResult",
    ListMultipartUploadsOutput => "ListMultipartUploadsResult",
    ListPartsOutput => "ListPartsResult",
);

// --- Object operations ---

/// Headers shared by GetObject and HeadObject.
fn set_object_headers(
    mut builder: http::response::Builder,
    head: &HeadObjectOutput,
) -> http::response::Builder {
    builder = builder.header("ETag", head.etag.as_str());
    builder = set_timestamp_header(builder, "Last-Modified", &head.last_modified);
    for (name, value) in head.content.pairs() {
        builder = set_optional_header(builder, name, Some(value));
    }
    builder = set_metadata_headers(builder, &head.metadata);
    builder = set_optional_header(builder, "x-amz-version-id", head.version_id.as_deref());
    if head.storage_class != StorageClass::Standard {
        builder = builder.header("x-amz-storage-class", head.storage_class.as_str());
    }
    builder = set_optional_header(builder, "x-amz-restore", head.restore.as_deref());
    builder = builder.header("x-amz-object-type", head.object_type.as_str());
    if let Some(position) = head.next_append_position {
        builder = builder.header("x-amz-next-append-position", position);
    }
    set_sse_headers(builder, &head.sse)
}

impl IntoS3Response for GetObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let status = if self.content_range.is_some() {
            http::StatusCode::PARTIAL_CONTENT
        } else {
            http::StatusCode::OK
        };
        let mut builder = http::Response::builder().status(status);
        builder = set_object_headers(builder, &self.head);
        builder = builder.header("Content-Length", self.body.len());
        builder = set_optional_header(builder, "Content-Range", self.content_range.as_deref());
        build_response(builder, S3ResponseBody::from(self.body))
    }
}

impl IntoS3Response for HeadObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder().status(http::StatusCode::OK);
        builder = set_object_headers(builder, &self);
        builder = builder.header("Content-Length", self.content_length);
        build_response(builder, S3ResponseBody::empty())
    }
}

impl IntoS3Response for PutObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder()
            .status(http::StatusCode::OK)
            .header("ETag", self.etag.as_str());
        builder = set_optional_header(builder, "x-amz-version-id", self.version_id.as_deref());
        builder = set_sse_headers(builder, &self.sse);
        build_response(builder, S3ResponseBody::empty())
    }
}

impl IntoS3Response for AppendObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder()
            .status(http::StatusCode::OK)
            .header("ETag", self.etag.as_str())
            .header("x-amz-next-append-position", self.next_append_position);
        builder = set_sse_headers(builder, &self.sse);
        build_response(builder, S3ResponseBody::empty())
    }
}

impl IntoS3Response for CopyObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder().status(http::StatusCode::OK);
        builder = set_optional_header(builder, "x-amz-version-id", self.version_id.as_deref());
        builder = set_optional_header(
            builder,
            "x-amz-copy-source-version-id",
            self.copy_source_version_id.as_deref(),
        );
        builder = set_sse_headers(builder, &self.sse);
        xml_response(builder, "CopyObjectResult", &self)
    }
}

impl IntoS3Response for DeleteObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder().status(http::StatusCode::NO_CONTENT);
        builder = set_optional_header(builder, "x-amz-version-id", self.version_id.as_deref());
        if self.delete_marker {
            builder = builder.header("x-amz-delete-marker", "true");
        }
        build_response(builder, S3ResponseBody::empty())
    }
}

impl IntoS3Response for RestoreObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        empty_response(if self.accepted {
            http::StatusCode::ACCEPTED
        } else {
            http::StatusCode::OK
        })
    }
}

/// Form uploads answer with a 303 redirect when one was requested, otherwise
/// with the requested success status (204 when unset).
impl IntoS3Response for PostObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        if let Some(redirect) = &self.success_action_redirect {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("bucket", &self.bucket)
                .append_pair("key", &self.key)
                .append_pair("etag", &self.etag)
                .finish();
            let separator = if redirect.contains('?') { '&' } else { '?' };
            let location = format!("{redirect}{separator}{query}");
            let builder = http::Response::builder()
                .status(http::StatusCode::SEE_OTHER)
                .header("ETag", self.etag.as_str());
            let builder = set_optional_header(builder, "Location", Some(&location));
            return build_response(builder, S3ResponseBody::empty());
        }

        let mut builder = http::Response::builder().header("ETag", self.etag.as_str());
        builder = set_optional_header(builder, "Location", Some(&self.location));
        builder = set_optional_header(builder, "x-amz-version-id", self.version_id.as_deref());
        match self.success_action_status {
            Some(201) => xml_response(builder.status(http::StatusCode::CREATED), "PostResponse", &self),
            Some(200) => build_response(builder.status(http::StatusCode::OK), S3ResponseBody::empty()),
            _ => build_response(
                builder.status(http::StatusCode::NO_CONTENT),
                S3ResponseBody::empty(),
            ),
        }
    }
}

// --- Multipart operations ---

impl IntoS3Response for CreateMultipartUploadOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = set_sse_headers(http::Response::builder(), &self.sse);
        xml_response(builder, "InitiateMultipartUploadResult", &self)
    }
}

impl IntoS3Response for UploadPartOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = http::Response::builder()
            .status(http::StatusCode::OK)
            .header("ETag", self.etag.as_str());
        build_response(set_sse_headers(builder, &self.sse), S3ResponseBody::empty())
    }
}

impl IntoS3Response for UploadPartCopyOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = set_optional_header(
            http::Response::builder(),
            "x-amz-copy-source-version-id",
            self.copy_source_version_id.as_deref(),
        );
        builder = set_sse_headers(builder, &self.sse);
        xml_response(builder, "CopyPartResult", &self)
    }
}

impl IntoS3Response for CompleteMultipartUploadOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder =
            set_optional_header(http::Response::builder(), "x-amz-version-id", self.version_id.as_deref());
        builder = set_sse_headers(builder, &self.sse);
        xml_response(builder, "CompleteMultipartUploadResult", &self)
    }
}

// --- S3Error to HTTP response ---

/// Convert an `S3Error` into an HTTP error response.
///
/// The `<Error>` document is omitted for HEAD requests and for 304 responses,
/// which carry no body.
#[must_use]
pub fn error_to_response(
    err: &S3Error,
    request_id: &str,
    is_head: bool,
) -> http::Response<S3ResponseBody> {
    let status = err.status_code;
    let bodiless = is_head || status == http::StatusCode::NOT_MODIFIED;

    let mut builder = http::Response::builder().status(status);
    for (name, value) in &err.headers {
        builder = set_optional_header(builder, name, Some(value));
    }
    let body = if bodiless {
        S3ResponseBody::empty()
    } else {
        builder = builder.header("Content-Type", "application/xml");
        S3ResponseBody::from_bytes(Bytes::from(ferrogate_s3_xml::error_to_xml(err, request_id)))
    };

    builder.body(body).unwrap_or_else(|_| {
        let mut fallback = http::Response::new(S3ResponseBody::empty());
        *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
