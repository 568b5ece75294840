use std::collections::HashMap;

use super::{ContentHeaders, Preconditions, SseCustomerKey, SseRequest};
use crate::request::StreamingBlob;
use crate::types::{CannedAcl, CompletedPart, StorageClass};

/// S3 CreateMultipartUploadInput.
#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// Representation headers for the final object.
    pub content: ContentHeaders,
    /// HTTP prefix headers: `x-amz-meta-`.
    pub metadata: HashMap<String, String>,
    /// HTTP header: `x-amz-acl`.
    pub acl: Option<CannedAcl>,
    /// HTTP header: `x-amz-storage-class`.
    pub storage_class: Option<StorageClass>,
    /// Encryption headers.
    pub sse: SseRequest,
}

/// S3 UploadPartInput.
#[derive(Debug, Clone, Default)]
pub struct UploadPartInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `uploadId`.
    pub upload_id: String,
    /// HTTP query: `partNumber`.
    pub part_number: i32,
    /// HTTP payload body.
    pub body: StreamingBlob,
    /// HTTP header: `Content-Length`.
    pub content_length: Option<u64>,
    /// HTTP header: `Content-MD5`.
    pub content_md5: Option<String>,
    /// SSE-C key, required when the upload uses SSE-C.
    pub sse_customer: SseCustomerKey,
}

/// S3 UploadPartCopyInput.
#[derive(Debug, Clone, Default)]
pub struct UploadPartCopyInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `uploadId`.
    pub upload_id: String,
    /// HTTP query: `partNumber`.
    pub part_number: i32,
    /// HTTP header: `x-amz-copy-source`.
    pub copy_source: String,
    /// HTTP header: `x-amz-copy-source-range`.
    pub copy_source_range: Option<String>,
    /// HTTP headers: `x-amz-copy-source-if-*`.
    pub copy_source_preconditions: Preconditions,
    /// HTTP headers: `x-amz-copy-source-server-side-encryption-customer-*`.
    pub copy_source_sse_customer: SseCustomerKey,
    /// SSE-C key of the destination upload.
    pub sse_customer: SseCustomerKey,
}

/// S3 CompleteMultipartUploadInput.
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `uploadId`.
    pub upload_id: String,
    /// HTTP payload body.
    pub parts: Vec<CompletedPart>,
}

/// S3 AbortMultipartUploadInput.
#[derive(Debug, Clone, Default)]
pub struct AbortMultipartUploadInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `uploadId`.
    pub upload_id: String,
}
