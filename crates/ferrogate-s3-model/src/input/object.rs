use std::collections::HashMap;

use super::{ContentHeaders, Preconditions, SseCustomerKey, SseRequest};
use crate::request::StreamingBlob;
use crate::types::{AccessControlPolicy, CannedAcl, MetadataDirective, StorageClass};

/// S3 PutObjectInput.
#[derive(Debug, Clone, Default)]
pub struct PutObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP payload body.
    pub body: StreamingBlob,
    /// HTTP header: `Content-Length` (or `x-amz-decoded-content-length`).
    pub content_length: Option<u64>,
    /// HTTP header: `Content-MD5`.
    pub content_md5: Option<String>,
    /// Representation headers.
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

/// S3 GetObjectInput. Also used for HeadObject.
#[derive(Debug, Clone, Default)]
pub struct GetObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `versionId`.
    pub version_id: Option<String>,
    /// HTTP header: `Range`.
    pub range: Option<String>,
    /// Conditional request headers.
    pub preconditions: Preconditions,
    /// HTTP query: `response-*` overrides.
    pub response_overrides: ContentHeaders,
    /// SSE-C key needed to decrypt.
    pub sse_customer: SseCustomerKey,
}

/// S3 HeadObjectInput.
pub type HeadObjectInput = GetObjectInput;

/// S3 CopyObjectInput.
#[derive(Debug, Clone, Default)]
pub struct CopyObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP header: `x-amz-copy-source`.
    pub copy_source: String,
    /// HTTP header: `x-amz-metadata-directive`.
    pub metadata_directive: Option<MetadataDirective>,
    /// HTTP headers: `x-amz-copy-source-if-*`.
    pub copy_source_preconditions: Preconditions,
    /// HTTP headers: `x-amz-copy-source-server-side-encryption-customer-*`.
    pub copy_source_sse_customer: SseCustomerKey,
    /// Representation headers used with `REPLACE`.
    pub content: ContentHeaders,
    /// HTTP prefix headers: `x-amz-meta-`.
    pub metadata: HashMap<String, String>,
    /// HTTP header: `x-amz-acl`.
    pub acl: Option<CannedAcl>,
    /// HTTP header: `x-amz-storage-class`.
    pub storage_class: Option<StorageClass>,
    /// Destination encryption headers.
    pub sse: SseRequest,
}

/// S3 DeleteObjectInput.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `versionId`.
    pub version_id: Option<String>,
}

/// RenameObjectInput.
#[derive(Debug, Clone, Default)]
pub struct RenameObjectInput {
    /// HTTP label (URI path): the new key.
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP header: `x-amz-rename-source`, the current key.
    pub rename_source: String,
}

/// AppendObjectInput.
#[derive(Debug, Clone, Default)]
pub struct AppendObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `position`.
    pub position: u64,
    /// HTTP payload body.
    pub body: StreamingBlob,
    /// HTTP header: `Content-Length`.
    pub content_length: Option<u64>,
    /// HTTP header: `Content-MD5`.
    pub content_md5: Option<String>,
    /// Representation headers, applied on the first append.
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

/// S3 GetObjectAclInput.
#[derive(Debug, Clone, Default)]
pub struct GetObjectAclInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `versionId`.
    pub version_id: Option<String>,
}

/// S3 PutObjectAclInput.
#[derive(Debug, Clone, Default)]
pub struct PutObjectAclInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `versionId`.
    pub version_id: Option<String>,
    /// HTTP header: `x-amz-acl`.
    pub acl: Option<CannedAcl>,
    /// HTTP payload body.
    pub access_control_policy: Option<AccessControlPolicy>,
}

/// PutObjectMetaInput.
#[derive(Debug, Clone, Default)]
pub struct PutObjectMetaInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// Representation headers replacing the stored ones.
    pub content: ContentHeaders,
    /// HTTP prefix headers: `x-amz-meta-`.
    pub metadata: HashMap<String, String>,
}

/// S3 RestoreObjectInput.
#[derive(Debug, Clone, Default)]
pub struct RestoreObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `versionId`.
    pub version_id: Option<String>,
    /// HTTP payload body: `RestoreRequest/Days`.
    pub days: u32,
}

/// S3 PostObjectInput, decoded from a `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct PostObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// Form field: `key`, with `${filename}` substituted.
    pub key: String,
    /// Form file part.
    pub body: StreamingBlob,
    /// Form fields: representation headers.
    pub content: ContentHeaders,
    /// Form fields: `x-amz-meta-*`.
    pub metadata: HashMap<String, String>,
    /// Form field: `acl`.
    pub acl: Option<CannedAcl>,
    /// Form field: `x-amz-storage-class`.
    pub storage_class: Option<StorageClass>,
    /// Form fields: encryption.
    pub sse: SseRequest,
    /// Form field: `success_action_status`.
    pub success_action_status: Option<u16>,
    /// Form field: `success_action_redirect` (or `redirect`).
    pub success_action_redirect: Option<String>,
}
