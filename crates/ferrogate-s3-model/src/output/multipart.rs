use chrono::{DateTime, Utc};

use super::SseResponse;

/// S3 CreateMultipartUploadOutput.
#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// New upload id.
    pub upload_id: String,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 UploadPartOutput.
#[derive(Debug, Clone, Default)]
pub struct UploadPartOutput {
    /// HTTP header: `ETag`, quoted.
    pub etag: String,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 UploadPartCopyOutput.
#[derive(Debug, Clone, Default)]
pub struct UploadPartCopyOutput {
    /// Quoted etag of the part.
    pub etag: String,
    /// Upload time of the part.
    pub last_modified: DateTime<Utc>,
    /// HTTP header: `x-amz-copy-source-version-id`.
    pub copy_source_version_id: Option<String>,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 CompleteMultipartUploadOutput.
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadOutput {
    /// Object URL path.
    pub location: String,
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Quoted `md5-N` etag.
    pub etag: String,
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// Encryption headers.
    pub sse: SseResponse,
}
