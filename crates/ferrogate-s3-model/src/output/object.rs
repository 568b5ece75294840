use std::collections::HashMap;
use std::pin::Pin;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::SseResponse;
use crate::input::ContentHeaders;
use crate::types::{ObjectType, StorageClass};

/// Object payload returned by GetObject.
pub enum ObjectBody {
    /// Fully buffered payload.
    Bytes(Bytes),
    /// Payload produced lazily by a reader. `length` is the exact byte count.
    Reader {
        /// Source of the payload.
        reader: Pin<Box<dyn tokio::io::AsyncRead + Send>>,
        /// Exact number of bytes the reader yields.
        length: u64,
    },
}

impl ObjectBody {
    /// Number of bytes in the body.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(b) => b.len() as u64,
            Self::Reader { length, .. } => *length,
        }
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObjectBody {
    fn default() -> Self {
        Self::Bytes(Bytes::new())
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Reader { length, .. } => {
                f.debug_struct("Reader").field("length", length).finish_non_exhaustive()
            }
        }
    }
}

/// S3 HeadObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct HeadObjectOutput {
    /// HTTP header: `Content-Length` (full object size).
    pub content_length: u64,
    /// HTTP header: `ETag`, quoted.
    pub etag: String,
    /// HTTP header: `Last-Modified`.
    pub last_modified: DateTime<Utc>,
    /// Representation headers, after `response-*` overrides.
    pub content: ContentHeaders,
    /// HTTP prefix headers: `x-amz-meta-`.
    pub metadata: HashMap<String, String>,
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// HTTP header: `x-amz-storage-class` (omitted for STANDARD).
    pub storage_class: StorageClass,
    /// HTTP header: `x-amz-restore`.
    pub restore: Option<String>,
    /// HTTP header: `x-amz-object-type`.
    pub object_type: ObjectType,
    /// HTTP header: `x-amz-next-append-position`, appendable objects only.
    pub next_append_position: Option<u64>,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 GetObjectOutput.
#[derive(Debug, Default)]
pub struct GetObjectOutput {
    /// Headers shared with HeadObject.
    pub head: HeadObjectOutput,
    /// HTTP header: `Content-Range`; set for 206 responses.
    pub content_range: Option<String>,
    /// HTTP payload body.
    pub body: ObjectBody,
}

/// S3 PutObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOutput {
    /// HTTP header: `ETag`, quoted.
    pub etag: String,
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// AppendObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct AppendObjectOutput {
    /// HTTP header: `ETag`, quoted.
    pub etag: String,
    /// HTTP header: `x-amz-next-append-position`.
    pub next_append_position: u64,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 CopyObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct CopyObjectOutput {
    /// Quoted etag of the new object.
    pub etag: String,
    /// Modification time of the new object.
    pub last_modified: DateTime<Utc>,
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// HTTP header: `x-amz-copy-source-version-id`.
    pub copy_source_version_id: Option<String>,
    /// Encryption headers.
    pub sse: SseResponse,
}

/// S3 DeleteObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectOutput {
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// HTTP header: `x-amz-delete-marker`.
    pub delete_marker: bool,
}

/// S3 RestoreObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct RestoreObjectOutput {
    /// `true` yields 202 (restore started), `false` yields 200 (extended).
    pub accepted: bool,
}

/// S3 PostObjectOutput.
#[derive(Debug, Clone, Default)]
pub struct PostObjectOutput {
    /// Bucket name.
    pub bucket: String,
    /// Stored key.
    pub key: String,
    /// Quoted etag.
    pub etag: String,
    /// Object URL path.
    pub location: String,
    /// HTTP header: `x-amz-version-id`.
    pub version_id: Option<String>,
    /// Status requested by the form.
    pub success_action_status: Option<u16>,
    /// Redirect requested by the form.
    pub success_action_redirect: Option<String>,
}
