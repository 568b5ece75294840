//! Operation inputs, one struct per S3 operation.
//!
//! Field docs name the HTTP source the request decoder reads them from.

mod bucket;
mod config;
mod list;
mod multipart;
mod object;

pub use bucket::*;
pub use config::*;
pub use list::*;
pub use multipart::*;
pub use object::*;

use crate::types::ServerSideEncryption;

/// SSE-C key material sent with a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SseCustomerKey {
    /// `...-customer-algorithm`; must be `AES256`.
    pub algorithm: Option<String>,
    /// `...-customer-key`, base64.
    pub key: Option<String>,
    /// `...-customer-key-MD5`, base64.
    pub key_md5: Option<String>,
}

impl SseCustomerKey {
    /// Whether any SSE-C header was supplied.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.algorithm.is_some() || self.key.is_some() || self.key_md5.is_some()
    }
}

impl std::fmt::Debug for SseCustomerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseCustomerKey")
            .field("algorithm", &self.algorithm)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("key_md5", &self.key_md5)
            .finish()
    }
}

/// Server-side encryption requested for a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseRequest {
    /// HTTP header: `x-amz-server-side-encryption`.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// HTTP header: `x-amz-server-side-encryption-aws-kms-key-id`.
    pub kms_key_id: Option<String>,
    /// HTTP headers: `x-amz-server-side-encryption-customer-*`.
    pub customer: SseCustomerKey,
}

/// Standard representation headers stored with an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentHeaders {
    /// HTTP header: `Content-Type`.
    pub content_type: Option<String>,
    /// HTTP header: `Cache-Control`.
    pub cache_control: Option<String>,
    /// HTTP header: `Content-Disposition`.
    pub content_disposition: Option<String>,
    /// HTTP header: `Content-Encoding`.
    pub content_encoding: Option<String>,
    /// HTTP header: `Content-Language`.
    pub content_language: Option<String>,
    /// HTTP header: `Expires`.
    pub expires: Option<String>,
    /// HTTP header: `x-amz-website-redirect-location`.
    pub website_redirect_location: Option<String>,
}

impl ContentHeaders {
    /// Header name and value pairs that are set.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("Content-Type", &self.content_type),
            ("Cache-Control", &self.cache_control),
            ("Content-Disposition", &self.content_disposition),
            ("Content-Encoding", &self.content_encoding),
            ("Content-Language", &self.content_language),
            ("Expires", &self.expires),
            (
                "x-amz-website-redirect-location",
                &self.website_redirect_location,
            ),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// Preconditions evaluated against an object before it is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    /// `If-Match` / `x-amz-copy-source-if-match`.
    pub if_match: Option<String>,
    /// `If-None-Match` / `x-amz-copy-source-if-none-match`.
    pub if_none_match: Option<String>,
    /// `If-Modified-Since` / `x-amz-copy-source-if-modified-since`.
    pub if_modified_since: Option<chrono::DateTime<chrono::Utc>>,
    /// `If-Unmodified-Since` / `x-amz-copy-source-if-unmodified-since`.
    pub if_unmodified_since: Option<chrono::DateTime<chrono::Utc>>,
}
