use crate::types::{CannedAcl, Delete};

/// S3 ListBucketsInput.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsInput {}

/// S3 CreateBucketInput.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP header: `x-amz-acl`.
    pub acl: Option<CannedAcl>,
    /// HTTP payload body: `CreateBucketConfiguration/LocationConstraint`.
    pub location_constraint: Option<String>,
}

/// S3 HeadBucketInput.
#[derive(Debug, Clone, Default)]
pub struct HeadBucketInput {
    /// HTTP label (URI path).
    pub bucket: String,
}

/// S3 DeleteBucketInput.
#[derive(Debug, Clone, Default)]
pub struct DeleteBucketInput {
    /// HTTP label (URI path).
    pub bucket: String,
}

/// S3 GetBucketLocationInput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketLocationInput {
    /// HTTP label (URI path).
    pub bucket: String,
}

/// S3 DeleteObjectsInput.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub delete: Delete,
    /// HTTP header: `Content-MD5`.
    pub content_md5: Option<String>,
}
