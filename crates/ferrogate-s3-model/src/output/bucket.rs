use crate::types::{
    AccessControlPolicy, BucketSummary, BucketVersioningStatus, CorsConfiguration, DeleteError,
    DeletedObject, LifecycleConfiguration, LoggingStatus, Owner,
    ServerSideEncryptionConfiguration, WebsiteConfiguration,
};

/// S3 ListBucketsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsOutput {
    /// Caller.
    pub owner: Owner,
    /// Buckets in name order.
    pub buckets: Vec<BucketSummary>,
}

/// S3 CreateBucketOutput.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketOutput {
    /// HTTP header: `Location`.
    pub location: String,
}

/// S3 GetBucketLocationOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketLocationOutput {
    /// Empty for the default region.
    pub location_constraint: Option<String>,
}

/// S3 GetBucketAclOutput. Also used for GetObjectAcl.
#[derive(Debug, Clone, Default)]
pub struct GetAclOutput {
    /// Expanded ACL.
    pub policy: AccessControlPolicy,
}

/// S3 GetBucketVersioningOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketVersioningOutput {
    /// `None` when versioning was never configured.
    pub status: Option<BucketVersioningStatus>,
}

/// S3 GetBucketCorsOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketCorsOutput {
    /// Stored rules.
    pub cors_configuration: CorsConfiguration,
}

/// S3 GetBucketLifecycleOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketLifecycleOutput {
    /// Stored rules.
    pub lifecycle_configuration: LifecycleConfiguration,
}

/// S3 GetBucketPolicyOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketPolicyOutput {
    /// Policy JSON as stored.
    pub policy: String,
}

/// S3 GetBucketWebsiteOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketWebsiteOutput {
    /// Stored configuration.
    pub website_configuration: WebsiteConfiguration,
}

/// S3 GetBucketEncryptionOutput.
#[derive(Debug, Clone)]
pub struct GetBucketEncryptionOutput {
    /// Stored default rule.
    pub server_side_encryption_configuration: ServerSideEncryptionConfiguration,
}

/// S3 GetBucketLoggingOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketLoggingOutput {
    /// Stored target.
    pub bucket_logging_status: LoggingStatus,
}

/// S3 DeleteObjectsOutput.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsOutput {
    /// Successfully deleted keys; empty in quiet mode.
    pub deleted: Vec<DeletedObject>,
    /// Failures.
    pub errors: Vec<DeleteError>,
}
