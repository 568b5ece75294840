use crate::types::{
    AccessControlPolicy, BucketVersioningStatus, CannedAcl, CorsConfiguration,
    LifecycleConfiguration, LoggingStatus, ServerSideEncryptionConfiguration,
    WebsiteConfiguration,
};

macro_rules! bucket_only_input {
    ($($name:ident),+ $(,)?) => {
        $(
            #[doc = concat!("S3 ", stringify!($name), ".")]
            #[derive(Debug, Clone, Default)]
            pub struct $name {
                /// HTTP label (URI path).
                pub bucket: String,
            }
        )+
    };
}

bucket_only_input!(
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

/// S3 PutBucketAclInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketAclInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP header: `x-amz-acl`.
    pub acl: Option<CannedAcl>,
    /// HTTP payload body.
    pub access_control_policy: Option<AccessControlPolicy>,
}

/// S3 PutBucketVersioningInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketVersioningInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body: `VersioningConfiguration/Status`.
    pub status: Option<BucketVersioningStatus>,
}

/// S3 PutBucketCorsInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketCorsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub cors_configuration: CorsConfiguration,
}

/// S3 PutBucketLifecycleInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketLifecycleInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub lifecycle_configuration: LifecycleConfiguration,
}

/// S3 PutBucketPolicyInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketPolicyInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body (JSON).
    pub policy: String,
}

/// S3 PutBucketWebsiteInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketWebsiteInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub website_configuration: WebsiteConfiguration,
}

/// S3 PutBucketEncryptionInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketEncryptionInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub server_side_encryption_configuration: Option<ServerSideEncryptionConfiguration>,
}

/// S3 PutBucketLoggingInput.
#[derive(Debug, Clone, Default)]
pub struct PutBucketLoggingInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP payload body.
    pub bucket_logging_status: LoggingStatus,
}
