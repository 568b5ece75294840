//! The set of S3 operations served by the gateway.

macro_rules! define_operations {
    ($( $(#[$meta:meta])* $name:ident => $action:literal $(, alias $alias:literal)? ;)+) => {
        /// All supported S3 operations.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum S3Operation {
            $( $(#[$meta])* $name, )+
        }

        impl S3Operation {
            /// Every operation, in declaration order.
            pub const ALL: &'static [S3Operation] = &[$(Self::$name,)+];

            /// Returns the AWS operation name string.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )+
                }
            }

            /// Returns the IAM action evaluated by bucket policies for this operation.
            #[must_use]
            pub fn policy_action(&self) -> &'static str {
                match self {
                    $( Self::$name => $action, )+
                }
            }

            /// Parse an operation name, accepting the legacy gateway aliases
            /// (`MakeBucket`, `NewMultipartUpload`, ...).
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( stringify!($name) $(| $alias)? => Some(Self::$name), )+
                    _ => None,
                }
            }
        }
    };
}

define_operations! {
    /// List all buckets owned by the caller.
    ListBuckets => "s3:ListAllMyBuckets";
    /// Create a bucket.
    CreateBucket => "s3:CreateBucket", alias "MakeBucket";
    /// Check bucket existence and access.
    HeadBucket => "s3:ListBucket";
    /// Delete an empty bucket.
    DeleteBucket => "s3:DeleteBucket";
    /// Return the bucket region.
    GetBucketLocation => "s3:GetBucketLocation";
    /// Return the bucket ACL.
    GetBucketAcl => "s3:GetBucketAcl";
    /// Replace the bucket ACL.
    PutBucketAcl => "s3:PutBucketAcl";
    /// Return the versioning state.
    GetBucketVersioning => "s3:GetBucketVersioning";
    /// Change the versioning state.
    PutBucketVersioning => "s3:PutBucketVersioning";
    /// Return the CORS rules.
    GetBucketCors => "s3:GetBucketCORS";
    /// Replace the CORS rules.
    PutBucketCors => "s3:PutBucketCORS";
    /// Remove the CORS rules.
    DeleteBucketCors => "s3:PutBucketCORS";
    /// Return the lifecycle configuration.
    GetBucketLifecycle => "s3:GetLifecycleConfiguration";
    /// Replace the lifecycle configuration.
    PutBucketLifecycle => "s3:PutLifecycleConfiguration";
    /// Remove the lifecycle configuration.
    DeleteBucketLifecycle => "s3:PutLifecycleConfiguration";
    /// Return the bucket policy document.
    GetBucketPolicy => "s3:GetBucketPolicy";
    /// Replace the bucket policy document.
    PutBucketPolicy => "s3:PutBucketPolicy";
    /// Remove the bucket policy document.
    DeleteBucketPolicy => "s3:DeleteBucketPolicy";
    /// Return the website configuration.
    GetBucketWebsite => "s3:GetBucketWebsite";
    /// Replace the website configuration.
    PutBucketWebsite => "s3:PutBucketWebsite";
    /// Remove the website configuration.
    DeleteBucketWebsite => "s3:DeleteBucketWebsite";
    /// Return the default encryption rule.
    GetBucketEncryption => "s3:GetEncryptionConfiguration";
    /// Replace the default encryption rule.
    PutBucketEncryption => "s3:PutEncryptionConfiguration";
    /// Remove the default encryption rule.
    DeleteBucketEncryption => "s3:PutEncryptionConfiguration";
    /// Return the logging target.
    GetBucketLogging => "s3:GetBucketLogging";
    /// Replace the logging target.
    PutBucketLogging => "s3:PutBucketLogging";
    /// List objects (v1 marker pagination).
    ListObjects => "s3:ListBucket";
    /// List objects (v2 continuation tokens).
    ListObjectsV2 => "s3:ListBucket";
    /// List every object version.
    ListObjectVersions => "s3:ListBucketVersions", alias "ListVersionedObjects";
    /// List in-progress multipart uploads.
    ListMultipartUploads => "s3:ListBucketMultipartUploads";
    /// Delete up to 1000 keys in one request.
    DeleteObjects => "s3:DeleteObject", alias "DeleteMultipleObjects";
    /// Browser form upload authenticated by a POST policy.
    PostObject => "s3:PutObject";
    /// Return object metadata.
    HeadObject => "s3:GetObject";
    /// Return object data.
    GetObject => "s3:GetObject";
    /// Store an object.
    PutObject => "s3:PutObject";
    /// Server-side copy.
    CopyObject => "s3:PutObject";
    /// Delete an object or version.
    DeleteObject => "s3:DeleteObject";
    /// Rename an object in place.
    RenameObject => "s3:PutObject";
    /// Append bytes to an appendable object.
    AppendObject => "s3:PutObject";
    /// Return the object ACL.
    GetObjectAcl => "s3:GetObjectAcl";
    /// Replace the object ACL.
    PutObjectAcl => "s3:PutObjectAcl";
    /// Replace object metadata without touching data.
    PutObjectMeta => "s3:PutObject";
    /// Restore a cold-tier object.
    RestoreObject => "s3:RestoreObject";
    /// Start a multipart upload.
    CreateMultipartUpload => "s3:PutObject", alias "NewMultipartUpload";
    /// Upload one part.
    UploadPart => "s3:PutObject", alias "PutObjectPart";
    /// Copy a source range into a part.
    UploadPartCopy => "s3:PutObject", alias "CopyObjectPart";
    /// List uploaded parts.
    ListParts => "s3:ListMultipartUploadParts", alias "ListObjectParts";
    /// Assemble uploaded parts into an object.
    CompleteMultipartUpload => "s3:PutObject";
    /// Discard an upload and its parts.
    AbortMultipartUpload => "s3:AbortMultipartUpload";
}

impl S3Operation {
    /// Whether this operation targets an object key rather than a bucket.
    #[must_use]
    pub fn is_object_operation(&self) -> bool {
        matches!(
            self,
            Self::HeadObject
                | Self::GetObject
                | Self::PutObject
                | Self::CopyObject
                | Self::DeleteObject
                | Self::RenameObject
                | Self::AppendObject
                | Self::GetObjectAcl
                | Self::PutObjectAcl
                | Self::PutObjectMeta
                | Self::RestoreObject
                | Self::CreateMultipartUpload
                | Self::UploadPart
                | Self::UploadPartCopy
                | Self::ListParts
                | Self::CompleteMultipartUpload
                | Self::AbortMultipartUpload
        )
    }

    /// Whether the operation only reads state.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::ListBuckets
                | Self::HeadBucket
                | Self::GetBucketLocation
                | Self::GetBucketAcl
                | Self::GetBucketVersioning
                | Self::GetBucketCors
                | Self::GetBucketLifecycle
                | Self::GetBucketPolicy
                | Self::GetBucketWebsite
                | Self::GetBucketEncryption
                | Self::GetBucketLogging
                | Self::ListObjects
                | Self::ListObjectsV2
                | Self::ListObjectVersions
                | Self::ListMultipartUploads
                | Self::HeadObject
                | Self::GetObject
                | Self::GetObjectAcl
                | Self::ListParts
        )
    }
}

impl std::fmt::Display for S3Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
