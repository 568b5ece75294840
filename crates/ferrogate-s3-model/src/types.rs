//! Domain types shared by the XML codec, the HTTP layer and the service core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $value)] $variant, )+
        }

        impl $name {
            /// Returns the wire value of this variant.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $value, )+
                }
            }

            /// Parse a wire value. Unknown values yield `None`.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Storage tier of an object.
    #[derive(Default)]
    StorageClass {
        /// Hot tier.
        #[default]
        Standard => "STANDARD",
        /// Infrequent access tier.
        StandardIa => "STANDARD_IA",
        /// Cold tier; reads require a restore.
        Glacier => "GLACIER",
    }
}

string_enum! {
    /// Bucket versioning state once versioning has been configured.
    BucketVersioningStatus {
        /// New writes mint version ids.
        Enabled => "Enabled",
        /// New writes use the `null` version.
        Suspended => "Suspended",
    }
}

string_enum! {
    /// How an object's bytes are laid out.
    #[derive(Default)]
    ObjectType {
        /// Written by a single PUT.
        #[default]
        Normal => "Normal",
        /// Created by AppendObject and extendable in place.
        Appendable => "Appendable",
        /// Assembled by CompleteMultipartUpload.
        Multipart => "Multipart",
    }
}

string_enum! {
    /// Value of the `x-amz-server-side-encryption` header.
    ServerSideEncryption {
        /// SSE-S3.
        Aes256 => "AES256",
        /// SSE-KMS.
        AwsKms => "aws:kms",
    }
}

string_enum! {
    /// Canned ACL names.
    CannedAcl {
        /// Owner only.
        Private => "private",
        /// Everyone may read.
        PublicRead => "public-read",
        /// Everyone may read and write.
        PublicReadWrite => "public-read-write",
        /// Owner plus EC2 image read.
        AwsExecRead => "aws-exec-read",
        /// Any authenticated user may read.
        AuthenticatedRead => "authenticated-read",
        /// Bucket owner may read the object.
        BucketOwnerRead => "bucket-owner-read",
        /// Bucket owner gets full control of the object.
        BucketOwnerFullControl => "bucket-owner-full-control",
    }
}

string_enum! {
    /// ACL permission names.
    Permission {
        /// All of the below.
        FullControl => "FULL_CONTROL",
        /// Create, overwrite and delete objects.
        Write => "WRITE",
        /// Write the ACL.
        WriteAcp => "WRITE_ACP",
        /// Read data or list.
        Read => "READ",
        /// Read the ACL.
        ReadAcp => "READ_ACP",
    }
}

string_enum! {
    /// `x-amz-metadata-directive` values.
    MetadataDirective {
        /// Keep the source metadata.
        Copy => "COPY",
        /// Take metadata from the request.
        Replace => "REPLACE",
    }
}

string_enum! {
    /// Lifecycle rule status.
    RuleStatus {
        /// Rule is evaluated.
        Enabled => "Enabled",
        /// Rule is ignored.
        Disabled => "Disabled",
    }
}

/// The URI identifying the "everyone" group.
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
/// The URI identifying the "any signed request" group.
pub const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
/// The URI identifying the log delivery group.
pub const LOG_DELIVERY_URI: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// Bucket or object owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Canonical user id.
    pub id: String,
    /// Display name.
    pub display_name: String,
}

/// The subject of an ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grantee {
    /// A specific account.
    CanonicalUser {
        /// Canonical user id.
        id: String,
        /// Display name.
        display_name: String,
    },
    /// A predefined group such as [`ALL_USERS_URI`].
    Group {
        /// Group URI.
        uri: String,
    },
    /// An account identified by e-mail.
    Email {
        /// E-mail address.
        email: String,
    },
}

/// One ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Who receives the permission.
    pub grantee: Grantee,
    /// What is granted.
    pub permission: Permission,
}

/// A full ACL document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    /// ACL owner.
    pub owner: Owner,
    /// Grants in document order.
    pub grants: Vec<Grant>,
}

/// Stored ACL: either a canned name or an explicit grant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acl {
    /// A canned ACL expanded on read.
    Canned(CannedAcl),
    /// Explicit grants.
    Grants(Vec<Grant>),
}

impl Default for Acl {
    fn default() -> Self {
        Self::Canned(CannedAcl::Private)
    }
}

/// One CORS rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    /// Optional rule id.
    pub id: Option<String>,
    /// Allowed origins (`*`, exact, or one `*` wildcard).
    pub allowed_origins: Vec<String>,
    /// Allowed methods (GET, PUT, POST, DELETE, HEAD).
    pub allowed_methods: Vec<String>,
    /// Allowed request headers.
    pub allowed_headers: Vec<String>,
    /// Headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime.
    pub max_age_seconds: Option<u32>,
}

/// Bucket CORS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsConfiguration {
    /// Ordered rules; the first match wins.
    pub rules: Vec<CorsRule>,
}

/// Redirect target used by `RedirectAllRequestsTo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectAllRequestsTo {
    /// Target host.
    pub host_name: String,
    /// `http` or `https`; defaults to the request protocol.
    pub protocol: Option<String>,
}

/// Condition part of a website routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingCondition {
    /// Key prefix that must match.
    pub key_prefix_equals: Option<String>,
    /// HTTP error code that must match.
    pub http_error_code_returned_equals: Option<u16>,
}

/// Redirect part of a website routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Target host; defaults to the request host.
    pub host_name: Option<String>,
    /// Redirect status code; defaults to 302.
    pub http_redirect_code: Option<u16>,
    /// Target protocol.
    pub protocol: Option<String>,
    /// Replace the matched prefix with this value.
    pub replace_key_prefix_with: Option<String>,
    /// Replace the whole key with this value.
    pub replace_key_with: Option<String>,
}

/// A website routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// When to apply.
    pub condition: Option<RoutingCondition>,
    /// Where to send the request.
    pub redirect: Redirect,
}

/// Static website hosting configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteConfiguration {
    /// Unconditional redirect; excludes every other field.
    pub redirect_all_requests_to: Option<RedirectAllRequestsTo>,
    /// Suffix appended to directory-like keys.
    pub index_document_suffix: Option<String>,
    /// Object rendered on 4xx errors.
    pub error_document_key: Option<String>,
    /// Conditional redirects.
    pub routing_rules: Vec<RoutingRule>,
}

/// Lifecycle filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleFilter {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Tags that must all be present.
    pub tags: Vec<Tag>,
}

/// Transition to another storage class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Age in days.
    pub days: Option<u32>,
    /// Absolute date.
    pub date: Option<DateTime<Utc>>,
    /// Target tier.
    pub storage_class: StorageClass,
}

/// Current-version expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiration {
    /// Age in days.
    pub days: Option<u32>,
    /// Absolute date.
    pub date: Option<DateTime<Utc>>,
    /// Remove delete markers that have no remaining versions.
    pub expired_object_delete_marker: Option<bool>,
}

/// Transition applied to non-current versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentVersionTransition {
    /// Days since the version became non-current.
    pub noncurrent_days: u32,
    /// Target tier.
    pub storage_class: StorageClass,
}

/// Expiration applied to non-current versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentVersionExpiration {
    /// Days since the version became non-current.
    pub noncurrent_days: u32,
}

/// One lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Rule id.
    pub id: Option<String>,
    /// Enabled or disabled.
    pub status: RuleStatus,
    /// Legacy top-level prefix.
    pub prefix: Option<String>,
    /// Prefix and tag filter.
    pub filter: Option<LifecycleFilter>,
    /// Tier transitions.
    pub transitions: Vec<Transition>,
    /// Current-version expiration.
    pub expiration: Option<Expiration>,
    /// Non-current tier transitions.
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
    /// Non-current expiration.
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    /// Days after initiation at which incomplete uploads are aborted.
    pub abort_incomplete_multipart_upload_days: Option<u32>,
}

impl Default for LifecycleRule {
    fn default() -> Self {
        Self {
            id: None,
            status: RuleStatus::Enabled,
            prefix: None,
            filter: None,
            transitions: Vec::new(),
            expiration: None,
            noncurrent_version_transitions: Vec::new(),
            noncurrent_version_expiration: None,
            abort_incomplete_multipart_upload_days: None,
        }
    }
}

/// Bucket lifecycle configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfiguration {
    /// Rules in document order.
    pub rules: Vec<LifecycleRule>,
}

/// Bucket access-logging target. `None` target disables logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingStatus {
    /// Bucket receiving log objects.
    pub target_bucket: Option<String>,
    /// Key prefix for log objects.
    pub target_prefix: Option<String>,
}

/// Default encryption applied to PUTs without SSE headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSideEncryptionConfiguration {
    /// Algorithm to apply.
    pub sse_algorithm: ServerSideEncryption,
    /// KMS key for `aws:kms`.
    pub kms_master_key_id: Option<String>,
}

/// A tag key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Key.
    pub key: String,
    /// Value.
    pub value: String,
}

/// Part reference in a CompleteMultipartUpload body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: i32,
    /// Client-side etag, possibly quoted.
    pub etag: String,
}

/// Key (and optional version) named in a DeleteObjects body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectIdentifier {
    /// Object key.
    pub key: String,
    /// Version id.
    pub version_id: Option<String>,
}

/// DeleteObjects request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delete {
    /// Objects to delete.
    pub objects: Vec<ObjectIdentifier>,
    /// Suppress per-key success entries.
    pub quiet: bool,
}

/// Entry in ListBuckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation time.
    pub creation_date: DateTime<Utc>,
}

/// Entry in ListObjects / ListObjectsV2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Quoted etag.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Storage class.
    pub storage_class: StorageClass,
    /// Object owner.
    pub owner: Option<Owner>,
}

/// Entry in ListObjectVersions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersionSummary {
    /// Object key.
    pub key: String,
    /// Version id, `null` for the pre-versioning version.
    pub version_id: String,
    /// True for the newest version of the key.
    pub is_latest: bool,
    /// True for delete markers.
    pub delete_marker: bool,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Quoted etag; empty for delete markers.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Storage class.
    pub storage_class: StorageClass,
    /// Version owner.
    pub owner: Owner,
}

/// Entry in ListMultipartUploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUploadSummary {
    /// Object key.
    pub key: String,
    /// Upload id.
    pub upload_id: String,
    /// Who started the upload.
    pub initiator: Owner,
    /// Who will own the object.
    pub owner: Owner,
    /// Target storage class.
    pub storage_class: StorageClass,
    /// When the upload started.
    pub initiated: DateTime<Utc>,
}

/// Entry in ListParts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    /// Part number.
    pub part_number: i32,
    /// Upload time.
    pub last_modified: DateTime<Utc>,
    /// Quoted etag.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
}

/// Successful entry in a DeleteObjects result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedObject {
    /// Object key.
    pub key: String,
    /// Version removed, if one was named.
    pub version_id: Option<String>,
    /// True when a delete marker was involved.
    pub delete_marker: bool,
    /// Version id of the delete marker created or removed.
    pub delete_marker_version_id: Option<String>,
}

/// Failed entry in a DeleteObjects result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteError {
    /// Object key.
    pub key: String,
    /// Version id, if one was named.
    pub version_id: Option<String>,
    /// S3 error code.
    pub code: String,
    /// Error message.
    pub message: String,
}
