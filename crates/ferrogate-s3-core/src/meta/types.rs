//! Metadata rows.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use ferrogate_s3_model::input::ContentHeaders;
use ferrogate_s3_model::types::{
    Acl, BucketVersioningStatus, CorsConfiguration, LifecycleConfiguration, LoggingStatus,
    ObjectType, Owner, ServerSideEncryptionConfiguration, StorageClass, WebsiteConfiguration,
};

use crate::backend::Pool;
use crate::crypto::SseType;

/// Version id of rows written while versioning was never enabled or is
/// suspended.
pub const NULL_VERSION_ID: &str = "null";

static LAST_VERSION_NANOS: AtomicU64 = AtomicU64::new(0);

/// Mint a version id that sorts before every id minted earlier.
///
/// The id is the hex form of `u64::MAX - nanos`, with `nanos` strictly
/// increasing across calls in this process.
#[must_use]
pub fn mint_version_id() -> String {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0);
    let mut last = LAST_VERSION_NANOS.load(Ordering::Relaxed);
    let nanos = loop {
        let next = now.max(last + 1);
        match LAST_VERSION_NANOS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break next,
            Err(actual) => last = actual,
        }
    };
    format!("{:016x}", u64::MAX - nanos)
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// A bucket row with every sub-resource configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRecord {
    /// Bucket name.
    pub name: String,
    /// Owning account.
    pub owner: Owner,
    /// Region the bucket was created in.
    pub region: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Bucket ACL.
    pub acl: Acl,
    /// CORS rules.
    pub cors: Option<CorsConfiguration>,
    /// Versioning state; `None` until first configured.
    pub versioning: Option<BucketVersioningStatus>,
    /// Access-log target.
    pub logging: LoggingStatus,
    /// Lifecycle rules.
    pub lifecycle: Option<LifecycleConfiguration>,
    /// Static website configuration.
    pub website: Option<WebsiteConfiguration>,
    /// Bucket policy JSON.
    pub policy: Option<String>,
    /// Default encryption.
    pub encryption: Option<ServerSideEncryptionConfiguration>,
    /// Bytes stored, net of deletes.
    pub usage: i64,
}

impl BucketRecord {
    /// A fresh private bucket.
    #[must_use]
    pub fn new(name: impl Into<String>, owner: Owner, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner,
            region: region.into(),
            created_at: Utc::now(),
            acl: Acl::default(),
            cors: None,
            versioning: None,
            logging: LoggingStatus::default(),
            lifecycle: None,
            website: None,
            policy: None,
            encryption: None,
            usage: 0,
        }
    }

    /// Whether new writes mint version ids.
    #[must_use]
    pub fn is_versioning_enabled(&self) -> bool {
        self.versioning == Some(BucketVersioningStatus::Enabled)
    }

    /// Whether versioning was ever configured.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.versioning.is_some()
    }

    /// Version id for a new row in this bucket.
    #[must_use]
    pub fn next_version_id(&self) -> String {
        if self.is_versioning_enabled() {
            mint_version_id()
        } else {
            NULL_VERSION_ID.to_owned()
        }
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// One stored part of a multipart or appendable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part number, `1..=10000`.
    pub part_number: i32,
    /// Plaintext size.
    pub size: u64,
    /// Hex MD5 of the plaintext, unquoted.
    pub etag: String,
    /// Offset of the part inside the assembled object.
    pub offset: u64,
    /// Backend object holding the part.
    pub object_id: String,
    /// IV the part was encrypted with.
    pub iv: Vec<u8>,
    /// Upload time.
    pub last_modified: DateTime<Utc>,
}

/// An object version row, or a delete marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub name: String,
    /// Version id, [`NULL_VERSION_ID`] for unversioned rows.
    pub version_id: String,
    /// Plaintext size.
    pub size: u64,
    /// Hex etag, unquoted.
    pub etag: String,
    /// Stored representation headers.
    pub content: ContentHeaders,
    /// `x-amz-meta-*` pairs, names without the prefix.
    pub metadata: HashMap<String, String>,
    /// Owning account.
    pub owner: Owner,
    /// Object ACL.
    pub acl: Acl,
    /// Storage tier.
    pub storage_class: StorageClass,
    /// Data layout.
    pub object_type: ObjectType,
    /// Encryption kind.
    pub sse_type: SseType,
    /// Sealed data key, or the SHA-256 of an SSE-C key.
    pub encryption_key: Vec<u8>,
    /// KMS key the data key is sealed under.
    pub kms_key_id: Option<String>,
    /// Object IV.
    pub iv: Vec<u8>,
    /// Cluster id holding the data.
    pub location: String,
    /// Backend pool.
    pub pool: Pool,
    /// Backend object id; empty for multipart objects.
    pub object_id: String,
    /// Parts by number.
    pub parts: BTreeMap<i32, Part>,
    /// Whether this row was written without versioning.
    pub null_version: bool,
    /// Whether this row is a delete marker.
    pub delete_marker: bool,
    /// Last data or metadata change.
    pub last_modified: DateTime<Utc>,
    /// First write.
    pub create_time: DateTime<Utc>,
}

impl ObjectRecord {
    /// An empty row for `bucket/name` at `version_id`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, name: impl Into<String>, version_id: String) -> Self {
        let now = Utc::now();
        Self {
            bucket: bucket.into(),
            name: name.into(),
            null_version: version_id == NULL_VERSION_ID,
            version_id,
            size: 0,
            etag: String::new(),
            content: ContentHeaders::default(),
            metadata: HashMap::new(),
            owner: Owner::default(),
            acl: Acl::default(),
            storage_class: StorageClass::Standard,
            object_type: ObjectType::Normal,
            sse_type: SseType::None,
            encryption_key: Vec::new(),
            kms_key_id: None,
            iv: Vec::new(),
            location: String::new(),
            pool: Pool::Small,
            object_id: String::new(),
            parts: BTreeMap::new(),
            delete_marker: false,
            last_modified: now,
            create_time: now,
        }
    }

    /// A delete marker row.
    #[must_use]
    pub fn delete_marker(bucket: &str, name: &str, version_id: String, owner: Owner) -> Self {
        let mut record = Self::new(bucket, name, version_id);
        record.owner = owner;
        record.delete_marker = true;
        record
    }

    /// Etag as sent on the wire, quoted.
    #[must_use]
    pub fn quoted_etag(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// Version id to expose; unversioned rows report none.
    #[must_use]
    pub fn exposed_version_id(&self) -> Option<String> {
        if self.null_version && self.version_id == NULL_VERSION_ID {
            None
        } else {
            Some(self.version_id.clone())
        }
    }

    /// Every backend object id holding this row's data. Multipart and
    /// appendable rows keep one backend object per part.
    #[must_use]
    pub fn backend_objects(&self) -> Vec<String> {
        if self.parts.is_empty() {
            if self.object_id.is_empty() {
                Vec::new()
            } else {
                vec![self.object_id.clone()]
            }
        } else {
            self.parts.values().map(|p| p.object_id.clone()).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Multipart uploads
// ---------------------------------------------------------------------------

/// An in-progress multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartUploadRecord {
    /// Bucket name.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload id.
    pub upload_id: String,
    /// Account that started the upload.
    pub initiator: Owner,
    /// Owner of the resulting object.
    pub owner: Owner,
    /// ACL of the resulting object.
    pub acl: Acl,
    /// Storage tier of the resulting object.
    pub storage_class: StorageClass,
    /// Representation headers of the resulting object.
    pub content: ContentHeaders,
    /// User metadata of the resulting object.
    pub metadata: HashMap<String, String>,
    /// Encryption kind.
    pub sse_type: SseType,
    /// Sealed data key or SSE-C fingerprint.
    pub encryption_key: Vec<u8>,
    /// KMS key id.
    pub kms_key_id: Option<String>,
    /// Base IV; parts derive theirs from it.
    pub iv: Vec<u8>,
    /// Cluster receiving the parts.
    pub location: String,
    /// Uploaded parts.
    pub parts: BTreeMap<i32, Part>,
    /// Start time.
    pub initiated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Freezer
// ---------------------------------------------------------------------------

/// Restore progress of an archived object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezerStatus {
    /// Requested, not yet picked up.
    Ready,
    /// Being restored.
    Restoring,
    /// Readable until the record expires.
    Finish,
}

impl FreezerStatus {
    /// Stored name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Restoring => "RESTORING",
            Self::Finish => "FINISH",
        }
    }
}

/// A restore request for a GLACIER object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezerRecord {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object version.
    pub version_id: String,
    /// Progress.
    pub status: FreezerStatus,
    /// Days the restored copy stays readable.
    pub days: u32,
    /// Request time.
    pub requested_at: DateTime<Utc>,
}

impl FreezerRecord {
    /// When the restored copy expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.requested_at + Duration::days(i64::from(self.days))
    }

    /// Whether a finished restore is still readable at `now`.
    #[must_use]
    pub fn is_readable(&self, now: DateTime<Utc>) -> bool {
        self.status == FreezerStatus::Finish && now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_mint_descending_version_ids() {
        let first = mint_version_id();
        let second = mint_version_id();
        assert_eq!(first.len(), 16);
        assert!(second < first, "later ids must sort first");
    }

    #[test]
    fn test_should_hide_null_version_id() {
        let record = ObjectRecord::new("b", "k", NULL_VERSION_ID.to_owned());
        assert!(record.null_version);
        assert_eq!(record.exposed_version_id(), None);

        let versioned = ObjectRecord::new("b", "k", mint_version_id());
        assert!(versioned.exposed_version_id().is_some());
    }

    #[test]
    fn test_should_pick_version_ids_by_bucket_state() {
        let mut bucket = BucketRecord::new("b", Owner::default(), "us-east-1");
        assert_eq!(bucket.next_version_id(), NULL_VERSION_ID);
        bucket.versioning = Some(BucketVersioningStatus::Enabled);
        assert_ne!(bucket.next_version_id(), NULL_VERSION_ID);
        bucket.versioning = Some(BucketVersioningStatus::Suspended);
        assert_eq!(bucket.next_version_id(), NULL_VERSION_ID);
    }

    #[test]
    fn test_should_expire_finished_restores() {
        let record = FreezerRecord {
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            version_id: NULL_VERSION_ID.to_owned(),
            status: FreezerStatus::Finish,
            days: 1,
            requested_at: Utc::now(),
        };
        assert!(record.is_readable(Utc::now()));
        assert!(!record.is_readable(Utc::now() + Duration::days(2)));
    }
}
