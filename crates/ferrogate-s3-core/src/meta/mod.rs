//! Metadata store.
//!
//! The gateway keeps bucket, object, multipart-upload, freezer and lifecycle
//! rows behind the [`MetaStore`] trait. [`MemoryMetaStore`] is the in-process
//! implementation; [`CachedMetaStore`] fronts any store with a TTL cache whose
//! entries are evicted through per-table invalidation channels.

pub mod cache;
pub mod listing;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use cache::{CachedMetaStore, DEFAULT_CACHE_TTL, Invalidation, Table};
pub use listing::{ListPage, ListQuery, UploadPage, UploadQuery, VersionPage, VersionQuery};
pub use memory::MemoryMetaStore;
pub use types::{
    BucketRecord, FreezerRecord, FreezerStatus, MultipartUploadRecord, NULL_VERSION_ID,
    ObjectRecord, Part, mint_version_id,
};

/// Metadata failures.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// No bucket row.
    #[error("no such bucket: {bucket}")]
    NoSuchBucket {
        /// Bucket name.
        bucket: String,
    },

    /// No object row for the key.
    #[error("no such key: {key}")]
    NoSuchKey {
        /// Object key.
        key: String,
    },

    /// No row for the requested version.
    #[error("no such version: {key}@{version_id}")]
    NoSuchVersion {
        /// Object key.
        key: String,
        /// Requested version.
        version_id: String,
    },

    /// No multipart upload row.
    #[error("no such upload: {upload_id}")]
    NoSuchUpload {
        /// Upload id.
        upload_id: String,
    },

    /// A bucket with that name exists.
    #[error("bucket already exists: {bucket}")]
    BucketExists {
        /// Bucket name.
        bucket: String,
        /// Owner of the existing bucket.
        owner: String,
    },

    /// The store cannot be reached.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for metadata calls.
pub type MetaResult<T> = Result<T, MetaError>;

/// Persistent metadata tables.
#[async_trait]
pub trait MetaStore: Send + Sync + std::fmt::Debug {
    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    /// Insert a bucket row; fails with [`MetaError::BucketExists`] when the
    /// name is taken.
    async fn create_bucket(&self, bucket: BucketRecord) -> MetaResult<()>;

    /// Fetch a bucket row.
    async fn get_bucket(&self, name: &str) -> MetaResult<BucketRecord>;

    /// Replace an existing bucket row.
    async fn update_bucket(&self, bucket: BucketRecord) -> MetaResult<()>;

    /// Delete a bucket row and its owner link.
    async fn delete_bucket(&self, name: &str) -> MetaResult<()>;

    /// Buckets owned by a user, ordered by name.
    async fn list_buckets(&self, owner_id: &str) -> MetaResult<Vec<BucketRecord>>;

    /// Whether the bucket holds no object rows and no uploads.
    async fn bucket_is_empty(&self, name: &str) -> MetaResult<bool>;

    /// Add `delta` bytes to the bucket usage counter.
    async fn add_usage(&self, name: &str, delta: i64) -> MetaResult<()>;

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Fetch a row. Without a version the latest row, possibly a delete
    /// marker, is returned.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> MetaResult<ObjectRecord>;

    /// Insert a row as the latest version of its key.
    ///
    /// A row with the null version replaces the previous null version, which
    /// is returned so its data can be recycled.
    async fn put_object(&self, object: ObjectRecord) -> MetaResult<Option<ObjectRecord>>;

    /// Replace a row in place, matched by version id.
    async fn update_object(&self, object: ObjectRecord) -> MetaResult<()>;

    /// Remove one version row and return it.
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<ObjectRecord>;

    /// Move the null version of `from` to `to`, returning the replaced
    /// destination row if any.
    async fn rename_object(
        &self,
        bucket: &str,
        from: &str,
        to: &str,
    ) -> MetaResult<Option<ObjectRecord>>;

    /// One page of latest, non-deleted objects.
    async fn list_objects(&self, bucket: &str, query: &ListQuery) -> MetaResult<ListPage>;

    /// One page of version rows.
    async fn list_versions(&self, bucket: &str, query: &VersionQuery) -> MetaResult<VersionPage>;

    // -----------------------------------------------------------------------
    // Multipart uploads
    // -----------------------------------------------------------------------

    /// Insert an upload row.
    async fn create_upload(&self, upload: MultipartUploadRecord) -> MetaResult<()>;

    /// Fetch an upload row.
    async fn get_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord>;

    /// Record a part, returning the part it replaces.
    async fn put_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part: Part,
    ) -> MetaResult<Option<Part>>;

    /// Remove an upload row and return it.
    async fn delete_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord>;

    /// Atomically remove the upload and insert the completed object.
    async fn complete_upload(
        &self,
        upload_id: &str,
        object: ObjectRecord,
    ) -> MetaResult<Option<ObjectRecord>>;

    /// One page of in-progress uploads.
    async fn list_uploads(&self, bucket: &str, query: &UploadQuery) -> MetaResult<UploadPage>;

    // -----------------------------------------------------------------------
    // Freezer and lifecycle
    // -----------------------------------------------------------------------

    /// Restore state of an archived object.
    async fn get_freezer(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<Option<FreezerRecord>>;

    /// Insert or replace a restore row.
    async fn put_freezer(&self, record: FreezerRecord) -> MetaResult<()>;

    /// Mark a bucket as carrying lifecycle rules, or clear the mark.
    async fn set_lifecycle(&self, bucket: &str, enabled: bool) -> MetaResult<()>;

    /// Buckets carrying lifecycle rules.
    async fn lifecycle_buckets(&self) -> MetaResult<Vec<String>>;
}
