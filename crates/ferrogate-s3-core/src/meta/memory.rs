//! In-process metadata tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::listing::{self, ListPage, ListQuery, UploadPage, UploadQuery, VersionPage, VersionQuery};
use super::types::{
    BucketRecord, FreezerRecord, MultipartUploadRecord, NULL_VERSION_ID, ObjectRecord, Part,
};
use super::{MetaError, MetaResult, MetaStore};

type ObjectRows = BTreeMap<String, Vec<ObjectRecord>>;
type UploadRows = BTreeMap<(String, String), MultipartUploadRecord>;

#[derive(Debug, Default)]
struct Tables {
    buckets: BTreeMap<String, BucketRecord>,
    user_buckets: HashMap<String, BTreeSet<String>>,
    objects: HashMap<String, ObjectRows>,
    uploads: HashMap<String, UploadRows>,
    freezer: HashMap<(String, String, String), FreezerRecord>,
    lifecycle: BTreeSet<String>,
}

impl Tables {
    fn bucket_exists(&self, bucket: &str) -> MetaResult<()> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(MetaError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })
        }
    }

    fn upload_mut(
        &mut self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<&mut MultipartUploadRecord> {
        self.uploads
            .get_mut(bucket)
            .and_then(|rows| rows.get_mut(&(key.to_owned(), upload_id.to_owned())))
            .ok_or_else(|| MetaError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })
    }

    fn insert_object(&mut self, object: ObjectRecord) -> Option<ObjectRecord> {
        let versions = self
            .objects
            .entry(object.bucket.clone())
            .or_default()
            .entry(object.name.clone())
            .or_default();
        let replaced = if object.version_id == NULL_VERSION_ID {
            versions
                .iter()
                .position(|v| v.version_id == NULL_VERSION_ID)
                .map(|idx| versions.remove(idx))
        } else {
            None
        };
        debug!(bucket = %object.bucket, key = %object.name, version_id = %object.version_id, "stored object row");
        versions.insert(0, object);
        replaced
    }
}

/// [`MetaStore`] held in process memory.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::meta::{BucketRecord, MemoryMetaStore, MetaStore};
/// use ferrogate_s3_model::types::Owner;
///
/// # tokio_test::block_on(async {
/// let store = MemoryMetaStore::new();
/// store.create_bucket(BucketRecord::new("photos", Owner::default(), "us-east-1")).await.unwrap();
/// assert!(store.bucket_is_empty("photos").await.unwrap());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    tables: RwLock<Tables>,
}

impl MemoryMetaStore {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    async fn create_bucket(&self, bucket: BucketRecord) -> MetaResult<()> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.buckets.get(&bucket.name) {
            return Err(MetaError::BucketExists {
                bucket: bucket.name.clone(),
                owner: existing.owner.id.clone(),
            });
        }
        tables
            .user_buckets
            .entry(bucket.owner.id.clone())
            .or_default()
            .insert(bucket.name.clone());
        tables.buckets.insert(bucket.name.clone(), bucket);
        Ok(())
    }

    async fn get_bucket(&self, name: &str) -> MetaResult<BucketRecord> {
        self.tables
            .read()
            .buckets
            .get(name)
            .cloned()
            .ok_or_else(|| MetaError::NoSuchBucket {
                bucket: name.to_owned(),
            })
    }

    async fn update_bucket(&self, bucket: BucketRecord) -> MetaResult<()> {
        let mut tables = self.tables.write();
        let slot = tables
            .buckets
            .get_mut(&bucket.name)
            .ok_or_else(|| MetaError::NoSuchBucket {
                bucket: bucket.name.clone(),
            })?;
        *slot = bucket;
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> MetaResult<()> {
        let mut tables = self.tables.write();
        let bucket = tables
            .buckets
            .remove(name)
            .ok_or_else(|| MetaError::NoSuchBucket {
                bucket: name.to_owned(),
            })?;
        if let Some(owned) = tables.user_buckets.get_mut(&bucket.owner.id) {
            owned.remove(name);
        }
        tables.objects.remove(name);
        tables.uploads.remove(name);
        tables.lifecycle.remove(name);
        tables.freezer.retain(|(b, _, _), _| b != name);
        Ok(())
    }

    async fn list_buckets(&self, owner_id: &str) -> MetaResult<Vec<BucketRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .user_buckets
            .get(owner_id)
            .into_iter()
            .flatten()
            .filter_map(|name| tables.buckets.get(name).cloned())
            .collect())
    }

    async fn bucket_is_empty(&self, name: &str) -> MetaResult<bool> {
        let tables = self.tables.read();
        tables.bucket_exists(name)?;
        let no_objects = tables.objects.get(name).is_none_or(BTreeMap::is_empty);
        let no_uploads = tables.uploads.get(name).is_none_or(BTreeMap::is_empty);
        Ok(no_objects && no_uploads)
    }

    async fn add_usage(&self, name: &str, delta: i64) -> MetaResult<()> {
        let mut tables = self.tables.write();
        let bucket = tables
            .buckets
            .get_mut(name)
            .ok_or_else(|| MetaError::NoSuchBucket {
                bucket: name.to_owned(),
            })?;
        bucket.usage += delta;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> MetaResult<ObjectRecord> {
        let tables = self.tables.read();
        tables.bucket_exists(bucket)?;
        let versions = tables
            .objects
            .get(bucket)
            .and_then(|rows| rows.get(key))
            .ok_or_else(|| MetaError::NoSuchKey {
                key: key.to_owned(),
            })?;
        match version_id {
            None => versions.first().cloned().ok_or_else(|| MetaError::NoSuchKey {
                key: key.to_owned(),
            }),
            Some(id) => versions
                .iter()
                .find(|v| v.version_id == id)
                .cloned()
                .ok_or_else(|| MetaError::NoSuchVersion {
                    key: key.to_owned(),
                    version_id: id.to_owned(),
                }),
        }
    }

    async fn put_object(&self, object: ObjectRecord) -> MetaResult<Option<ObjectRecord>> {
        let mut tables = self.tables.write();
        tables.bucket_exists(&object.bucket)?;
        Ok(tables.insert_object(object))
    }

    async fn update_object(&self, object: ObjectRecord) -> MetaResult<()> {
        let mut tables = self.tables.write();
        let slot = tables
            .objects
            .get_mut(&object.bucket)
            .and_then(|rows| rows.get_mut(&object.name))
            .and_then(|versions| versions.iter_mut().find(|v| v.version_id == object.version_id))
            .ok_or_else(|| MetaError::NoSuchVersion {
                key: object.name.clone(),
                version_id: object.version_id.clone(),
            })?;
        *slot = object;
        Ok(())
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<ObjectRecord> {
        let mut tables = self.tables.write();
        tables.bucket_exists(bucket)?;
        let rows = tables
            .objects
            .get_mut(bucket)
            .ok_or_else(|| MetaError::NoSuchKey {
                key: key.to_owned(),
            })?;
        let versions = rows.get_mut(key).ok_or_else(|| MetaError::NoSuchKey {
            key: key.to_owned(),
        })?;
        let idx = versions
            .iter()
            .position(|v| v.version_id == version_id)
            .ok_or_else(|| MetaError::NoSuchVersion {
                key: key.to_owned(),
                version_id: version_id.to_owned(),
            })?;
        let removed = versions.remove(idx);
        if versions.is_empty() {
            rows.remove(key);
        }
        tables
            .freezer
            .remove(&(bucket.to_owned(), key.to_owned(), version_id.to_owned()));
        Ok(removed)
    }

    async fn rename_object(
        &self,
        bucket: &str,
        from: &str,
        to: &str,
    ) -> MetaResult<Option<ObjectRecord>> {
        let mut tables = self.tables.write();
        tables.bucket_exists(bucket)?;
        let rows = tables.objects.entry(bucket.to_owned()).or_default();
        let mut versions = rows.remove(from).ok_or_else(|| MetaError::NoSuchKey {
            key: from.to_owned(),
        })?;
        let Some(idx) = versions.iter().position(|v| v.version_id == NULL_VERSION_ID) else {
            rows.insert(from.to_owned(), versions);
            return Err(MetaError::NoSuchKey {
                key: from.to_owned(),
            });
        };
        let mut object = versions.remove(idx);
        if !versions.is_empty() {
            rows.insert(from.to_owned(), versions);
        }
        to.clone_into(&mut object.name);
        object.last_modified = chrono::Utc::now();
        Ok(tables.insert_object(object))
    }

    async fn list_objects(&self, bucket: &str, query: &ListQuery) -> MetaResult<ListPage> {
        let tables = self.tables.read();
        tables.bucket_exists(bucket)?;
        Ok(tables
            .objects
            .get(bucket)
            .map(|rows| listing::list_objects(rows, query))
            .unwrap_or_default())
    }

    async fn list_versions(&self, bucket: &str, query: &VersionQuery) -> MetaResult<VersionPage> {
        let tables = self.tables.read();
        tables.bucket_exists(bucket)?;
        Ok(tables
            .objects
            .get(bucket)
            .map(|rows| listing::list_versions(rows, query))
            .unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Multipart uploads
    // -----------------------------------------------------------------------

    async fn create_upload(&self, upload: MultipartUploadRecord) -> MetaResult<()> {
        let mut tables = self.tables.write();
        tables.bucket_exists(&upload.bucket)?;
        tables
            .uploads
            .entry(upload.bucket.clone())
            .or_default()
            .insert((upload.key.clone(), upload.upload_id.clone()), upload);
        Ok(())
    }

    async fn get_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord> {
        let tables = self.tables.read();
        tables.bucket_exists(bucket)?;
        tables
            .uploads
            .get(bucket)
            .and_then(|rows| rows.get(&(key.to_owned(), upload_id.to_owned())))
            .cloned()
            .ok_or_else(|| MetaError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })
    }

    async fn put_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part: Part,
    ) -> MetaResult<Option<Part>> {
        let mut tables = self.tables.write();
        let upload = tables.upload_mut(bucket, key, upload_id)?;
        Ok(upload.parts.insert(part.part_number, part))
    }

    async fn delete_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord> {
        let mut tables = self.tables.write();
        tables
            .uploads
            .get_mut(bucket)
            .and_then(|rows| rows.remove(&(key.to_owned(), upload_id.to_owned())))
            .ok_or_else(|| MetaError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })
    }

    async fn complete_upload(
        &self,
        upload_id: &str,
        object: ObjectRecord,
    ) -> MetaResult<Option<ObjectRecord>> {
        let mut tables = self.tables.write();
        tables.bucket_exists(&object.bucket)?;
        tables
            .uploads
            .get_mut(&object.bucket)
            .and_then(|rows| rows.remove(&(object.name.clone(), upload_id.to_owned())))
            .ok_or_else(|| MetaError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })?;
        Ok(tables.insert_object(object))
    }

    async fn list_uploads(&self, bucket: &str, query: &UploadQuery) -> MetaResult<UploadPage> {
        let tables = self.tables.read();
        tables.bucket_exists(bucket)?;
        Ok(tables
            .uploads
            .get(bucket)
            .map(|rows| listing::list_uploads(rows, query))
            .unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Freezer and lifecycle
    // -----------------------------------------------------------------------

    async fn get_freezer(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<Option<FreezerRecord>> {
        Ok(self
            .tables
            .read()
            .freezer
            .get(&(bucket.to_owned(), key.to_owned(), version_id.to_owned()))
            .cloned())
    }

    async fn put_freezer(&self, record: FreezerRecord) -> MetaResult<()> {
        let mut tables = self.tables.write();
        tables.bucket_exists(&record.bucket)?;
        tables.freezer.insert(
            (
                record.bucket.clone(),
                record.key.clone(),
                record.version_id.clone(),
            ),
            record,
        );
        Ok(())
    }

    async fn set_lifecycle(&self, bucket: &str, enabled: bool) -> MetaResult<()> {
        let mut tables = self.tables.write();
        tables.bucket_exists(bucket)?;
        if enabled {
            tables.lifecycle.insert(bucket.to_owned());
        } else {
            tables.lifecycle.remove(bucket);
        }
        Ok(())
    }

    async fn lifecycle_buckets(&self) -> MetaResult<Vec<String>> {
        Ok(self.tables.read().lifecycle.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::Owner;

    use super::*;
    use crate::meta::types::mint_version_id;

    fn owner(id: &str) -> Owner {
        Owner {
            id: id.to_owned(),
            display_name: id.to_owned(),
        }
    }

    async fn store_with_bucket() -> MemoryMetaStore {
        let store = MemoryMetaStore::new();
        store
            .create_bucket(BucketRecord::new("b", owner("alice"), "us-east-1"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_bucket() {
        let store = store_with_bucket().await;
        let err = store
            .create_bucket(BucketRecord::new("b", owner("bob"), "us-east-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::BucketExists { owner, .. } if owner == "alice"));
        assert_eq!(store.list_buckets("alice").await.unwrap().len(), 1);
        assert!(store.list_buckets("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_replace_null_version() {
        let store = store_with_bucket().await;
        let mut first = ObjectRecord::new("b", "k", NULL_VERSION_ID.to_owned());
        first.object_id = "old".to_owned();
        assert!(store.put_object(first).await.unwrap().is_none());

        let second = ObjectRecord::new("b", "k", NULL_VERSION_ID.to_owned());
        let replaced = store.put_object(second).await.unwrap().unwrap();
        assert_eq!(replaced.object_id, "old");
        let page = store
            .list_versions("b", &VersionQuery { max_keys: 10, ..VersionQuery::default() })
            .await
            .unwrap();
        assert_eq!(page.versions.len(), 1);
    }

    #[tokio::test]
    async fn test_should_keep_versions_latest_first() {
        let store = store_with_bucket().await;
        let v1 = ObjectRecord::new("b", "k", mint_version_id());
        let v2 = ObjectRecord::new("b", "k", mint_version_id());
        store.put_object(v1.clone()).await.unwrap();
        store.put_object(v2.clone()).await.unwrap();

        let latest = store.get_object("b", "k", None).await.unwrap();
        assert_eq!(latest.version_id, v2.version_id);
        let old = store
            .get_object("b", "k", Some(&v1.version_id))
            .await
            .unwrap();
        assert_eq!(old.version_id, v1.version_id);
        assert!(matches!(
            store.get_object("b", "k", Some("nope")).await,
            Err(MetaError::NoSuchVersion { .. })
        ));

        store.delete_object("b", "k", &v2.version_id).await.unwrap();
        let latest = store.get_object("b", "k", None).await.unwrap();
        assert_eq!(latest.version_id, v1.version_id);
    }

    #[tokio::test]
    async fn test_should_complete_upload_atomically() {
        let store = store_with_bucket().await;
        store
            .create_upload(MultipartUploadRecord {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                upload_id: "u1".to_owned(),
                initiator: owner("alice"),
                owner: owner("alice"),
                acl: ferrogate_s3_model::types::Acl::default(),
                storage_class: ferrogate_s3_model::types::StorageClass::Standard,
                content: ferrogate_s3_model::input::ContentHeaders::default(),
                metadata: HashMap::new(),
                sse_type: crate::crypto::SseType::None,
                encryption_key: Vec::new(),
                kms_key_id: None,
                iv: Vec::new(),
                location: "c1".to_owned(),
                parts: BTreeMap::new(),
                initiated: chrono::Utc::now(),
            })
            .await
            .unwrap();
        assert!(!store.bucket_is_empty("b").await.unwrap());

        let object = ObjectRecord::new("b", "k", NULL_VERSION_ID.to_owned());
        store.complete_upload("u1", object.clone()).await.unwrap();
        assert!(store.get_upload("b", "k", "u1").await.is_err());
        assert!(store.get_object("b", "k", None).await.is_ok());
        assert!(matches!(
            store.complete_upload("u1", object).await,
            Err(MetaError::NoSuchUpload { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_rename_null_version() {
        let store = store_with_bucket().await;
        store
            .put_object(ObjectRecord::new("b", "from", NULL_VERSION_ID.to_owned()))
            .await
            .unwrap();
        store.rename_object("b", "from", "to").await.unwrap();
        assert!(store.get_object("b", "from", None).await.is_err());
        assert_eq!(store.get_object("b", "to", None).await.unwrap().name, "to");
    }

    #[tokio::test]
    async fn test_should_track_usage_and_emptiness() {
        let store = store_with_bucket().await;
        store.add_usage("b", 100).await.unwrap();
        store.add_usage("b", -40).await.unwrap();
        assert_eq!(store.get_bucket("b").await.unwrap().usage, 60);
        assert!(store.bucket_is_empty("b").await.unwrap());
        store.delete_bucket("b").await.unwrap();
        assert!(matches!(
            store.get_bucket("b").await,
            Err(MetaError::NoSuchBucket { .. })
        ));
    }
}
