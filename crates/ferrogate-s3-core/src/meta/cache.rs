//! Lookup-through cache in front of a [`MetaStore`].
//!
//! Bucket and object lookups are cached with a TTL. Every mutation evicts the
//! affected entries locally and publishes an [`Invalidation`] on the table's
//! broadcast channel so other caches sharing the channel evict too. A sweeper
//! task drops expired entries periodically.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::listing::{ListPage, ListQuery, UploadPage, UploadQuery, VersionPage, VersionQuery};
use super::types::{BucketRecord, FreezerRecord, MultipartUploadRecord, ObjectRecord, Part};
use super::{MetaResult, MetaStore};

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

const CHANNEL_CAPACITY: usize = 1024;

/// Cached table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Bucket rows, keyed by bucket name.
    Buckets,
    /// Object rows, keyed by `bucket/key#` prefixes.
    Objects,
}

/// Eviction request for every entry of `table` whose key starts with `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Table to evict from.
    pub table: Table,
    /// Key prefix to evict.
    pub key: String,
}

#[derive(Debug)]
struct TtlMap<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlMap<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.0.elapsed() < self.ttl {
            return Some(entry.1.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    fn insert(&self, key: String, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    fn remove_prefix(&self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn object_key(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}#")
}

/// A [`MetaStore`] decorator caching bucket and object lookups.
#[derive(Debug)]
pub struct CachedMetaStore {
    inner: Arc<dyn MetaStore>,
    buckets: TtlMap<BucketRecord>,
    objects: TtlMap<ObjectRecord>,
    bucket_events: broadcast::Sender<Invalidation>,
    object_events: broadcast::Sender<Invalidation>,
}

impl CachedMetaStore {
    /// Wrap `inner` with entries living for `ttl`.
    #[must_use]
    pub fn new(inner: Arc<dyn MetaStore>, ttl: Duration) -> Self {
        let (bucket_events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (object_events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner,
            buckets: TtlMap::new(ttl),
            objects: TtlMap::new(ttl),
            bucket_events,
            object_events,
        }
    }

    /// Receive invalidations published for `table`.
    #[must_use]
    pub fn subscribe(&self, table: Table) -> broadcast::Receiver<Invalidation> {
        self.sender(table).subscribe()
    }

    /// Number of cached entries in `table`.
    #[must_use]
    pub fn cached_entries(&self, table: Table) -> usize {
        match table {
            Table::Buckets => self.buckets.len(),
            Table::Objects => self.objects.len(),
        }
    }

    /// Evict the entries an invalidation names.
    pub fn apply(&self, invalidation: &Invalidation) {
        trace!(table = ?invalidation.table, key = %invalidation.key, "evicting cache entries");
        match invalidation.table {
            Table::Buckets => self.buckets.remove_prefix(&invalidation.key),
            Table::Objects => self.objects.remove_prefix(&invalidation.key),
        }
    }

    /// Drop expired entries; returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.buckets.sweep() + self.objects.sweep()
    }

    /// Evict locally and publish to other subscribers.
    fn publish(&self, table: Table, key: String) {
        let invalidation = Invalidation { table, key };
        self.apply(&invalidation);
        // No receiver is not an error.
        let _ = self.sender(table).send(invalidation);
    }

    fn sender(&self, table: Table) -> &broadcast::Sender<Invalidation> {
        match table {
            Table::Buckets => &self.bucket_events,
            Table::Objects => &self.object_events,
        }
    }

    /// Apply invalidations from `source` to this cache until the source
    /// channel closes.
    pub fn spawn_invalidator(
        self: &Arc<Self>,
        mut source: broadcast::Receiver<Invalidation>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(invalidation) => cache.apply(&invalidation),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "invalidation channel lagged, flushing cache");
                        cache.buckets.remove_prefix("");
                        cache.objects.remove_prefix("");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Sweep expired entries every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl MetaStore for CachedMetaStore {
    async fn create_bucket(&self, bucket: BucketRecord) -> MetaResult<()> {
        let name = bucket.name.clone();
        let result = self.inner.create_bucket(bucket).await;
        self.publish(Table::Buckets, name);
        result
    }

    async fn get_bucket(&self, name: &str) -> MetaResult<BucketRecord> {
        if let Some(bucket) = self.buckets.get(name) {
            return Ok(bucket);
        }
        let bucket = self.inner.get_bucket(name).await?;
        self.buckets.insert(name.to_owned(), bucket.clone());
        Ok(bucket)
    }

    async fn update_bucket(&self, bucket: BucketRecord) -> MetaResult<()> {
        let name = bucket.name.clone();
        let result = self.inner.update_bucket(bucket).await;
        self.publish(Table::Buckets, name);
        result
    }

    async fn delete_bucket(&self, name: &str) -> MetaResult<()> {
        let result = self.inner.delete_bucket(name).await;
        self.publish(Table::Buckets, name.to_owned());
        self.publish(Table::Objects, format!("{name}/"));
        result
    }

    async fn list_buckets(&self, owner_id: &str) -> MetaResult<Vec<BucketRecord>> {
        self.inner.list_buckets(owner_id).await
    }

    async fn bucket_is_empty(&self, name: &str) -> MetaResult<bool> {
        self.inner.bucket_is_empty(name).await
    }

    async fn add_usage(&self, name: &str, delta: i64) -> MetaResult<()> {
        let result = self.inner.add_usage(name, delta).await;
        self.publish(Table::Buckets, name.to_owned());
        result
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> MetaResult<ObjectRecord> {
        let cache_key = format!("{}{}", object_key(bucket, key), version_id.unwrap_or_default());
        if let Some(object) = self.objects.get(&cache_key) {
            return Ok(object);
        }
        let object = self.inner.get_object(bucket, key, version_id).await?;
        self.objects.insert(cache_key, object.clone());
        Ok(object)
    }

    async fn put_object(&self, object: ObjectRecord) -> MetaResult<Option<ObjectRecord>> {
        let key = object_key(&object.bucket, &object.name);
        let result = self.inner.put_object(object).await;
        self.publish(Table::Objects, key);
        result
    }

    async fn update_object(&self, object: ObjectRecord) -> MetaResult<()> {
        let key = object_key(&object.bucket, &object.name);
        let result = self.inner.update_object(object).await;
        self.publish(Table::Objects, key);
        result
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<ObjectRecord> {
        let result = self.inner.delete_object(bucket, key, version_id).await;
        self.publish(Table::Objects, object_key(bucket, key));
        result
    }

    async fn rename_object(
        &self,
        bucket: &str,
        from: &str,
        to: &str,
    ) -> MetaResult<Option<ObjectRecord>> {
        let result = self.inner.rename_object(bucket, from, to).await;
        self.publish(Table::Objects, object_key(bucket, from));
        self.publish(Table::Objects, object_key(bucket, to));
        result
    }

    async fn list_objects(&self, bucket: &str, query: &ListQuery) -> MetaResult<ListPage> {
        self.inner.list_objects(bucket, query).await
    }

    async fn list_versions(&self, bucket: &str, query: &VersionQuery) -> MetaResult<VersionPage> {
        self.inner.list_versions(bucket, query).await
    }

    async fn create_upload(&self, upload: MultipartUploadRecord) -> MetaResult<()> {
        self.inner.create_upload(upload).await
    }

    async fn get_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord> {
        self.inner.get_upload(bucket, key, upload_id).await
    }

    async fn put_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part: Part,
    ) -> MetaResult<Option<Part>> {
        self.inner.put_part(bucket, key, upload_id, part).await
    }

    async fn delete_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<MultipartUploadRecord> {
        self.inner.delete_upload(bucket, key, upload_id).await
    }

    async fn complete_upload(
        &self,
        upload_id: &str,
        object: ObjectRecord,
    ) -> MetaResult<Option<ObjectRecord>> {
        let key = object_key(&object.bucket, &object.name);
        let result = self.inner.complete_upload(upload_id, object).await;
        self.publish(Table::Objects, key);
        result
    }

    async fn list_uploads(&self, bucket: &str, query: &UploadQuery) -> MetaResult<UploadPage> {
        self.inner.list_uploads(bucket, query).await
    }

    async fn get_freezer(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> MetaResult<Option<FreezerRecord>> {
        self.inner.get_freezer(bucket, key, version_id).await
    }

    async fn put_freezer(&self, record: FreezerRecord) -> MetaResult<()> {
        self.inner.put_freezer(record).await
    }

    async fn set_lifecycle(&self, bucket: &str, enabled: bool) -> MetaResult<()> {
        self.inner.set_lifecycle(bucket, enabled).await
    }

    async fn lifecycle_buckets(&self) -> MetaResult<Vec<String>> {
        self.inner.lifecycle_buckets().await
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::Owner;

    use super::*;
    use crate::meta::MemoryMetaStore;
    use crate::meta::types::NULL_VERSION_ID;

    async fn cached(ttl: Duration) -> (Arc<MemoryMetaStore>, Arc<CachedMetaStore>) {
        let inner = Arc::new(MemoryMetaStore::new());
        inner
            .create_bucket(BucketRecord::new("b", Owner::default(), "us-east-1"))
            .await
            .unwrap();
        let cache = Arc::new(CachedMetaStore::new(inner.clone(), ttl));
        (inner, cache)
    }

    #[tokio::test]
    async fn test_should_serve_bucket_from_cache_until_invalidated() {
        let (inner, cache) = cached(DEFAULT_CACHE_TTL).await;
        assert_eq!(cache.get_bucket("b").await.unwrap().usage, 0);

        // Bypass the cache: the stale entry is still served.
        inner.add_usage("b", 10).await.unwrap();
        assert_eq!(cache.get_bucket("b").await.unwrap().usage, 0);

        cache.add_usage("b", 5).await.unwrap();
        assert_eq!(cache.get_bucket("b").await.unwrap().usage, 15);
    }

    #[tokio::test]
    async fn test_should_evict_all_versions_of_written_key() {
        let (_, cache) = cached(DEFAULT_CACHE_TTL).await;
        cache
            .put_object(ObjectRecord::new("b", "k", NULL_VERSION_ID.to_owned()))
            .await
            .unwrap();
        cache.get_object("b", "k", None).await.unwrap();
        cache.get_object("b", "k", Some(NULL_VERSION_ID)).await.unwrap();
        assert_eq!(cache.cached_entries(Table::Objects), 2);

        cache.delete_object("b", "k", NULL_VERSION_ID).await.unwrap();
        assert_eq!(cache.cached_entries(Table::Objects), 0);
        assert!(cache.get_object("b", "k", None).await.is_err());
    }

    #[tokio::test]
    async fn test_should_apply_invalidations_from_peer() {
        let (inner, peer) = cached(DEFAULT_CACHE_TTL).await;
        let local = Arc::new(CachedMetaStore::new(inner, DEFAULT_CACHE_TTL));
        local.get_bucket("b").await.unwrap();
        assert_eq!(local.cached_entries(Table::Buckets), 1);

        let handle = local.spawn_invalidator(peer.subscribe(Table::Buckets));
        peer.add_usage("b", 1).await.unwrap();
        for _ in 0..50 {
            if local.cached_entries(Table::Buckets) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(local.cached_entries(Table::Buckets), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_should_expire_entries_after_ttl() {
        let (_, cache) = cached(Duration::from_millis(20)).await;
        cache.get_bucket("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.cached_entries(Table::Buckets), 0);
    }
}
