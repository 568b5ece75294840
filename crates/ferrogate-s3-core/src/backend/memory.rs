//! In-process storage cluster.
//!
//! Objects are byte vectors in a [`DashMap`] keyed by `(pool, object id)`.
//! Capacity is nominal and only feeds [`Cluster::used_space_percent`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

use super::{BackendError, BoxReader, Cluster, Pool};

/// Default nominal capacity: 1 TiB.
const DEFAULT_CAPACITY: u64 = 1 << 40;

/// A [`Cluster`] kept entirely in memory.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::backend::{Cluster, MemoryCluster};
///
/// let cluster = MemoryCluster::new("local");
/// assert_eq!(cluster.cluster_id(), "local");
/// assert_eq!(cluster.object_count(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryCluster {
    id: String,
    capacity: u64,
    used: AtomicU64,
    objects: DashMap<(Pool, String), Vec<u8>>,
}

impl MemoryCluster {
    /// Create an empty cluster with the default capacity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, DEFAULT_CAPACITY)
    }

    /// Create an empty cluster reporting usage against `capacity` bytes.
    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: u64) -> Self {
        Self {
            id: id.into(),
            capacity: capacity.max(1),
            used: AtomicU64::new(0),
            objects: DashMap::new(),
        }
    }

    /// Number of stored backend objects, stripes included.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Bytes currently stored.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Whether an object exists.
    #[must_use]
    pub fn contains(&self, pool: Pool, object_id: &str) -> bool {
        self.objects.contains_key(&(pool, object_id.to_owned()))
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    fn cluster_id(&self) -> &str {
        &self.id
    }

    async fn write(
        &self,
        pool: Pool,
        object_id: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, BackendError> {
        let start = usize::try_from(offset)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "offset too large"))?;
        let end = start + data.len();

        let mut entry = self.objects.entry((pool, object_id.to_owned())).or_default();
        let buf = entry.value_mut();
        if buf.len() < end {
            self.used
                .fetch_add((end - buf.len()) as u64, Ordering::Relaxed);
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(&data);
        trace!(cluster = %self.id, %pool, object_id, offset, len = data.len(), "wrote extent");
        Ok(data.len() as u64)
    }

    async fn read(
        &self,
        pool: Pool,
        object_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<BoxReader, BackendError> {
        let entry = self
            .objects
            .get(&(pool, object_id.to_owned()))
            .ok_or_else(|| BackendError::NotFound {
                pool,
                object_id: object_id.to_owned(),
            })?;
        let len = entry.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
        let end = usize::try_from(offset.saturating_add(length))
            .unwrap_or(usize::MAX)
            .min(len);
        let slice = Bytes::copy_from_slice(&entry[start..end]);
        Ok(Box::pin(std::io::Cursor::new(slice)))
    }

    async fn remove(&self, pool: Pool, object_id: &str) -> Result<(), BackendError> {
        let (_, data) = self
            .objects
            .remove(&(pool, object_id.to_owned()))
            .ok_or_else(|| BackendError::NotFound {
                pool,
                object_id: object_id.to_owned(),
            })?;
        self.used.fetch_sub(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn used_space_percent(&self) -> Result<f64, BackendError> {
        let used = self.used.load(Ordering::Relaxed) as f64;
        Ok((used / self.capacity as f64 * 100.0).min(100.0))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    async fn read_all(cluster: &MemoryCluster, id: &str, offset: u64, len: u64) -> Vec<u8> {
        let mut reader = cluster.read(Pool::Small, id, offset, len).await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_should_write_and_read_ranges() {
        let cluster = MemoryCluster::new("c1");
        cluster
            .write(Pool::Small, "o1", 0, Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        assert_eq!(read_all(&cluster, "o1", 6, 5).await, b"world");
        assert_eq!(read_all(&cluster, "o1", 6, 100).await, b"world");
    }

    #[tokio::test]
    async fn test_should_extend_object_on_positional_write() {
        let cluster = MemoryCluster::new("c1");
        cluster
            .write(Pool::Small, "o1", 0, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        cluster
            .write(Pool::Small, "o1", 3, Bytes::from_static(b"def"))
            .await
            .unwrap();
        assert_eq!(read_all(&cluster, "o1", 0, 6).await, b"abcdef");
        assert_eq!(cluster.used_bytes(), 6);
    }

    #[tokio::test]
    async fn test_should_remove_and_report_missing() {
        let cluster = MemoryCluster::new("c1");
        cluster
            .write(Pool::Big, "o1", 0, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        cluster.remove(Pool::Big, "o1").await.unwrap();
        assert_eq!(cluster.used_bytes(), 0);
        assert!(matches!(
            cluster.remove(Pool::Big, "o1").await,
            Err(BackendError::NotFound { .. })
        ));
        assert!(cluster.read(Pool::Big, "o1", 0, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_should_report_used_space_percent() {
        let cluster = MemoryCluster::with_capacity("c1", 100);
        cluster
            .write(Pool::Small, "o1", 0, Bytes::from(vec![0u8; 25]))
            .await
            .unwrap();
        let used = cluster.used_space_percent().await.unwrap();
        assert!((used - 25.0).abs() < f64::EPSILON);
    }
}
