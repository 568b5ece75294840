//! Placement and striping over a set of clusters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesOrdered;
use rand::RngExt;
use tracing::{debug, warn};

use super::{
    AIO_CONCURRENT, AdaptiveWindow, BackendError, BoxReader, ChainReader, Cluster, Pool,
    StripeLayout, WindowConfig,
};

/// The clusters available to the gateway plus the rules for using them.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    clusters: Vec<Arc<dyn Cluster>>,
    layout: StripeLayout,
    window: WindowConfig,
}

impl ClusterSet {
    /// Build a set with the default stripe layout.
    #[must_use]
    pub fn new(clusters: Vec<Arc<dyn Cluster>>, window: WindowConfig) -> Self {
        Self {
            clusters,
            layout: StripeLayout::default(),
            window,
        }
    }

    /// Override the stripe layout.
    #[must_use]
    pub fn with_layout(mut self, layout: StripeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Ids of every cluster in the set.
    pub fn cluster_ids(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().map(|c| c.cluster_id())
    }

    /// Look a cluster up by id.
    pub fn cluster(&self, id: &str) -> Result<Arc<dyn Cluster>, BackendError> {
        self.clusters
            .iter()
            .find(|c| c.cluster_id() == id)
            .cloned()
            .ok_or_else(|| BackendError::UnknownCluster(id.to_owned()))
    }

    /// Choose a cluster at random, weighted by free space.
    ///
    /// Clusters whose usage cannot be read are skipped. When every cluster
    /// is full the first one is returned.
    #[allow(clippy::cast_precision_loss)]
    pub async fn pick_cluster(&self) -> Result<Arc<dyn Cluster>, BackendError> {
        let first = self.clusters.first().ok_or(BackendError::NoCluster)?;
        if self.clusters.len() == 1 {
            return Ok(Arc::clone(first));
        }

        let mut weighted = Vec::with_capacity(self.clusters.len());
        for cluster in &self.clusters {
            match cluster.used_space_percent().await {
                Ok(used) => weighted.push((cluster, (100.0 - used).max(0.0))),
                Err(err) => {
                    warn!(cluster = cluster.cluster_id(), error = %err, "cannot read cluster usage");
                }
            }
        }
        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Ok(Arc::clone(first));
        }

        let mut buf = [0u8; 8];
        rand::rng().fill(&mut buf);
        let mut target = u64::from_le_bytes(buf) as f64 / u64::MAX as f64 * total;
        for (cluster, weight) in &weighted {
            if target < *weight {
                return Ok(Arc::clone(cluster));
            }
            target -= weight;
        }
        Ok(weighted
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map_or_else(|| Arc::clone(first), |(c, _)| Arc::clone(c)))
    }

    /// Mint a fresh backend object id.
    #[must_use]
    pub fn new_object_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Write `data` at logical `offset` of an object.
    ///
    /// Small-pool objects are written in one call. Big-pool objects are cut
    /// into adaptive windows, each striped over the layout, with at most
    /// [`AIO_CONCURRENT`] windows in flight. Returns the bytes stored.
    pub async fn write(
        &self,
        cluster: &Arc<dyn Cluster>,
        pool: Pool,
        object_id: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, BackendError> {
        if pool == Pool::Small {
            return cluster.write(pool, object_id, offset, data).await;
        }

        let mut window = AdaptiveWindow::new(self.window);
        let mut in_flight = FuturesOrdered::new();
        let mut written = 0u64;
        let mut pos = 0usize;

        while pos < data.len() {
            let size = window.size().min(data.len() - pos);
            let chunk = data.slice(pos..pos + size);
            in_flight.push_back(write_window(
                Arc::clone(cluster),
                self.layout,
                object_id.to_owned(),
                offset + pos as u64,
                chunk,
            ));
            pos += size;

            if in_flight.len() >= AIO_CONCURRENT {
                if let Some(result) = in_flight.next().await {
                    let (n, elapsed) = result?;
                    written += n;
                    window.observe(n, elapsed);
                }
            }
        }
        while let Some(result) = in_flight.next().await {
            let (n, elapsed) = result?;
            written += n;
            window.observe(n, elapsed);
        }

        debug!(
            cluster = cluster.cluster_id(),
            object_id,
            offset,
            written,
            window = window.size(),
            "striped write finished"
        );
        Ok(written)
    }

    /// Open a reader over `length` bytes at logical `offset`.
    pub async fn reader(
        &self,
        cluster: &Arc<dyn Cluster>,
        pool: Pool,
        object_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<BoxReader, BackendError> {
        if pool == Pool::Small {
            return cluster.read(pool, object_id, offset, length).await;
        }

        let mut readers = Vec::new();
        for extent in self.layout.extents(offset, length) {
            let name = StripeLayout::stripe_name(object_id, extent.object_no);
            readers.push(
                cluster
                    .read(pool, &name, extent.object_offset, extent.length)
                    .await?,
            );
        }
        Ok(ChainReader::new(readers).boxed())
    }

    /// Delete an object and, for the big pool, every stripe object.
    pub async fn remove(
        &self,
        cluster: &Arc<dyn Cluster>,
        pool: Pool,
        object_id: &str,
    ) -> Result<(), BackendError> {
        if pool == Pool::Small {
            return cluster.remove(pool, object_id).await;
        }

        let mut object_no = 0u64;
        loop {
            let name = StripeLayout::stripe_name(object_id, object_no);
            match cluster.remove(pool, &name).await {
                Ok(()) => object_no += 1,
                Err(BackendError::NotFound { .. }) => break,
                Err(err) => return Err(err),
            }
        }
        debug!(cluster = cluster.cluster_id(), object_id, stripes = object_no, "removed striped object");
        Ok(())
    }
}

/// Write one window across its stripe extents and time it.
async fn write_window(
    cluster: Arc<dyn Cluster>,
    layout: StripeLayout,
    object_id: String,
    offset: u64,
    chunk: Bytes,
) -> Result<(u64, Duration), BackendError> {
    let started = Instant::now();
    let mut written = 0u64;
    for extent in layout.extents(offset, chunk.len() as u64) {
        #[allow(clippy::cast_possible_truncation)]
        let start = extent.buffer_offset as usize;
        #[allow(clippy::cast_possible_truncation)]
        let end = start + extent.length as usize;
        let name = StripeLayout::stripe_name(&object_id, extent.object_no);
        written += cluster
            .write(Pool::Big, &name, extent.object_offset, chunk.slice(start..end))
            .await?;
    }
    Ok((written, started.elapsed()))
}
