//! The gateway service object.
//!
//! [`GatewayS3`] owns every shared component: the metadata store, the
//! backend clusters, the KMS and the handles of the background workers.
//! Individual S3 operations are implemented in the `ops` submodules
//! as `handle_*` methods.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::backend::{Cluster, ClusterSet, MemoryCluster, WindowConfig};
use crate::config::GatewayConfig;
use crate::crypto::{Kms, LocalKms};
use crate::error::S3ServiceError;
use crate::meta::{CachedMetaStore, MemoryMetaStore, MetaStore};
use crate::workers::{MetaSync, Recycler, RetryPolicy};

/// The S3 gateway service.
///
/// All fields are cheap to clone or `Arc`-wrapped, so the service can be
/// shared across handler tasks behind one `Arc`.
#[derive(Debug)]
pub struct GatewayS3 {
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) meta: Arc<dyn MetaStore>,
    pub(crate) clusters: ClusterSet,
    pub(crate) kms: Arc<dyn Kms>,
    pub(crate) recycler: Recycler,
    pub(crate) meta_sync: MetaSync,
}

/// Join handles of the tasks started with the service.
#[derive(Debug)]
pub struct WorkerHandles {
    recycler: JoinHandle<()>,
    meta_sync: JoinHandle<()>,
    sweeper: Option<JoinHandle<()>>,
}

impl GatewayS3 {
    /// Build the service from configuration: one in-memory cluster per
    /// configured id, a cached in-memory metadata store and a local KMS.
    ///
    /// Must be called inside a Tokio runtime; the workers are spawned here.
    pub fn new(config: GatewayConfig) -> Result<(Self, WorkerHandles), S3ServiceError> {
        let window = WindowConfig {
            min: config.upload_min_window,
            max: config.upload_max_window,
            expected_rate: config.upload_expected_rate,
        };
        let clusters: Vec<Arc<dyn Cluster>> = config
            .cluster_ids
            .iter()
            .map(|id| Arc::new(MemoryCluster::new(id.clone())) as Arc<dyn Cluster>)
            .collect();
        let kms = LocalKms::from_config(config.kms_master_key.as_deref())?;

        let ttl = Duration::from_secs(config.cache_ttl_secs);
        let cache = Arc::new(CachedMetaStore::new(Arc::new(MemoryMetaStore::new()), ttl));
        let sweeper = cache.spawn_sweeper(ttl);

        let (service, mut handles) = Self::with_parts(
            config,
            cache,
            ClusterSet::new(clusters, window),
            Arc::new(kms),
            RetryPolicy::default(),
        );
        handles.sweeper = Some(sweeper);
        Ok((service, handles))
    }

    /// Assemble the service from explicit components and start its workers.
    #[must_use]
    pub fn with_parts(
        config: GatewayConfig,
        meta: Arc<dyn MetaStore>,
        clusters: ClusterSet,
        kms: Arc<dyn Kms>,
        retry: RetryPolicy,
    ) -> (Self, WorkerHandles) {
        let (recycler, recycler_task) = Recycler::spawn(clusters.clone(), retry);
        let (meta_sync, meta_sync_task) =
            MetaSync::spawn(Arc::clone(&meta), recycler.clone(), retry);
        info!(
            clusters = ?clusters.cluster_ids().collect::<Vec<_>>(),
            region = %config.region,
            "gateway service initialised"
        );
        (
            Self {
                config: Arc::new(config),
                meta,
                clusters,
                kms,
                recycler,
                meta_sync,
            },
            WorkerHandles {
                recycler: recycler_task,
                meta_sync: meta_sync_task,
                sweeper: None,
            },
        )
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the metadata store.
    #[must_use]
    pub fn meta(&self) -> &Arc<dyn MetaStore> {
        &self.meta
    }

    /// Returns the backend clusters.
    #[must_use]
    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    /// Returns the recycler handle.
    #[must_use]
    pub fn recycler(&self) -> &Recycler {
        &self.recycler
    }

    /// Stop the workers in dependency order: meta-sync first, since it may
    /// still hand data to the recycler.
    pub async fn shutdown(&self, handles: WorkerHandles) {
        self.meta_sync.stop();
        if let Err(err) = handles.meta_sync.await {
            tracing::warn!(error = %err, "meta-sync task failed");
        }
        self.recycler.stop();
        if let Err(err) = handles.recycler.await {
            tracing::warn!(error = %err, "recycler task failed");
        }
        if let Some(sweeper) = handles.sweeper {
            sweeper.abort();
        }
        info!("gateway workers stopped");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for handler tests.

    use std::time::Duration;

    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use ferrogate_s3_model::input::SseCustomerKey;
    use ferrogate_s3_model::output::ObjectBody;
    use ferrogate_s3_model::request::{Identity, RequestContext};
    use ferrogate_s3_model::types::Owner;
    use md5::{Digest, Md5};
    use tokio::io::AsyncReadExt;

    use super::*;

    /// A service over one in-memory cluster with fast worker retries.
    pub(crate) fn service() -> (GatewayS3, WorkerHandles, Arc<MemoryCluster>) {
        let cluster = Arc::new(MemoryCluster::new("local"));
        let clusters = ClusterSet::new(
            vec![Arc::clone(&cluster) as Arc<dyn Cluster>],
            WindowConfig::default(),
        );
        let kms = LocalKms::new("test-key", &[7u8; 32]).unwrap();
        let (service, handles) = GatewayS3::with_parts(
            GatewayConfig::default(),
            Arc::new(MemoryMetaStore::new()),
            clusters,
            Arc::new(kms),
            RetryPolicy {
                max_tries: 3,
                delay: Duration::from_millis(1),
            },
        );
        (service, handles, cluster)
    }

    /// A signed context for `user`.
    pub(crate) fn user(user: &str) -> RequestContext {
        RequestContext::new(format!("req-{user}")).with_identity(Identity {
            user_id: user.to_owned(),
            display_name: user.to_owned(),
            access_key: format!("{user}-key"),
        })
    }

    /// Create `name` owned by `owner` directly in the metadata store.
    pub(crate) async fn make_bucket(service: &GatewayS3, owner: &str, name: &str) {
        service
            .meta()
            .create_bucket(crate::meta::BucketRecord::new(
                name,
                Owner {
                    id: owner.to_owned(),
                    display_name: owner.to_owned(),
                },
                "us-east-1",
            ))
            .await
            .unwrap();
    }

    /// SSE-C headers for a key made of `byte` repeated.
    pub(crate) fn customer_key(byte: u8) -> SseCustomerKey {
        let key = [byte; 32];
        SseCustomerKey {
            algorithm: Some("AES256".to_owned()),
            key: Some(BASE64_STANDARD.encode(key)),
            key_md5: Some(BASE64_STANDARD.encode(Md5::digest(key))),
        }
    }

    /// Drain a GET body.
    pub(crate) async fn read_body(body: ObjectBody) -> Vec<u8> {
        match body {
            ObjectBody::Bytes(bytes) => bytes.to_vec(),
            ObjectBody::Reader { mut reader, .. } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await.unwrap();
                buf
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::service;
    use super::*;

    #[tokio::test]
    async fn test_should_create_provider_with_defaults() {
        let (provider, handles) = GatewayS3::new(GatewayConfig::default()).unwrap();
        assert_eq!(provider.config().region, "us-east-1");
        assert_eq!(provider.clusters().cluster_ids().collect::<Vec<_>>(), vec!["local"]);
        assert!(provider.meta().list_buckets("anyone").await.unwrap().is_empty());
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_debug_format_provider() {
        let (provider, handles, _) = service();
        assert!(format!("{provider:?}").contains("GatewayS3"));
        provider.shutdown(handles).await;
    }
}
