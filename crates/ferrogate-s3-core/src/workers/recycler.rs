//! Deletes orphaned backend objects.
//!
//! Anything that wrote bytes without a committed metadata row (failed PUTs,
//! replaced parts, aborted uploads, overwritten versions) hands the backend
//! object to the recycler.

use std::sync::Arc;

use ferrogate_s3_model::types::ObjectType;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CHANNEL_DEPTH, RetryPolicy};
use crate::backend::{BackendError, ClusterSet, Pool};
use crate::meta::{MultipartUploadRecord, ObjectRecord, Part};

/// One backend object to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecycleTask {
    /// Cluster holding the object.
    pub cluster: String,
    /// Pool of the object.
    pub pool: Pool,
    /// Backend object id.
    pub object_id: String,
    /// Layout of the row the object belonged to.
    pub object_type: ObjectType,
    /// Attempts made so far.
    pub attempts: u32,
}

impl RecycleTask {
    /// A fresh task.
    #[must_use]
    pub fn new(cluster: impl Into<String>, pool: Pool, object_id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            cluster: cluster.into(),
            pool,
            object_id: object_id.into(),
            object_type,
            attempts: 0,
        }
    }

    /// Tasks for every backend object of an object row. Parts always live
    /// in the big pool.
    #[must_use]
    pub fn for_object(record: &ObjectRecord) -> Vec<Self> {
        if record.delete_marker || record.location.is_empty() {
            return Vec::new();
        }
        if !record.parts.is_empty() {
            return record
                .parts
                .values()
                .map(|part| Self::for_part(&record.location, part, record.object_type))
                .collect();
        }
        record
            .backend_objects()
            .into_iter()
            .map(|id| Self::new(&record.location, record.pool, id, record.object_type))
            .collect()
    }

    /// Task for one part of a multipart upload or appendable object.
    #[must_use]
    pub fn for_part(cluster: &str, part: &Part, object_type: ObjectType) -> Self {
        Self::new(cluster, Pool::Big, &part.object_id, object_type)
    }

    /// Tasks for every part of an upload.
    #[must_use]
    pub fn for_upload(upload: &MultipartUploadRecord) -> Vec<Self> {
        upload
            .parts
            .values()
            .map(|part| Self::for_part(&upload.location, part, ObjectType::Multipart))
            .collect()
    }
}

/// Handle to the recycler task. Cloning shares the same queue.
#[derive(Debug, Clone)]
pub struct Recycler {
    tx: mpsc::Sender<RecycleTask>,
    stop: Arc<watch::Sender<bool>>,
}

impl Recycler {
    /// Start the worker.
    #[must_use]
    pub fn spawn(clusters: ClusterSet, retry: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(clusters, retry, rx, stop_rx));
        (
            Self {
                tx,
                stop: Arc::new(stop_tx),
            },
            handle,
        )
    }

    /// Queue one task, waiting for room in the channel.
    pub async fn recycle(&self, task: RecycleTask) {
        if *self.stop.borrow() {
            warn!(object_id = %task.object_id, "recycler stopped, leaking backend object");
            return;
        }
        if let Err(err) = self.tx.send(task).await {
            warn!(object_id = %err.0.object_id, "recycler gone, leaking backend object");
        }
    }

    /// Queue several tasks.
    pub async fn recycle_all(&self, tasks: impl IntoIterator<Item = RecycleTask>) {
        for task in tasks {
            self.recycle(task).await;
        }
    }

    /// Refuse new work; the worker drains the queue and exits.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

async fn run(
    clusters: ClusterSet,
    retry: RetryPolicy,
    mut rx: mpsc::Receiver<RecycleTask>,
    mut stop: watch::Receiver<bool>,
) {
    info!("recycler started");
    loop {
        tokio::select! {
            task = rx.recv() => match task {
                Some(task) => remove_with_retry(&clusters, retry, task).await,
                None => break,
            },
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    rx.close();
                    while let Some(task) = rx.recv().await {
                        remove_with_retry(&clusters, retry, task).await;
                    }
                    break;
                }
            }
        }
    }
    info!("recycler stopped");
}

async fn remove_with_retry(clusters: &ClusterSet, retry: RetryPolicy, mut task: RecycleTask) {
    while task.attempts < retry.max_tries {
        task.attempts += 1;
        let result = match clusters.cluster(&task.cluster) {
            Ok(cluster) => clusters.remove(&cluster, task.pool, &task.object_id).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) | Err(BackendError::NotFound { .. }) => {
                debug!(cluster = %task.cluster, object_id = %task.object_id, "recycled backend object");
                return;
            }
            Err(err) => {
                warn!(
                    cluster = %task.cluster,
                    object_id = %task.object_id,
                    attempt = task.attempts,
                    error = %err,
                    "failed to recycle backend object"
                );
                if task.attempts < retry.max_tries {
                    tokio::time::sleep(retry.delay).await;
                }
            }
        }
    }
    warn!(
        cluster = %task.cluster,
        pool = %task.pool,
        object_id = %task.object_id,
        object_type = %task.object_type,
        "giving up on backend object"
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::backend::{Cluster, MemoryCluster, WindowConfig};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_tries: 3,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_should_remove_queued_objects_before_stopping() {
        let cluster = Arc::new(MemoryCluster::new("c1"));
        let set = ClusterSet::new(vec![cluster.clone() as Arc<dyn Cluster>], WindowConfig::default());
        for id in ["a", "b", "c"] {
            cluster.write(Pool::Small, id, 0, Bytes::from_static(b"xyz")).await.unwrap();
        }

        let (recycler, handle) = Recycler::spawn(set, fast_retry());
        for id in ["a", "b", "c"] {
            recycler
                .recycle(RecycleTask::new("c1", Pool::Small, id, ObjectType::Normal))
                .await;
        }
        recycler.stop();
        handle.await.unwrap();

        assert_eq!(cluster.object_count(), 0);
    }

    #[tokio::test]
    async fn test_should_drop_task_for_unknown_cluster() {
        let set = ClusterSet::new(Vec::new(), WindowConfig::default());
        let (recycler, handle) = Recycler::spawn(set, fast_retry());
        recycler
            .recycle(RecycleTask::new("missing", Pool::Big, "x", ObjectType::Normal))
            .await;
        recycler.stop();
        handle.await.unwrap();
        // a second send after stop is ignored
        recycler
            .recycle(RecycleTask::new("missing", Pool::Big, "y", ObjectType::Normal))
            .await;
    }

    #[test]
    fn test_should_build_tasks_for_multipart_rows() {
        let mut record = ObjectRecord::new("b", "k", "null".to_owned());
        record.location = "c1".to_owned();
        record.object_type = ObjectType::Multipart;
        for n in 1..=2 {
            record.parts.insert(
                n,
                Part {
                    part_number: n,
                    size: 1,
                    etag: String::new(),
                    offset: 0,
                    object_id: format!("part-{n}"),
                    iv: Vec::new(),
                    last_modified: chrono::Utc::now(),
                },
            );
        }
        let tasks = RecycleTask::for_object(&record);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.pool == Pool::Big));
    }
}
