//! Retries object-row inserts that failed after the data was written.
//!
//! A stored row is accounted in its bucket's usage like a foreground insert.
//! A row that still cannot be stored after the last attempt is dropped and
//! its backend objects go to the [`Recycler`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CHANNEL_DEPTH, RecycleTask, Recycler, RetryPolicy};
use crate::meta::{MetaStore, ObjectRecord};
use crate::ops::signed_delta;

/// A row waiting to be inserted.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    /// The row.
    pub row: ObjectRecord,
    /// Attempts made so far, including the failed foreground insert.
    pub attempt: u32,
}

/// Handle to the meta-sync task.
#[derive(Debug, Clone)]
pub struct MetaSync {
    tx: mpsc::Sender<SyncEvent>,
    stop: Arc<watch::Sender<bool>>,
}

impl MetaSync {
    /// Start the worker.
    #[must_use]
    pub fn spawn(
        meta: Arc<dyn MetaStore>,
        recycler: Recycler,
        retry: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = Worker {
            meta,
            recycler,
            retry,
        };
        let handle = tokio::spawn(worker.run(rx, stop_rx));
        (
            Self {
                tx,
                stop: Arc::new(stop_tx),
            },
            handle,
        )
    }

    /// Queue a row whose foreground insert failed.
    pub async fn submit(&self, row: ObjectRecord) {
        let event = SyncEvent { row, attempt: 1 };
        if *self.stop.borrow() {
            warn!(bucket = %event.row.bucket, key = %event.row.name, "meta-sync stopped, dropping row");
            return;
        }
        if let Err(err) = self.tx.send(event).await {
            warn!(bucket = %err.0.row.bucket, key = %err.0.row.name, "meta-sync gone, dropping row");
        }
    }

    /// Refuse new work; the worker drains the queue and exits.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

struct Worker {
    meta: Arc<dyn MetaStore>,
    recycler: Recycler,
    retry: RetryPolicy,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<SyncEvent>, mut stop: watch::Receiver<bool>) {
        info!("meta-sync started");
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.sync(event).await,
                    None => break,
                },
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        rx.close();
                        while let Some(event) = rx.recv().await {
                            self.sync(event).await;
                        }
                        break;
                    }
                }
            }
        }
        info!("meta-sync stopped");
    }

    async fn sync(&self, mut event: SyncEvent) {
        while event.attempt < self.retry.max_tries {
            // Linear backoff: one delay unit per failed attempt.
            tokio::time::sleep(self.retry.delay * event.attempt).await;
            event.attempt += 1;
            match self.meta.put_object(event.row.clone()).await {
                Ok(replaced) => {
                    debug!(bucket = %event.row.bucket, key = %event.row.name, "meta-sync stored row");
                    self.settle(&event.row, replaced).await;
                    return;
                }
                Err(err) => {
                    warn!(
                        bucket = %event.row.bucket,
                        key = %event.row.name,
                        attempt = event.attempt,
                        error = %err,
                        "meta-sync insert failed"
                    );
                }
            }
        }
        warn!(
            bucket = %event.row.bucket,
            key = %event.row.name,
            version_id = %event.row.version_id,
            "meta-sync giving up, recycling data"
        );
        self.recycler.recycle_all(RecycleTask::for_object(&event.row)).await;
    }

    async fn settle(&self, row: &ObjectRecord, replaced: Option<ObjectRecord>) {
        let removed = replaced.as_ref().map_or(0, |old| old.size);
        let delta = signed_delta(row.size, removed);
        if delta != 0 {
            if let Err(err) = self.meta.add_usage(&row.bucket, delta).await {
                warn!(bucket = %row.bucket, delta, error = %err, "failed to update bucket usage");
            }
        }
        if let Some(old) = replaced {
            self.recycler.recycle_all(RecycleTask::for_object(&old)).await;
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("retry", &self.retry).finish_non_exhaustive()
    }
}
