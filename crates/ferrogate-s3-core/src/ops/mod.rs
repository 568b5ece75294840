//! S3 operation handlers.
//!
//! This module contains the implementations of all S3 operations, organized
//! into submodules by category. Each submodule exposes `handle_*` methods
//! on [`crate::provider::GatewayS3`]:
//!
//! - [`bucket`]: bucket lifecycle and location
//! - [`bucket_config`]: bucket sub-resources (ACL, versioning, CORS, ...)
//! - [`list`]: object and version listings
//! - [`object`]: object CRUD, multi-object delete, copy and rename
//! - [`object_config`]: object ACL, metadata updates and restore
//! - [`append`]: appendable objects
//! - [`multipart`]: multipart uploads and their listings
//! - [`post`]: browser form uploads
//!
//! The shared I/O path lives here: placing data on a cluster, opening
//! decrypted ranges across parts and committing rows with the meta-sync
//! fallback.

pub mod append;
pub mod bucket;
pub mod bucket_config;
pub mod list;
pub mod multipart;
pub mod object;
pub mod object_config;
pub mod post;

use std::sync::Arc;

use bytes::Bytes;
use ferrogate_s3_model::input::SseCustomerKey;
use ferrogate_s3_model::request::RequestContext;
use ferrogate_s3_model::types::{Acl, CannedAcl, ObjectType, Owner, Permission};
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::backend::{BackendError, BoxReader, ChainReader, Cluster, ClusterSet, Pool};
use crate::crypto::sse::unlock;
use crate::crypto::{CtrReader, KEY_LEN, align_down, iv_from_slice};
use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::{BucketRecord, MetaError, ObjectRecord};
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::workers::RecycleTask;

/// Appended bytes go to the last part until it holds this many.
pub const APPEND_PART_SIZE: u64 = 30 * 1024 * 1024;

/// Smallest allowed size of a non-final multipart part.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// The account a request acts as; anonymous requests own nothing.
pub(crate) fn requester(ctx: &RequestContext) -> Owner {
    ctx.identity
        .as_ref()
        .map(|identity| Owner {
            id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
        })
        .unwrap_or_default()
}

pub(crate) fn canned(acl: Option<CannedAcl>) -> Acl {
    Acl::Canned(acl.unwrap_or(CannedAcl::Private))
}

/// Where a new backend object goes.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub(crate) cluster: Arc<dyn Cluster>,
    pub(crate) pool: Pool,
    pub(crate) object_id: String,
}

/// A contiguous run of object bytes held by one backend object.
struct Segment<'a> {
    pool: Pool,
    object_id: &'a str,
    offset: u64,
    size: u64,
    iv: &'a [u8],
    counter_base: u64,
}

fn segments(row: &ObjectRecord) -> Vec<Segment<'_>> {
    if row.parts.is_empty() {
        return vec![Segment {
            pool: row.pool,
            object_id: &row.object_id,
            offset: 0,
            size: row.size,
            iv: &row.iv,
            counter_base: 0,
        }];
    }
    // Appendable parts share the object keystream at their absolute offset;
    // multipart parts each restart a derived keystream at zero.
    let appendable = row.object_type == ObjectType::Appendable;
    row.parts
        .values()
        .map(|part| Segment {
            pool: Pool::Big,
            object_id: &part.object_id,
            offset: part.offset,
            size: part.size,
            iv: if appendable { &row.iv } else { &part.iv },
            counter_base: if appendable { part.offset } else { 0 },
        })
        .collect()
}

impl GatewayS3 {
    pub(crate) async fn load_bucket(&self, name: &str) -> S3ServiceResult<BucketRecord> {
        Ok(self.meta.get_bucket(name).await?)
    }

    /// Fetch a readable row. A latest delete marker reads as a missing key;
    /// addressing a marker by version is not allowed. Requesters who may not
    /// list the bucket get `AccessDenied` instead of `NoSuchKey`.
    pub(crate) async fn load_object(
        &self,
        bucket: &BucketRecord,
        key: &str,
        version_id: Option<&str>,
        ctx: &RequestContext,
    ) -> S3ServiceResult<ObjectRecord> {
        match self.meta.get_object(&bucket.name, key, version_id).await {
            Ok(row) if row.delete_marker => {
                if version_id.is_some() {
                    Err(S3ServiceError::MethodNotAllowed)
                } else {
                    Err(S3ServiceError::DeleteMarker {
                        key: key.to_owned(),
                        version_id: row.version_id,
                    })
                }
            }
            Ok(row) => Ok(row),
            Err(err @ (MetaError::NoSuchKey { .. } | MetaError::NoSuchVersion { .. })) => {
                check_access(bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, ctx)?;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The data key of a stored row, checking any SSE-C headers.
    pub(crate) async fn data_key(
        &self,
        row: &ObjectRecord,
        customer: &SseCustomerKey,
    ) -> S3ServiceResult<Option<[u8; KEY_LEN]>> {
        unlock(
            self.kms.as_ref(),
            row.sse_type,
            &row.encryption_key,
            row.kms_key_id.as_deref(),
            customer,
            &row.bucket,
            &row.name,
        )
        .await
    }

    /// Pick a cluster for a new backend object in `pool`.
    pub(crate) async fn place(&self, pool: Pool) -> S3ServiceResult<Placement> {
        Ok(Placement {
            cluster: self.clusters.pick_cluster().await?,
            pool,
            object_id: ClusterSet::new_object_id(),
        })
    }

    /// Write already-sealed bytes. A fresh object that fails or comes up
    /// short goes to the recycler; a short write is `IncompleteBody`.
    pub(crate) async fn store(
        &self,
        placement: &Placement,
        offset: u64,
        data: Bytes,
        object_type: ObjectType,
        fresh: bool,
    ) -> S3ServiceResult<()> {
        let expected = data.len() as u64;
        let failure = match self
            .clusters
            .write(&placement.cluster, placement.pool, &placement.object_id, offset, data)
            .await
        {
            Ok(written) if written == expected => return Ok(()),
            Ok(written) => {
                warn!(
                    object_id = %placement.object_id,
                    written,
                    expected,
                    "backend stored fewer bytes than sent"
                );
                S3ServiceError::IncompleteBody
            }
            Err(err) => {
                warn!(object_id = %placement.object_id, error = %err, "backend write failed");
                S3ServiceError::from(err)
            }
        };
        if fresh {
            self.recycler
                .recycle(RecycleTask::new(
                    placement.cluster.cluster_id(),
                    placement.pool,
                    &placement.object_id,
                    object_type,
                ))
                .await;
        }
        Err(failure)
    }

    /// Open `length` plaintext bytes at `start`, streaming across parts and
    /// decrypting with `key` when the row is encrypted.
    pub(crate) async fn open_range(
        &self,
        row: &ObjectRecord,
        key: Option<&[u8; KEY_LEN]>,
        start: u64,
        length: u64,
    ) -> S3ServiceResult<BoxReader> {
        if length == 0 {
            return Ok(Box::pin(tokio::io::empty()));
        }
        let cluster = self.clusters.cluster(&row.location)?;
        let end = start + length;

        let mut readers = Vec::new();
        for segment in segments(row) {
            let segment_end = segment.offset + segment.size;
            if segment_end <= start || segment.offset >= end {
                continue;
            }
            let rel_start = start.saturating_sub(segment.offset);
            let rel_end = end.min(segment_end) - segment.offset;
            let reader = match key {
                None => {
                    self.clusters
                        .reader(&cluster, segment.pool, segment.object_id, rel_start, rel_end - rel_start)
                        .await?
                }
                Some(key) => {
                    let (aligned, skip) = align_down(segment.counter_base + rel_start);
                    let backend_start = rel_start - skip as u64;
                    let inner = self
                        .clusters
                        .reader(
                            &cluster,
                            segment.pool,
                            segment.object_id,
                            backend_start,
                            rel_end - backend_start,
                        )
                        .await?;
                    let iv = iv_from_slice(segment.iv)?;
                    Box::pin(CtrReader::new(inner, key, &iv, aligned, skip)?) as BoxReader
                }
            };
            readers.push(reader);
        }
        Ok(ChainReader::new(readers).boxed())
    }

    /// Read a whole plaintext range into memory, for copies.
    pub(crate) async fn read_range(
        &self,
        row: &ObjectRecord,
        key: Option<&[u8; KEY_LEN]>,
        start: u64,
        length: u64,
    ) -> S3ServiceResult<Bytes> {
        let mut reader = self.open_range(row, key, start, length).await?;
        let mut buf = Vec::with_capacity(usize::try_from(length).unwrap_or_default());
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(BackendError::Io)?;
        Ok(Bytes::from(buf))
    }

    /// Insert a freshly written row.
    ///
    /// When the metadata store is unreachable the row goes to meta-sync and
    /// the write still succeeds; any other failure recycles the new data.
    pub(crate) async fn commit(&self, row: ObjectRecord) -> S3ServiceResult<()> {
        match self.meta.put_object(row.clone()).await {
            Ok(replaced) => {
                self.settle(&row.bucket, row.size, replaced).await;
                Ok(())
            }
            Err(MetaError::Unavailable(reason)) => {
                warn!(
                    bucket = %row.bucket,
                    key = %row.name,
                    %reason,
                    "object insert failed, handing row to meta-sync"
                );
                self.meta_sync.submit(row).await;
                Ok(())
            }
            Err(err) => {
                self.recycler.recycle_all(RecycleTask::for_object(&row)).await;
                Err(err.into())
            }
        }
    }

    /// Account for `added` new bytes and recycle a replaced row.
    pub(crate) async fn settle(&self, bucket: &str, added: u64, replaced: Option<ObjectRecord>) {
        let removed = replaced.as_ref().map_or(0, |row| row.size);
        self.add_usage(bucket, signed_delta(added, removed)).await;
        if let Some(old) = replaced {
            self.recycler.recycle_all(RecycleTask::for_object(&old)).await;
        }
    }

    pub(crate) async fn add_usage(&self, bucket: &str, delta: i64) {
        if delta == 0 {
            return;
        }
        if let Err(err) = self.meta.add_usage(bucket, delta).await {
            warn!(bucket, delta, error = %err, "failed to update bucket usage");
        }
    }
}

/// `added - removed` as a signed byte count.
pub(crate) fn signed_delta(added: u64, removed: u64) -> i64 {
    let added = i64::try_from(added).unwrap_or(i64::MAX);
    let removed = i64::try_from(removed).unwrap_or(i64::MAX);
    added - removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_signed_usage_delta() {
        assert_eq!(signed_delta(10, 4), 6);
        assert_eq!(signed_delta(4, 10), -6);
        assert_eq!(signed_delta(0, 0), 0);
    }

    #[test]
    fn test_should_default_canned_acl_to_private() {
        assert_eq!(canned(None), Acl::Canned(CannedAcl::Private));
        assert_eq!(
            canned(Some(CannedAcl::PublicRead)),
            Acl::Canned(CannedAcl::PublicRead)
        );
    }

    #[test]
    fn test_should_split_appendable_rows_at_absolute_offsets() {
        let mut row = ObjectRecord::new("b", "k", "null".to_owned());
        row.object_type = ObjectType::Appendable;
        row.iv = vec![1; 12];
        for (n, offset) in [(1, 0), (2, APPEND_PART_SIZE)] {
            row.parts.insert(
                n,
                crate::meta::Part {
                    part_number: n,
                    size: 10,
                    etag: String::new(),
                    offset,
                    object_id: format!("p{n}"),
                    iv: vec![9; 12],
                    last_modified: chrono::Utc::now(),
                },
            );
        }
        let segs = segments(&row);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].counter_base, APPEND_PART_SIZE);
        assert_eq!(segs[1].iv, row.iv.as_slice());
    }
}
