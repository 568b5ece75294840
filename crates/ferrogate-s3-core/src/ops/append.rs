//! Appendable objects.
//!
//! `POST ?append&position=N` creates an appendable object at position 0 and
//! extends it afterwards, but only at its current length. Bytes fill the
//! last part up to [`APPEND_PART_SIZE`] before a new part is opened, so
//! every part starts at a multiple of the cap. Encrypted appendable objects
//! keep a single keystream addressed by absolute offset.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{AppendObjectInput, SseCustomerKey};
use ferrogate_s3_model::output::AppendObjectOutput;
use ferrogate_s3_model::request::S3Request;
use ferrogate_s3_model::types::{ObjectType, Permission};
use tracing::debug;

use super::{APPEND_PART_SIZE, Placement, canned, requester};
use crate::backend::{ClusterSet, Pool};
use crate::crypto::sse::sse_response;
use crate::crypto::{EncryptionPlan, KEY_LEN, apply_at, iv_from_slice};
use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::{MetaError, NULL_VERSION_ID, ObjectRecord, Part};
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::utils::md5_hex;
use crate::validation::{
    validate_body_length, validate_content_md5, validate_metadata, validate_object_key,
    validate_object_size,
};
use crate::workers::RecycleTask;

impl GatewayS3 {
    /// Write `data` at the end of `row`, opening parts as needed, and grow
    /// the row. Parts created here are recycled if a later write fails.
    async fn append_bytes(
        &self,
        row: &mut ObjectRecord,
        key: Option<&[u8; KEY_LEN]>,
        data: &Bytes,
    ) -> S3ServiceResult<()> {
        let cluster = self.clusters.cluster(&row.location)?;
        let iv = if key.is_some() {
            Some(iv_from_slice(&row.iv)?)
        } else {
            None
        };
        let now = Utc::now();
        let mut created = Vec::new();
        let mut pos = 0usize;

        while pos < data.len() {
            let offset = row.size + pos as u64;
            let mut part = match row.parts.values().next_back() {
                Some(last) if last.size < APPEND_PART_SIZE => last.clone(),
                last => {
                    let part_number = last.map_or(1, |p| p.part_number + 1);
                    let object_id = ClusterSet::new_object_id();
                    created.push(object_id.clone());
                    Part {
                        part_number,
                        size: 0,
                        etag: String::new(),
                        offset,
                        object_id,
                        iv: row.iv.clone(),
                        last_modified: now,
                    }
                }
            };
            let room = APPEND_PART_SIZE - part.size;
            let take = usize::try_from(room).map_or(data.len() - pos, |room| room.min(data.len() - pos));
            let chunk = data.slice(pos..pos + take);
            let sealed = match (key, iv.as_ref()) {
                (Some(key), Some(iv)) => apply_at(key, iv, offset, &chunk)?,
                _ => chunk,
            };

            let placement = Placement {
                cluster: Arc::clone(&cluster),
                pool: Pool::Big,
                object_id: part.object_id.clone(),
            };
            if let Err(err) = self
                .store(&placement, part.size, sealed, ObjectType::Appendable, false)
                .await
            {
                self.recycler
                    .recycle_all(created.iter().map(|id| {
                        RecycleTask::new(&row.location, Pool::Big, id, ObjectType::Appendable)
                    }).collect::<Vec<_>>())
                    .await;
                return Err(err);
            }

            part.size += take as u64;
            part.last_modified = now;
            row.parts.insert(part.part_number, part);
            pos += take;
        }
        row.size += data.len() as u64;
        row.last_modified = now;
        Ok(())
    }

    /// Handle `AppendObject`.
    pub async fn handle_append_object(
        &self,
        req: S3Request<AppendObjectInput>,
    ) -> Result<AppendObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        validate_object_key(&input.key)?;
        validate_metadata(&input.metadata)?;

        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:PutObject",
            Some(&input.key),
            &context,
        )?;
        if input.sse.customer.is_present() {
            return Err(S3ServiceError::InvalidRequest {
                message: "Appendable objects do not support customer-provided keys".to_owned(),
            }
            .into());
        }

        let declared = input
            .content_length
            .ok_or(S3ServiceError::MissingContentLength)?;
        validate_object_size(declared)?;
        let data = input.body.data;
        validate_body_length(Some(declared), data.len())?;
        validate_content_md5(input.content_md5.as_deref(), &data)?;

        let existing = match self.meta.get_object(&bucket.name, &input.key, None).await {
            Ok(row) if row.delete_marker => None,
            Ok(row) => Some(row),
            Err(MetaError::NoSuchKey { .. }) => None,
            Err(err) => return Err(err.into()),
        };
        let etag = md5_hex(&data);

        let row = match existing {
            Some(mut row) => {
                if row.object_type != ObjectType::Appendable {
                    return Err(S3ServiceError::ObjectNotAppendable { key: input.key }.into());
                }
                if input.position != row.size {
                    return Err(S3ServiceError::PositionNotEqualToLength {
                        position: input.position,
                        length: row.size,
                    }
                    .into());
                }
                let key = self.data_key(&row, &SseCustomerKey::default()).await?;
                self.append_bytes(&mut row, key.as_ref(), &data).await?;
                row.etag.clone_from(&etag);
                self.meta.update_object(row.clone()).await?;
                self.add_usage(&bucket.name, i64::try_from(data.len()).unwrap_or(i64::MAX))
                    .await;
                row
            }
            None => {
                if input.position != 0 {
                    return Err(S3ServiceError::PositionNotEqualToLength {
                        position: input.position,
                        length: 0,
                    }
                    .into());
                }
                let plan = EncryptionPlan::for_write(
                    self.kms.as_ref(),
                    &input.sse,
                    bucket.encryption.as_ref(),
                    &bucket.name,
                    &input.key,
                )
                .await?;
                let cluster = self.clusters.pick_cluster().await?;

                let mut row = ObjectRecord::new(&bucket.name, &input.key, NULL_VERSION_ID.to_owned());
                row.object_type = ObjectType::Appendable;
                row.pool = Pool::Big;
                row.location = cluster.cluster_id().to_owned();
                row.sse_type = plan.sse_type;
                row.encryption_key.clone_from(&plan.stored_key);
                row.kms_key_id.clone_from(&plan.kms_key_id);
                row.iv = plan.iv.to_vec();
                row.content = input.content;
                row.metadata = input.metadata;
                row.owner = requester(&context);
                row.acl = canned(input.acl);
                row.storage_class = input.storage_class.unwrap_or_default();
                row.etag.clone_from(&etag);

                self.append_bytes(&mut row, plan.key.as_ref(), &data).await?;
                self.commit(row.clone()).await?;
                row
            }
        };

        debug!(
            bucket = %bucket.name,
            key = %row.name,
            appended = data.len(),
            next_position = row.size,
            parts = row.parts.len(),
            "append_object completed"
        );
        Ok(AppendObjectOutput {
            etag: format!("\"{etag}\""),
            next_append_position: row.size,
            sse: sse_response(row.sse_type, row.kms_key_id.as_deref(), None),
        })
    }
}
