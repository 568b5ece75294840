//! Multipart upload operation handlers.
//!
//! Implements `create_multipart_upload`, `upload_part`, `upload_part_copy`,
//! `complete_multipart_upload`, `abort_multipart_upload`, `list_parts`,
//! and `list_multipart_uploads`.
//!
//! Parts are separate big-pool objects on the cluster chosen when the upload
//! starts. Encrypted parts use an IV derived from the upload IV and the part
//! number, with the counter starting at zero in every part.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::Utc;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{
    AbortMultipartUploadInput, CompleteMultipartUploadInput, CreateMultipartUploadInput,
    ListMultipartUploadsInput, ListPartsInput, SseCustomerKey, UploadPartCopyInput,
    UploadPartInput,
};
use ferrogate_s3_model::output::{
    CompleteMultipartUploadOutput, CreateMultipartUploadOutput, ListMultipartUploadsOutput,
    ListPartsOutput, UploadPartCopyOutput, UploadPartOutput,
};
use ferrogate_s3_model::request::{RequestContext, S3Request};
use ferrogate_s3_model::types::{MultipartUploadSummary, ObjectType, PartSummary, Permission};
use tracing::debug;

use super::list::page_size;
use super::{MIN_PART_SIZE, Placement, canned, requester};
use crate::backend::{ClusterSet, Pool};
use crate::crypto::sse::{sse_response, unlock};
use crate::crypto::{EncryptionPlan, KEY_LEN, apply_at, derive_iv, iv_from_slice};
use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::{BucketRecord, MultipartUploadRecord, ObjectRecord, Part, UploadQuery};
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::utils::{
    check_copy_preconditions, etags_match, generate_upload_id, md5_hex, multipart_etag,
    parse_copy_source, parse_copy_source_range,
};
use crate::validation::{
    validate_body_length, validate_content_md5, validate_metadata, validate_object_key,
    validate_object_size, validate_part_number,
};
use crate::workers::RecycleTask;

#[allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
impl GatewayS3 {
    /// Load the bucket and upload a part request addresses, checking write
    /// access to the bucket.
    async fn load_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        ctx: &RequestContext,
    ) -> S3ServiceResult<(BucketRecord, MultipartUploadRecord)> {
        let bucket = self.load_bucket(bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:PutObject",
            Some(key),
            ctx,
        )?;
        let upload = self.meta.get_upload(&bucket.name, key, upload_id).await?;
        Ok((bucket, upload))
    }

    /// Data key of an upload, checking SSE-C headers against it.
    async fn upload_key(
        &self,
        upload: &MultipartUploadRecord,
        customer: &SseCustomerKey,
    ) -> S3ServiceResult<Option<[u8; KEY_LEN]>> {
        unlock(
            self.kms.as_ref(),
            upload.sse_type,
            &upload.encryption_key,
            upload.kms_key_id.as_deref(),
            customer,
            &upload.bucket,
            &upload.key,
        )
        .await
    }

    /// Encrypt and write one part, then record it. A replaced part is
    /// recycled; if the upload vanished meanwhile the new part is.
    async fn store_part(
        &self,
        upload: &MultipartUploadRecord,
        part_number: i32,
        data: Bytes,
        key: Option<&[u8; KEY_LEN]>,
    ) -> S3ServiceResult<Part> {
        let base_iv = iv_from_slice(&upload.iv)?;
        let iv = derive_iv(&base_iv, part_number as u32);
        let size = data.len() as u64;
        let etag = md5_hex(&data);
        let sealed = match key {
            Some(key) => apply_at(key, &iv, 0, &data)?,
            None => data,
        };

        let placement = Placement {
            cluster: self.clusters.cluster(&upload.location)?,
            pool: Pool::Big,
            object_id: ClusterSet::new_object_id(),
        };
        self.store(&placement, 0, sealed, ObjectType::Multipart, true).await?;

        let part = Part {
            part_number,
            size,
            etag,
            offset: 0,
            object_id: placement.object_id,
            iv: iv.to_vec(),
            last_modified: Utc::now(),
        };
        match self
            .meta
            .put_part(&upload.bucket, &upload.key, &upload.upload_id, part.clone())
            .await
        {
            Ok(replaced) => {
                if let Some(old) = replaced {
                    self.recycler
                        .recycle(RecycleTask::for_part(&upload.location, &old, ObjectType::Multipart))
                        .await;
                }
                Ok(part)
            }
            Err(err) => {
                self.recycler
                    .recycle(RecycleTask::for_part(&upload.location, &part, ObjectType::Multipart))
                    .await;
                Err(err.into())
            }
        }
    }

    /// Handle `CreateMultipartUpload`.
    pub async fn handle_create_multipart_upload(
        &self,
        req: S3Request<CreateMultipartUploadInput>,
    ) -> Result<CreateMultipartUploadOutput, S3Error> {
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

        let plan = EncryptionPlan::for_write(
            self.kms.as_ref(),
            &input.sse,
            bucket.encryption.as_ref(),
            &bucket.name,
            &input.key,
        )
        .await?;
        let cluster = self.clusters.pick_cluster().await?;
        let owner = requester(&context);
        let upload = MultipartUploadRecord {
            bucket: bucket.name.clone(),
            key: input.key.clone(),
            upload_id: generate_upload_id(),
            initiator: owner.clone(),
            owner,
            acl: canned(input.acl),
            storage_class: input.storage_class.unwrap_or_default(),
            content: input.content,
            metadata: input.metadata,
            sse_type: plan.sse_type,
            encryption_key: plan.stored_key.clone(),
            kms_key_id: plan.kms_key_id.clone(),
            iv: plan.iv.to_vec(),
            location: cluster.cluster_id().to_owned(),
            parts: BTreeMap::new(),
            initiated: Utc::now(),
        };
        let upload_id = upload.upload_id.clone();
        self.meta.create_upload(upload).await?;

        debug!(bucket = %bucket.name, key = %input.key, upload_id = %upload_id, "create_multipart_upload completed");
        Ok(CreateMultipartUploadOutput {
            bucket: bucket.name,
            key: input.key,
            upload_id,
            sse: plan.response(),
        })
    }

    /// Handle `UploadPart`.
    pub async fn handle_upload_part(
        &self,
        req: S3Request<UploadPartInput>,
    ) -> Result<UploadPartOutput, S3Error> {
        let S3Request { input, context } = req;
        validate_part_number(input.part_number)?;
        let (_, upload) = self
            .load_upload(&input.bucket, &input.key, &input.upload_id, &context)
            .await?;

        let declared = input
            .content_length
            .ok_or(S3ServiceError::MissingContentLength)?;
        validate_object_size(declared)?;
        let data = input.body.data;
        validate_body_length(Some(declared), data.len())?;
        validate_content_md5(input.content_md5.as_deref(), &data)?;

        let key = self.upload_key(&upload, &input.sse_customer).await?;
        let part = self
            .store_part(&upload, input.part_number, data, key.as_ref())
            .await?;

        debug!(
            bucket = %upload.bucket,
            key = %upload.key,
            upload_id = %upload.upload_id,
            part_number = part.part_number,
            size = part.size,
            "upload_part completed"
        );
        Ok(UploadPartOutput {
            etag: format!("\"{}\"", part.etag),
            sse: sse_response(
                upload.sse_type,
                upload.kms_key_id.as_deref(),
                input.sse_customer.key_md5.as_deref(),
            ),
        })
    }

    /// Handle `UploadPartCopy`.
    pub async fn handle_upload_part_copy(
        &self,
        req: S3Request<UploadPartCopyInput>,
    ) -> Result<UploadPartCopyOutput, S3Error> {
        let S3Request { input, context } = req;
        validate_part_number(input.part_number)?;
        let (_, upload) = self
            .load_upload(&input.bucket, &input.key, &input.upload_id, &context)
            .await?;

        let (src_bucket_name, src_key, src_version) = parse_copy_source(&input.copy_source)?;
        let src_bucket = self.load_bucket(&src_bucket_name).await?;
        let source = self
            .load_object(&src_bucket, &src_key, src_version.as_deref(), &context)
            .await?;
        check_access(
            &src_bucket,
            AclTarget::Object {
                owner: &source.owner,
                acl: &source.acl,
            },
            Permission::Read,
            "s3:GetObject",
            Some(&src_key),
            &context,
        )?;
        check_copy_preconditions(
            &input.copy_source_preconditions,
            &source.etag,
            source.last_modified,
        )?;
        self.archive_state(&source, true).await?;

        let (start, length) = match input.copy_source_range.as_deref() {
            Some(range) => {
                let (start, end) = parse_copy_source_range(range, source.size)?;
                (start, end - start + 1)
            }
            None => (0, source.size),
        };
        validate_object_size(length)?;

        let source_key = self
            .data_key(&source, &input.copy_source_sse_customer)
            .await?;
        let data = self
            .read_range(&source, source_key.as_ref(), start, length)
            .await?;
        let key = self.upload_key(&upload, &input.sse_customer).await?;
        let part = self
            .store_part(&upload, input.part_number, data, key.as_ref())
            .await?;

        debug!(
            source = %input.copy_source,
            upload_id = %upload.upload_id,
            part_number = part.part_number,
            size = part.size,
            "upload_part_copy completed"
        );
        Ok(UploadPartCopyOutput {
            etag: format!("\"{}\"", part.etag),
            last_modified: part.last_modified,
            copy_source_version_id: source.exposed_version_id(),
            sse: sse_response(
                upload.sse_type,
                upload.kms_key_id.as_deref(),
                input.sse_customer.key_md5.as_deref(),
            ),
        })
    }

    /// Handle `CompleteMultipartUpload`.
    ///
    /// The listed parts must be numbered 1..=N, exist with matching etags
    /// and, except for the last, hold at least [`MIN_PART_SIZE`] bytes. The
    /// last part must not be empty. The object row replaces the upload
    /// atomically; parts left out of the list are recycled.
    pub async fn handle_complete_multipart_upload(
        &self,
        req: S3Request<CompleteMultipartUploadInput>,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        let S3Request { input, context } = req;
        let (bucket, mut upload) = self
            .load_upload(&input.bucket, &input.key, &input.upload_id, &context)
            .await?;
        if input.parts.is_empty() {
            return Err(S3ServiceError::MalformedXml {
                message: "You must specify at least one part".to_owned(),
            }
            .into());
        }
        if input
            .parts
            .windows(2)
            .any(|pair| pair[0].part_number >= pair[1].part_number)
        {
            return Err(S3ServiceError::InvalidPartOrder.into());
        }

        let last_index = input.parts.len() - 1;
        let mut parts = BTreeMap::new();
        let mut offset = 0u64;
        for (index, listed) in input.parts.iter().enumerate() {
            // Part numbers run 1..=N without gaps.
            if usize::try_from(listed.part_number).ok() != Some(index + 1) {
                return Err(S3ServiceError::InvalidPart {
                    part_number: listed.part_number,
                }
                .into());
            }
            let stored = upload
                .parts
                .remove(&listed.part_number)
                .filter(|stored| etags_match(&stored.etag, &listed.etag))
                .ok_or(S3ServiceError::InvalidPart {
                    part_number: listed.part_number,
                })?;
            let min_size_allowed = if index == last_index { 1 } else { MIN_PART_SIZE };
            if stored.size < min_size_allowed {
                return Err(S3ServiceError::EntityTooSmall {
                    proposed_size: stored.size,
                    min_size_allowed,
                    part_number: listed.part_number,
                    part_etag: listed.etag.clone(),
                }
                .into());
            }
            let mut part = stored;
            part.offset = offset;
            offset += part.size;
            parts.insert(part.part_number, part);
        }
        let etag = multipart_etag(parts.values().map(|p| p.etag.as_str()))?;
        // Whatever is still in the upload was not listed.
        let unlisted = std::mem::take(&mut upload.parts);

        let mut row = ObjectRecord::new(&bucket.name, &upload.key, bucket.next_version_id());
        row.size = offset;
        row.etag = etag;
        row.content = upload.content;
        row.metadata = upload.metadata;
        row.owner = upload.owner;
        row.acl = upload.acl;
        row.storage_class = upload.storage_class;
        row.object_type = ObjectType::Multipart;
        row.sse_type = upload.sse_type;
        row.encryption_key = upload.encryption_key;
        row.kms_key_id = upload.kms_key_id;
        row.iv = upload.iv;
        row.location.clone_from(&upload.location);
        row.pool = Pool::Big;
        row.parts = parts;

        let output = CompleteMultipartUploadOutput {
            location: format!("/{}/{}", bucket.name, row.name),
            bucket: bucket.name.clone(),
            key: row.name.clone(),
            etag: row.quoted_etag(),
            version_id: row.exposed_version_id(),
            sse: sse_response(row.sse_type, row.kms_key_id.as_deref(), None),
        };
        let size = row.size;
        let part_count = row.parts.len();
        let replaced = self.meta.complete_upload(&input.upload_id, row).await?;
        self.settle(&bucket.name, size, replaced).await;
        self.recycler
            .recycle_all(
                unlisted
                    .values()
                    .map(|part| RecycleTask::for_part(&upload.location, part, ObjectType::Multipart))
                    .collect::<Vec<_>>(),
            )
            .await;

        debug!(
            bucket = %bucket.name,
            key = %output.key,
            upload_id = %input.upload_id,
            parts = part_count,
            size,
            "complete_multipart_upload completed"
        );
        Ok(output)
    }

    /// Handle `AbortMultipartUpload`; every uploaded part is recycled.
    pub async fn handle_abort_multipart_upload(
        &self,
        req: S3Request<AbortMultipartUploadInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:AbortMultipartUpload",
            Some(&input.key),
            &context,
        )?;
        let upload = self
            .meta
            .delete_upload(&bucket.name, &input.key, &input.upload_id)
            .await?;
        self.recycler.recycle_all(RecycleTask::for_upload(&upload)).await;
        debug!(
            bucket = %bucket.name,
            key = %input.key,
            upload_id = %input.upload_id,
            parts = upload.parts.len(),
            "abort_multipart_upload completed"
        );
        Ok(())
    }

    /// Handle `ListParts`.
    pub async fn handle_list_parts(
        &self,
        req: S3Request<ListPartsInput>,
    ) -> Result<ListPartsOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Read,
            "s3:ListMultipartUploadParts",
            Some(&input.key),
            &context,
        )?;
        let upload = self
            .meta
            .get_upload(&bucket.name, &input.key, &input.upload_id)
            .await?;
        let max_parts = page_size(input.max_parts, "max-parts")?;
        let marker = input.part_number_marker.unwrap_or(0);

        let mut remaining = upload.parts.range(marker + 1..);
        let parts: Vec<PartSummary> = remaining
            .by_ref()
            .take(max_parts)
            .map(|(_, part)| PartSummary {
                part_number: part.part_number,
                last_modified: part.last_modified,
                etag: format!("\"{}\"", part.etag),
                size: part.size,
            })
            .collect();
        let is_truncated = remaining.next().is_some();
        let next_part_number_marker = parts.last().map_or(0, |p| p.part_number);

        Ok(ListPartsOutput {
            bucket: bucket.name,
            key: upload.key,
            upload_id: upload.upload_id,
            initiator: upload.initiator,
            owner: upload.owner,
            storage_class: upload.storage_class,
            part_number_marker: marker,
            next_part_number_marker,
            max_parts: max_parts as i32,
            is_truncated,
            parts,
        })
    }

    /// Handle `ListMultipartUploads`.
    pub async fn handle_list_multipart_uploads(
        &self,
        req: S3Request<ListMultipartUploadsInput>,
    ) -> Result<ListMultipartUploadsOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Read,
            "s3:ListBucketMultipartUploads",
            None,
            &context,
        )?;
        let max_uploads = page_size(input.max_uploads, "max-uploads")?;
        let page = self
            .meta
            .list_uploads(
                &bucket.name,
                &UploadQuery {
                    prefix: input.prefix.clone().unwrap_or_default(),
                    delimiter: input.delimiter.clone().unwrap_or_default(),
                    key_marker: input.key_marker.clone().unwrap_or_default(),
                    upload_id_marker: input.upload_id_marker.clone().unwrap_or_default(),
                    max_uploads,
                },
            )
            .await?;

        Ok(ListMultipartUploadsOutput {
            bucket: bucket.name,
            prefix: input.prefix,
            delimiter: input.delimiter,
            key_marker: input.key_marker,
            upload_id_marker: input.upload_id_marker,
            next_key_marker: page.next_key_marker,
            next_upload_id_marker: page.next_upload_id_marker,
            max_uploads: max_uploads as i32,
            is_truncated: page.is_truncated,
            uploads: page
                .uploads
                .into_iter()
                .map(|upload| MultipartUploadSummary {
                    key: upload.key,
                    upload_id: upload.upload_id,
                    initiator: upload.initiator,
                    owner: upload.owner,
                    storage_class: upload.storage_class,
                    initiated: upload.initiated,
                })
                .collect(),
            common_prefixes: page.common_prefixes,
        })
    }
}
