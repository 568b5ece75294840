//! Object CRUD operation handlers.
//!
//! Implements `put_object`, `get_object`, `head_object`, `delete_object`,
//! `delete_objects`, `copy_object` and `rename_object`.

use bytes::Bytes;
use chrono::Utc;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{
    ContentHeaders, CopyObjectInput, DeleteObjectInput, DeleteObjectsInput, GetObjectInput,
    HeadObjectInput, PutObjectInput, RenameObjectInput,
};
use ferrogate_s3_model::output::{
    CopyObjectOutput, DeleteObjectOutput, DeleteObjectsOutput, GetObjectOutput, HeadObjectOutput,
    ObjectBody, PutObjectOutput,
};
use ferrogate_s3_model::request::{RequestContext, S3Request};
use ferrogate_s3_model::types::{
    BucketVersioningStatus, DeleteError, DeletedObject, MetadataDirective, ObjectType, Permission,
    StorageClass,
};
use percent_encoding::percent_decode_str;
use tracing::debug;

use super::{canned, requester};
use crate::backend::Pool;
use crate::crypto::{EncryptionPlan, SseType};
use crate::crypto::sse::sse_response;
use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::{
    BucketRecord, FreezerRecord, FreezerStatus, MetaError, NULL_VERSION_ID, ObjectRecord,
    mint_version_id,
};
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::utils::{
    check_copy_preconditions, check_preconditions, md5_hex, parse_copy_source, parse_range_header,
};
use crate::validation::{
    MAX_DELETE_KEYS, validate_body_length, validate_content_md5, validate_metadata,
    validate_object_key, validate_object_size,
};

/// `x-amz-restore` value for an archived object.
fn restore_header(freezer: &FreezerRecord) -> String {
    match freezer.status {
        FreezerStatus::Finish => format!(
            "ongoing-request=\"false\", expiry-date=\"{}\"",
            freezer.expires_at().format("%a, %d %b %Y %H:%M:%S GMT")
        ),
        FreezerStatus::Ready | FreezerStatus::Restoring => "ongoing-request=\"true\"".to_owned(),
    }
}

fn override_with(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Apply `response-*` query overrides to the stored headers.
pub(super) fn apply_overrides(content: &mut ContentHeaders, overrides: ContentHeaders) {
    override_with(&mut content.content_type, overrides.content_type);
    override_with(&mut content.cache_control, overrides.cache_control);
    override_with(&mut content.content_disposition, overrides.content_disposition);
    override_with(&mut content.content_encoding, overrides.content_encoding);
    override_with(&mut content.content_language, overrides.content_language);
    override_with(&mut content.expires, overrides.expires);
}

pub(crate) fn head_output(
    row: &ObjectRecord,
    restore: Option<String>,
    customer_key_md5: Option<&str>,
) -> HeadObjectOutput {
    HeadObjectOutput {
        content_length: row.size,
        etag: row.quoted_etag(),
        last_modified: row.last_modified,
        content: row.content.clone(),
        metadata: row.metadata.clone(),
        version_id: row.exposed_version_id(),
        storage_class: row.storage_class,
        restore,
        object_type: row.object_type,
        next_append_position: (row.object_type == ObjectType::Appendable).then_some(row.size),
        sse: sse_response(row.sse_type, row.kms_key_id.as_deref(), customer_key_md5),
    }
}

#[allow(clippy::too_many_lines)]
impl GatewayS3 {
    /// Restore state of an archived row; with `require_readable` a GLACIER
    /// row without a live finished restore is `InvalidObjectState`.
    pub(crate) async fn archive_state(
        &self,
        row: &ObjectRecord,
        require_readable: bool,
    ) -> S3ServiceResult<Option<String>> {
        if row.storage_class != StorageClass::Glacier {
            return Ok(None);
        }
        let freezer = self
            .meta
            .get_freezer(&row.bucket, &row.name, &row.version_id)
            .await?;
        if require_readable && !freezer.as_ref().is_some_and(|f| f.is_readable(Utc::now())) {
            return Err(S3ServiceError::InvalidObjectState {
                key: row.name.clone(),
            });
        }
        Ok(freezer.as_ref().map(restore_header))
    }

    /// Seal and write a whole new object, returning its uncommitted row.
    pub(crate) async fn write_new_object(
        &self,
        bucket: &BucketRecord,
        key: &str,
        data: Bytes,
        plan: &EncryptionPlan,
        etag: String,
    ) -> S3ServiceResult<ObjectRecord> {
        let size = data.len() as u64;
        let placement = self.place(Pool::for_size(size)).await?;
        let sealed = plan.seal_at(0, &data)?;
        self.store(&placement, 0, sealed, ObjectType::Normal, true).await?;

        let mut row = ObjectRecord::new(&bucket.name, key, bucket.next_version_id());
        row.size = size;
        row.etag = etag;
        row.sse_type = plan.sse_type;
        row.encryption_key.clone_from(&plan.stored_key);
        row.kms_key_id.clone_from(&plan.kms_key_id);
        row.iv = plan.iv.to_vec();
        row.location = placement.cluster.cluster_id().to_owned();
        row.pool = placement.pool;
        row.object_id = placement.object_id;
        Ok(row)
    }

    /// Handle `PutObject`.
    pub async fn handle_put_object(
        &self,
        req: S3Request<PutObjectInput>,
    ) -> Result<PutObjectOutput, S3Error> {
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

        let declared = input
            .content_length
            .ok_or(S3ServiceError::MissingContentLength)?;
        validate_object_size(declared)?;
        let data = input.body.data;
        validate_body_length(Some(declared), data.len())?;
        validate_content_md5(input.content_md5.as_deref(), &data)?;

        let plan = EncryptionPlan::for_write(
            self.kms.as_ref(),
            &input.sse,
            bucket.encryption.as_ref(),
            &bucket.name,
            &input.key,
        )
        .await?;
        let etag = md5_hex(&data);
        let mut row = self
            .write_new_object(&bucket, &input.key, data, &plan, etag)
            .await?;
        row.content = input.content;
        row.metadata = input.metadata;
        row.owner = requester(&context);
        row.acl = canned(input.acl);
        row.storage_class = input.storage_class.unwrap_or_default();

        let output = PutObjectOutput {
            etag: row.quoted_etag(),
            version_id: row.exposed_version_id(),
            sse: plan.response(),
        };
        debug!(
            bucket = %bucket.name,
            key = %row.name,
            version_id = %row.version_id,
            size = row.size,
            "put_object completed"
        );
        self.commit(row).await?;
        Ok(output)
    }

    /// Handle `GetObject`.
    pub async fn handle_get_object(
        &self,
        req: S3Request<GetObjectInput>,
    ) -> Result<GetObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        let row = self
            .load_object(&bucket, &input.key, input.version_id.as_deref(), &context)
            .await?;
        check_access(
            &bucket,
            AclTarget::Object {
                owner: &row.owner,
                acl: &row.acl,
            },
            Permission::Read,
            "s3:GetObject",
            Some(&input.key),
            &context,
        )?;
        let restore = self.archive_state(&row, true).await?;
        check_preconditions(&input.preconditions, &row.etag, row.last_modified)?;
        let key = self.data_key(&row, &input.sse_customer).await?;

        let (start, length, content_range) = match input.range.as_deref() {
            Some(range) => {
                let (start, end) = parse_range_header(range, row.size)?;
                (
                    start,
                    end - start + 1,
                    Some(format!("bytes {start}-{end}/{}", row.size)),
                )
            }
            None => (0, row.size, None),
        };
        let reader = self.open_range(&row, key.as_ref(), start, length).await?;

        let mut head = head_output(&row, restore, input.sse_customer.key_md5.as_deref());
        apply_overrides(&mut head.content, input.response_overrides);
        debug!(
            bucket = %bucket.name,
            key = %row.name,
            start,
            length,
            "get_object completed"
        );
        Ok(GetObjectOutput {
            head,
            content_range,
            body: ObjectBody::Reader { reader, length },
        })
    }

    /// Handle `HeadObject`.
    pub async fn handle_head_object(
        &self,
        req: S3Request<HeadObjectInput>,
    ) -> Result<HeadObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        let row = self
            .load_object(&bucket, &input.key, input.version_id.as_deref(), &context)
            .await?;
        check_access(
            &bucket,
            AclTarget::Object {
                owner: &row.owner,
                acl: &row.acl,
            },
            Permission::Read,
            "s3:GetObject",
            Some(&input.key),
            &context,
        )?;
        let restore = self.archive_state(&row, false).await?;
        check_preconditions(&input.preconditions, &row.etag, row.last_modified)?;
        if !matches!(row.sse_type, SseType::S3 | SseType::Kms) {
            // Only customer-key checks matter here; managed keys stay sealed.
            self.data_key(&row, &input.sse_customer).await?;
        }
        let mut head = head_output(&row, restore, input.sse_customer.key_md5.as_deref());
        apply_overrides(&mut head.content, input.response_overrides);
        debug!(bucket = %bucket.name, key = %row.name, "head_object completed");
        Ok(head)
    }

    /// Delete one key or version, honouring the bucket versioning state.
    pub(crate) async fn delete_one(
        &self,
        bucket: &BucketRecord,
        key: &str,
        version_id: Option<&str>,
        ctx: &RequestContext,
    ) -> S3ServiceResult<DeleteObjectOutput> {
        if let Some(version_id) = version_id {
            return match self.meta.delete_object(&bucket.name, key, version_id).await {
                Ok(removed) => {
                    let delete_marker = removed.delete_marker;
                    self.settle(&bucket.name, 0, Some(removed)).await;
                    Ok(DeleteObjectOutput {
                        version_id: Some(version_id.to_owned()),
                        delete_marker,
                    })
                }
                Err(MetaError::NoSuchKey { .. } | MetaError::NoSuchVersion { .. }) => {
                    Ok(DeleteObjectOutput {
                        version_id: Some(version_id.to_owned()),
                        delete_marker: false,
                    })
                }
                Err(err) => Err(err.into()),
            };
        }

        match bucket.versioning {
            Some(BucketVersioningStatus::Enabled) => {
                let marker = ObjectRecord::delete_marker(
                    &bucket.name,
                    key,
                    mint_version_id(),
                    requester(ctx),
                );
                let version_id = marker.version_id.clone();
                self.meta.put_object(marker).await?;
                Ok(DeleteObjectOutput {
                    version_id: Some(version_id),
                    delete_marker: true,
                })
            }
            Some(BucketVersioningStatus::Suspended) => {
                let marker = ObjectRecord::delete_marker(
                    &bucket.name,
                    key,
                    NULL_VERSION_ID.to_owned(),
                    requester(ctx),
                );
                let replaced = self.meta.put_object(marker).await?;
                self.settle(&bucket.name, 0, replaced).await;
                Ok(DeleteObjectOutput {
                    version_id: Some(NULL_VERSION_ID.to_owned()),
                    delete_marker: true,
                })
            }
            None => match self.meta.delete_object(&bucket.name, key, NULL_VERSION_ID).await {
                Ok(removed) => {
                    self.settle(&bucket.name, 0, Some(removed)).await;
                    Ok(DeleteObjectOutput::default())
                }
                Err(MetaError::NoSuchKey { .. } | MetaError::NoSuchVersion { .. }) => {
                    Ok(DeleteObjectOutput::default())
                }
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Handle `DeleteObject`.
    pub async fn handle_delete_object(
        &self,
        req: S3Request<DeleteObjectInput>,
    ) -> Result<DeleteObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:DeleteObject",
            Some(&input.key),
            &context,
        )?;
        let output = self
            .delete_one(&bucket, &input.key, input.version_id.as_deref(), &context)
            .await?;
        debug!(
            bucket = %bucket.name,
            key = %input.key,
            delete_marker = output.delete_marker,
            "delete_object completed"
        );
        Ok(output)
    }

    /// Handle `DeleteObjects`. Per-key failures are reported in the body;
    /// quiet mode lists only the failures.
    pub async fn handle_delete_objects(
        &self,
        req: S3Request<DeleteObjectsInput>,
    ) -> Result<DeleteObjectsOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        let objects = input.delete.objects;
        if objects.is_empty() || objects.len() > MAX_DELETE_KEYS {
            return Err(S3ServiceError::MalformedXml {
                message: format!("Delete must name between 1 and {MAX_DELETE_KEYS} keys"),
            }
            .into());
        }

        let mut output = DeleteObjectsOutput::default();
        for object in objects {
            let result = match check_access(
                &bucket,
                AclTarget::Bucket,
                Permission::Write,
                "s3:DeleteObject",
                Some(&object.key),
                &context,
            ) {
                Ok(()) => {
                    self.delete_one(&bucket, &object.key, object.version_id.as_deref(), &context)
                        .await
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(deleted) => {
                    if input.delete.quiet {
                        continue;
                    }
                    let marker_version = if deleted.delete_marker {
                        object.version_id.clone().or(deleted.version_id)
                    } else {
                        None
                    };
                    output.deleted.push(DeletedObject {
                        key: object.key,
                        version_id: object.version_id,
                        delete_marker: deleted.delete_marker,
                        delete_marker_version_id: marker_version,
                    });
                }
                Err(err) => {
                    let err = S3Error::from(err);
                    output.errors.push(DeleteError {
                        key: object.key,
                        version_id: object.version_id,
                        code: err.code.as_str().to_owned(),
                        message: err.message,
                    });
                }
            }
        }
        debug!(
            bucket = %bucket.name,
            deleted = output.deleted.len(),
            errors = output.errors.len(),
            "delete_objects completed"
        );
        Ok(output)
    }

    /// Handle `CopyObject`.
    ///
    /// Copying an object onto itself with `REPLACE` only rewrites its
    /// metadata, unless the bucket mints versions.
    pub async fn handle_copy_object(
        &self,
        req: S3Request<CopyObjectInput>,
    ) -> Result<CopyObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        validate_object_key(&input.key)?;
        validate_metadata(&input.metadata)?;
        let (src_bucket_name, src_key, src_version) = parse_copy_source(&input.copy_source)?;

        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:PutObject",
            Some(&input.key),
            &context,
        )?;
        let src_bucket = if src_bucket_name == bucket.name {
            bucket.clone()
        } else {
            self.load_bucket(&src_bucket_name).await?
        };
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

        let directive = input.metadata_directive.unwrap_or(MetadataDirective::Copy);
        let same_object = src_bucket_name == bucket.name && src_key == input.key;
        if same_object && directive == MetadataDirective::Copy {
            return Err(S3ServiceError::InvalidRequest {
                message: "This copy request is illegal because it is trying to copy an object to \
                          itself without changing the object's metadata."
                    .to_owned(),
            }
            .into());
        }

        if same_object && !bucket.is_versioning_enabled() {
            let mut row = source;
            row.content = input.content;
            row.metadata = input.metadata;
            if let Some(storage_class) = input.storage_class {
                row.storage_class = storage_class;
            }
            if let Some(acl) = input.acl {
                row.acl = canned(Some(acl));
            }
            row.last_modified = Utc::now();
            let output = CopyObjectOutput {
                etag: row.quoted_etag(),
                last_modified: row.last_modified,
                version_id: row.exposed_version_id(),
                copy_source_version_id: row.exposed_version_id(),
                sse: sse_response(row.sse_type, row.kms_key_id.as_deref(), None),
            };
            self.meta.update_object(row).await?;
            debug!(bucket = %bucket.name, key = %input.key, "copy_object updated metadata in place");
            return Ok(output);
        }

        validate_object_size(source.size)?;
        let key = self
            .data_key(&source, &input.copy_source_sse_customer)
            .await?;
        let data = self.read_range(&source, key.as_ref(), 0, source.size).await?;
        let plan = EncryptionPlan::for_write(
            self.kms.as_ref(),
            &input.sse,
            bucket.encryption.as_ref(),
            &bucket.name,
            &input.key,
        )
        .await?;

        let mut row = self
            .write_new_object(&bucket, &input.key, data, &plan, source.etag.clone())
            .await?;
        match directive {
            MetadataDirective::Copy => {
                row.content = source.content.clone();
                row.metadata = source.metadata.clone();
            }
            MetadataDirective::Replace => {
                row.content = input.content;
                row.metadata = input.metadata;
            }
        }
        row.owner = requester(&context);
        row.acl = canned(input.acl);
        row.storage_class = input.storage_class.unwrap_or_default();

        let output = CopyObjectOutput {
            etag: row.quoted_etag(),
            last_modified: row.last_modified,
            version_id: row.exposed_version_id(),
            copy_source_version_id: source.exposed_version_id(),
            sse: plan.response(),
        };
        debug!(
            source = %input.copy_source,
            bucket = %bucket.name,
            key = %row.name,
            "copy_object completed"
        );
        self.commit(row).await?;
        Ok(output)
    }

    /// Handle `RenameObject`: move the row of `rename_source` to `key`
    /// without touching its data.
    ///
    /// SSE-S3 and SSE-KMS data keys are sealed under the object's name, so
    /// those objects cannot be renamed.
    pub async fn handle_rename_object(
        &self,
        req: S3Request<RenameObjectInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        validate_object_key(&input.key)?;
        let source = percent_decode_str(input.rename_source.trim_start_matches('/'))
            .decode_utf8()
            .map_err(|_| S3ServiceError::invalid_argument("x-amz-rename-source is not valid UTF-8"))?
            .into_owned();
        validate_object_key(&source)?;

        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Write,
            "s3:PutObject",
            Some(&input.key),
            &context,
        )?;
        if bucket.is_versioned() {
            return Err(S3ServiceError::InvalidRequest {
                message: "Objects in versioned buckets cannot be renamed".to_owned(),
            }
            .into());
        }
        if source == input.key {
            return Err(S3ServiceError::InvalidRequest {
                message: "The rename source and destination are the same".to_owned(),
            }
            .into());
        }
        let row = self.load_object(&bucket, &source, None, &context).await?;
        if row.object_type == ObjectType::Multipart {
            return Err(S3ServiceError::InvalidRequest {
                message: "Multipart objects cannot be renamed".to_owned(),
            }
            .into());
        }
        if matches!(row.sse_type, SseType::S3 | SseType::Kms) {
            return Err(S3ServiceError::InvalidRequest {
                message: "Objects encrypted with SSE-S3 or SSE-KMS cannot be renamed".to_owned(),
            }
            .into());
        }

        let replaced = self
            .meta
            .rename_object(&bucket.name, &source, &input.key)
            .await?;
        self.settle(&bucket.name, 0, replaced).await;
        debug!(bucket = %bucket.name, from = %source, to = %input.key, "rename_object completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::S3ErrorCode;
    use ferrogate_s3_model::input::SseRequest;
    use ferrogate_s3_model::request::StreamingBlob;
    use ferrogate_s3_model::types::{Delete, ObjectIdentifier, ServerSideEncryption};

    use super::*;
    use crate::provider::test_support::{customer_key, make_bucket, read_body, service, user};

    fn put(bucket: &str, key: &str, body: &'static [u8]) -> S3Request<PutObjectInput> {
        S3Request::new(PutObjectInput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            body: StreamingBlob::new(body),
            content_length: Some(body.len() as u64),
            ..PutObjectInput::default()
        })
        .with_context(user("alice"))
    }

    fn get(bucket: &str, key: &str) -> S3Request<GetObjectInput> {
        S3Request::new(GetObjectInput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            ..GetObjectInput::default()
        })
        .with_context(user("alice"))
    }

    async fn enable_versioning(provider: &GatewayS3, bucket: &str) {
        let mut record = provider.meta().get_bucket(bucket).await.unwrap();
        record.versioning = Some(BucketVersioningStatus::Enabled);
        provider.meta().update_bucket(record).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;

        let out = provider.handle_put_object(put("b", "hello.txt", b"hello world")).await.unwrap();
        assert_eq!(out.etag, "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
        assert_eq!(out.version_id, None);

        let got = provider.handle_get_object(get("b", "hello.txt")).await.unwrap();
        assert_eq!(got.head.content_length, 11);
        assert_eq!(read_body(got.body).await, b"hello world");
        assert_eq!(provider.meta().get_bucket("b").await.unwrap().usage, 11);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_require_content_length() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let mut req = put("b", "k", b"data");
        req.input.content_length = None;
        let err = provider.handle_put_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MissingContentLength);

        let mut req = put("b", "k", b"data");
        req.input.content_length = Some(10);
        let err = provider.handle_put_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::IncompleteBody);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_serve_ranges_and_preconditions() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "k", b"hello world")).await.unwrap();

        let mut req = get("b", "k");
        req.input.range = Some("bytes=-5".to_owned());
        let got = provider.handle_get_object(req).await.unwrap();
        assert_eq!(got.content_range.as_deref(), Some("bytes 6-10/11"));
        assert_eq!(read_body(got.body).await, b"world");

        let mut req = get("b", "k");
        req.input.preconditions.if_none_match = Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\"".to_owned());
        let err = provider.handle_get_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NotModified);

        let mut req = get("b", "k");
        req.input.preconditions.if_match = Some("\"other\"".to_owned());
        let err = provider.handle_get_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::PreconditionFailed);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_read_sse_c_ranges_only_with_matching_key() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let body: &'static [u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut req = put("b", "secret", body);
        req.input.sse = SseRequest {
            customer: customer_key(1),
            ..SseRequest::default()
        };
        provider.handle_put_object(req).await.unwrap();

        let mut req = get("b", "secret");
        req.input.range = Some("bytes=5-20".to_owned());
        req.input.sse_customer = customer_key(1);
        let got = provider.handle_get_object(req).await.unwrap();
        assert_eq!(read_body(got.body).await, &body[5..=20]);

        let err = provider.handle_get_object(get("b", "secret")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidSseHeader);

        let mut req = get("b", "secret");
        req.input.sse_customer = customer_key(2);
        let err = provider.handle_get_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidSseHeader);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_create_delete_markers_in_versioned_bucket() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        enable_versioning(&provider, "b").await;

        let v1 = provider.handle_put_object(put("b", "k", b"one")).await.unwrap();
        let v1 = v1.version_id.unwrap();

        let deleted = provider
            .handle_delete_object(
                S3Request::new(DeleteObjectInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    version_id: None,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert!(deleted.delete_marker);
        let marker = deleted.version_id.unwrap();

        let err = provider.handle_get_object(get("b", "k")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchKey);
        assert_eq!(err.header("x-amz-delete-marker"), Some("true"));

        let mut req = get("b", "k");
        req.input.version_id = Some(v1.clone());
        assert_eq!(read_body(provider.handle_get_object(req).await.unwrap().body).await, b"one");

        provider
            .handle_delete_object(
                S3Request::new(DeleteObjectInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    version_id: Some(marker),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        let got = provider.handle_get_object(get("b", "k")).await.unwrap();
        assert_eq!(got.head.version_id, Some(v1));
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_recycle_overwritten_data() {
        let (provider, handles, cluster) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "k", b"first")).await.unwrap();
        provider.handle_put_object(put("b", "k", b"second")).await.unwrap();
        provider.shutdown(handles).await;
        assert_eq!(cluster.object_count(), 1);
        assert_eq!(provider.meta().get_bucket("b").await.unwrap().usage, 6);
    }

    #[tokio::test]
    async fn test_should_delete_multiple_objects_quietly() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "a", b"1")).await.unwrap();
        provider.handle_put_object(put("b", "c", b"2")).await.unwrap();

        let delete = |quiet| {
            S3Request::new(DeleteObjectsInput {
                bucket: "b".to_owned(),
                delete: Delete {
                    objects: vec![
                        ObjectIdentifier {
                            key: "a".to_owned(),
                            version_id: None,
                        },
                        ObjectIdentifier {
                            key: "c".to_owned(),
                            version_id: None,
                        },
                    ],
                    quiet,
                },
                content_md5: None,
            })
            .with_context(user("alice"))
        };
        let out = provider.handle_delete_objects(delete(false)).await.unwrap();
        assert_eq!(out.deleted.len(), 2);
        let out = provider.handle_delete_objects(delete(true)).await.unwrap();
        assert!(out.deleted.is_empty());
        assert!(out.errors.is_empty());

        let mut anonymous = delete(false);
        anonymous.context = RequestContext::default();
        let out = provider.handle_delete_objects(anonymous).await.unwrap();
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].code, "AccessDenied");
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_copy_objects_and_update_metadata_in_place() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "src", b"payload")).await.unwrap();

        let copy = |key: &str, directive| {
            S3Request::new(CopyObjectInput {
                bucket: "b".to_owned(),
                key: key.to_owned(),
                copy_source: "/b/src".to_owned(),
                metadata_directive: directive,
                metadata: [("color".to_owned(), "red".to_owned())].into(),
                ..CopyObjectInput::default()
            })
            .with_context(user("alice"))
        };
        let out = provider.handle_copy_object(copy("dst", None)).await.unwrap();
        assert_eq!(out.etag, format!("\"{}\"", md5_hex(b"payload")));
        let got = provider.handle_get_object(get("b", "dst")).await.unwrap();
        assert!(got.head.metadata.is_empty());
        assert_eq!(read_body(got.body).await, b"payload");

        let err = provider.handle_copy_object(copy("src", None)).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidRequest);

        provider
            .handle_copy_object(copy("src", Some(MetadataDirective::Replace)))
            .await
            .unwrap();
        let got = provider.handle_get_object(get("b", "src")).await.unwrap();
        assert_eq!(got.head.metadata.get("color").map(String::as_str), Some("red"));
        assert_eq!(read_body(got.body).await, b"payload");
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_reject_copy_when_source_precondition_fails() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "src", b"payload")).await.unwrap();
        let mut req = S3Request::new(CopyObjectInput {
            bucket: "b".to_owned(),
            key: "dst".to_owned(),
            copy_source: "b/src".to_owned(),
            ..CopyObjectInput::default()
        })
        .with_context(user("alice"));
        req.input.copy_source_preconditions.if_none_match = Some(md5_hex(b"payload"));
        let err = provider.handle_copy_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::PreconditionFailed);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_rename_objects_in_unversioned_buckets() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "old name", b"data")).await.unwrap();

        let rename = S3Request::new(RenameObjectInput {
            bucket: "b".to_owned(),
            key: "new".to_owned(),
            rename_source: "old%20name".to_owned(),
        })
        .with_context(user("alice"));
        provider.handle_rename_object(rename.clone()).await.unwrap();
        assert_eq!(
            read_body(provider.handle_get_object(get("b", "new")).await.unwrap().body).await,
            b"data"
        );
        let err = provider.handle_get_object(get("b", "old name")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchKey);

        enable_versioning(&provider, "b").await;
        let err = provider.handle_rename_object(rename).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidRequest);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_refuse_renaming_kms_sealed_objects() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let mut req = put("b", "sealed", b"secret");
        req.input.sse = SseRequest {
            server_side_encryption: Some(ServerSideEncryption::Aes256),
            ..SseRequest::default()
        };
        provider.handle_put_object(req).await.unwrap();

        let err = provider
            .handle_rename_object(
                S3Request::new(RenameObjectInput {
                    bucket: "b".to_owned(),
                    key: "moved".to_owned(),
                    rename_source: "sealed".to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidRequest);
        assert_eq!(
            read_body(provider.handle_get_object(get("b", "sealed")).await.unwrap().body).await,
            b"secret"
        );
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_deny_anonymous_reads_of_private_objects() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider.handle_put_object(put("b", "k", b"data")).await.unwrap();
        let mut req = get("b", "k");
        req.context = RequestContext::default();
        let err = provider.handle_get_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);

        let mut req = get("b", "missing");
        req.context = RequestContext::default();
        let err = provider.handle_get_object(req).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);
        provider.shutdown(handles).await;
    }
}
