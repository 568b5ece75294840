//! Object configuration operation handlers.
//!
//! Implements `get_object_acl`, `put_object_acl`, `put_object_meta`, and
//! `restore_object`.

use chrono::Utc;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{
    GetObjectAclInput, PutObjectAclInput, PutObjectMetaInput, RestoreObjectInput,
};
use ferrogate_s3_model::output::{GetAclOutput, RestoreObjectOutput};
use ferrogate_s3_model::request::S3Request;
use ferrogate_s3_model::types::{AccessControlPolicy, Permission, StorageClass};
use tracing::{debug, info};

use super::bucket_config::requested_acl;
use super::object::apply_overrides;
use crate::error::S3ServiceError;
use crate::meta::{FreezerRecord, FreezerStatus};
use crate::policy::{AclTarget, check_access, grants_for};
use crate::provider::GatewayS3;
use crate::validation::validate_metadata;

impl GatewayS3 {
    /// Handle `GetObjectAcl`.
    pub async fn handle_get_object_acl(
        &self,
        req: S3Request<GetObjectAclInput>,
    ) -> Result<GetAclOutput, S3Error> {
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
            Permission::ReadAcp,
            "s3:GetObjectAcl",
            Some(&input.key),
            &context,
        )?;
        Ok(GetAclOutput {
            policy: AccessControlPolicy {
                grants: grants_for(&row.acl, &row.owner, Some(&bucket.owner)),
                owner: row.owner,
            },
        })
    }

    /// Handle `PutObjectAcl`.
    pub async fn handle_put_object_acl(
        &self,
        req: S3Request<PutObjectAclInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        let mut row = self
            .load_object(&bucket, &input.key, input.version_id.as_deref(), &context)
            .await?;
        check_access(
            &bucket,
            AclTarget::Object {
                owner: &row.owner,
                acl: &row.acl,
            },
            Permission::WriteAcp,
            "s3:PutObjectAcl",
            Some(&input.key),
            &context,
        )?;
        row.acl = requested_acl(input.acl, input.access_control_policy.as_ref(), &row.owner)?;
        self.meta.update_object(row).await?;
        debug!(bucket = %bucket.name, key = %input.key, "put_object_acl completed");
        Ok(())
    }

    /// Handle `PutObjectMeta`: replace the user metadata of the latest
    /// version and override any representation headers given.
    pub async fn handle_put_object_meta(
        &self,
        req: S3Request<PutObjectMetaInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
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
        let mut row = self.load_object(&bucket, &input.key, None, &context).await?;

        let redirect = input.content.website_redirect_location.clone();
        apply_overrides(&mut row.content, input.content);
        if redirect.is_some() {
            row.content.website_redirect_location = redirect;
        }
        row.metadata = input.metadata;
        self.meta.update_object(row).await?;
        debug!(bucket = %bucket.name, key = %input.key, "put_object_meta completed");
        Ok(())
    }

    /// Handle `RestoreObject`.
    ///
    /// A first request queues a restore and answers `202 Accepted`; a
    /// request against a finished restore extends it and answers `200`.
    pub async fn handle_restore_object(
        &self,
        req: S3Request<RestoreObjectInput>,
    ) -> Result<RestoreObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        if input.days == 0 {
            return Err(S3ServiceError::invalid_argument(
                "The restore request must specify a positive number of days",
            )
            .into());
        }
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
            "s3:RestoreObject",
            Some(&input.key),
            &context,
        )?;
        if row.storage_class != StorageClass::Glacier {
            return Err(S3ServiceError::InvalidObjectState { key: row.name }.into());
        }

        let existing = self
            .meta
            .get_freezer(&row.bucket, &row.name, &row.version_id)
            .await?;
        let (record, accepted) = match existing {
            None => (
                FreezerRecord {
                    bucket: row.bucket.clone(),
                    key: row.name.clone(),
                    version_id: row.version_id.clone(),
                    status: FreezerStatus::Restoring,
                    days: input.days,
                    requested_at: Utc::now(),
                },
                true,
            ),
            Some(mut record) if record.status == FreezerStatus::Finish => {
                record.days = input.days;
                record.requested_at = Utc::now();
                (record, false)
            }
            Some(_) => {
                return Err(S3ServiceError::RestoreAlreadyInProgress { key: row.name }.into());
            }
        };
        self.meta.put_freezer(record).await?;
        info!(
            bucket = %row.bucket,
            key = %row.name,
            version_id = %row.version_id,
            days = input.days,
            accepted,
            "restore requested"
        );
        Ok(RestoreObjectOutput { accepted })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ferrogate_s3_model::S3ErrorCode;
    use ferrogate_s3_model::input::{ContentHeaders, GetObjectInput, HeadObjectInput, PutObjectInput};
    use ferrogate_s3_model::request::StreamingBlob;
    use ferrogate_s3_model::types::CannedAcl;

    use super::*;
    use crate::provider::test_support::{make_bucket, service, user};

    async fn put(provider: &GatewayS3, storage_class: Option<StorageClass>) {
        provider
            .handle_put_object(
                S3Request::new(PutObjectInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    body: StreamingBlob::new("cold data"),
                    content_length: Some(9),
                    storage_class,
                    ..PutObjectInput::default()
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
    }

    fn restore(days: u32) -> S3Request<RestoreObjectInput> {
        S3Request::new(RestoreObjectInput {
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            version_id: None,
            days,
        })
        .with_context(user("alice"))
    }

    fn get() -> S3Request<GetObjectInput> {
        S3Request::new(GetObjectInput {
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            ..GetObjectInput::default()
        })
        .with_context(user("alice"))
    }

    #[tokio::test]
    async fn test_should_gate_glacier_reads_on_restore() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        put(&provider, Some(StorageClass::Glacier)).await;

        let err = provider.handle_get_object(get()).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidObjectState);

        let out = provider.handle_restore_object(restore(2)).await.unwrap();
        assert!(out.accepted);
        let err = provider.handle_restore_object(restore(2)).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::RestoreAlreadyInProgress);

        let mut record = provider.meta().get_freezer("b", "k", "null").await.unwrap().unwrap();
        record.status = FreezerStatus::Finish;
        provider.meta().put_freezer(record).await.unwrap();

        let got = provider.handle_get_object(get()).await.unwrap();
        assert!(got.head.restore.unwrap().contains("ongoing-request=\"false\""));
        let out = provider.handle_restore_object(restore(5)).await.unwrap();
        assert!(!out.accepted);
        let record = provider.meta().get_freezer("b", "k", "null").await.unwrap().unwrap();
        assert_eq!(record.days, 5);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_reject_restore_of_hot_objects() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        put(&provider, None).await;
        let err = provider.handle_restore_object(restore(1)).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidObjectState);
        let err = provider.handle_restore_object(restore(0)).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidArgument);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_update_object_meta_in_place() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        put(&provider, None).await;
        provider
            .handle_put_object_meta(
                S3Request::new(PutObjectMetaInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    content: ContentHeaders {
                        content_type: Some("text/plain".to_owned()),
                        ..ContentHeaders::default()
                    },
                    metadata: HashMap::from([("color".to_owned(), "blue".to_owned())]),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();

        let head = provider
            .handle_head_object(
                S3Request::new(HeadObjectInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    ..HeadObjectInput::default()
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(head.content.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.metadata.get("color").map(String::as_str), Some("blue"));
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_set_object_acl_for_writers_of_acp_only() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        put(&provider, None).await;
        let put_acl = |who: &str| {
            S3Request::new(PutObjectAclInput {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                acl: Some(CannedAcl::PublicRead),
                ..PutObjectAclInput::default()
            })
            .with_context(user(who))
        };
        let err = provider.handle_put_object_acl(put_acl("bob")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);
        provider.handle_put_object_acl(put_acl("alice")).await.unwrap();

        let out = provider
            .handle_get_object_acl(
                S3Request::new(GetObjectAclInput {
                    bucket: "b".to_owned(),
                    key: "k".to_owned(),
                    version_id: None,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.policy.owner.id, "alice");
        assert_eq!(out.policy.grants.len(), 2);
        provider.shutdown(handles).await;
    }
}
