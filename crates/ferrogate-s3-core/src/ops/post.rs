//! Browser form upload (`POST /{bucket}`).
//!
//! The form's policy document and signature are verified by the HTTP layer
//! before the handler runs; here the upload is stored like a PUT.

use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::PostObjectInput;
use ferrogate_s3_model::output::PostObjectOutput;
use ferrogate_s3_model::request::S3Request;
use ferrogate_s3_model::types::{Acl, CannedAcl, Permission};
use tracing::debug;

use super::{canned, requester};
use crate::crypto::EncryptionPlan;
use crate::error::S3ServiceError;
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::utils::md5_hex;
use crate::validation::{validate_metadata, validate_object_key, validate_object_size};

impl GatewayS3 {
    /// Handle `PostObject`. Anonymous forms may only write into
    /// `public-read-write` buckets.
    pub async fn handle_post_object(
        &self,
        req: S3Request<PostObjectInput>,
    ) -> Result<PostObjectOutput, S3Error> {
        let S3Request { input, context } = req;
        validate_object_key(&input.key)?;
        validate_metadata(&input.metadata)?;
        let bucket = self.load_bucket(&input.bucket).await?;
        if context.is_anonymous() {
            if bucket.acl != Acl::Canned(CannedAcl::PublicReadWrite) {
                return Err(S3ServiceError::AccessDenied.into());
            }
        } else {
            check_access(
                &bucket,
                AclTarget::Bucket,
                Permission::Write,
                "s3:PutObject",
                Some(&input.key),
                &context,
            )?;
        }

        let data = input.body.data;
        validate_object_size(data.len() as u64)?;
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

        let output = PostObjectOutput {
            bucket: bucket.name.clone(),
            key: row.name.clone(),
            etag: row.quoted_etag(),
            location: format!("/{}/{}", bucket.name, row.name),
            version_id: row.exposed_version_id(),
            success_action_status: input.success_action_status,
            success_action_redirect: input.success_action_redirect,
        };
        debug!(bucket = %bucket.name, key = %row.name, size = row.size, "post_object completed");
        self.commit(row).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::S3ErrorCode;
    use ferrogate_s3_model::request::{RequestContext, StreamingBlob};

    use super::*;
    use crate::provider::test_support::{make_bucket, service, user};

    fn form(ctx: RequestContext) -> S3Request<PostObjectInput> {
        S3Request::new(PostObjectInput {
            bucket: "b".to_owned(),
            key: "uploads/photo.jpg".to_owned(),
            body: StreamingBlob::new("jpeg bytes"),
            ..PostObjectInput::default()
        })
        .with_context(ctx)
    }

    #[tokio::test]
    async fn test_should_store_signed_form_upload() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let out = provider.handle_post_object(form(user("alice"))).await.unwrap();
        assert_eq!(out.location, "/b/uploads/photo.jpg");
        assert_eq!(out.etag, format!("\"{}\"", md5_hex(b"jpeg bytes")));
        let row = provider
            .meta()
            .get_object("b", "uploads/photo.jpg", None)
            .await
            .unwrap();
        assert_eq!(row.owner.id, "alice");
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_admit_anonymous_forms_only_on_public_write_buckets() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let err = provider
            .handle_post_object(form(RequestContext::new("anon")))
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);

        let mut bucket = provider.meta().get_bucket("b").await.unwrap();
        bucket.acl = Acl::Canned(CannedAcl::PublicReadWrite);
        provider.meta().update_bucket(bucket).await.unwrap();
        provider
            .handle_post_object(form(RequestContext::new("anon")))
            .await
            .unwrap();
        provider.shutdown(handles).await;
    }
}
