//! Bucket operation handlers.
//!
//! Implements `list_buckets`, `create_bucket`, `head_bucket`,
//! `delete_bucket`, and `get_bucket_location`.

use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{
    CreateBucketInput, DeleteBucketInput, GetBucketLocationInput, HeadBucketInput,
    ListBucketsInput,
};
use ferrogate_s3_model::output::{CreateBucketOutput, GetBucketLocationOutput, ListBucketsOutput};
use ferrogate_s3_model::request::S3Request;
use ferrogate_s3_model::types::{BucketSummary, Permission};
use tracing::{debug, info};

use super::{canned, requester};
use crate::error::S3ServiceError;
use crate::meta::{BucketRecord, MetaError};
use crate::policy::{AclTarget, check_access, check_owner};
use crate::provider::GatewayS3;
use crate::validation::validate_bucket_name;

impl GatewayS3 {
    /// Handle `ListBuckets`; only signed requests own buckets.
    pub async fn handle_list_buckets(
        &self,
        req: S3Request<ListBucketsInput>,
    ) -> Result<ListBucketsOutput, S3Error> {
        let context = req.context;
        if context.is_anonymous() {
            return Err(S3ServiceError::AccessDenied.into());
        }
        let owner = requester(&context);
        let buckets = self
            .meta
            .list_buckets(&owner.id)
            .await?
            .into_iter()
            .map(|b| BucketSummary {
                name: b.name,
                creation_date: b.created_at,
            })
            .collect::<Vec<_>>();
        debug!(owner = %owner.id, count = buckets.len(), "list_buckets completed");
        Ok(ListBucketsOutput { owner, buckets })
    }

    /// Handle `CreateBucket`.
    pub async fn handle_create_bucket(
        &self,
        req: S3Request<CreateBucketInput>,
    ) -> Result<CreateBucketOutput, S3Error> {
        let S3Request { input, context } = req;
        if context.is_anonymous() {
            return Err(S3ServiceError::AccessDenied.into());
        }
        validate_bucket_name(&input.bucket)?;

        let region = match input.location_constraint.as_deref() {
            None | Some("") => self.config.region.clone(),
            Some(location) if location == self.config.region => location.to_owned(),
            Some(location) => {
                return Err(S3ServiceError::InvalidLocationConstraint {
                    location: location.to_owned(),
                }
                .into());
            }
        };

        let owner = requester(&context);
        let mut record = BucketRecord::new(&input.bucket, owner.clone(), region);
        record.acl = canned(input.acl);
        match self.meta.create_bucket(record).await {
            Ok(()) => {}
            Err(MetaError::BucketExists { bucket, owner: existing }) => {
                return Err(if existing == owner.id {
                    S3ServiceError::BucketAlreadyOwnedByYou { bucket }
                } else {
                    S3ServiceError::BucketAlreadyExists { bucket }
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        info!(bucket = %input.bucket, owner = %owner.id, "bucket created");
        Ok(CreateBucketOutput {
            location: format!("/{}", input.bucket),
        })
    }

    /// Handle `HeadBucket`.
    pub async fn handle_head_bucket(
        &self,
        req: S3Request<HeadBucketInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Read,
            "s3:ListBucket",
            None,
            &context,
        )?;
        Ok(())
    }

    /// Handle `DeleteBucket`. Only the owner may delete, and only an empty
    /// bucket.
    pub async fn handle_delete_bucket(
        &self,
        req: S3Request<DeleteBucketInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_owner(&bucket, "s3:DeleteBucket", &context)?;
        if !self.meta.bucket_is_empty(&bucket.name).await? {
            return Err(S3ServiceError::BucketNotEmpty {
                bucket: bucket.name,
            }
            .into());
        }
        self.meta.delete_bucket(&bucket.name).await?;
        info!(bucket = %bucket.name, "bucket deleted");
        Ok(())
    }

    /// Handle `GetBucketLocation`.
    pub async fn handle_get_bucket_location(
        &self,
        req: S3Request<GetBucketLocationInput>,
    ) -> Result<GetBucketLocationOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_owner(&bucket, "s3:GetBucketLocation", &context)?;
        Ok(GetBucketLocationOutput {
            location_constraint: Some(bucket.region),
        })
    }
}
