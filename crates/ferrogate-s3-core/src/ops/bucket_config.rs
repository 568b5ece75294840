//! Bucket configuration operation handlers.
//!
//! Implements the get/put/delete triples of the bucket sub-resources: ACL,
//! versioning, CORS, lifecycle, policy, website, default encryption and
//! logging. The ACL follows the grant model; every other sub-resource is
//! reserved to the bucket owner.

use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{
    DeleteBucketCorsInput, DeleteBucketEncryptionInput, DeleteBucketLifecycleInput,
    DeleteBucketPolicyInput, DeleteBucketWebsiteInput, GetBucketAclInput, GetBucketCorsInput,
    GetBucketEncryptionInput, GetBucketLifecycleInput, GetBucketLoggingInput,
    GetBucketPolicyInput, GetBucketVersioningInput, GetBucketWebsiteInput, PutBucketAclInput,
    PutBucketCorsInput, PutBucketEncryptionInput, PutBucketLifecycleInput, PutBucketLoggingInput,
    PutBucketPolicyInput, PutBucketVersioningInput, PutBucketWebsiteInput,
};
use ferrogate_s3_model::output::{
    GetAclOutput, GetBucketCorsOutput, GetBucketEncryptionOutput, GetBucketLifecycleOutput,
    GetBucketLoggingOutput, GetBucketPolicyOutput, GetBucketVersioningOutput,
    GetBucketWebsiteOutput,
};
use ferrogate_s3_model::request::{RequestContext, S3Request};
use ferrogate_s3_model::types::{AccessControlPolicy, Acl, CannedAcl, Owner, Permission};
use tracing::debug;

use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::BucketRecord;
use crate::policy::{
    AclTarget, BucketPolicy, check_access, check_owner, grants_for, lifecycle, validate_policy,
};
use crate::provider::GatewayS3;
use crate::{cors, website};

/// Resolve the ACL a PutBucketAcl / PutObjectAcl request sets. Exactly one
/// of the canned header and the XML body must be present.
pub(crate) fn requested_acl(
    canned: Option<CannedAcl>,
    policy: Option<&AccessControlPolicy>,
    owner: &Owner,
) -> S3ServiceResult<Acl> {
    match (canned, policy) {
        (Some(canned), None) => Ok(Acl::Canned(canned)),
        (None, Some(policy)) => validate_policy(policy, owner),
        (Some(_), Some(_)) => Err(S3ServiceError::InvalidRequest {
            message: "Specifying both Canned ACLs and Header Grants is not allowed".to_owned(),
        }),
        (None, None) => Err(S3ServiceError::MalformedAcl {
            message: "An access control list or canned ACL is required".to_owned(),
        }),
    }
}

impl GatewayS3 {
    /// Load a bucket whose configuration only the owner may touch.
    async fn owned_bucket(
        &self,
        name: &str,
        action: &str,
        ctx: &RequestContext,
    ) -> S3ServiceResult<BucketRecord> {
        let bucket = self.load_bucket(name).await?;
        check_owner(&bucket, action, ctx)?;
        Ok(bucket)
    }

    /// Apply `change` to an owned bucket and store it.
    async fn configure_bucket(
        &self,
        name: &str,
        action: &str,
        ctx: &RequestContext,
        change: impl FnOnce(&mut BucketRecord),
    ) -> Result<(), S3Error> {
        let mut bucket = self.owned_bucket(name, action, ctx).await?;
        change(&mut bucket);
        self.meta.update_bucket(bucket).await?;
        debug!(bucket = %name, action, "bucket configuration updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // ACL
    // -----------------------------------------------------------------------

    /// Handle `GetBucketAcl`.
    pub async fn handle_get_bucket_acl(
        &self,
        req: S3Request<GetBucketAclInput>,
    ) -> Result<GetAclOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::ReadAcp,
            "s3:GetBucketAcl",
            None,
            &context,
        )?;
        Ok(GetAclOutput {
            policy: AccessControlPolicy {
                grants: grants_for(&bucket.acl, &bucket.owner, None),
                owner: bucket.owner,
            },
        })
    }

    /// Handle `PutBucketAcl`.
    pub async fn handle_put_bucket_acl(
        &self,
        req: S3Request<PutBucketAclInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let mut bucket = self.load_bucket(&input.bucket).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::WriteAcp,
            "s3:PutBucketAcl",
            None,
            &context,
        )?;
        bucket.acl = requested_acl(input.acl, input.access_control_policy.as_ref(), &bucket.owner)?;
        self.meta.update_bucket(bucket).await?;
        debug!(bucket = %input.bucket, "put_bucket_acl completed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Versioning
    // -----------------------------------------------------------------------

    /// Handle `GetBucketVersioning`.
    pub async fn handle_get_bucket_versioning(
        &self,
        req: S3Request<GetBucketVersioningInput>,
    ) -> Result<GetBucketVersioningOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetBucketVersioning", &context)
            .await?;
        Ok(GetBucketVersioningOutput {
            status: bucket.versioning,
        })
    }

    /// Handle `PutBucketVersioning`. A configured bucket cannot go back to
    /// the unversioned state.
    pub async fn handle_put_bucket_versioning(
        &self,
        req: S3Request<PutBucketVersioningInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let Some(status) = input.status else {
            return Err(S3ServiceError::IllegalVersioningConfiguration {
                message: "The versioning configuration specified in the request is invalid"
                    .to_owned(),
            }
            .into());
        };
        self.configure_bucket(&input.bucket, "s3:PutBucketVersioning", &context, |b| {
            b.versioning = Some(status);
        })
        .await
    }

    // -----------------------------------------------------------------------
    // CORS
    // -----------------------------------------------------------------------

    /// Handle `GetBucketCors`.
    pub async fn handle_get_bucket_cors(
        &self,
        req: S3Request<GetBucketCorsInput>,
    ) -> Result<GetBucketCorsOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self.owned_bucket(&input.bucket, "s3:GetBucketCORS", &context).await?;
        let cors_configuration = bucket
            .cors
            .ok_or(S3ServiceError::NoSuchCorsConfiguration)?;
        Ok(GetBucketCorsOutput { cors_configuration })
    }

    /// Handle `PutBucketCors`.
    pub async fn handle_put_bucket_cors(
        &self,
        req: S3Request<PutBucketCorsInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        cors::validate(&input.cors_configuration)?;
        let config = input.cors_configuration;
        self.configure_bucket(&input.bucket, "s3:PutBucketCORS", &context, |b| {
            b.cors = Some(config);
        })
        .await
    }

    /// Handle `DeleteBucketCors`.
    pub async fn handle_delete_bucket_cors(
        &self,
        req: S3Request<DeleteBucketCorsInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        self.configure_bucket(&input.bucket, "s3:PutBucketCORS", &context, |b| b.cors = None)
            .await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Handle `GetBucketLifecycle`.
    pub async fn handle_get_bucket_lifecycle(
        &self,
        req: S3Request<GetBucketLifecycleInput>,
    ) -> Result<GetBucketLifecycleOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetLifecycleConfiguration", &context)
            .await?;
        let lifecycle_configuration = bucket
            .lifecycle
            .ok_or(S3ServiceError::NoSuchLifecycleConfiguration)?;
        Ok(GetBucketLifecycleOutput {
            lifecycle_configuration,
        })
    }

    /// Handle `PutBucketLifecycle`; the bucket joins the lifecycle scan set.
    pub async fn handle_put_bucket_lifecycle(
        &self,
        req: S3Request<PutBucketLifecycleInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        lifecycle::validate(&input.lifecycle_configuration)?;
        let config = input.lifecycle_configuration;
        self.configure_bucket(&input.bucket, "s3:PutLifecycleConfiguration", &context, |b| {
            b.lifecycle = Some(config);
        })
        .await?;
        self.meta.set_lifecycle(&input.bucket, true).await?;
        Ok(())
    }

    /// Handle `DeleteBucketLifecycle`.
    pub async fn handle_delete_bucket_lifecycle(
        &self,
        req: S3Request<DeleteBucketLifecycleInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        self.configure_bucket(&input.bucket, "s3:PutLifecycleConfiguration", &context, |b| {
            b.lifecycle = None;
        })
        .await?;
        self.meta.set_lifecycle(&input.bucket, false).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Policy
    // -----------------------------------------------------------------------

    /// Handle `GetBucketPolicy`.
    pub async fn handle_get_bucket_policy(
        &self,
        req: S3Request<GetBucketPolicyInput>,
    ) -> Result<GetBucketPolicyOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetBucketPolicy", &context)
            .await?;
        let policy = bucket.policy.ok_or(S3ServiceError::NoSuchBucketPolicy)?;
        Ok(GetBucketPolicyOutput { policy })
    }

    /// Handle `PutBucketPolicy`. The document is stored verbatim once it
    /// parses.
    pub async fn handle_put_bucket_policy(
        &self,
        req: S3Request<PutBucketPolicyInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        BucketPolicy::parse(&input.policy, &input.bucket)?;
        let document = input.policy;
        self.configure_bucket(&input.bucket, "s3:PutBucketPolicy", &context, |b| {
            b.policy = Some(document);
        })
        .await
    }

    /// Handle `DeleteBucketPolicy`.
    pub async fn handle_delete_bucket_policy(
        &self,
        req: S3Request<DeleteBucketPolicyInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        self.configure_bucket(&input.bucket, "s3:DeleteBucketPolicy", &context, |b| {
            b.policy = None;
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Website
    // -----------------------------------------------------------------------

    /// Handle `GetBucketWebsite`.
    pub async fn handle_get_bucket_website(
        &self,
        req: S3Request<GetBucketWebsiteInput>,
    ) -> Result<GetBucketWebsiteOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetBucketWebsite", &context)
            .await?;
        let website_configuration = bucket
            .website
            .ok_or(S3ServiceError::NoSuchWebsiteConfiguration)?;
        Ok(GetBucketWebsiteOutput {
            website_configuration,
        })
    }

    /// Handle `PutBucketWebsite`.
    pub async fn handle_put_bucket_website(
        &self,
        req: S3Request<PutBucketWebsiteInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        website::validate(&input.website_configuration)?;
        let config = input.website_configuration;
        self.configure_bucket(&input.bucket, "s3:PutBucketWebsite", &context, |b| {
            b.website = Some(config);
        })
        .await
    }

    /// Handle `DeleteBucketWebsite`.
    pub async fn handle_delete_bucket_website(
        &self,
        req: S3Request<DeleteBucketWebsiteInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        self.configure_bucket(&input.bucket, "s3:DeleteBucketWebsite", &context, |b| {
            b.website = None;
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Default encryption
    // -----------------------------------------------------------------------

    /// Handle `GetBucketEncryption`.
    pub async fn handle_get_bucket_encryption(
        &self,
        req: S3Request<GetBucketEncryptionInput>,
    ) -> Result<GetBucketEncryptionOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetEncryptionConfiguration", &context)
            .await?;
        let server_side_encryption_configuration = bucket
            .encryption
            .ok_or(S3ServiceError::ServerSideEncryptionConfigurationNotFound)?;
        Ok(GetBucketEncryptionOutput {
            server_side_encryption_configuration,
        })
    }

    /// Handle `PutBucketEncryption`.
    pub async fn handle_put_bucket_encryption(
        &self,
        req: S3Request<PutBucketEncryptionInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        let config = input
            .server_side_encryption_configuration
            .ok_or_else(|| S3ServiceError::MalformedXml {
                message: "The server side encryption configuration is missing".to_owned(),
            })?;
        self.configure_bucket(&input.bucket, "s3:PutEncryptionConfiguration", &context, |b| {
            b.encryption = Some(config);
        })
        .await
    }

    /// Handle `DeleteBucketEncryption`.
    pub async fn handle_delete_bucket_encryption(
        &self,
        req: S3Request<DeleteBucketEncryptionInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        self.configure_bucket(&input.bucket, "s3:PutEncryptionConfiguration", &context, |b| {
            b.encryption = None;
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Logging
    // -----------------------------------------------------------------------

    /// Handle `GetBucketLogging`.
    pub async fn handle_get_bucket_logging(
        &self,
        req: S3Request<GetBucketLoggingInput>,
    ) -> Result<GetBucketLoggingOutput, S3Error> {
        let S3Request { input, context } = req;
        let bucket = self
            .owned_bucket(&input.bucket, "s3:GetBucketLogging", &context)
            .await?;
        Ok(GetBucketLoggingOutput {
            bucket_logging_status: bucket.logging,
        })
    }

    /// Handle `PutBucketLogging`. An empty status turns logging off; a
    /// target bucket must exist.
    pub async fn handle_put_bucket_logging(
        &self,
        req: S3Request<PutBucketLoggingInput>,
    ) -> Result<(), S3Error> {
        let S3Request { input, context } = req;
        if let Some(target) = input.bucket_logging_status.target_bucket.as_deref()
            && self.meta.get_bucket(target).await.is_err()
        {
            return Err(S3ServiceError::invalid_argument(format!(
                "The target bucket for logging does not exist: {target}"
            ))
            .into());
        }
        let status = input.bucket_logging_status;
        self.configure_bucket(&input.bucket, "s3:PutBucketLogging", &context, |b| {
            b.logging = status;
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::S3ErrorCode;
    use ferrogate_s3_model::types::{
        BucketVersioningStatus, CorsConfiguration, CorsRule, Expiration, Grantee,
        LifecycleConfiguration, LifecycleRule, LoggingStatus, ServerSideEncryption,
        ServerSideEncryptionConfiguration, WebsiteConfiguration,
    };

    use super::*;
    use crate::provider::test_support::{make_bucket, service, user};

    #[tokio::test]
    async fn test_should_round_trip_canned_bucket_acl() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        provider
            .handle_put_bucket_acl(
                S3Request::new(PutBucketAclInput {
                    bucket: "b".to_owned(),
                    acl: Some(CannedAcl::PublicRead),
                    access_control_policy: None,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();

        let out = provider
            .handle_get_bucket_acl(
                S3Request::new(GetBucketAclInput {
                    bucket: "b".to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.policy.grants.len(), 2);
        assert!(matches!(out.policy.grants[1].grantee, Grantee::Group { .. }));

        let err = provider
            .handle_put_bucket_acl(
                S3Request::new(PutBucketAclInput {
                    bucket: "b".to_owned(),
                    acl: None,
                    access_control_policy: None,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedACLError);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_require_versioning_status() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let put = |status| {
            S3Request::new(PutBucketVersioningInput {
                bucket: "b".to_owned(),
                status,
            })
            .with_context(user("alice"))
        };
        let err = provider.handle_put_bucket_versioning(put(None)).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::IllegalVersioningConfigurationException);

        provider
            .handle_put_bucket_versioning(put(Some(BucketVersioningStatus::Enabled)))
            .await
            .unwrap();
        let out = provider
            .handle_get_bucket_versioning(
                S3Request::new(GetBucketVersioningInput {
                    bucket: "b".to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.status, Some(BucketVersioningStatus::Enabled));
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_report_missing_configurations() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let bucket = || "b".to_owned();

        let err = provider
            .handle_get_bucket_cors(
                S3Request::new(GetBucketCorsInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchCORSConfiguration);
        let err = provider
            .handle_get_bucket_policy(
                S3Request::new(GetBucketPolicyInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchBucketPolicy);
        let err = provider
            .handle_get_bucket_website(
                S3Request::new(GetBucketWebsiteInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchWebsiteConfiguration);
        let err = provider
            .handle_get_bucket_lifecycle(
                S3Request::new(GetBucketLifecycleInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchLifecycleConfiguration);
        let err = provider
            .handle_get_bucket_encryption(
                S3Request::new(GetBucketEncryptionInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError);
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_store_cors_and_encryption_for_owner_only() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let cors = CorsConfiguration {
            rules: vec![CorsRule {
                allowed_origins: vec!["https://*.example.com".to_owned()],
                allowed_methods: vec!["GET".to_owned()],
                ..CorsRule::default()
            }],
        };
        let put_cors = |who: &str| {
            S3Request::new(PutBucketCorsInput {
                bucket: "b".to_owned(),
                cors_configuration: cors.clone(),
            })
            .with_context(user(who))
        };
        let err = provider.handle_put_bucket_cors(put_cors("bob")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);
        provider.handle_put_bucket_cors(put_cors("alice")).await.unwrap();
        assert_eq!(provider.meta().get_bucket("b").await.unwrap().cors, Some(cors.clone()));

        let err = provider
            .handle_put_bucket_encryption(
                S3Request::new(PutBucketEncryptionInput {
                    bucket: "b".to_owned(),
                    server_side_encryption_configuration: None,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedXML);
        provider
            .handle_put_bucket_encryption(
                S3Request::new(PutBucketEncryptionInput {
                    bucket: "b".to_owned(),
                    server_side_encryption_configuration: Some(ServerSideEncryptionConfiguration {
                        sse_algorithm: ServerSideEncryption::Aes256,
                        kms_master_key_id: None,
                    }),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert!(provider.meta().get_bucket("b").await.unwrap().encryption.is_some());
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_require_existing_logging_target() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let put = |target: &str| {
            S3Request::new(PutBucketLoggingInput {
                bucket: "b".to_owned(),
                bucket_logging_status: LoggingStatus {
                    target_bucket: Some(target.to_owned()),
                    target_prefix: Some("logs/".to_owned()),
                },
            })
            .with_context(user("alice"))
        };
        let err = provider.handle_put_bucket_logging(put("nowhere")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidArgument);

        make_bucket(&provider, "alice", "logs").await;
        provider.handle_put_bucket_logging(put("logs")).await.unwrap();
        let out = provider
            .handle_get_bucket_logging(
                S3Request::new(GetBucketLoggingInput {
                    bucket: "b".to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.bucket_logging_status.target_bucket.as_deref(), Some("logs"));
        provider.shutdown(handles).await;
    }

    #[tokio::test]
    async fn test_should_store_and_clear_policy_lifecycle_and_website() {
        let (provider, handles, _) = service();
        make_bucket(&provider, "alice", "b").await;
        let bucket = || "b".to_owned();

        let err = provider
            .handle_put_bucket_policy(
                S3Request::new(PutBucketPolicyInput {
                    bucket: bucket(),
                    policy: "{not json".to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedPolicy);
        let policy = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject","Resource":"arn:aws:s3:::b/*"}]}"#;
        provider
            .handle_put_bucket_policy(
                S3Request::new(PutBucketPolicyInput {
                    bucket: bucket(),
                    policy: policy.to_owned(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        let out = provider
            .handle_get_bucket_policy(
                S3Request::new(GetBucketPolicyInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.policy, policy);

        let err = provider
            .handle_put_bucket_lifecycle(
                S3Request::new(PutBucketLifecycleInput {
                    bucket: bucket(),
                    lifecycle_configuration: LifecycleConfiguration::default(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedXML);
        let lifecycle = LifecycleConfiguration {
            rules: vec![LifecycleRule {
                id: Some("expire-logs".to_owned()),
                prefix: Some("logs/".to_owned()),
                expiration: Some(Expiration {
                    days: Some(30),
                    ..Expiration::default()
                }),
                ..LifecycleRule::default()
            }],
        };
        provider
            .handle_put_bucket_lifecycle(
                S3Request::new(PutBucketLifecycleInput {
                    bucket: bucket(),
                    lifecycle_configuration: lifecycle.clone(),
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        let out = provider
            .handle_get_bucket_lifecycle(
                S3Request::new(GetBucketLifecycleInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap();
        assert_eq!(out.lifecycle_configuration, lifecycle);

        let website = WebsiteConfiguration {
            index_document_suffix: Some("index.html".to_owned()),
            ..WebsiteConfiguration::default()
        };
        let err = provider
            .handle_put_bucket_website(
                S3Request::new(PutBucketWebsiteInput {
                    bucket: bucket(),
                    website_configuration: website.clone(),
                })
                .with_context(user("bob")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);
        provider
            .handle_put_bucket_website(
                S3Request::new(PutBucketWebsiteInput {
                    bucket: bucket(),
                    website_configuration: website,
                })
                .with_context(user("alice")),
            )
            .await
            .unwrap();
        assert!(provider.meta().get_bucket("b").await.unwrap().website.is_some());

        provider
            .handle_delete_bucket_policy(
                S3Request::new(DeleteBucketPolicyInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap();
        provider
            .handle_delete_bucket_lifecycle(
                S3Request::new(DeleteBucketLifecycleInput { bucket: bucket() })
                    .with_context(user("alice")),
            )
            .await
            .unwrap();
        provider
            .handle_delete_bucket_website(
                S3Request::new(DeleteBucketWebsiteInput { bucket: bucket() }).with_context(user("alice")),
            )
            .await
            .unwrap();
        let record = provider.meta().get_bucket("b").await.unwrap();
        assert!(record.policy.is_none() && record.lifecycle.is_none() && record.website.is_none());
        provider.shutdown(handles).await;
    }
}
