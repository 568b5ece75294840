//! S3 operation handler implementation for [`GatewayS3`].
//!
//! This module bridges the HTTP layer (`ferrogate-s3-http`) with the gateway
//! core (`ferrogate-s3-core`) by implementing the [`S3Handler`] trait. Each
//! operation is decoded with [`FromS3Request`](ferrogate_s3_http::FromS3Request),
//! handed to the matching `handle_*` method and encoded with
//! [`IntoS3Response`](ferrogate_s3_http::IntoS3Response).

use std::sync::Arc;

use bytes::Bytes;
use ferrogate_s3_core::GatewayS3;
use ferrogate_s3_http::dispatch::{
    BoxFuture, HandlerResult, S3Handler, dispatch_no_content, dispatch_output,
};
use ferrogate_s3_http::router::RoutingContext;
use ferrogate_s3_model::S3Operation;
use ferrogate_s3_model::request::RequestContext;
use ferrogate_s3_model::types::{CorsConfiguration, WebsiteConfiguration};

/// Wrapper that implements [`S3Handler`] by delegating to [`GatewayS3`].
#[derive(Debug, Clone)]
pub struct GatewayHandler(pub Arc<GatewayS3>);

impl S3Handler for GatewayHandler {
    // One delegation per operation; the length follows the operation count.
    #[allow(clippy::too_many_lines)]
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
        context: RequestContext,
    ) -> BoxFuture<HandlerResult> {
        let gateway = Arc::clone(&self.0);
        Box::pin(async move {
            let (p, c, b, x) = (parts, ctx, body, context);
            match op {
                // -----------------------------------------------------------
                // Buckets
                // -----------------------------------------------------------
                S3Operation::ListBuckets => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_buckets(r)).await
                }
                S3Operation::CreateBucket => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_create_bucket(r)).await
                }
                S3Operation::HeadBucket => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_head_bucket(r)).await
                }
                S3Operation::DeleteBucket => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_delete_bucket(r)).await
                }
                S3Operation::GetBucketLocation => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_location(r)).await
                }

                // -----------------------------------------------------------
                // Bucket configuration
                // -----------------------------------------------------------
                S3Operation::GetBucketAcl => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_acl(r)).await
                }
                S3Operation::PutBucketAcl => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_acl(r)).await
                }
                S3Operation::GetBucketVersioning => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_versioning(r)).await
                }
                S3Operation::PutBucketVersioning => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_versioning(r)).await
                }
                S3Operation::GetBucketCors => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_cors(r)).await
                }
                S3Operation::PutBucketCors => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_cors(r)).await
                }
                S3Operation::DeleteBucketCors => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_delete_bucket_cors(r)).await
                }
                S3Operation::GetBucketLifecycle => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_lifecycle(r)).await
                }
                S3Operation::PutBucketLifecycle => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_lifecycle(r)).await
                }
                S3Operation::DeleteBucketLifecycle => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_delete_bucket_lifecycle(r))
                        .await
                }
                S3Operation::GetBucketPolicy => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_policy(r)).await
                }
                S3Operation::PutBucketPolicy => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_put_bucket_policy(r)).await
                }
                S3Operation::DeleteBucketPolicy => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_delete_bucket_policy(r))
                        .await
                }
                S3Operation::GetBucketWebsite => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_website(r)).await
                }
                S3Operation::PutBucketWebsite => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_website(r)).await
                }
                S3Operation::DeleteBucketWebsite => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_delete_bucket_website(r))
                        .await
                }
                S3Operation::GetBucketEncryption => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_encryption(r)).await
                }
                S3Operation::PutBucketEncryption => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_encryption(r)).await
                }
                S3Operation::DeleteBucketEncryption => {
                    dispatch_no_content(p, c, b, x, |r| {
                        gateway.handle_delete_bucket_encryption(r)
                    })
                    .await
                }
                S3Operation::GetBucketLogging => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_bucket_logging(r)).await
                }
                S3Operation::PutBucketLogging => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_bucket_logging(r)).await
                }

                // -----------------------------------------------------------
                // Listing
                // -----------------------------------------------------------
                S3Operation::ListObjects => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_objects(r)).await
                }
                S3Operation::ListObjectsV2 => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_objects_v2(r)).await
                }
                S3Operation::ListObjectVersions => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_object_versions(r)).await
                }
                S3Operation::ListMultipartUploads => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_multipart_uploads(r)).await
                }

                // -----------------------------------------------------------
                // Objects
                // -----------------------------------------------------------
                S3Operation::PutObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_object(r)).await
                }
                S3Operation::GetObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_object(r)).await
                }
                S3Operation::HeadObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_head_object(r)).await
                }
                S3Operation::DeleteObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_delete_object(r)).await
                }
                S3Operation::DeleteObjects => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_delete_objects(r)).await
                }
                S3Operation::CopyObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_copy_object(r)).await
                }
                S3Operation::RenameObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_rename_object(r)).await
                }
                S3Operation::AppendObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_append_object(r)).await
                }
                S3Operation::PostObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_post_object(r)).await
                }
                S3Operation::GetObjectAcl => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_get_object_acl(r)).await
                }
                S3Operation::PutObjectAcl => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_object_acl(r)).await
                }
                S3Operation::PutObjectMeta => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_put_object_meta(r)).await
                }
                S3Operation::RestoreObject => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_restore_object(r)).await
                }

                // -----------------------------------------------------------
                // Multipart uploads
                // -----------------------------------------------------------
                S3Operation::CreateMultipartUpload => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_create_multipart_upload(r))
                        .await
                }
                S3Operation::UploadPart => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_upload_part(r)).await
                }
                S3Operation::UploadPartCopy => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_upload_part_copy(r)).await
                }
                S3Operation::CompleteMultipartUpload => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_complete_multipart_upload(r))
                        .await
                }
                S3Operation::AbortMultipartUpload => {
                    dispatch_no_content(p, c, b, x, |r| gateway.handle_abort_multipart_upload(r))
                        .await
                }
                S3Operation::ListParts => {
                    dispatch_output(p, c, b, x, |r| gateway.handle_list_parts(r)).await
                }
            }
        })
    }

    fn bucket_cors(&self, bucket: String) -> BoxFuture<Option<CorsConfiguration>> {
        let gateway = Arc::clone(&self.0);
        Box::pin(async move {
            gateway
                .meta()
                .get_bucket(&bucket)
                .await
                .ok()
                .and_then(|record| record.cors)
        })
    }

    fn bucket_website(&self, bucket: String) -> BoxFuture<Option<WebsiteConfiguration>> {
        let gateway = Arc::clone(&self.0);
        Box::pin(async move {
            gateway
                .meta()
                .get_bucket(&bucket)
                .await
                .ok()
                .and_then(|record| record.website)
        })
    }
}
