//! S3 operation dispatch: routes a resolved operation to the business logic handler.
//!
//! Given a [`RoutingContext`], the HTTP request parts and the collected body,
//! dispatch:
//!
//! 1. Decodes the request into the operation's typed input (via [`FromS3Request`])
//! 2. Wraps it in an [`S3Request`] carrying the [`RequestContext`]
//! 3. Calls the handler and encodes its output (via [`IntoS3Response`])
//!
//! The [`S3Handler`] trait also answers the bucket lookups the middleware
//! chain needs (CORS rules and website configuration) before dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::operations::S3Operation;
use ferrogate_s3_model::request::{RequestContext, S3Request};
use ferrogate_s3_model::types::{CorsConfiguration, WebsiteConfiguration};

use crate::body::S3ResponseBody;
use crate::request::FromS3Request;
use crate::response::{IntoS3Response, empty_response};
use crate::router::RoutingContext;

/// A boxed, sendable future as returned by [`S3Handler`] methods.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Result of handling one operation.
pub type HandlerResult = Result<http::Response<S3ResponseBody>, S3Error>;

/// Trait that the business logic provider must implement.
///
/// This is the boundary between the HTTP layer and the gateway core. Methods
/// return boxed futures so the trait stays object safe.
pub trait S3Handler: Send + Sync + 'static {
    /// Handle an S3 operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
        context: RequestContext,
    ) -> BoxFuture<HandlerResult>;

    /// CORS rules of `bucket`, if the bucket exists and has any.
    fn bucket_cors(&self, _bucket: String) -> BoxFuture<Option<CorsConfiguration>> {
        Box::pin(async { None })
    }

    /// Website configuration of `bucket`, if the bucket exists and has one.
    fn bucket_website(&self, _bucket: String) -> BoxFuture<Option<WebsiteConfiguration>> {
        Box::pin(async { None })
    }
}

/// Dispatch a routed S3 request to the handler.
pub async fn dispatch_operation<H: S3Handler + ?Sized>(
    handler: &H,
    parts: http::request::Parts,
    body: Bytes,
    ctx: RoutingContext,
    context: RequestContext,
) -> HandlerResult {
    let op = ctx.operation;
    tracing::debug!(operation = %op, bucket = ?ctx.bucket, key = ?ctx.key, "dispatching S3 operation");
    handler.handle_operation(op, parts, body, ctx, context).await
}

/// Decode the input, run `handle` and encode its output.
///
/// # Errors
///
/// Returns decoding errors and whatever `handle` fails with.
pub async fn dispatch_output<I, O, F, Fut>(
    parts: http::request::Parts,
    ctx: RoutingContext,
    body: Bytes,
    context: RequestContext,
    handle: F,
) -> HandlerResult
where
    I: FromS3Request,
    O: IntoS3Response,
    F: FnOnce(S3Request<I>) -> Fut,
    Fut: Future<Output = Result<O, S3Error>>,
{
    let input = I::from_s3_request(
        &parts,
        ctx.bucket.as_deref(),
        ctx.key.as_deref(),
        &ctx.query_params,
        body,
    )?;
    handle(S3Request::new(input).with_context(context))
        .await?
        .into_s3_response()
}

/// Like [`dispatch_output`] for handlers returning nothing; answers 204.
///
/// # Errors
///
/// Returns decoding errors and whatever `handle` fails with.
pub async fn dispatch_no_content<I, F, Fut>(
    parts: http::request::Parts,
    ctx: RoutingContext,
    body: Bytes,
    context: RequestContext,
    handle: F,
) -> HandlerResult
where
    I: FromS3Request,
    F: FnOnce(S3Request<I>) -> Fut,
    Fut: Future<Output = Result<(), S3Error>>,
{
    dispatch_output(parts, ctx, body, context, handle).await?;
    empty_response(http::StatusCode::NO_CONTENT)
}

/// A handler that returns `NotImplemented` for all operations.
///
/// Useful for testing the HTTP routing and middleware layers in isolation.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl S3Handler for NotImplementedHandler {
    fn handle_operation(
        &self,
        op: S3Operation,
        _parts: http::request::Parts,
        _body: Bytes,
        _ctx: RoutingContext,
        _context: RequestContext,
    ) -> BoxFuture<HandlerResult> {
        Box::pin(async move { Err(S3Error::not_implemented(op.as_str())) })
    }
}
