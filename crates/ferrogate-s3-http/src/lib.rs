//! S3 HTTP routing, request decoding, response encoding, middleware and the
//! hyper service for Ferrogate.
//!
//! - **Routing** ([`router`]): maps requests to S3 operations from method,
//!   path, query and headers. Path-style and virtual-hosted-style addressing
//!   are both supported; unserved sub-resources are rejected here.
//! - **Request decoding** ([`request`]): raw request parts into the typed
//!   inputs of `ferrogate-s3-model`.
//! - **Response encoding** ([`response`]): typed outputs into status codes,
//!   headers and XML bodies.
//! - **Dispatch** ([`dispatch`]): hands routed operations to the gateway
//!   through the [`S3Handler`](dispatch::S3Handler) trait.
//! - **Middleware** ([`middleware`]): admission control, panic recovery,
//!   common headers, CORS, the function switch, authentication, logging,
//!   access records, request context and website hosting.
//! - **Service** ([`service`]): [`S3HttpService`](service::S3HttpService),
//!   hyper's `Service` running the middleware chain.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> S3HttpService (hyper Service)
//!     -> rate limit -> recovery -> common headers -> CORS
//!     -> S3Router (resource allow-list) -> function switch
//!     -> body collection -> authentication
//!     -> log -> access log -> request context -> website
//!     -> dispatch_operation (S3Handler trait)
//!   <- HTTP Response
//! ```

// S3Error carries its code, message, resource, status and extra headers and
// is the error type of nearly every Result here; boxing it everywhere would
// only add indirection.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod middleware;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::S3ResponseBody;
pub use dispatch::{NotImplementedHandler, S3Handler};
pub use middleware::access_log::{ChannelMessageBus, MessageBus};
pub use request::FromS3Request;
pub use response::IntoS3Response;
pub use router::{RoutingContext, S3Router};
pub use service::{S3HttpConfig, S3HttpService};
