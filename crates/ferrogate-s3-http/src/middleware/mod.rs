//! The request middleware chain.
//!
//! [`S3HttpService`](crate::service::S3HttpService) runs every request through
//! these stages, outermost first:
//!
//! ```text
//! rate_limit -> recovery -> common_headers -> cors -> switch (resource
//! allow-list + function switch) -> auth -> log -> access_log -> context
//! -> website -> dispatch
//! ```
//!
//! A stage that answers early (throttling, a rejected preflight, a disabled
//! operation, a failed signature) returns before any inner stage runs, so
//! nothing is logged to the access log and no storage is touched.

pub mod access_log;
pub mod auth;
pub mod common_headers;
pub mod context;
pub mod cors;
pub mod log;
pub mod rate_limit;
pub mod recovery;
pub mod switch;
pub mod website;
