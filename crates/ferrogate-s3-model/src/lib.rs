//! S3 wire model for Ferrogate.
//!
//! Holds the error taxonomy ([`S3Error`]), the operation enum ([`S3Operation`]),
//! the domain types exchanged with clients, and one input/output struct per
//! operation. No I/O happens here.
#![allow(clippy::struct_excessive_bools)]

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod request;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;
pub use request::{Identity, RequestContext, S3Request, StreamingBlob};
