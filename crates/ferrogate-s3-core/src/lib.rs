//! S3 gateway core for Ferrogate.
//!
//! This crate holds everything between a parsed S3 request and the storage
//! clusters: object placement and striping, server-side encryption, the
//! cached metadata store, access control, and the background workers that
//! reclaim orphaned data and replay failed metadata writes. Every S3
//! operation is a `handle_*` method on [`GatewayS3`].
//!
//! # Architecture
//!
//! ```text
//! ferrogate-s3-http (routing, XML, auth, middleware)
//!        |
//!        v
//! GatewayS3 (handle_* operations, policy checks)
//!        |                    |
//!        v                    v
//!   MetaStore (cached)    ClusterSet (small / big pools)
//!        |                    |
//!        v                    v
//!     MetaSync  ------->  Recycler
//! ```

pub mod backend;
pub mod config;
pub mod cors;
pub mod crypto;
pub mod error;
pub mod meta;
mod ops;
pub mod policy;
pub mod provider;
pub mod utils;
pub mod validation;
pub mod website;
pub mod workers;

pub use config::GatewayConfig;
pub use error::{S3ServiceError, S3ServiceResult};
pub use ops::{APPEND_PART_SIZE, MIN_PART_SIZE};
pub use provider::{GatewayS3, WorkerHandles};
