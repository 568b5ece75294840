//! Object data backends.
//!
//! A [`Cluster`] is a flat object store addressed by `(pool, object id)` that
//! supports positional writes. [`ClusterSet`] layers the gateway's placement
//! rules on top: pool selection by size, striping of big-pool objects,
//! adaptive upload windows and free-space weighted cluster choice.
//!
//! - [`memory`] - in-process [`Cluster`] used for single-node deployments and tests
//! - [`striper`] - stripe layout arithmetic
//! - [`window`] - adaptive upload window
//! - [`reader`] - readers chaining several backend extents

pub mod cluster_set;
pub mod memory;
pub mod reader;
pub mod striper;
pub mod window;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use cluster_set::ClusterSet;
pub use memory::MemoryCluster;
pub use reader::ChainReader;
pub use striper::StripeLayout;
pub use window::{AdaptiveWindow, WindowConfig};

/// Objects below this size go to the small pool.
pub const BIG_FILE_THRESHOLD: u64 = 128 * 1024;

/// Maximum number of chunk writes in flight for one upload.
pub const AIO_CONCURRENT: usize = 4;

/// A boxed byte stream returned by backend reads.
pub type BoxReader = Pin<Box<dyn tokio::io::AsyncRead + Send>>;

/// Backend failures.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No cluster is registered under the id.
    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    /// The set holds no cluster at all.
    #[error("no backend cluster configured")]
    NoCluster,

    /// The object does not exist in the pool.
    #[error("object not found: {pool}/{object_id}")]
    NotFound {
        /// Pool searched.
        pool: Pool,
        /// Object id searched.
        object_id: String,
    },

    /// The cluster accepted fewer bytes than were sent.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes the cluster stored.
        written: u64,
        /// Bytes sent.
        expected: u64,
    },

    /// Transport or device failure.
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage pool of a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pool {
    /// Whole objects below [`BIG_FILE_THRESHOLD`].
    Small,
    /// Striped objects, including every appendable object.
    Big,
}

impl Pool {
    /// The pool an object of `size` bytes is written to.
    #[must_use]
    pub fn for_size(size: u64) -> Self {
        if size < BIG_FILE_THRESHOLD {
            Self::Small
        } else {
            Self::Big
        }
    }

    /// Pool name as used by the storage cluster.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "tiger",
            Self::Big => "rabbit",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage cluster holding raw objects.
///
/// Implementations must be safe to call concurrently; writes to disjoint
/// ranges of one object may run in parallel.
#[async_trait]
pub trait Cluster: Send + Sync + fmt::Debug {
    /// Stable id stored with every object placed on this cluster.
    fn cluster_id(&self) -> &str;

    /// Write `data` at `offset` of the object, creating it when absent.
    ///
    /// Returns the number of bytes stored.
    async fn write(
        &self,
        pool: Pool,
        object_id: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, BackendError>;

    /// Open a reader over `length` bytes starting at `offset`.
    async fn read(
        &self,
        pool: Pool,
        object_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<BoxReader, BackendError>;

    /// Delete the object. Missing objects yield [`BackendError::NotFound`].
    async fn remove(&self, pool: Pool, object_id: &str) -> Result<(), BackendError>;

    /// Percentage of capacity in use, `0.0..=100.0`.
    async fn used_space_percent(&self) -> Result<f64, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_select_pool_by_size() {
        assert_eq!(Pool::for_size(0), Pool::Small);
        assert_eq!(Pool::for_size(BIG_FILE_THRESHOLD - 1), Pool::Small);
        assert_eq!(Pool::for_size(BIG_FILE_THRESHOLD), Pool::Big);
    }

    #[test]
    fn test_should_display_pool_names() {
        assert_eq!(Pool::Small.to_string(), "tiger");
        assert_eq!(Pool::Big.to_string(), "rabbit");
    }
}
