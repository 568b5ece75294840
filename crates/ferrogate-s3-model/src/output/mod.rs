//! Operation outputs, one struct per S3 operation that returns data.

mod bucket;
mod list;
mod multipart;
mod object;

pub use bucket::*;
pub use list::*;
pub use multipart::*;
pub use object::*;

use crate::types::ServerSideEncryption;

/// Encryption facts echoed on write and read responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseResponse {
    /// HTTP header: `x-amz-server-side-encryption`.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// HTTP header: `x-amz-server-side-encryption-aws-kms-key-id`.
    pub kms_key_id: Option<String>,
    /// HTTP header: `x-amz-server-side-encryption-customer-algorithm`.
    pub customer_algorithm: Option<String>,
    /// HTTP header: `x-amz-server-side-encryption-customer-key-MD5`.
    pub customer_key_md5: Option<String>,
}
