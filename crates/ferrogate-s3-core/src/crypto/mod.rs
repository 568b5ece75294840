//! Server-side encryption.
//!
//! Object bodies are encrypted with AES-256-CTR under a per-object data key
//! and a 12-byte IV. The data key is either sealed by a [`Kms`] (SSE-S3 and
//! SSE-KMS) or supplied by the client on every request (SSE-C), in which case
//! only its SHA-256 is kept.

pub mod kms;
pub mod sse;
pub mod stream;

use serde::{Deserialize, Serialize};

pub use kms::{DataKey, Kms, LocalKms};
pub use sse::{CustomerKey, EncryptionPlan};
pub use stream::{CtrReader, align_down, apply_at, derive_iv};

/// Data key length.
pub const KEY_LEN: usize = 32;
/// IV length; the remaining four counter bytes hold the block index.
pub const IV_LEN: usize = 12;
/// Cipher block size.
pub const BLOCK_SIZE: u64 = 16;

/// Encryption failures below the S3 error layer.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material has the wrong size.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// The stored IV is malformed.
    #[error("invalid initialization vector")]
    InvalidIv,

    /// The keystream cannot reach the offset.
    #[error("offset {0} is beyond the keystream")]
    OffsetOutOfRange(u64),

    /// Sealing a data key failed.
    #[error("failed to seal data key")]
    Seal,

    /// The sealed key is corrupt or bound to another context.
    #[error("failed to unseal data key")]
    Unseal,
}

/// How an object is encrypted at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SseType {
    /// Plaintext.
    #[default]
    None,
    /// Gateway-managed key.
    S3,
    /// KMS-managed key.
    Kms,
    /// Client-supplied key.
    Customer,
}

impl SseType {
    /// Short name stored in metadata rows.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::S3 => "S3",
            Self::Kms => "KMS",
            Self::Customer => "C",
        }
    }

    /// Whether the body is ciphertext.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Convert a stored IV into its fixed-size form.
pub fn iv_from_slice(iv: &[u8]) -> Result<[u8; IV_LEN], CryptoError> {
    iv.try_into().map_err(|_| CryptoError::InvalidIv)
}
