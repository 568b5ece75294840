//! Data-key sealing.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use rand::RngExt;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{CryptoError, KEY_LEN};

const GCM_NONCE_LEN: usize = 12;

/// A freshly generated data-encryption key.
pub struct DataKey {
    /// Key material used for the object body.
    pub plaintext: [u8; KEY_LEN],
    /// Sealed form persisted with the object.
    pub sealed: Vec<u8>,
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("plaintext", &"[REDACTED]")
            .field("sealed_len", &self.sealed.len())
            .finish()
    }
}

/// Key management service used for SSE-S3 and SSE-KMS.
///
/// `context` binds a sealed key to the object it protects; unsealing with a
/// different context fails.
#[async_trait]
pub trait Kms: Send + Sync + std::fmt::Debug {
    /// Id of the master key this service seals with.
    fn key_id(&self) -> &str;

    /// Generate a data key under `key_name`.
    async fn generate_key(&self, key_name: &str, context: &str) -> Result<DataKey, CryptoError>;

    /// Recover a data key sealed by [`Kms::generate_key`].
    async fn unseal_key(
        &self,
        key_name: &str,
        sealed: &[u8],
        context: &str,
    ) -> Result<[u8; KEY_LEN], CryptoError>;
}

/// A KMS sealing data keys with a local AES-256-GCM master key.
///
/// Sealed keys are `nonce || ciphertext || tag`, the context being the
/// associated data.
pub struct LocalKms {
    key_id: String,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for LocalKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKms").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

impl LocalKms {
    /// Create a KMS from raw master key bytes.
    pub fn new(key_id: impl Into<String>, master: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(master).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: master.len(),
        })?;
        Ok(Self {
            key_id: key_id.into(),
            cipher,
        })
    }

    /// Create a KMS from the configured master key.
    ///
    /// A base64 string decoding to 32 bytes is used as is. Any other string
    /// is hashed with SHA-256. Without a key a random one is generated, so
    /// sealed keys do not survive a restart.
    pub fn from_config(master: Option<&str>) -> Result<Self, CryptoError> {
        let key = match master {
            Some(value) => match BASE64_STANDARD.decode(value) {
                Ok(bytes) if bytes.len() == KEY_LEN => bytes,
                _ => Sha256::digest(value.as_bytes()).to_vec(),
            },
            None => {
                warn!("no KMS master key configured, generated an ephemeral one");
                let mut key = [0u8; KEY_LEN];
                rand::rng().fill(&mut key);
                key.to_vec()
            }
        };
        let key_id = hex::encode(&Sha256::digest(&key)[..8]);
        Self::new(key_id, &key)
    }
}

#[async_trait]
impl Kms for LocalKms {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn generate_key(&self, _key_name: &str, context: &str) -> Result<DataKey, CryptoError> {
        let mut plaintext = [0u8; KEY_LEN];
        rand::rng().fill(&mut plaintext);
        let mut nonce = [0u8; GCM_NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: context.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Seal)?;

        let mut sealed = Vec::with_capacity(GCM_NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(DataKey { plaintext, sealed })
    }

    async fn unseal_key(
        &self,
        _key_name: &str,
        sealed: &[u8],
        context: &str,
    ) -> Result<[u8; KEY_LEN], CryptoError> {
        if sealed.len() <= GCM_NONCE_LEN {
            return Err(CryptoError::Unseal);
        }
        let (nonce, ciphertext) = sealed.split_at(GCM_NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: context.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Unseal)?;
        plaintext
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: v.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_seal_and_unseal_with_matching_context() {
        let kms = LocalKms::from_config(Some("test-master")).unwrap();
        let key = kms.generate_key("k", "bucket/object").await.unwrap();
        let plain = kms.unseal_key("k", &key.sealed, "bucket/object").await.unwrap();
        assert_eq!(plain, key.plaintext);
    }

    #[tokio::test]
    async fn test_should_reject_foreign_context() {
        let kms = LocalKms::from_config(None).unwrap();
        let key = kms.generate_key("k", "bucket/a").await.unwrap();
        assert!(matches!(
            kms.unseal_key("k", &key.sealed, "bucket/b").await,
            Err(CryptoError::Unseal)
        ));
        assert!(kms.unseal_key("k", b"short", "bucket/a").await.is_err());
    }

    #[test]
    fn test_should_accept_base64_master_key() {
        let encoded = BASE64_STANDARD.encode([9u8; 32]);
        let a = LocalKms::from_config(Some(&encoded)).unwrap();
        let b = LocalKms::new("x", &[9u8; 32]).unwrap();
        assert_eq!(a.key_id(), hex::encode(&Sha256::digest([9u8; 32])[..8]));
        assert_eq!(b.key_id(), "x");
        assert!(LocalKms::new("bad", &[0u8; 3]).is_err());
    }
}
