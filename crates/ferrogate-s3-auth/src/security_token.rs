//! Temporary-credential security tokens (`X-Amz-Security-Token`).
//!
//! A token is `base64([version = 1][nonce: 12][AES-256-GCM(json(FederationToken))])`.
//! The token is issued by a federation service sharing the gateway's token key;
//! the gateway only unseals and checks it.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::RngExt;
use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::AuthError;

const TOKEN_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
/// Expiration timestamp format inside the token.
pub const TOKEN_EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// The 32-byte AES-256-GCM key shared with the token issuer.
#[derive(Clone)]
pub struct TokenKey([u8; 32]);

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKey(<redacted>)")
    }
}

impl TokenKey {
    /// Build a key from exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AuthError> {
        let key: [u8; 32] = bytes.try_into().map_err(|_| AuthError::InvalidToken)?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// The sealed content of a security token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationToken {
    /// Temporary access key.
    pub access_key: String,
    /// Temporary secret key.
    pub secret_key: String,
    /// Federated user name.
    pub name: String,
    /// User id of the identity that requested the token.
    pub original_user: String,
    /// Expiration, formatted with [`TOKEN_EXPIRATION_FORMAT`].
    pub expiration: String,
}

impl FederationToken {
    /// Seal the token under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if serialization or encryption fails.
    pub fn pack(&self, key: &TokenKey) -> Result<String, AuthError> {
        let plaintext = serde_json::to_vec(self).map_err(|_| AuthError::InvalidToken)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);
        let ciphertext = key
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| AuthError::InvalidToken)?;

        let mut packed = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        packed.push(TOKEN_VERSION);
        packed.extend_from_slice(&nonce);
        packed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(packed))
    }

    /// Unseal a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for bad base64, an unknown version,
    /// a failed authentication tag, or an undecodable payload.
    pub fn unpack(key: &TokenKey, token: &str) -> Result<Self, AuthError> {
        let packed = BASE64.decode(token).map_err(|_| AuthError::InvalidToken)?;
        if packed.len() <= 1 + NONCE_LEN || packed[0] != TOKEN_VERSION {
            return Err(AuthError::InvalidToken);
        }
        let (nonce, ciphertext) = packed[1..].split_at(NONCE_LEN);
        let plaintext = key
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::InvalidToken)?;
        serde_json::from_slice(&plaintext).map_err(|_| AuthError::InvalidToken)
    }

    /// Parsed expiration time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the timestamp is malformed.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, AuthError> {
        NaiveDateTime::parse_from_str(&self.expiration, TOKEN_EXPIRATION_FORMAT)
            .map(|n| n.and_utc())
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Verify a token presented with `access_key` and return the temporary identity.
///
/// The identity acts as the original user; its display name is
/// `originalUser:name`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] when the token cannot be unsealed or
/// belongs to another access key, and [`AuthError::TokenExpired`] past its
/// expiration.
pub fn verify_token(
    key: &TokenKey,
    access_key: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Credential, AuthError> {
    let federation = FederationToken::unpack(key, token)?;
    if federation.access_key != access_key {
        return Err(AuthError::InvalidToken);
    }
    if now > federation.expires_at()? {
        return Err(AuthError::TokenExpired);
    }
    Ok(Credential {
        user_id: federation.original_user.clone(),
        display_name: format!("{}:{}", federation.original_user, federation.name),
        access_key: access_key.to_owned(),
        secret_key: federation.secret_key,
        policy: None,
    })
}
