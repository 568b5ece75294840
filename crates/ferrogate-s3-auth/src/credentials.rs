//! Credential lookup.
//!
//! [`CredentialProvider`] is the identity-service contract: resolve an access
//! key to a [`Credential`], or list every key of a user. The gateway wraps the
//! configured provider in a [`CachedCredentialProvider`] so hot keys do not hit
//! the identity service on every request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::AuthError;

/// Default lifetime of a cached credential.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(600);

/// A resolved identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Canonical user id; the owner id of buckets and objects.
    pub user_id: String,
    /// Display name shown in ACL and listing responses.
    pub display_name: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Optional inline IAM policy document.
    pub policy: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("policy", &self.policy)
            .finish()
    }
}

impl Credential {
    /// Build a credential whose user id and display name equal the access key.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let access_key = access_key.into();
        Self {
            user_id: access_key.clone(),
            display_name: access_key.clone(),
            access_key,
            secret_key: secret_key.into(),
            policy: None,
        }
    }
}

/// Identity-service lookups used by the signature verifiers.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Resolve the credential owning `access_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the access key is not recognized.
    async fn get_credential(&self, access_key: &str) -> Result<Credential, AuthError>;

    /// List every credential of the user `uid`.
    async fn get_keys_by_uid(&self, uid: &str) -> Result<Vec<Credential>, AuthError>;
}

/// An in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_auth::credentials::{Credential, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![Credential::new("AKID", "secret")]);
/// assert_eq!(provider.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, Credential>,
}

impl StaticCredentialProvider {
    /// Create a provider from an iterable of credentials.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|c| (c.access_key.clone(), c))
                .collect(),
        }
    }

    /// Number of known access keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no access key is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get_credential(&self, access_key: &str) -> Result<Credential, AuthError> {
        self.credentials
            .get(access_key)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key.to_owned()))
    }

    async fn get_keys_by_uid(&self, uid: &str) -> Result<Vec<Credential>, AuthError> {
        Ok(self
            .credentials
            .values()
            .filter(|c| c.user_id == uid)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    credential: Credential,
    inserted: Instant,
}

/// A lookup-through cache in front of another provider.
///
/// Entries expire after the configured TTL. Misses and failures are never
/// cached. [`CachedCredentialProvider::sweep`] drops expired entries and is
/// driven by the server's periodic sweeper task.
#[derive(Debug)]
pub struct CachedCredentialProvider {
    inner: Arc<dyn CredentialProvider>,
    entries: DashMap<String, CachedEntry>,
    ttl: Duration,
}

impl CachedCredentialProvider {
    /// Wrap `inner` with a cache of the given TTL.
    #[must_use]
    pub fn new(inner: Arc<dyn CredentialProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Evict the cached entry of `access_key`.
    pub fn invalidate(&self, access_key: &str) {
        self.entries.remove(access_key);
    }

    /// Drop every expired entry and return how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    /// Number of cached entries, expired or not.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl CredentialProvider for CachedCredentialProvider {
    async fn get_credential(&self, access_key: &str) -> Result<Credential, AuthError> {
        if let Some(entry) = self.entries.get(access_key) {
            if entry.inserted.elapsed() < self.ttl {
                return Ok(entry.credential.clone());
            }
        }
        let credential = self.inner.get_credential(access_key).await?;
        debug!(access_key, "credential cache miss");
        self.entries.insert(
            access_key.to_owned(),
            CachedEntry {
                credential: credential.clone(),
                inserted: Instant::now(),
            },
        );
        Ok(credential)
    }

    async fn get_keys_by_uid(&self, uid: &str) -> Result<Vec<Credential>, AuthError> {
        self.inner.get_keys_by_uid(uid).await
    }
}
