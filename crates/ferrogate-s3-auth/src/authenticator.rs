//! Entry point tying credential lookup, security tokens and the individual
//! signature verifiers together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth_type::AuthType;
use crate::credentials::{Credential, CredentialProvider};
use crate::error::AuthError;
use crate::presigned::verify_presigned;
use crate::security_token::{TokenKey, verify_token};
use crate::sigv2::{verify_presigned_v2, verify_sigv2};
use crate::sigv4::verify_sigv4;
use crate::streaming::StreamingSeed;

/// Result of a successful signature verification.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The identity the request was signed as.
    pub credential: Credential,
    /// Region from the SigV4 credential scope.
    pub region: Option<String>,
    /// Chunk-signing seed for `STREAMING-AWS4-HMAC-SHA256-PAYLOAD` bodies.
    pub streaming: Option<StreamingSeed>,
}

/// What [`Authenticator::authenticate`] concluded about a request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// No credentials were presented.
    Anonymous,
    /// The signature was verified.
    Authenticated(AuthResult),
    /// A browser form upload; the policy is verified against the parsed form.
    PostPolicy,
}

impl AuthOutcome {
    /// The verified credential, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Authenticated(result) => Some(&result.credential),
            Self::Anonymous | Self::PostPolicy => None,
        }
    }
}

/// Verifies requests against a credential provider.
#[derive(Debug, Clone)]
pub struct Authenticator {
    provider: Arc<dyn CredentialProvider>,
    token_key: Option<TokenKey>,
    domains: Arc<[String]>,
}

impl Authenticator {
    /// Create an authenticator over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            token_key: None,
            domains: Arc::from(Vec::new()),
        }
    }

    /// Accept `X-Amz-Security-Token` values sealed under `key`.
    #[must_use]
    pub fn with_token_key(mut self, key: TokenKey) -> Self {
        self.token_key = Some(key);
        self
    }

    /// Domains under which buckets are addressed as virtual hosts.
    #[must_use]
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = Arc::from(domains);
        self
    }

    /// Bucket name carried in a virtual-host `Host` header, if any.
    #[must_use]
    pub fn virtual_host_bucket<'a>(&self, host: &'a str) -> Option<&'a str> {
        let host = strip_port(host);
        self.domains.iter().find_map(|domain| {
            host.strip_suffix(domain.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
                .filter(|bucket| !bucket.is_empty())
        })
    }

    /// Look up the signing identity for `access_key`.
    ///
    /// With a security token the identity comes from the token; otherwise from
    /// the credential provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] when a token is presented but no
    /// token key is configured or the token is invalid,
    /// [`AuthError::TokenExpired`] for an expired token, and the provider's
    /// error for an unknown key.
    pub async fn resolve_credential(
        &self,
        access_key: &str,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Credential, AuthError> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                let key = self.token_key.as_ref().ok_or(AuthError::InvalidToken)?;
                verify_token(key, access_key, token, now)
            }
            None => self.provider.get_credential(access_key).await,
        }
    }

    /// Every credential belonging to a user id.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error.
    pub async fn keys_by_uid(&self, uid: &str) -> Result<Vec<Credential>, AuthError> {
        self.provider.get_keys_by_uid(uid).await
    }

    /// Detect the scheme of a request and verify it.
    ///
    /// `body` is the collected body and only matters for signed SigV4
    /// requests whose payload hash is declared.
    ///
    /// # Errors
    ///
    /// Returns the verifier's [`AuthError`]; an unrecognised `Authorization`
    /// header yields [`AuthError::InvalidAuthHeader`].
    pub async fn authenticate(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<AuthOutcome, AuthError> {
        let auth_type = AuthType::detect(parts);
        debug!(?auth_type, method = %parts.method, path = %parts.uri.path(), "authenticating request");

        let result = match auth_type {
            AuthType::Anonymous => return Ok(AuthOutcome::Anonymous),
            AuthType::PostPolicy => return Ok(AuthOutcome::PostPolicy),
            AuthType::Unknown => return Err(AuthError::InvalidAuthHeader),
            AuthType::SignedV4 | AuthType::StreamingSignedV4 => {
                verify_sigv4(parts, body, self, now).await?
            }
            AuthType::PresignedV4 => verify_presigned(parts, self, now).await?,
            AuthType::SignedV2 => verify_sigv2(parts, self, now).await?,
            AuthType::PresignedV2 => verify_presigned_v2(parts, self, now).await?,
        };
        Ok(AuthOutcome::Authenticated(result))
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::credentials::StaticCredentialProvider;
    use crate::security_token::FederationToken;

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(StaticCredentialProvider::new(vec![Credential::new(
            "AK", "SK",
        )])))
        .with_domains(vec!["s3.local".to_owned(), "s3.example.com".to_owned()])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_should_extract_virtual_host_bucket() {
        let auth = authenticator();
        assert_eq!(auth.virtual_host_bucket("pics.s3.local"), Some("pics"));
        assert_eq!(auth.virtual_host_bucket("pics.s3.local:8080"), Some("pics"));
        assert_eq!(auth.virtual_host_bucket("a.b.s3.example.com"), Some("a.b"));
        assert_eq!(auth.virtual_host_bucket("s3.local"), None);
        assert_eq!(auth.virtual_host_bucket("evils3.local"), None);
        assert_eq!(auth.virtual_host_bucket("localhost:9000"), None);
    }

    #[tokio::test]
    async fn test_should_resolve_static_and_token_credentials() {
        let key = TokenKey::from_slice(&[3u8; 32]).unwrap();
        let auth = authenticator().with_token_key(key.clone());

        let cred = auth.resolve_credential("AK", None, now()).await.unwrap();
        assert_eq!(cred.secret_key, "SK");

        let token = FederationToken {
            access_key: "TMP".to_owned(),
            secret_key: "tmpsecret".to_owned(),
            name: "bob".to_owned(),
            original_user: "AK".to_owned(),
            expiration: "2024-01-01T13:00:00.000Z".to_owned(),
        }
        .pack(&key)
        .unwrap();
        let cred = auth.resolve_credential("TMP", Some(&token), now()).await.unwrap();
        assert_eq!(cred.display_name, "AK:bob");
    }

    #[tokio::test]
    async fn test_should_reject_token_without_configured_key() {
        let result = authenticator()
            .resolve_credential("AK", Some("dG9rZW4="), now())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_should_pass_anonymous_and_defer_post_policy() {
        let auth = authenticator();
        let anonymous = http::Request::builder()
            .uri("/bucket/key")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert!(matches!(
            auth.authenticate(&anonymous, b"", now()).await.unwrap(),
            AuthOutcome::Anonymous
        ));

        let post = http::Request::builder()
            .method("POST")
            .uri("/bucket")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let outcome = auth.authenticate(&post, b"", now()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::PostPolicy));
        assert!(outcome.credential().is_none());
    }

    #[tokio::test]
    async fn test_should_reject_unknown_scheme() {
        let parts = http::Request::builder()
            .uri("/bucket/key")
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let result = authenticator().authenticate(&parts, b"", now()).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }
}
