//! Signature verification and identity resolution.
//!
//! Header-signed, presigned and chunk-signed requests go through the
//! [`Authenticator`]. Browser form uploads are parsed here, verified against
//! their policy, and the parsed form is left in the request extensions for
//! input decoding.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use ferrogate_s3_auth::{
    AuthOutcome, AuthType, Authenticator, Credential, MAX_CHUNK_SIZE, decode_streaming_body,
    verify_post_policy,
};
use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use ferrogate_s3_model::operations::S3Operation;
use ferrogate_s3_model::request::Identity;
use tracing::debug;

use crate::multipart::{extract_boundary, parse_multipart};
use crate::router::RoutingContext;

/// What authentication established about a request.
#[derive(Debug)]
pub struct Authenticated {
    /// `None` for anonymous requests.
    pub identity: Option<Identity>,
    /// The payload with any chunk framing removed.
    pub body: Bytes,
}

/// The authentication stage.
#[derive(Debug, Clone)]
pub struct AuthStage {
    authenticator: Arc<Authenticator>,
    skip_signature_validation: bool,
    fallback: Identity,
}

/// Identity of a verified credential.
#[must_use]
pub fn identity_of(credential: &Credential) -> Identity {
    Identity {
        user_id: credential.user_id.clone(),
        display_name: credential.display_name.clone(),
        access_key: credential.access_key.clone(),
    }
}

impl AuthStage {
    /// Verify with `authenticator`. With `skip_signature_validation`, any
    /// request carrying credentials runs as `fallback` without checks.
    #[must_use]
    pub fn new(
        authenticator: Arc<Authenticator>,
        skip_signature_validation: bool,
        fallback: Identity,
    ) -> Self {
        Self {
            authenticator,
            skip_signature_validation,
            fallback,
        }
    }

    /// Authenticate one request.
    ///
    /// # Errors
    ///
    /// The S3 form of the verifier's failure: `SignatureDoesNotMatch`,
    /// `InvalidAccessKeyId`, `ExpiredToken`, `AccessDenied` and so on.
    pub async fn authenticate(
        &self,
        parts: &mut http::request::Parts,
        body: Bytes,
        routing: &RoutingContext,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, S3Error> {
        if routing.operation == S3Operation::PostObject {
            return self.authenticate_form(parts, body, routing, now).await;
        }

        let auth_type = AuthType::detect(parts);
        if self.skip_signature_validation {
            let body = if auth_type == AuthType::StreamingSignedV4 {
                strip_chunk_framing(&body)?
            } else {
                body
            };
            let identity = (auth_type != AuthType::Anonymous).then(|| self.fallback.clone());
            return Ok(Authenticated { identity, body });
        }

        match self.authenticator.authenticate(parts, &body, now).await? {
            AuthOutcome::Authenticated(result) => {
                debug!(access_key = %result.credential.access_key, "request authenticated");
                let body = match result.streaming {
                    Some(seed) => decode_streaming_body(seed, &body, decoded_length(parts))?,
                    None => body,
                };
                Ok(Authenticated {
                    identity: Some(identity_of(&result.credential)),
                    body,
                })
            }
            AuthOutcome::Anonymous | AuthOutcome::PostPolicy => Ok(Authenticated {
                identity: None,
                body,
            }),
        }
    }

    async fn authenticate_form(
        &self,
        parts: &mut http::request::Parts,
        body: Bytes,
        routing: &RoutingContext,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, S3Error> {
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let mut form = parse_multipart(&body, &extract_boundary(content_type)?)?;
        if let Some(bucket) = &routing.bucket {
            form.fields.insert("Bucket".to_owned(), bucket.clone());
        }

        let identity = if self.skip_signature_validation {
            form.fields
                .keys()
                .any(|k| k == "Awsaccesskeyid" || k == "X-Amz-Credential")
                .then(|| self.fallback.clone())
        } else {
            let result = verify_post_policy(
                &form.fields,
                form.file_data.len() as u64,
                &self.authenticator,
                now,
            )
            .await?;
            debug!(policy_type = ?result.policy_type, "form upload verified");
            result.credential.as_ref().map(identity_of)
        };

        let file = form.file_data.clone();
        parts.extensions.insert(form);
        Ok(Authenticated {
            identity,
            body: file,
        })
    }
}

fn decoded_length(parts: &http::request::Parts) -> Option<u64> {
    parts
        .headers
        .get("x-amz-decoded-content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Remove `aws-chunked` framing without checking chunk signatures.
fn strip_chunk_framing(body: &[u8]) -> Result<Bytes, S3Error> {
    let malformed = || S3Error::with_message(S3ErrorCode::IncompleteBody, "malformed chunked payload");
    let mut out = BytesMut::with_capacity(body.len());
    let mut rest = body;
    loop {
        let line_end = rest.windows(2).position(|w| w == b"\r\n").ok_or_else(malformed)?;
        let line = std::str::from_utf8(&rest[..line_end]).map_err(|_| malformed())?;
        let size_hex = line.split(';').next().unwrap_or_default().trim();
        let size = u64::from_str_radix(size_hex, 16)
            .ok()
            .filter(|size| *size <= MAX_CHUNK_SIZE)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(malformed)?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Ok(out.freeze());
        }
        let end = size.checked_add(2).filter(|end| *end <= rest.len()).ok_or_else(malformed)?;
        if &rest[size..end] != b"\r\n" {
            return Err(malformed());
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[end..];
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ferrogate_s3_auth::StaticCredentialProvider;

    use super::*;
    use crate::multipart::MultipartForm;

    fn stage(skip: bool) -> AuthStage {
        let provider = StaticCredentialProvider::new(vec![Credential::new("AK", "SK")]);
        AuthStage::new(
            Arc::new(Authenticator::new(Arc::new(provider))),
            skip,
            identity_of(&Credential::new("AK", "SK")),
        )
    }

    fn routing(op: S3Operation) -> RoutingContext {
        RoutingContext {
            bucket: Some("b".to_owned()),
            key: None,
            operation: op,
            query_params: vec![],
            virtual_host: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn parts(headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().method("PUT").uri("/b/k");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_should_pass_anonymous_request() {
        let mut p = parts(&[]);
        let out = stage(false)
            .authenticate(&mut p, Bytes::from("x"), &routing(S3Operation::PutObject), now())
            .await
            .unwrap();
        assert!(out.identity.is_none());
        assert_eq!(out.body.as_ref(), b"x");
    }

    #[tokio::test]
    async fn test_should_reject_garbage_authorization() {
        let mut p = parts(&[("authorization", "Bearer nope")]);
        let err = stage(false)
            .authenticate(&mut p, Bytes::new(), &routing(S3Operation::PutObject), now())
            .await
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_use_fallback_identity_when_skipping_validation() {
        let mut p = parts(&[(
            "authorization",
            "AWS4-HMAC-SHA256 Credential=AK/20240101/us-east-1/s3/aws4_request, SignedHeaders=host, Signature=00",
        )]);
        let out = stage(true)
            .authenticate(&mut p, Bytes::new(), &routing(S3Operation::PutObject), now())
            .await
            .unwrap();
        assert_eq!(out.identity.unwrap().access_key, "AK");
    }

    #[test]
    fn test_should_strip_chunk_framing() {
        let body = b"5;chunk-signature=aa\r\nhello\r\n6;chunk-signature=bb\r\n world\r\n0;chunk-signature=cc\r\n\r\n";
        assert_eq!(strip_chunk_framing(body).unwrap().as_ref(), b"hello world");
        assert!(strip_chunk_framing(b"5;chunk-signature=aa\r\nhel").is_err());
    }

    #[test]
    fn test_should_reject_oversized_chunk_framing() {
        for body in [
            &b"ffffffffffffffff;chunk-signature=aa\r\nhello\r\n0;chunk-signature=bb\r\n\r\n"[..],
            &b"fffffffffffffffe;chunk-signature=aa\r\nhello\r\n"[..],
            &b"140000001;chunk-signature=aa\r\nhello\r\n"[..],
        ] {
            let err = strip_chunk_framing(body).unwrap_err();
            assert_eq!(err.code, S3ErrorCode::IncompleteBody);
        }
    }

    #[tokio::test]
    async fn test_should_leave_anonymous_form_in_extensions() {
        let body = crate::multipart::tests::form_body("XX", &[("key", "k")], b"data");
        let mut p = http::Request::builder()
            .method("POST")
            .uri("/b")
            .header("content-type", "multipart/form-data; boundary=XX")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let out = stage(false)
            .authenticate(&mut p, Bytes::from(body), &routing(S3Operation::PostObject), now())
            .await
            .unwrap();
        assert!(out.identity.is_none());
        assert_eq!(out.body.as_ref(), b"data");
        let form = p.extensions.get::<MultipartForm>().unwrap();
        assert_eq!(form.fields.get("Bucket").map(String::as_str), Some("b"));
    }
}
