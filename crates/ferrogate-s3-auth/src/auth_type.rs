//! Classification of incoming requests by authentication scheme.

use crate::sigv4::{SIGN_V4_ALGORITHM, STREAMING_PAYLOAD, header_str};

/// How a request claims to be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// An `Authorization` header in no recognised scheme.
    Unknown,
    /// No credentials at all.
    Anonymous,
    /// `Authorization: AWS AK:signature`.
    SignedV2,
    /// `Authorization: AWS4-HMAC-SHA256 ...`.
    SignedV4,
    /// `AWSAccessKeyId`/`Expires`/`Signature` query parameters.
    PresignedV2,
    /// `X-Amz-Credential` and friends in the query.
    PresignedV4,
    /// SigV4 header with a chunk-signed body.
    StreamingSignedV4,
    /// Browser form upload; verified once the form is parsed.
    PostPolicy,
}

impl AuthType {
    /// Detect the scheme from the request head.
    ///
    /// The checks run in a fixed order: streaming PUT, header schemes,
    /// presigned query schemes, form POST, then anonymous.
    #[must_use]
    pub fn detect(parts: &http::request::Parts) -> Self {
        let authorization = header_str(parts, "authorization");
        let query = parts.uri.query().unwrap_or("");

        if parts.method == http::Method::PUT
            && header_str(parts, "x-amz-content-sha256") == Some(STREAMING_PAYLOAD)
        {
            return Self::StreamingSignedV4;
        }
        if let Some(value) = authorization {
            if value.starts_with(SIGN_V4_ALGORITHM) {
                return Self::SignedV4;
            }
            if value.starts_with("AWS ") {
                return Self::SignedV2;
            }
        }
        if has_query_param(query, "X-Amz-Credential") {
            return Self::PresignedV4;
        }
        if has_query_param(query, "AWSAccessKeyId") {
            return Self::PresignedV2;
        }
        if parts.method == http::Method::POST
            && header_str(parts, "content-type")
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("multipart/form-data"))
        {
            return Self::PostPolicy;
        }
        if authorization.is_none() {
            return Self::Anonymous;
        }
        Self::Unknown
    }
}

fn has_query_param(query: &str, name: &str) -> bool {
    form_urlencoded::parse(query.as_bytes()).any(|(k, _)| k == name)
}
