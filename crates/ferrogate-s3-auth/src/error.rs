//! Error types for request authentication.
//!
//! Every verifier in this crate reports failures through [`AuthError`]. The
//! conversion into [`S3Error`] picks the AWS error code a client expects for
//! each failure mode.

use ferrogate_s3_model::error::{S3Error, S3ErrorCode};

/// Errors that can occur while authenticating an S3 request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing algorithm is not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required HTTP header referenced in `SignedHeaders` is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// A header that must be covered by the signature is not in `SignedHeaders`.
    #[error("Header {0} must be signed")]
    UnsignedHeader(String),

    /// `SignedHeaders` is not sorted.
    #[error("Signed headers are not sorted")]
    SignedHeadersNotSorted,

    /// The `Credential` component does not match
    /// `AKID/date/region/s3/aws4_request`.
    #[error("Invalid credential: {0}")]
    InvalidCredential(&'static str),

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The presigned URL has expired.
    #[error("Request has expired")]
    RequestExpired,

    /// `X-Amz-Expires` exceeds seven days.
    #[error("X-Amz-Expires must be less than a week (in seconds) that is 604800")]
    ExpiresTooLarge,

    /// `X-Amz-Expires` or `Expires` is not a non-negative integer.
    #[error("Malformed expiration: {0}")]
    MalformedExpires(String),

    /// The request date could not be parsed.
    #[error("Malformed date: {0}")]
    MalformedDate(String),

    /// The request date is too far from the server clock.
    #[error("The difference between the request time and the server's time is too large")]
    RequestTimeTooSkewed,

    /// A required query parameter for presigned authentication is missing.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// `x-amz-content-sha256` does not match the payload.
    #[error("The provided 'x-amz-content-sha256' header does not match what was computed")]
    ContentSha256Mismatch,

    /// A streaming chunk is malformed or truncated.
    #[error("Malformed streaming chunk: {0}")]
    MalformedChunk(String),

    /// A POST form upload is malformed.
    #[error("{0}")]
    MalformedPost(String),

    /// A required POST form field is missing.
    #[error("Missing required form field: {0}")]
    MissingField(String),

    /// The POST policy has expired.
    #[error("Invalid according to Policy: Policy expired.")]
    PolicyExpired,

    /// A POST policy condition is not satisfied by the form.
    #[error("Invalid according to Policy: Policy Condition failed: {0}")]
    PolicyConditionFailed(String),

    /// The uploaded file exceeds the policy's `content-length-range`.
    #[error("Your proposed upload exceeds the maximum allowed size")]
    EntityTooLarge,

    /// The uploaded file is below the policy's `content-length-range`.
    #[error("Your proposed upload is smaller than the minimum allowed size")]
    EntityTooSmall,

    /// The security token could not be decoded or belongs to another key.
    #[error("Invalid security token")]
    InvalidToken,

    /// The security token has expired.
    #[error("The provided token has expired")]
    TokenExpired,

    /// Anonymous requests are not allowed for this operation.
    #[error("Anonymous access is forbidden for this operation")]
    AnonymousForbidden,

    /// The credential store failed.
    #[error("Credential backend error: {0}")]
    Backend(String),
}

impl From<AuthError> for S3Error {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::MissingAuthHeader
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::InvalidAuthHeader => S3ErrorCode::AuthorizationHeaderMalformed,
            AuthError::MissingHeader(_)
            | AuthError::UnsignedHeader(_)
            | AuthError::PolicyExpired
            | AuthError::PolicyConditionFailed(_)
            | AuthError::AnonymousForbidden => S3ErrorCode::AccessDenied,
            AuthError::SignedHeadersNotSorted | AuthError::SignatureDoesNotMatch => {
                S3ErrorCode::SignatureDoesNotMatch
            }
            AuthError::InvalidCredential(_) => S3ErrorCode::CredentialMalformed,
            AuthError::AccessKeyNotFound(_) | AuthError::InvalidToken => {
                S3ErrorCode::InvalidAccessKeyId
            }
            AuthError::RequestExpired | AuthError::TokenExpired => S3ErrorCode::ExpiredToken,
            AuthError::ExpiresTooLarge
            | AuthError::MalformedExpires(_)
            | AuthError::MissingQueryParam(_) => S3ErrorCode::AuthorizationQueryParametersError,
            AuthError::MalformedDate(_) => S3ErrorCode::MalformedDate,
            AuthError::RequestTimeTooSkewed => S3ErrorCode::RequestTimeTooSkewed,
            AuthError::ContentSha256Mismatch => S3ErrorCode::XAmzContentSHA256Mismatch,
            AuthError::MalformedChunk(_) => S3ErrorCode::IncompleteBody,
            AuthError::MalformedPost(_) => S3ErrorCode::MalformedPOSTRequest,
            AuthError::MissingField(_) => S3ErrorCode::MissingFields,
            AuthError::EntityTooLarge => S3ErrorCode::EntityTooLarge,
            AuthError::EntityTooSmall => S3ErrorCode::EntityTooSmall,
            AuthError::Backend(_) => S3ErrorCode::InternalError,
        };
        let message = match code {
            S3ErrorCode::InternalError => code.default_message().to_owned(),
            _ => err.to_string(),
        };
        S3Error::with_message(code, message).with_source(err)
    }
}
