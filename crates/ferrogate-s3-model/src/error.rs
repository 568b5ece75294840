//! S3 error taxonomy.
//!
//! Every failure that reaches the wire is an [`S3Error`]: an AWS error code,
//! an HTTP status, a human readable message, plus optional resource, request
//! id, extra XML elements and extra response headers.

use std::fmt;

/// Well-known S3 error codes understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// AccessDenied error.
    #[default]
    AccessDenied,
    /// AuthorizationHeaderMalformed error.
    AuthorizationHeaderMalformed,
    /// AuthorizationQueryParametersError error.
    AuthorizationQueryParametersError,
    /// BadDigest error.
    BadDigest,
    /// BucketAlreadyExists error.
    BucketAlreadyExists,
    /// BucketAlreadyOwnedByYou error.
    BucketAlreadyOwnedByYou,
    /// BucketNotEmpty error.
    BucketNotEmpty,
    /// CredentialMalformed error.
    CredentialMalformed,
    /// EntityTooLarge error.
    EntityTooLarge,
    /// EntityTooSmall error.
    EntityTooSmall,
    /// ExpiredToken error.
    ExpiredToken,
    /// IllegalVersioningConfigurationException error.
    IllegalVersioningConfigurationException,
    /// IncompleteBody error.
    IncompleteBody,
    /// InternalError error.
    InternalError,
    /// InvalidAccessKeyId error.
    InvalidAccessKeyId,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidBucketName error.
    InvalidBucketName,
    /// InvalidCorsDocument error.
    InvalidCorsDocument,
    /// InvalidDigest error.
    InvalidDigest,
    /// InvalidLocationConstraint error.
    InvalidLocationConstraint,
    /// InvalidObjectName error.
    InvalidObjectName,
    /// InvalidObjectState error.
    InvalidObjectState,
    /// InvalidPart error.
    InvalidPart,
    /// InvalidPartOrder error.
    InvalidPartOrder,
    /// InvalidPolicyDocument error.
    InvalidPolicyDocument,
    /// InvalidRange error.
    InvalidRange,
    /// InvalidRequest error.
    InvalidRequest,
    /// InvalidSseHeader error.
    InvalidSseHeader,
    /// InvalidStorageClass error.
    InvalidStorageClass,
    /// InvalidWebsiteConfiguration error.
    InvalidWebsiteConfiguration,
    /// MalformedACLError error.
    MalformedACLError,
    /// MalformedDate error.
    MalformedDate,
    /// MalformedPOSTRequest error.
    MalformedPOSTRequest,
    /// MalformedPolicy error.
    MalformedPolicy,
    /// MalformedXML error.
    MalformedXML,
    /// MetadataTooLarge error.
    MetadataTooLarge,
    /// MethodNotAllowed error.
    MethodNotAllowed,
    /// MissingContentLength error.
    MissingContentLength,
    /// MissingContentMD5 error.
    MissingContentMD5,
    /// MissingFields error.
    MissingFields,
    /// MissingSecurityHeader error.
    MissingSecurityHeader,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchBucketPolicy error.
    NoSuchBucketPolicy,
    /// NoSuchCORSConfiguration error.
    NoSuchCORSConfiguration,
    /// NoSuchKey error.
    NoSuchKey,
    /// NoSuchLifecycleConfiguration error.
    NoSuchLifecycleConfiguration,
    /// NoSuchUpload error.
    NoSuchUpload,
    /// NoSuchVersion error.
    NoSuchVersion,
    /// NoSuchWebsiteConfiguration error.
    NoSuchWebsiteConfiguration,
    /// NotImplemented error.
    NotImplemented,
    /// NotModified error (HTTP 304).
    NotModified,
    /// ObjectNotAppendable error.
    ObjectNotAppendable,
    /// PositionNotEqualToLength error.
    PositionNotEqualToLength,
    /// PreconditionFailed error.
    PreconditionFailed,
    /// RequestTimeout error.
    RequestTimeout,
    /// RequestTimeTooSkewed error.
    RequestTimeTooSkewed,
    /// RestoreAlreadyInProgress error.
    RestoreAlreadyInProgress,
    /// ServerSideEncryptionConfigurationNotFoundError error.
    ServerSideEncryptionConfigurationNotFoundError,
    /// SignatureDoesNotMatch error.
    SignatureDoesNotMatch,
    /// SlowDown error.
    SlowDown,
    /// XAmzContentSHA256Mismatch error.
    XAmzContentSHA256Mismatch,
    /// A custom error code not in the standard set.
    Custom(&'static str),
}

impl S3ErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::AuthorizationHeaderMalformed => "AuthorizationHeaderMalformed",
            Self::AuthorizationQueryParametersError => "AuthorizationQueryParametersError",
            Self::BadDigest => "BadDigest",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::CredentialMalformed => "CredentialMalformed",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::EntityTooSmall => "EntityTooSmall",
            Self::ExpiredToken => "ExpiredToken",
            Self::IllegalVersioningConfigurationException => {
                "IllegalVersioningConfigurationException"
            }
            Self::IncompleteBody => "IncompleteBody",
            Self::InternalError => "InternalError",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidCorsDocument => "InvalidCorsDocument",
            Self::InvalidDigest => "InvalidDigest",
            Self::InvalidLocationConstraint => "InvalidLocationConstraint",
            Self::InvalidObjectName => "InvalidObjectName",
            Self::InvalidObjectState => "InvalidObjectState",
            Self::InvalidPart => "InvalidPart",
            Self::InvalidPartOrder => "InvalidPartOrder",
            Self::InvalidPolicyDocument => "InvalidPolicyDocument",
            Self::InvalidRange => "InvalidRange",
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidSseHeader => "InvalidSseHeader",
            Self::InvalidStorageClass => "InvalidStorageClass",
            Self::InvalidWebsiteConfiguration => "InvalidWebsiteConfiguration",
            Self::MalformedACLError => "MalformedACLError",
            Self::MalformedDate => "MalformedDate",
            Self::MalformedPOSTRequest => "MalformedPOSTRequest",
            Self::MalformedPolicy => "MalformedPolicy",
            Self::MalformedXML => "MalformedXML",
            Self::MetadataTooLarge => "MetadataTooLarge",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MissingContentLength => "MissingContentLength",
            Self::MissingContentMD5 => "MissingContentMD5",
            Self::MissingFields => "MissingFields",
            Self::MissingSecurityHeader => "MissingSecurityHeader",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchBucketPolicy => "NoSuchBucketPolicy",
            Self::NoSuchCORSConfiguration => "NoSuchCORSConfiguration",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchLifecycleConfiguration => "NoSuchLifecycleConfiguration",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::NoSuchVersion => "NoSuchVersion",
            Self::NoSuchWebsiteConfiguration => "NoSuchWebsiteConfiguration",
            Self::NotImplemented => "NotImplemented",
            Self::NotModified => "NotModified",
            Self::ObjectNotAppendable => "ObjectNotAppendable",
            Self::PositionNotEqualToLength => "PositionNotEqualToLength",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::RequestTimeout => "RequestTimeout",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::RestoreAlreadyInProgress => "RestoreAlreadyInProgress",
            Self::ServerSideEncryptionConfigurationNotFoundError => {
                "ServerSideEncryptionConfigurationNotFoundError"
            }
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::SlowDown => "SlowDown",
            Self::XAmzContentSHA256Mismatch => "XAmzContentSHA256Mismatch",
            Self::Custom(s) => s,
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::NotModified => http::StatusCode::NOT_MODIFIED,
            Self::AuthorizationHeaderMalformed
            | Self::AuthorizationQueryParametersError
            | Self::BadDigest
            | Self::CredentialMalformed
            | Self::EntityTooLarge
            | Self::EntityTooSmall
            | Self::IllegalVersioningConfigurationException
            | Self::IncompleteBody
            | Self::InvalidArgument
            | Self::InvalidBucketName
            | Self::InvalidCorsDocument
            | Self::InvalidDigest
            | Self::InvalidLocationConstraint
            | Self::InvalidObjectName
            | Self::InvalidPart
            | Self::InvalidPartOrder
            | Self::InvalidPolicyDocument
            | Self::InvalidRequest
            | Self::InvalidSseHeader
            | Self::InvalidStorageClass
            | Self::InvalidWebsiteConfiguration
            | Self::MalformedACLError
            | Self::MalformedDate
            | Self::MalformedPOSTRequest
            | Self::MalformedPolicy
            | Self::MalformedXML
            | Self::MetadataTooLarge
            | Self::MissingContentMD5
            | Self::MissingFields
            | Self::MissingSecurityHeader
            | Self::RequestTimeout
            | Self::ServerSideEncryptionConfigurationNotFoundError
            | Self::XAmzContentSHA256Mismatch => http::StatusCode::BAD_REQUEST,
            Self::AccessDenied
            | Self::ExpiredToken
            | Self::InvalidAccessKeyId
            | Self::InvalidObjectState
            | Self::RequestTimeTooSkewed
            | Self::SignatureDoesNotMatch => http::StatusCode::FORBIDDEN,
            Self::NoSuchBucket
            | Self::NoSuchBucketPolicy
            | Self::NoSuchCORSConfiguration
            | Self::NoSuchKey
            | Self::NoSuchLifecycleConfiguration
            | Self::NoSuchUpload
            | Self::NoSuchVersion
            | Self::NoSuchWebsiteConfiguration => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::BucketAlreadyExists
            | Self::BucketAlreadyOwnedByYou
            | Self::BucketNotEmpty
            | Self::ObjectNotAppendable
            | Self::PositionNotEqualToLength
            | Self::RestoreAlreadyInProgress => http::StatusCode::CONFLICT,
            Self::MissingContentLength => http::StatusCode::LENGTH_REQUIRED,
            Self::PreconditionFailed => http::StatusCode::PRECONDITION_FAILED,
            Self::InvalidRange => http::StatusCode::RANGE_NOT_SATISFIABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
            Self::SlowDown => http::StatusCode::SERVICE_UNAVAILABLE,
            Self::Custom(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::AuthorizationHeaderMalformed => "The authorization header is malformed",
            Self::AuthorizationQueryParametersError => {
                "Error parsing the X-Amz-Credential parameter"
            }
            Self::BadDigest => "The Content-MD5 you specified did not match what we received",
            Self::BucketAlreadyExists => "The requested bucket name is not available",
            Self::BucketAlreadyOwnedByYou => "The bucket is already owned by you",
            Self::BucketNotEmpty => "The bucket you tried to delete is not empty",
            Self::CredentialMalformed => "The credential is malformed",
            Self::EntityTooLarge => "Your proposed upload exceeds the maximum allowed size",
            Self::EntityTooSmall => {
                "Your proposed upload is smaller than the minimum allowed object size."
            }
            Self::ExpiredToken => "The provided token has expired",
            Self::IllegalVersioningConfigurationException => {
                "The versioning configuration specified in the request is invalid"
            }
            Self::IncompleteBody => {
                "You did not provide the number of bytes specified by the Content-Length HTTP header"
            }
            Self::InternalError => "We encountered an internal error, please try again",
            Self::InvalidAccessKeyId => {
                "The access key Id you provided does not exist in our records"
            }
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidBucketName => "The specified bucket is not valid",
            Self::InvalidCorsDocument => "The CORS XML you provided is invalid",
            Self::InvalidDigest => "The Content-MD5 you specified is not valid",
            Self::InvalidLocationConstraint => {
                "The specified location constraint is not valid"
            }
            Self::InvalidObjectName => "Object name contains unsupported characters",
            Self::InvalidObjectState => {
                "The operation is not valid for the current state of the object"
            }
            Self::InvalidPart => "One or more of the specified parts could not be found",
            Self::InvalidPartOrder => "The list of parts was not in ascending order",
            Self::InvalidPolicyDocument => "The content of the form does not meet the conditions",
            Self::InvalidRange => "The requested range cannot be satisfied",
            Self::InvalidRequest => "Invalid Request",
            Self::InvalidSseHeader => "The server-side encryption headers are invalid",
            Self::InvalidStorageClass => "The storage class you specified is not valid",
            Self::InvalidWebsiteConfiguration => "The website configuration is invalid",
            Self::MalformedACLError => "The ACL you provided was not well-formed",
            Self::MalformedDate => "Invalid date format header",
            Self::MalformedPOSTRequest => {
                "The body of your POST request is not well-formed multipart/form-data"
            }
            Self::MalformedPolicy => "Policy has invalid resource",
            Self::MalformedXML => "The XML you provided was not well-formed",
            Self::MetadataTooLarge => {
                "Your metadata headers exceed the maximum allowed metadata size"
            }
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::MissingContentLength => "You must provide the Content-Length HTTP header",
            Self::MissingContentMD5 => "Missing required header for this request: Content-Md5",
            Self::MissingFields => "Missing fields in request",
            Self::MissingSecurityHeader => "Your request was missing a required header",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchBucketPolicy => "The specified bucket does not have a bucket policy",
            Self::NoSuchCORSConfiguration => "The CORS configuration does not exist",
            Self::NoSuchKey => "The specified key does not exist",
            Self::NoSuchLifecycleConfiguration => "The lifecycle configuration does not exist",
            Self::NoSuchUpload => "The specified multipart upload does not exist",
            Self::NoSuchVersion => "The specified version does not exist",
            Self::NoSuchWebsiteConfiguration => "The website configuration does not exist",
            Self::NotImplemented => "A header you provided implies functionality that is not implemented",
            Self::NotModified => "Not Modified",
            Self::ObjectNotAppendable => "The object is not appendable",
            Self::PositionNotEqualToLength => {
                "The position of append is not equal to the length of the object"
            }
            Self::PreconditionFailed => {
                "At least one of the preconditions you specified did not hold"
            }
            Self::RequestTimeout => {
                "Your socket connection to the server was not read from or written to within the timeout period"
            }
            Self::RequestTimeTooSkewed => {
                "The difference between the request time and the server's time is too large"
            }
            Self::RestoreAlreadyInProgress => "Object restore is already in progress",
            Self::ServerSideEncryptionConfigurationNotFoundError => {
                "The server side encryption configuration was not found"
            }
            Self::SignatureDoesNotMatch => {
                "The request signature we calculated does not match the signature you provided"
            }
            Self::SlowDown => "Please reduce your request rate",
            Self::XAmzContentSHA256Mismatch => {
                "The provided x-amz-content-sha256 header does not match what was computed"
            }
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error response.
#[derive(Debug)]
pub struct S3Error {
    /// The error code.
    pub code: S3ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource that caused the error.
    pub resource: Option<String>,
    /// The request ID.
    pub request_id: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// Extra child elements of `<Error>`, in emission order.
    pub details: Vec<(&'static str, String)>,
    /// Extra response headers.
    pub headers: Vec<(&'static str, String)>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S3Error({}): {}", self.code, self.message)
    }
}

impl std::error::Error for S3Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl S3Error {
    /// Create a new S3Error from an error code.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new S3Error with a custom message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            request_id: None,
            details: Vec::new(),
            headers: Vec::new(),
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Append an extra element to the XML error body.
    #[must_use]
    pub fn with_detail(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.details.push((name, value.into()));
        self
    }

    /// Attach a response header to the error response.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.status_code = status;
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a NoSuchBucket error.
    #[must_use]
    pub fn no_such_bucket(bucket_name: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchBucket).with_resource(bucket_name)
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key(key: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchKey).with_resource(key)
    }

    /// Create a NoSuchUpload error.
    #[must_use]
    pub fn no_such_upload(upload_id: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchUpload).with_resource(upload_id)
    }

    /// Create an AccessDenied error.
    #[must_use]
    pub fn access_denied(resource: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::AccessDenied).with_resource(resource)
    }

    /// Create an InternalError error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InternalError, message)
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidArgument, message)
    }

    /// Create a MalformedXML error.
    #[must_use]
    pub fn malformed_xml(detail: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::MalformedXML).with_resource(detail)
    }

    /// Create a MethodNotAllowed error.
    #[must_use]
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::MethodNotAllowed).with_resource(method)
    }

    /// Create a NotImplemented error.
    #[must_use]
    pub fn not_implemented(detail: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NotImplemented).with_resource(detail)
    }

    /// Create a SignatureDoesNotMatch error.
    #[must_use]
    pub fn signature_does_not_match(detail: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::SignatureDoesNotMatch).with_resource(detail)
    }

    /// Look up an extra response header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Create an S3Error from an error code.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_model::s3_error;
/// use ferrogate_s3_model::error::S3ErrorCode;
///
/// let err = s3_error!(NoSuchBucket);
/// assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
///
/// let err = s3_error!(NoSuchKey, "The key does not exist");
/// assert_eq!(err.message, "The key does not exist");
/// ```
#[macro_export]
macro_rules! s3_error {
    ($code:ident) => {
        $crate::error::S3Error::new($crate::error::S3ErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::S3Error::with_message($crate::error::S3ErrorCode::$code, $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_codes_to_documented_statuses() {
        assert_eq!(
            S3ErrorCode::RequestTimeTooSkewed.default_status_code(),
            http::StatusCode::FORBIDDEN
        );
        assert_eq!(
            S3ErrorCode::BucketAlreadyExists.default_status_code(),
            http::StatusCode::CONFLICT
        );
        assert_eq!(
            S3ErrorCode::MissingContentLength.default_status_code(),
            http::StatusCode::LENGTH_REQUIRED
        );
        assert_eq!(
            S3ErrorCode::InvalidRange.default_status_code(),
            http::StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(
            S3ErrorCode::SlowDown.default_status_code(),
            http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            S3ErrorCode::NotImplemented.default_status_code(),
            http::StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn test_should_carry_details_and_headers() {
        let err = S3Error::new(S3ErrorCode::EntityTooSmall)
            .with_detail("ProposedSize", "3145728")
            .with_header("x-amz-next-append-position", "7");
        assert_eq!(err.details, vec![("ProposedSize", "3145728".to_owned())]);
        assert_eq!(err.header("X-Amz-Next-Append-Position"), Some("7"));
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_use_custom_code_string() {
        let err = S3Error::new(S3ErrorCode::Custom("QuotaExceeded"));
        assert_eq!(err.code.as_str(), "QuotaExceeded");
        assert_eq!(err.to_string(), "S3Error(QuotaExceeded): QuotaExceeded");
    }
}
