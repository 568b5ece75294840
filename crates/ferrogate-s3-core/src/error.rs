//! S3 service error types.
//!
//! Defines [`S3ServiceError`], the error every operation handler returns.
//! Each variant maps to a concrete [`S3ErrorCode`]; the [`From`]
//! implementation into [`S3Error`] attaches the code, a message and any extra
//! XML elements or headers the variant carries.
//!
//! # Usage
//!
//! ```
//! use ferrogate_s3_core::error::S3ServiceError;
//! use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
//!
//! let err = S3ServiceError::NoSuchBucket {
//!     bucket: "my-bucket".to_owned(),
//! };
//! let s3_err: S3Error = err.into();
//! assert_eq!(s3_err.code, S3ErrorCode::NoSuchBucket);
//! ```

use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use tracing::warn;

use crate::backend::BackendError;
use crate::crypto::CryptoError;
use crate::meta::MetaError;

/// S3 service error type.
#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    // -----------------------------------------------------------------------
    // Bucket errors
    // -----------------------------------------------------------------------
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The requested bucket name is owned by another account.
    #[error("The requested bucket name is not available: {bucket}")]
    BucketAlreadyExists {
        /// The bucket name that already exists.
        bucket: String,
    },

    /// The bucket already exists and is owned by the caller.
    #[error(
        "Your previous request to create the named bucket succeeded and you already own it: {bucket}"
    )]
    BucketAlreadyOwnedByYou {
        /// The bucket name that already exists.
        bucket: String,
    },

    /// The bucket is not empty and cannot be deleted.
    #[error("The bucket you tried to delete is not empty: {bucket}")]
    BucketNotEmpty {
        /// The bucket name that is not empty.
        bucket: String,
    },

    /// The bucket name violates the naming rules.
    #[error("The specified bucket is not valid: {name}: {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// Which rule was violated.
        reason: String,
    },

    /// CreateBucket asked for a region this gateway does not serve.
    #[error("The specified location constraint is not valid: {location}")]
    InvalidLocationConstraint {
        /// The requested region.
        location: String,
    },

    // -----------------------------------------------------------------------
    // Object / key errors
    // -----------------------------------------------------------------------
    /// The specified key does not exist.
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The key that was not found.
        key: String,
    },

    /// The specified version does not exist.
    #[error("The specified version does not exist: key={key}, version_id={version_id}")]
    NoSuchVersion {
        /// The key for the version.
        key: String,
        /// The version that was not found.
        version_id: String,
    },

    /// The latest version of the key is a delete marker.
    #[error("The specified key does not exist: {key}")]
    DeleteMarker {
        /// The key.
        key: String,
        /// Version id of the delete marker.
        version_id: String,
    },

    /// The key is empty, too long or otherwise unusable.
    #[error("{message}")]
    InvalidObjectName {
        /// What is wrong with the key.
        message: String,
    },

    /// Append on an object that was not created by AppendObject.
    #[error("The object is not appendable: {key}")]
    ObjectNotAppendable {
        /// The key.
        key: String,
    },

    /// Append `position` differs from the current object length.
    #[error("The position {position} is not equal to the length of the object {length}")]
    PositionNotEqualToLength {
        /// Position the client sent.
        position: u64,
        /// Current object length.
        length: u64,
    },

    /// The object is in the cold tier and not restored.
    #[error("The operation is not valid for the object's storage class: {key}")]
    InvalidObjectState {
        /// The key.
        key: String,
    },

    /// A restore of the object is still running.
    #[error("Object restore is already in progress: {key}")]
    RestoreAlreadyInProgress {
        /// The key.
        key: String,
    },

    // -----------------------------------------------------------------------
    // Multipart errors
    // -----------------------------------------------------------------------
    /// The specified multipart upload does not exist.
    #[error("The specified multipart upload does not exist: {upload_id}")]
    NoSuchUpload {
        /// The upload ID that was not found.
        upload_id: String,
    },

    /// A listed part was not uploaded or its etag differs.
    #[error("One or more of the specified parts could not be found: part {part_number}")]
    InvalidPart {
        /// The offending part number.
        part_number: i32,
    },

    /// The list of parts was not in ascending order.
    #[error("The list of parts was not in ascending order")]
    InvalidPartOrder,

    /// A non-final part is smaller than the minimum part size.
    #[error("Your proposed upload is smaller than the minimum allowed object size")]
    EntityTooSmall {
        /// Size of the offending part.
        proposed_size: u64,
        /// Smallest allowed size.
        min_size_allowed: u64,
        /// The offending part number.
        part_number: i32,
        /// Etag of the offending part.
        part_etag: String,
    },

    /// The entity exceeds the maximum allowed size.
    #[error("Your proposed upload exceeds the maximum allowed size")]
    EntityTooLarge,

    // -----------------------------------------------------------------------
    // Request validation errors
    // -----------------------------------------------------------------------
    /// Invalid argument in the request.
    #[error("{message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The request is not valid in the current state.
    #[error("{message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// The requested range is not satisfiable.
    #[error("The requested range is not satisfiable")]
    InvalidRange,

    /// The Content-MD5 header is not valid base64 of 16 bytes.
    #[error("The Content-MD5 you specified is not valid")]
    InvalidDigest,

    /// The Content-MD5 does not match the body.
    #[error("The Content-MD5 you specified did not match what we received")]
    BadDigest,

    /// Content-Length is required.
    #[error("You must provide the Content-Length HTTP header")]
    MissingContentLength,

    /// Content-MD5 is required.
    #[error("Missing required header for this request: Content-Md5")]
    MissingContentMd5,

    /// Fewer bytes arrived or were stored than declared.
    #[error("You did not provide the number of bytes specified by the Content-Length HTTP header")]
    IncompleteBody,

    /// The XML body could not be parsed.
    #[error("The XML you provided was not well-formed: {message}")]
    MalformedXml {
        /// Parser detail.
        message: String,
    },

    /// The ACL body is not valid.
    #[error("The ACL you provided was not well-formed: {message}")]
    MalformedAcl {
        /// Detail.
        message: String,
    },

    /// The bucket policy document is not valid.
    #[error("{message}")]
    MalformedPolicy {
        /// Detail.
        message: String,
    },

    /// The POST form is not valid.
    #[error("{message}")]
    MalformedPostRequest {
        /// Detail.
        message: String,
    },

    /// The form does not satisfy the POST policy.
    #[error("{message}")]
    InvalidPolicyDocument {
        /// Detail.
        message: String,
    },

    /// SSE headers are missing, inconsistent or do not match the stored key.
    #[error("{message}")]
    InvalidSseHeader {
        /// Detail.
        message: String,
    },

    /// The storage class is not supported.
    #[error("The storage class you specified is not valid")]
    InvalidStorageClass,

    /// The CORS document is not valid.
    #[error("{message}")]
    InvalidCorsDocument {
        /// Detail.
        message: String,
    },

    /// The website configuration is not valid.
    #[error("{message}")]
    InvalidWebsiteConfiguration {
        /// Detail.
        message: String,
    },

    /// The versioning configuration is not valid.
    #[error("{message}")]
    IllegalVersioningConfiguration {
        /// Detail.
        message: String,
    },

    /// At least one precondition did not hold.
    #[error("At least one of the preconditions you specified did not hold")]
    PreconditionFailed,

    /// The object was not modified since the given time or etag.
    #[error("Not Modified")]
    NotModified,

    // -----------------------------------------------------------------------
    // Access errors
    // -----------------------------------------------------------------------
    /// Access denied.
    #[error("Access Denied")]
    AccessDenied,

    /// The method is not allowed against this resource.
    #[error("The specified method is not allowed against this resource")]
    MethodNotAllowed,

    /// The functionality is not implemented or switched off.
    #[error("{feature} is not implemented")]
    NotImplemented {
        /// The operation or sub-resource.
        feature: String,
    },

    /// Too many in-flight requests.
    #[error("Please reduce your request rate")]
    SlowDown,

    // -----------------------------------------------------------------------
    // Configuration not found errors
    // -----------------------------------------------------------------------
    /// No bucket policy configured.
    #[error("The bucket policy does not exist")]
    NoSuchBucketPolicy,

    /// No CORS configuration.
    #[error("The CORS configuration does not exist")]
    NoSuchCorsConfiguration,

    /// No lifecycle configuration.
    #[error("The lifecycle configuration does not exist")]
    NoSuchLifecycleConfiguration,

    /// No website configuration.
    #[error("The specified bucket does not have a website configuration")]
    NoSuchWebsiteConfiguration,

    /// No default encryption configuration.
    #[error("The server side encryption configuration was not found")]
    ServerSideEncryptionConfigurationNotFound,

    // -----------------------------------------------------------------------
    // Lower layers
    // -----------------------------------------------------------------------
    /// Backend I/O failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Encryption failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Internal error (catch-all).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl S3ServiceError {
    /// Convert this error into an [`S3Error`].
    ///
    /// Equivalent to `S3Error::from(self)`, available as a method for
    /// `map_err` chains.
    #[must_use]
    pub fn into_s3_error(self) -> S3Error {
        S3Error::from(self)
    }

    /// Build an [`S3ServiceError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build an [`S3ServiceError::InvalidSseHeader`].
    #[must_use]
    pub fn invalid_sse(message: impl Into<String>) -> Self {
        Self::InvalidSseHeader {
            message: message.into(),
        }
    }

    /// Whether the error hides an unexpected failure.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Crypto(_) | Self::Internal(_))
    }
}

impl From<MetaError> for S3ServiceError {
    fn from(err: MetaError) -> Self {
        match err {
            MetaError::NoSuchBucket { bucket } => Self::NoSuchBucket { bucket },
            MetaError::NoSuchKey { key } => Self::NoSuchKey { key },
            MetaError::NoSuchVersion { key, version_id } => Self::NoSuchVersion { key, version_id },
            MetaError::NoSuchUpload { upload_id } => Self::NoSuchUpload { upload_id },
            MetaError::BucketExists { bucket, .. } => Self::BucketAlreadyExists { bucket },
            other @ MetaError::Unavailable(_) => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<S3ServiceError> for S3Error {
    fn from(err: S3ServiceError) -> Self {
        if err.is_internal() {
            warn!(error = %err, "internal error coerced to InternalError");
            return S3Error::new(S3ErrorCode::InternalError).with_source(err);
        }

        let code = error_code(&err);
        let message = err.to_string();
        match err {
            S3ServiceError::EntityTooSmall {
                proposed_size,
                min_size_allowed,
                part_number,
                part_etag,
            } => S3Error::with_message(code, message)
                .with_detail("ProposedSize", proposed_size.to_string())
                .with_detail("MinSizeAllowed", min_size_allowed.to_string())
                .with_detail("PartNumber", part_number.to_string())
                .with_detail("PartETag", part_etag),
            S3ServiceError::PositionNotEqualToLength { length, .. } => {
                S3Error::with_message(code, message)
                    .with_header("x-amz-next-append-position", length.to_string())
            }
            S3ServiceError::DeleteMarker { key, version_id } => S3Error::with_message(code, message)
                .with_resource(key)
                .with_header("x-amz-delete-marker", "true")
                .with_header("x-amz-version-id", version_id),
            S3ServiceError::NoSuchKey { key } => S3Error::with_message(code, message).with_resource(key),
            S3ServiceError::NoSuchBucket { bucket } => {
                S3Error::with_message(code, message).with_resource(bucket)
            }
            _ => S3Error::with_message(code, message),
        }
    }
}

macro_rules! via_service_error {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for S3Error {
                fn from(err: $source) -> Self {
                    S3ServiceError::from(err).into()
                }
            }
        )+
    };
}

via_service_error!(MetaError, BackendError, CryptoError);

/// Map an [`S3ServiceError`] variant to the corresponding [`S3ErrorCode`].
fn error_code(err: &S3ServiceError) -> S3ErrorCode {
    match err {
        S3ServiceError::NoSuchBucket { .. } => S3ErrorCode::NoSuchBucket,
        S3ServiceError::BucketAlreadyExists { .. } => S3ErrorCode::BucketAlreadyExists,
        S3ServiceError::BucketAlreadyOwnedByYou { .. } => S3ErrorCode::BucketAlreadyOwnedByYou,
        S3ServiceError::BucketNotEmpty { .. } => S3ErrorCode::BucketNotEmpty,
        S3ServiceError::InvalidBucketName { .. } => S3ErrorCode::InvalidBucketName,
        S3ServiceError::InvalidLocationConstraint { .. } => S3ErrorCode::InvalidLocationConstraint,
        S3ServiceError::NoSuchKey { .. } | S3ServiceError::DeleteMarker { .. } => {
            S3ErrorCode::NoSuchKey
        }
        S3ServiceError::NoSuchVersion { .. } => S3ErrorCode::NoSuchVersion,
        S3ServiceError::InvalidObjectName { .. } => S3ErrorCode::InvalidObjectName,
        S3ServiceError::ObjectNotAppendable { .. } => S3ErrorCode::ObjectNotAppendable,
        S3ServiceError::PositionNotEqualToLength { .. } => S3ErrorCode::PositionNotEqualToLength,
        S3ServiceError::InvalidObjectState { .. } => S3ErrorCode::InvalidObjectState,
        S3ServiceError::RestoreAlreadyInProgress { .. } => S3ErrorCode::RestoreAlreadyInProgress,
        S3ServiceError::NoSuchUpload { .. } => S3ErrorCode::NoSuchUpload,
        S3ServiceError::InvalidPart { .. } => S3ErrorCode::InvalidPart,
        S3ServiceError::InvalidPartOrder => S3ErrorCode::InvalidPartOrder,
        S3ServiceError::EntityTooSmall { .. } => S3ErrorCode::EntityTooSmall,
        S3ServiceError::EntityTooLarge => S3ErrorCode::EntityTooLarge,
        S3ServiceError::InvalidArgument { .. } => S3ErrorCode::InvalidArgument,
        S3ServiceError::InvalidRequest { .. } => S3ErrorCode::InvalidRequest,
        S3ServiceError::InvalidRange => S3ErrorCode::InvalidRange,
        S3ServiceError::InvalidDigest => S3ErrorCode::InvalidDigest,
        S3ServiceError::BadDigest => S3ErrorCode::BadDigest,
        S3ServiceError::MissingContentLength => S3ErrorCode::MissingContentLength,
        S3ServiceError::MissingContentMd5 => S3ErrorCode::MissingContentMD5,
        S3ServiceError::IncompleteBody => S3ErrorCode::IncompleteBody,
        S3ServiceError::MalformedXml { .. } => S3ErrorCode::MalformedXML,
        S3ServiceError::MalformedAcl { .. } => S3ErrorCode::MalformedACLError,
        S3ServiceError::MalformedPolicy { .. } => S3ErrorCode::MalformedPolicy,
        S3ServiceError::MalformedPostRequest { .. } => S3ErrorCode::MalformedPOSTRequest,
        S3ServiceError::InvalidPolicyDocument { .. } => S3ErrorCode::InvalidPolicyDocument,
        S3ServiceError::InvalidSseHeader { .. } => S3ErrorCode::InvalidSseHeader,
        S3ServiceError::InvalidStorageClass => S3ErrorCode::InvalidStorageClass,
        S3ServiceError::InvalidCorsDocument { .. } => S3ErrorCode::InvalidCorsDocument,
        S3ServiceError::InvalidWebsiteConfiguration { .. } => {
            S3ErrorCode::InvalidWebsiteConfiguration
        }
        S3ServiceError::IllegalVersioningConfiguration { .. } => {
            S3ErrorCode::IllegalVersioningConfigurationException
        }
        S3ServiceError::PreconditionFailed => S3ErrorCode::PreconditionFailed,
        S3ServiceError::NotModified => S3ErrorCode::NotModified,
        S3ServiceError::AccessDenied => S3ErrorCode::AccessDenied,
        S3ServiceError::MethodNotAllowed => S3ErrorCode::MethodNotAllowed,
        S3ServiceError::NotImplemented { .. } => S3ErrorCode::NotImplemented,
        S3ServiceError::SlowDown => S3ErrorCode::SlowDown,
        S3ServiceError::NoSuchBucketPolicy => S3ErrorCode::NoSuchBucketPolicy,
        S3ServiceError::NoSuchCorsConfiguration => S3ErrorCode::NoSuchCORSConfiguration,
        S3ServiceError::NoSuchLifecycleConfiguration => S3ErrorCode::NoSuchLifecycleConfiguration,
        S3ServiceError::NoSuchWebsiteConfiguration => S3ErrorCode::NoSuchWebsiteConfiguration,
        S3ServiceError::ServerSideEncryptionConfigurationNotFound => {
            S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError
        }
        S3ServiceError::Backend(_) | S3ServiceError::Crypto(_) | S3ServiceError::Internal(_) => {
            S3ErrorCode::InternalError
        }
    }
}

/// Convenience result type for S3 service operations.
pub type S3ServiceResult<T> = Result<T, S3ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_convert_no_such_bucket_to_s3_error() {
        let err = S3ServiceError::NoSuchBucket {
            bucket: "test-bucket".to_owned(),
        };
        let s3_err: S3Error = err.into();
        assert_eq!(s3_err.code, S3ErrorCode::NoSuchBucket);
        assert_eq!(s3_err.status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(s3_err.resource.as_deref(), Some("test-bucket"));
    }

    #[test]
    fn test_should_convert_entity_too_small_with_details() {
        let err = S3ServiceError::EntityTooSmall {
            proposed_size: 3_145_728,
            min_size_allowed: 5_242_880,
            part_number: 1,
            part_etag: "abc".to_owned(),
        };
        let s3_err = err.into_s3_error();
        assert_eq!(s3_err.code, S3ErrorCode::EntityTooSmall);
        assert_eq!(
            s3_err.details,
            vec![
                ("ProposedSize", "3145728".to_owned()),
                ("MinSizeAllowed", "5242880".to_owned()),
                ("PartNumber", "1".to_owned()),
                ("PartETag", "abc".to_owned()),
            ]
        );
    }

    #[test]
    fn test_should_attach_next_append_position_header() {
        let s3_err = S3ServiceError::PositionNotEqualToLength {
            position: 3,
            length: 11,
        }
        .into_s3_error();
        assert_eq!(s3_err.code, S3ErrorCode::PositionNotEqualToLength);
        assert_eq!(s3_err.header("x-amz-next-append-position"), Some("11"));
    }

    #[test]
    fn test_should_convert_delete_marker_to_no_such_key() {
        let s3_err = S3ServiceError::DeleteMarker {
            key: "k".to_owned(),
            version_id: "v1".to_owned(),
        }
        .into_s3_error();
        assert_eq!(s3_err.code, S3ErrorCode::NoSuchKey);
        assert_eq!(s3_err.header("x-amz-delete-marker"), Some("true"));
        assert_eq!(s3_err.header("x-amz-version-id"), Some("v1"));
    }

    #[test]
    fn test_should_hide_internal_error_details() {
        let err = S3ServiceError::Internal(anyhow::anyhow!("disk on fire"));
        let s3_err: S3Error = err.into();
        assert_eq!(s3_err.code, S3ErrorCode::InternalError);
        assert!(!s3_err.message.contains("disk"));
        assert!(std::error::Error::source(&s3_err).is_some());
    }

    #[test]
    fn test_should_convert_meta_errors() {
        let err: S3ServiceError = MetaError::NoSuchUpload {
            upload_id: "u1".to_owned(),
        }
        .into();
        assert!(matches!(err, S3ServiceError::NoSuchUpload { .. }));
        let err: S3ServiceError = MetaError::Unavailable("down".to_owned()).into();
        assert_eq!(err.into_s3_error().code, S3ErrorCode::InternalError);
    }

    #[test]
    fn test_should_convert_config_not_found_errors() {
        assert_eq!(
            S3ServiceError::NoSuchCorsConfiguration.into_s3_error().code,
            S3ErrorCode::NoSuchCORSConfiguration
        );
        assert_eq!(
            S3ServiceError::ServerSideEncryptionConfigurationNotFound
                .into_s3_error()
                .code,
            S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError
        );
        assert_eq!(
            S3ServiceError::NoSuchWebsiteConfiguration.into_s3_error().code,
            S3ErrorCode::NoSuchWebsiteConfiguration
        );
    }

    #[test]
    fn test_should_convert_append_errors_to_conflict() {
        let s3_err = S3ServiceError::ObjectNotAppendable {
            key: "k".to_owned(),
        }
        .into_s3_error();
        assert_eq!(s3_err.status_code, http::StatusCode::CONFLICT);
    }
}
