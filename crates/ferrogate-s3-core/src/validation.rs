//! Request validation shared by the operation handlers.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::net::Ipv4Addr;

use base64::Engine;
use md5::{Digest, Md5};

use crate::error::S3ServiceError;

/// Maximum total size of user metadata keys and values.
const MAX_METADATA_SIZE: usize = 2048;

/// Maximum object key length in bytes.
const MAX_KEY_BYTES: usize = 1024;

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Largest single PUT or part.
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Highest allowed part number.
pub const MAX_PART_NUMBER: i32 = 10_000;

/// Maximum number of keys in one multi-object delete.
pub const MAX_DELETE_KEYS: usize = 1000;

fn bad_bucket(name: &str, reason: impl Into<String>) -> S3ServiceError {
    S3ServiceError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

/// Validate a bucket name.
///
/// 3-63 characters of lowercase letters, digits, `-` and `.`, starting and
/// ending with a letter or digit, without `..` and not shaped like an IPv4
/// address.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-valid-bucket").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), S3ServiceError> {
    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(bad_bucket(
            name,
            format!("length must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN}"),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(bad_bucket(name, "only lowercase letters, digits, '-' and '.' are allowed"));
    }
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(name.as_bytes()[0]) || !edge_ok(name.as_bytes()[len - 1]) {
        return Err(bad_bucket(name, "must start and end with a letter or digit"));
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(bad_bucket(name, "dots must separate labels"));
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(bad_bucket(name, "must not be formatted as an IP address"));
    }
    Ok(())
}

/// Validate an object key: 1-1024 bytes.
pub fn validate_object_key(key: &str) -> Result<(), S3ServiceError> {
    if key.is_empty() {
        return Err(S3ServiceError::InvalidObjectName {
            message: "Object key must not be empty".to_owned(),
        });
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(S3ServiceError::InvalidObjectName {
            message: format!("Object key must not exceed {MAX_KEY_BYTES} bytes"),
        });
    }
    Ok(())
}

/// Validate the total size of user metadata.
///
/// ```
/// use std::collections::HashMap;
/// use ferrogate_s3_core::validation::validate_metadata;
///
/// let mut meta = HashMap::new();
/// meta.insert("color".to_owned(), "blue".to_owned());
/// assert!(validate_metadata(&meta).is_ok());
/// ```
pub fn validate_metadata<S: BuildHasher>(
    metadata: &HashMap<String, String, S>,
) -> Result<(), S3ServiceError> {
    let total: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
    if total > MAX_METADATA_SIZE {
        return Err(S3ServiceError::invalid_argument(format!(
            "User-defined metadata must not exceed {MAX_METADATA_SIZE} bytes, got {total}"
        )));
    }
    Ok(())
}

/// Decode a `Content-MD5` header into its 16 digest bytes.
pub fn decode_content_md5(content_md5: &str) -> Result<[u8; 16], S3ServiceError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content_md5.trim())
        .map_err(|_| S3ServiceError::InvalidDigest)?;
    bytes.try_into().map_err(|_| S3ServiceError::InvalidDigest)
}

/// Check the body against an optional `Content-MD5` header.
pub fn validate_content_md5(content_md5: Option<&str>, body: &[u8]) -> Result<(), S3ServiceError> {
    let Some(header) = content_md5 else {
        return Ok(());
    };
    let expected = decode_content_md5(header)?;
    if Md5::digest(body).as_slice() != expected {
        return Err(S3ServiceError::BadDigest);
    }
    Ok(())
}

/// Check a declared or actual body size against the single-request limit.
pub fn validate_object_size(size: u64) -> Result<(), S3ServiceError> {
    if size > MAX_OBJECT_SIZE {
        return Err(S3ServiceError::EntityTooLarge);
    }
    Ok(())
}

/// Check the declared length against the bytes that arrived.
pub fn validate_body_length(declared: Option<u64>, actual: usize) -> Result<(), S3ServiceError> {
    match declared {
        Some(declared) if declared != actual as u64 => Err(S3ServiceError::IncompleteBody),
        _ => Ok(()),
    }
}

/// Validate a multipart part number.
pub fn validate_part_number(part_number: i32) -> Result<(), S3ServiceError> {
    if (1..=MAX_PART_NUMBER).contains(&part_number) {
        Ok(())
    } else {
        Err(S3ServiceError::invalid_argument(format!(
            "Part number must be an integer between 1 and {MAX_PART_NUMBER}, inclusive"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_valid_bucket_names() {
        let long_name = "a".repeat(63);
        for name in ["my-bucket", "abc", "bucket.with.dots", "123bucket", long_name.as_str()] {
            assert!(validate_bucket_name(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn test_should_reject_invalid_bucket_names() {
        let too_long = "a".repeat(64);
        for name in ["ab", too_long.as_str(), "My-Bucket", "-bucket", "bucket-", "a..b", "a.-b", "192.168.1.1", "under_score"] {
            assert!(
                matches!(validate_bucket_name(name), Err(S3ServiceError::InvalidBucketName { .. })),
                "accepted {name}"
            );
        }
    }

    #[test]
    fn test_should_validate_object_keys() {
        assert!(validate_object_key("photos/2024/image.jpg").is_ok());
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(&"k".repeat(1025)).is_err());
    }

    #[test]
    fn test_should_check_content_md5() {
        // md5("hello world") = 5eb63bbbe01eeed093cb22bb8f5acdc3
        let header = base64::engine::general_purpose::STANDARD
            .encode(hex::decode("5eb63bbbe01eeed093cb22bb8f5acdc3").unwrap());
        assert!(validate_content_md5(Some(&header), b"hello world").is_ok());
        assert!(matches!(
            validate_content_md5(Some(&header), b"hello there"),
            Err(S3ServiceError::BadDigest)
        ));
        assert!(matches!(
            validate_content_md5(Some("not-base64!"), b"x"),
            Err(S3ServiceError::InvalidDigest)
        ));
        assert!(matches!(
            validate_content_md5(Some("AAAA"), b"x"),
            Err(S3ServiceError::InvalidDigest)
        ));
    }

    #[test]
    fn test_should_bound_part_numbers_and_sizes() {
        assert!(validate_part_number(1).is_ok());
        assert!(validate_part_number(10_000).is_ok());
        assert!(validate_part_number(0).is_err());
        assert!(validate_part_number(10_001).is_err());
        assert!(validate_object_size(MAX_OBJECT_SIZE).is_ok());
        assert!(matches!(
            validate_object_size(MAX_OBJECT_SIZE + 1),
            Err(S3ServiceError::EntityTooLarge)
        ));
        assert!(matches!(validate_body_length(Some(3), 2), Err(S3ServiceError::IncompleteBody)));
    }
}
