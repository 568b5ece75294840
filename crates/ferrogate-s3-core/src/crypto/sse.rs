//! SSE header resolution for reads and writes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use ferrogate_s3_model::input::{SseCustomerKey, SseRequest};
use ferrogate_s3_model::output::SseResponse;
use ferrogate_s3_model::types::{ServerSideEncryption, ServerSideEncryptionConfiguration};
use md5::{Digest as _, Md5};
use rand::RngExt;
use sha2::Sha256;

use super::{CryptoError, IV_LEN, KEY_LEN, Kms, SseType, apply_at};
use crate::error::{S3ServiceError, S3ServiceResult};

const CUSTOMER_ALGORITHM: &str = "AES256";

/// A validated SSE-C key.
#[derive(Clone)]
pub struct CustomerKey {
    /// Raw key.
    pub key: [u8; KEY_LEN],
    /// Base64 MD5 of the key, echoed in responses.
    pub key_md5: String,
}

impl std::fmt::Debug for CustomerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerKey")
            .field("key", &"[REDACTED]")
            .field("key_md5", &self.key_md5)
            .finish()
    }
}

impl CustomerKey {
    /// Validate SSE-C headers. Returns `None` when none were sent.
    pub fn parse(headers: &SseCustomerKey) -> S3ServiceResult<Option<Self>> {
        if !headers.is_present() {
            return Ok(None);
        }
        match headers.algorithm.as_deref() {
            Some(CUSTOMER_ALGORITHM) => {}
            Some(other) => {
                return Err(S3ServiceError::invalid_sse(format!(
                    "unsupported customer algorithm: {other}"
                )));
            }
            None => return Err(S3ServiceError::invalid_sse("missing customer algorithm")),
        }
        let encoded = headers
            .key
            .as_deref()
            .ok_or_else(|| S3ServiceError::invalid_sse("missing customer key"))?;
        let raw = BASE64_STANDARD
            .decode(encoded)
            .map_err(|_| S3ServiceError::invalid_sse("customer key is not valid base64"))?;
        let key: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| S3ServiceError::invalid_sse("customer key must be 256 bits"))?;

        let key_md5 = BASE64_STANDARD.encode(Md5::digest(key));
        let supplied = headers
            .key_md5
            .as_deref()
            .ok_or_else(|| S3ServiceError::invalid_sse("missing customer key MD5"))?;
        if supplied != key_md5 {
            return Err(S3ServiceError::invalid_sse(
                "customer key MD5 does not match the key",
            ));
        }
        Ok(Some(Self { key, key_md5 }))
    }

    /// SHA-256 of the key, the only form that is persisted.
    #[must_use]
    pub fn fingerprint(&self) -> Vec<u8> {
        Sha256::digest(self.key).to_vec()
    }
}

/// Context a data key is sealed under.
#[must_use]
pub fn kms_context(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

/// Everything needed to encrypt a new object and record how.
#[derive(Clone, Default)]
pub struct EncryptionPlan {
    /// Encryption kind.
    pub sse_type: SseType,
    /// Data key, absent for plaintext objects.
    pub key: Option<[u8; KEY_LEN]>,
    /// Sealed data key or SSE-C fingerprint.
    pub stored_key: Vec<u8>,
    /// Object IV.
    pub iv: [u8; IV_LEN],
    /// KMS key the data key is sealed under.
    pub kms_key_id: Option<String>,
    /// Base64 MD5 of the SSE-C key.
    pub customer_key_md5: Option<String>,
}

impl std::fmt::Debug for EncryptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionPlan")
            .field("sse_type", &self.sse_type)
            .field("kms_key_id", &self.kms_key_id)
            .finish_non_exhaustive()
    }
}

impl EncryptionPlan {
    /// Decide how a new object is encrypted.
    ///
    /// SSE-C headers win; then the explicit `x-amz-server-side-encryption`
    /// header; then the bucket default.
    pub async fn for_write(
        kms: &dyn Kms,
        request: &SseRequest,
        bucket_default: Option<&ServerSideEncryptionConfiguration>,
        bucket: &str,
        key: &str,
    ) -> S3ServiceResult<Self> {
        if let Some(customer) = CustomerKey::parse(&request.customer)? {
            if request.server_side_encryption.is_some() {
                return Err(S3ServiceError::invalid_sse(
                    "server-side encryption and customer keys are mutually exclusive",
                ));
            }
            return Ok(Self::for_customer(&customer));
        }
        if request.server_side_encryption.is_none() && request.kms_key_id.is_some() {
            return Err(S3ServiceError::invalid_sse(
                "a KMS key id requires aws:kms encryption",
            ));
        }

        let (algorithm, key_id) = match (request.server_side_encryption, bucket_default) {
            (Some(algorithm), _) => (algorithm, request.kms_key_id.clone()),
            (None, Some(default)) => (default.sse_algorithm, default.kms_master_key_id.clone()),
            (None, None) => return Ok(Self::default()),
        };

        let context = kms_context(bucket, key);
        let (sse_type, key_name) = match algorithm {
            ServerSideEncryption::Aes256 => (SseType::S3, kms.key_id().to_owned()),
            ServerSideEncryption::AwsKms => (
                SseType::Kms,
                key_id.unwrap_or_else(|| kms.key_id().to_owned()),
            ),
        };
        let data_key = kms.generate_key(&key_name, &context).await?;
        Ok(Self {
            sse_type,
            key: Some(data_key.plaintext),
            stored_key: data_key.sealed,
            iv: random_iv(),
            kms_key_id: Some(key_name),
            customer_key_md5: None,
        })
    }

    /// Plan for an SSE-C write.
    #[must_use]
    pub fn for_customer(customer: &CustomerKey) -> Self {
        Self {
            sse_type: SseType::Customer,
            key: Some(customer.key),
            stored_key: customer.fingerprint(),
            iv: random_iv(),
            kms_key_id: None,
            customer_key_md5: Some(customer.key_md5.clone()),
        }
    }

    /// Encrypt `data` placed at `offset` of the object; plaintext plans pass
    /// the data through.
    pub fn seal_at(&self, offset: u64, data: &Bytes) -> Result<Bytes, CryptoError> {
        match &self.key {
            Some(key) => apply_at(key, &self.iv, offset, data),
            None => Ok(data.clone()),
        }
    }

    /// SSE headers to return for this plan.
    #[must_use]
    pub fn response(&self) -> SseResponse {
        sse_response(
            self.sse_type,
            self.kms_key_id.as_deref(),
            self.customer_key_md5.as_deref(),
        )
    }
}

/// Recover the data key of a stored object.
///
/// SSE-C objects need the same client key that wrote them; a missing or
/// different key is rejected.
pub async fn unlock(
    kms: &dyn Kms,
    sse_type: SseType,
    stored_key: &[u8],
    kms_key_id: Option<&str>,
    customer: &SseCustomerKey,
    bucket: &str,
    key: &str,
) -> S3ServiceResult<Option<[u8; KEY_LEN]>> {
    match sse_type {
        SseType::None => {
            if customer.is_present() {
                return Err(S3ServiceError::invalid_sse(
                    "the object was not encrypted with a customer key",
                ));
            }
            Ok(None)
        }
        SseType::Customer => {
            let supplied = CustomerKey::parse(customer)?.ok_or_else(|| {
                S3ServiceError::invalid_sse("the object is encrypted with a customer key")
            })?;
            if supplied.fingerprint() != stored_key {
                return Err(S3ServiceError::invalid_sse(
                    "the customer key does not match the object",
                ));
            }
            Ok(Some(supplied.key))
        }
        SseType::S3 | SseType::Kms => {
            let key_name = kms_key_id.unwrap_or_else(|| kms.key_id());
            let plaintext = kms
                .unseal_key(key_name, stored_key, &kms_context(bucket, key))
                .await?;
            Ok(Some(plaintext))
        }
    }
}

/// SSE response headers for a stored object.
#[must_use]
pub fn sse_response(
    sse_type: SseType,
    kms_key_id: Option<&str>,
    customer_key_md5: Option<&str>,
) -> SseResponse {
    match sse_type {
        SseType::None => SseResponse::default(),
        SseType::S3 => SseResponse {
            server_side_encryption: Some(ServerSideEncryption::Aes256),
            ..SseResponse::default()
        },
        SseType::Kms => SseResponse {
            server_side_encryption: Some(ServerSideEncryption::AwsKms),
            kms_key_id: kms_key_id.map(str::to_owned),
            ..SseResponse::default()
        },
        SseType::Customer => SseResponse {
            customer_algorithm: Some(CUSTOMER_ALGORITHM.to_owned()),
            customer_key_md5: customer_key_md5.map(str::to_owned),
            ..SseResponse::default()
        },
    }
}

/// A fresh random IV.
#[must_use]
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill(&mut iv);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LocalKms;

    fn customer_headers(key: &[u8; 32]) -> SseCustomerKey {
        SseCustomerKey {
            algorithm: Some("AES256".to_owned()),
            key: Some(BASE64_STANDARD.encode(key)),
            key_md5: Some(BASE64_STANDARD.encode(Md5::digest(key))),
        }
    }

    #[test]
    fn test_should_parse_valid_customer_key() {
        let parsed = CustomerKey::parse(&customer_headers(&[1u8; 32]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.key, [1u8; 32]);
        assert_eq!(parsed.fingerprint(), Sha256::digest([1u8; 32]).to_vec());
        assert!(CustomerKey::parse(&SseCustomerKey::default()).unwrap().is_none());
    }

    #[test]
    fn test_should_reject_bad_customer_headers() {
        let mut headers = customer_headers(&[1u8; 32]);
        headers.key_md5 = Some(BASE64_STANDARD.encode(Md5::digest(b"other")));
        assert!(matches!(
            CustomerKey::parse(&headers),
            Err(S3ServiceError::InvalidSseHeader { .. })
        ));

        let mut headers = customer_headers(&[1u8; 32]);
        headers.algorithm = Some("AES128".to_owned());
        assert!(CustomerKey::parse(&headers).is_err());

        let mut headers = customer_headers(&[1u8; 32]);
        headers.key = Some(BASE64_STANDARD.encode([1u8; 16]));
        assert!(CustomerKey::parse(&headers).is_err());
    }

    #[tokio::test]
    async fn test_should_plan_bucket_default_encryption() {
        let kms = LocalKms::from_config(Some("k")).unwrap();
        let default = ServerSideEncryptionConfiguration {
            sse_algorithm: ServerSideEncryption::Aes256,
            kms_master_key_id: None,
        };
        let plan = EncryptionPlan::for_write(&kms, &SseRequest::default(), Some(&default), "b", "o")
            .await
            .unwrap();
        assert_eq!(plan.sse_type, SseType::S3);
        assert_eq!(
            plan.response().server_side_encryption,
            Some(ServerSideEncryption::Aes256)
        );

        let key = unlock(
            &kms,
            plan.sse_type,
            &plan.stored_key,
            plan.kms_key_id.as_deref(),
            &SseCustomerKey::default(),
            "b",
            "o",
        )
        .await
        .unwrap();
        assert_eq!(key, plan.key);
    }

    #[tokio::test]
    async fn test_should_leave_plaintext_without_headers_or_default() {
        let kms = LocalKms::from_config(Some("k")).unwrap();
        let plan = EncryptionPlan::for_write(&kms, &SseRequest::default(), None, "b", "o")
            .await
            .unwrap();
        assert_eq!(plan.sse_type, SseType::None);
        let data = Bytes::from_static(b"plain");
        assert_eq!(plan.seal_at(0, &data).unwrap(), data);
    }

    #[tokio::test]
    async fn test_should_require_matching_customer_key_on_read() {
        let kms = LocalKms::from_config(Some("k")).unwrap();
        let request = SseRequest {
            customer: customer_headers(&[5u8; 32]),
            ..SseRequest::default()
        };
        let plan = EncryptionPlan::for_write(&kms, &request, None, "b", "o")
            .await
            .unwrap();
        assert_eq!(plan.sse_type, SseType::Customer);

        let missing = unlock(
            &kms,
            plan.sse_type,
            &plan.stored_key,
            None,
            &SseCustomerKey::default(),
            "b",
            "o",
        )
        .await;
        assert!(matches!(missing, Err(S3ServiceError::InvalidSseHeader { .. })));

        let wrong = unlock(
            &kms,
            plan.sse_type,
            &plan.stored_key,
            None,
            &customer_headers(&[6u8; 32]),
            "b",
            "o",
        )
        .await;
        assert!(matches!(wrong, Err(S3ServiceError::InvalidSseHeader { .. })));

        let right = unlock(
            &kms,
            plan.sse_type,
            &plan.stored_key,
            None,
            &customer_headers(&[5u8; 32]),
            "b",
            "o",
        )
        .await
        .unwrap();
        assert_eq!(right, Some([5u8; 32]));
    }
}
