//! Server-side encryption integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::ServerSideEncryption;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use md5::{Digest, Md5};

    use crate::{cleanup_bucket, create_test_bucket, error_code, s3_client};

    const PLAINTEXT: &[u8] = b"The quick brown fox jumps over the lazy dog";

    fn customer_key() -> (String, String) {
        let raw = [0x42u8; 32];
        (BASE64_STANDARD.encode(raw), BASE64_STANDARD.encode(Md5::digest(raw)))
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_read_customer_encrypted_range() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "ssec").await;
        let (key, key_md5) = customer_key();

        client
            .put_object()
            .bucket(&bucket)
            .key("secret")
            .body(ByteStream::from_static(PLAINTEXT))
            .sse_customer_algorithm("AES256")
            .sse_customer_key(&key)
            .sse_customer_key_md5(&key_md5)
            .send()
            .await
            .expect("put with SSE-C");

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("secret")
            .range("bytes=5-20")
            .sse_customer_algorithm("AES256")
            .sse_customer_key(&key)
            .sse_customer_key_md5(&key_md5)
            .send()
            .await
            .expect("ranged get with SSE-C");
        assert_eq!(resp.sse_customer_algorithm(), Some("AES256"));
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), &PLAINTEXT[5..=20]);

        let err = client
            .get_object()
            .bucket(&bucket)
            .key("secret")
            .send()
            .await
            .expect_err("key required");
        assert!(error_code(&err).is_some());

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_round_trip_gateway_managed_encryption() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "sses3").await;

        let put = client
            .put_object()
            .bucket(&bucket)
            .key("managed")
            .body(ByteStream::from_static(PLAINTEXT))
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .expect("put with SSE-S3");
        assert_eq!(put.server_side_encryption(), Some(&ServerSideEncryption::Aes256));

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("managed")
            .send()
            .await
            .expect("get SSE-S3 object");
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), PLAINTEXT);

        cleanup_bucket(&client, &bucket).await;
    }
}
