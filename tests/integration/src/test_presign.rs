//! Presigned URL integration tests.

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use aws_sdk_s3::presigning::PresigningConfig;
    use aws_sdk_s3::primitives::ByteStream;

    use crate::{cleanup_bucket, create_test_bucket, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_fresh_presigned_url() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign").await;
        client
            .put_object()
            .bucket(&bucket)
            .key("shared")
            .body(ByteStream::from_static(b"hello world"))
            .send()
            .await
            .expect("put_object");

        let presigned = client
            .get_object()
            .bucket(&bucket)
            .key("shared")
            .presigned(PresigningConfig::expires_in(Duration::from_secs(60)).unwrap())
            .await
            .expect("presign");
        let resp = reqwest::get(presigned.uri()).await.expect("GET presigned");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "hello world");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_expired_presigned_url() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "expired").await;

        // Signed 70 seconds ago with X-Amz-Expires=60.
        let config = PresigningConfig::builder()
            .start_time(SystemTime::now() - Duration::from_secs(70))
            .expires_in(Duration::from_secs(60))
            .build()
            .unwrap();
        let presigned = client
            .get_object()
            .bucket(&bucket)
            .key("shared")
            .presigned(config)
            .await
            .expect("presign");
        assert!(presigned.uri().contains("X-Amz-Expires=60"));

        let resp = reqwest::get(presigned.uri()).await.expect("GET presigned");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        assert!(resp.text().await.unwrap().contains("<Code>ExpiredToken</Code>"));

        cleanup_bucket(&client, &bucket).await;
    }
}
