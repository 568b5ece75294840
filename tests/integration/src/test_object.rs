//! Object integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;

    use crate::{cleanup_bucket, create_test_bucket, error_code, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_and_get_hello_world() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "putget").await;

        let put = client
            .put_object()
            .bucket(&bucket)
            .key("hello.txt")
            .body(ByteStream::from_static(b"hello world"))
            .content_type("text/plain")
            .send()
            .await
            .expect("put_object");
        assert_eq!(put.e_tag(), Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""));

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("hello.txt")
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.content_length(), Some(11));
        assert_eq!(resp.e_tag(), Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""));
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"hello world");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_byte_range() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "range").await;

        client
            .put_object()
            .bucket(&bucket)
            .key("digits")
            .body(ByteStream::from_static(b"0123456789"))
            .send()
            .await
            .expect("put_object");

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("digits")
            .range("bytes=2-5")
            .send()
            .await
            .expect("ranged get");
        assert_eq!(resp.content_range(), Some("bytes 2-5/10"));
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"2345");

        let err = client
            .get_object()
            .bucket(&bucket)
            .key("digits")
            .range("bytes=20-30")
            .send()
            .await
            .expect_err("unsatisfiable range");
        assert_eq!(error_code(&err), Some("InvalidRange"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_copy_object_with_source_etag() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "copy").await;

        client
            .put_object()
            .bucket(&bucket)
            .key("src")
            .body(ByteStream::from_static(b"hello world"))
            .send()
            .await
            .expect("put_object");

        let copy = client
            .copy_object()
            .bucket(&bucket)
            .key("dst")
            .copy_source(format!("{bucket}/src"))
            .send()
            .await
            .expect("copy_object");
        let etag = copy.copy_object_result().and_then(|r| r.e_tag());
        assert_eq!(etag, Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""));

        let err = client
            .copy_object()
            .bucket(&bucket)
            .key("src")
            .copy_source(format!("{bucket}/src"))
            .send()
            .await
            .expect_err("copy onto itself without REPLACE");
        assert_eq!(error_code(&err), Some("InvalidRequest"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_missing_key_without_error() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "delmissing").await;

        client
            .delete_object()
            .bucket(&bucket)
            .key("never-written")
            .send()
            .await
            .expect("delete of a missing key succeeds");

        let err = client
            .get_object()
            .bucket(&bucket)
            .key("never-written")
            .send()
            .await
            .expect_err("get of a missing key");
        assert_eq!(error_code(&err), Some("NoSuchKey"));

        cleanup_bucket(&client, &bucket).await;
    }
}
