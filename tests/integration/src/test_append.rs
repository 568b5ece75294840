//! Append and browser form upload integration tests.
//!
//! Both run anonymously against a `public-read-write` bucket so they can be
//! sent with a plain HTTP client.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::types::BucketCannedAcl;

    use crate::{cleanup_bucket, endpoint_url, s3_client, test_bucket_name};

    async fn public_bucket(client: &aws_sdk_s3::Client, prefix: &str) -> String {
        let name = test_bucket_name(prefix);
        client
            .create_bucket()
            .bucket(&name)
            .acl(BucketCannedAcl::PublicReadWrite)
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to create bucket {name}: {e}"));
        name
    }

    async fn append(
        http: &reqwest::Client,
        bucket: &str,
        position: u64,
        data: &'static [u8],
    ) -> reqwest::Response {
        http.post(format!("{}/{bucket}/log.txt?append&position={position}", endpoint_url()))
            .body(data)
            .send()
            .await
            .expect("append request")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_append_at_current_length() {
        let client = s3_client();
        let bucket = public_bucket(&client, "append").await;
        let http = reqwest::Client::new();

        let first = append(&http, &bucket, 0, b"abc").await;
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        assert_eq!(first.headers()["x-amz-next-append-position"], "3");

        let stale = append(&http, &bucket, 0, b"zzz").await;
        assert_eq!(stale.status(), reqwest::StatusCode::CONFLICT);
        assert!(stale.text().await.unwrap().contains("PositionNotEqualToLength"));

        let second = append(&http, &bucket, 3, b"def").await;
        assert_eq!(second.headers()["x-amz-next-append-position"], "6");

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("log.txt")
            .send()
            .await
            .expect("get_object");
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"abcdef");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_anonymous_form_upload() {
        let client = s3_client();
        let bucket = public_bucket(&client, "form").await;

        let boundary = "ferrogateboundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\nuploads/${{filename}}\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"success_action_status\"\r\n\r\n201\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nmeow\r\n--{boundary}--\r\n"
        );
        let resp = reqwest::Client::new()
            .post(format!("{}/{bucket}", endpoint_url()))
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(body)
            .send()
            .await
            .expect("form upload");
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        assert!(resp.text().await.unwrap().contains("<Key>uploads/cat.txt</Key>"));

        let object = client
            .get_object()
            .bucket(&bucket)
            .key("uploads/cat.txt")
            .send()
            .await
            .expect("get uploaded object");
        let data = object.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"meow");

        cleanup_bucket(&client, &bucket).await;
    }
}
