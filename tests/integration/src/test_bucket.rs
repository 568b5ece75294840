//! Bucket integration tests.

#[cfg(test)]
mod tests {
    use crate::{create_test_bucket, error_code, s3_client, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_head_and_delete_bucket() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "crud").await;

        client.head_bucket().bucket(&bucket).send().await.expect("head_bucket");

        let listed = client.list_buckets().send().await.expect("list_buckets");
        assert!(listed.buckets().iter().any(|b| b.name() == Some(bucket.as_str())));

        client.delete_bucket().bucket(&bucket).send().await.expect("first delete");
        let err = client
            .delete_bucket()
            .bucket(&bucket)
            .send()
            .await
            .expect_err("second delete");
        assert_eq!(error_code(&err), Some("NoSuchBucket"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_bucket_location() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "location").await;

        let location = client
            .get_bucket_location()
            .bucket(&bucket)
            .send()
            .await
            .expect("get_bucket_location");
        assert_eq!(location.location_constraint().map(|c| c.as_str()), Some("us-east-1"));

        client.delete_bucket().bucket(&bucket).send().await.expect("delete_bucket");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_deleting_non_empty_bucket() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "notempty").await;

        client
            .put_object()
            .bucket(&bucket)
            .key("k")
            .body(aws_sdk_s3::primitives::ByteStream::from_static(b"x"))
            .send()
            .await
            .expect("put_object");

        let err = client
            .delete_bucket()
            .bucket(&bucket)
            .send()
            .await
            .expect_err("bucket still has objects");
        assert_eq!(error_code(&err), Some("BucketNotEmpty"));

        crate::cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_bucket() {
        let client = s3_client();
        let err = client
            .list_objects_v2()
            .bucket(test_bucket_name("absent"))
            .send()
            .await
            .expect_err("bucket does not exist");
        assert_eq!(error_code(&err), Some("NoSuchBucket"));
    }
}
