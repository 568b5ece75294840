//! Versioning integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};

    use crate::{cleanup_bucket, create_test_bucket, error_code, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_keep_versions_behind_delete_marker() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "versions").await;

        client
            .put_bucket_versioning()
            .bucket(&bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
            .expect("enable versioning");

        let first = client
            .put_object()
            .bucket(&bucket)
            .key("doc")
            .body(ByteStream::from_static(b"v1"))
            .send()
            .await
            .expect("put v1");
        let second = client
            .put_object()
            .bucket(&bucket)
            .key("doc")
            .body(ByteStream::from_static(b"v2"))
            .send()
            .await
            .expect("put v2");
        let v1 = first.version_id().expect("version id").to_owned();
        assert_ne!(Some(v1.as_str()), second.version_id());

        let deleted = client
            .delete_object()
            .bucket(&bucket)
            .key("doc")
            .send()
            .await
            .expect("delete latest");
        assert_eq!(deleted.delete_marker(), Some(true));
        let marker = deleted.version_id().expect("marker version").to_owned();

        let err = client
            .get_object()
            .bucket(&bucket)
            .key("doc")
            .send()
            .await
            .expect_err("latest is a delete marker");
        assert_eq!(error_code(&err), Some("NoSuchKey"));

        let old = client
            .get_object()
            .bucket(&bucket)
            .key("doc")
            .version_id(&v1)
            .send()
            .await
            .expect("get v1");
        let data = old.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"v1");

        let err = client
            .get_object()
            .bucket(&bucket)
            .key("doc")
            .version_id(&marker)
            .send()
            .await
            .expect_err("a delete marker has no content");
        assert_eq!(error_code(&err), Some("MethodNotAllowed"));

        let versions = client
            .list_object_versions()
            .bucket(&bucket)
            .send()
            .await
            .expect("list_object_versions");
        assert_eq!(versions.versions().len(), 2);
        assert_eq!(versions.delete_markers().len(), 1);

        cleanup_bucket(&client, &bucket).await;
    }
}
