//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
    use md5::{Digest, Md5};

    use crate::{cleanup_bucket, create_test_bucket, error_code, s3_client};

    const MIB: usize = 1024 * 1024;

    async fn upload_parts(
        client: &aws_sdk_s3::Client,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[Vec<u8>],
    ) -> CompletedMultipartUpload {
        let mut completed = CompletedMultipartUpload::builder();
        for (index, data) in parts.iter().enumerate() {
            let number = i32::try_from(index + 1).unwrap();
            let part = client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(number)
                .body(ByteStream::from(data.clone()))
                .send()
                .await
                .unwrap_or_else(|e| panic!("upload part {number}: {e}"));
            completed = completed.parts(
                CompletedPart::builder()
                    .part_number(number)
                    .e_tag(part.e_tag().unwrap_or_default())
                    .build(),
            );
        }
        completed.build()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_complete_six_mib_plus_one_upload() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "mpu").await;
        let key = "large.bin";

        let create = client
            .create_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .send()
            .await
            .expect("create_multipart_upload");
        let upload_id = create.upload_id().expect("upload_id");

        let parts = vec![vec![0xA5u8; 5 * MIB], vec![0x5Au8; MIB + 1]];
        let completed = upload_parts(&client, &bucket, key, upload_id, &parts).await;
        let done = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .expect("complete_multipart_upload");
        assert!(done.e_tag().is_some_and(|etag| etag.ends_with("-2\"")));

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key(key)
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.content_length(), Some(i64::try_from(6 * MIB + 1).unwrap()));
        let data = resp.body.collect().await.expect("collect body").into_bytes();
        let expected: Vec<u8> = parts.concat();
        assert_eq!(hex::encode(Md5::digest(&data)), hex::encode(Md5::digest(&expected)));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_small_non_final_part() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "small").await;
        let key = "small.bin";

        let create = client
            .create_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .send()
            .await
            .expect("create_multipart_upload");
        let upload_id = create.upload_id().expect("upload_id");

        let parts = vec![vec![1u8; 3 * MIB], vec![2u8; 3 * MIB]];
        let completed = upload_parts(&client, &bucket, key, upload_id, &parts).await;
        let err = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .expect_err("first part is below the minimum");
        assert_eq!(error_code(&err), Some("EntityTooSmall"));
        if let Some(body) = err.raw_response().and_then(|r| r.body().bytes()) {
            let body = String::from_utf8_lossy(body);
            assert!(body.contains("<ProposedSize>3145728</ProposedSize>"));
            assert!(body.contains("<MinSizeAllowed>5242880</MinSizeAllowed>"));
            assert!(body.contains("<PartNumber>1</PartNumber>"));
        }

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_abort_only_once() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "abort").await;

        let create = client
            .create_multipart_upload()
            .bucket(&bucket)
            .key("k")
            .send()
            .await
            .expect("create_multipart_upload");
        let upload_id = create.upload_id().expect("upload_id");

        client
            .abort_multipart_upload()
            .bucket(&bucket)
            .key("k")
            .upload_id(upload_id)
            .send()
            .await
            .expect("first abort");
        let err = client
            .abort_multipart_upload()
            .bucket(&bucket)
            .key("k")
            .upload_id(upload_id)
            .send()
            .await
            .expect_err("second abort");
        assert_eq!(error_code(&err), Some("NoSuchUpload"));

        cleanup_bucket(&client, &bucket).await;
    }
}
