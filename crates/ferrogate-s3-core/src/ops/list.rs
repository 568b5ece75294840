//! List operation handlers.
//!
//! Implements `list_objects` (v1), `list_objects_v2`, and `list_object_versions`.
//! Common prefixes count toward the page size like keys do.

use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::input::{ListObjectVersionsInput, ListObjectsInput, ListObjectsV2Input};
use ferrogate_s3_model::output::{ListObjectVersionsOutput, ListObjectsOutput, ListObjectsV2Output};
use ferrogate_s3_model::request::{RequestContext, S3Request};
use ferrogate_s3_model::types::{ObjectSummary, ObjectVersionSummary, Permission};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::{BucketRecord, ListQuery, NULL_VERSION_ID, ObjectRecord, VersionQuery};
use crate::policy::{AclTarget, check_access};
use crate::provider::GatewayS3;
use crate::utils::{decode_continuation_token, encode_continuation_token};

/// Default and upper bound of every listing page.
const DEFAULT_MAX_KEYS: usize = 1000;

/// Characters `encoding-type=url` leaves alone.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Resolve a requested page size: absent means the default, larger values
/// are clamped and negative values are rejected.
pub(crate) fn page_size(requested: Option<i32>, name: &str) -> S3ServiceResult<usize> {
    match requested {
        None => Ok(DEFAULT_MAX_KEYS),
        Some(n) if n < 0 => Err(S3ServiceError::invalid_argument(format!(
            "Argument {name} must be an integer between 0 and 2147483647"
        ))),
        Some(n) => Ok(usize::try_from(n).unwrap_or(DEFAULT_MAX_KEYS).min(DEFAULT_MAX_KEYS)),
    }
}

/// Key encoding requested by `encoding-type`.
#[derive(Debug, Clone, Copy)]
struct KeyEncoding {
    url: bool,
}

impl KeyEncoding {
    fn parse(encoding_type: Option<&str>) -> S3ServiceResult<Self> {
        match encoding_type {
            None => Ok(Self { url: false }),
            Some(value) if value.eq_ignore_ascii_case("url") => Ok(Self { url: true }),
            Some(other) => Err(S3ServiceError::invalid_argument(format!(
                "Invalid Encoding Method specified in Request: {other}"
            ))),
        }
    }

    fn apply(self, value: String) -> String {
        if self.url {
            utf8_percent_encode(&value, KEY_ENCODE_SET).to_string()
        } else {
            value
        }
    }

    fn apply_opt(self, value: Option<String>) -> Option<String> {
        value.map(|v| self.apply(v))
    }

    fn apply_all(self, values: Vec<String>) -> Vec<String> {
        values.into_iter().map(|v| self.apply(v)).collect()
    }
}

fn summary(row: ObjectRecord, with_owner: bool, encoding: KeyEncoding) -> ObjectSummary {
    ObjectSummary {
        etag: row.quoted_etag(),
        key: encoding.apply(row.name),
        last_modified: row.last_modified,
        size: row.size,
        storage_class: row.storage_class,
        owner: with_owner.then_some(row.owner),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
impl GatewayS3 {
    async fn listable_bucket(&self, name: &str, ctx: &RequestContext) -> S3ServiceResult<BucketRecord> {
        let bucket = self.load_bucket(name).await?;
        check_access(
            &bucket,
            AclTarget::Bucket,
            Permission::Read,
            "s3:ListBucket",
            None,
            ctx,
        )?;
        Ok(bucket)
    }

    /// Handle `ListObjects` (v1).
    pub async fn handle_list_objects(
        &self,
        req: S3Request<ListObjectsInput>,
    ) -> Result<ListObjectsOutput, S3Error> {
        let S3Request { input, context } = req;
        let encoding = KeyEncoding::parse(input.encoding_type.as_deref())?;
        let max_keys = page_size(input.max_keys, "max-keys")?;
        let bucket = self.listable_bucket(&input.bucket, &context).await?;

        let page = self
            .meta
            .list_objects(
                &bucket.name,
                &ListQuery {
                    prefix: input.prefix.clone().unwrap_or_default(),
                    delimiter: input.delimiter.clone().unwrap_or_default(),
                    marker: input.marker.clone().unwrap_or_default(),
                    max_keys,
                },
            )
            .await?;

        // Without a delimiter v1 leaves NextMarker to the client.
        let next_marker = if input.delimiter.as_deref().is_some_and(|d| !d.is_empty()) {
            page.next_marker
        } else {
            None
        };
        debug!(bucket = %bucket.name, count = page.objects.len(), truncated = page.is_truncated, "list_objects completed");
        Ok(ListObjectsOutput {
            name: bucket.name,
            prefix: encoding.apply_opt(input.prefix),
            delimiter: encoding.apply_opt(input.delimiter),
            marker: encoding.apply_opt(input.marker),
            next_marker: encoding.apply_opt(next_marker),
            max_keys: max_keys as i32,
            is_truncated: page.is_truncated,
            contents: page
                .objects
                .into_iter()
                .map(|row| summary(row, true, encoding))
                .collect(),
            common_prefixes: encoding.apply_all(page.common_prefixes),
            encoding_type: input.encoding_type,
        })
    }

    /// Handle `ListObjectsV2`.
    ///
    /// The continuation token wins over `start-after` when both are given.
    pub async fn handle_list_objects_v2(
        &self,
        req: S3Request<ListObjectsV2Input>,
    ) -> Result<ListObjectsV2Output, S3Error> {
        let S3Request { input, context } = req;
        let encoding = KeyEncoding::parse(input.encoding_type.as_deref())?;
        let max_keys = page_size(input.max_keys, "max-keys")?;
        let bucket = self.listable_bucket(&input.bucket, &context).await?;

        let marker = match input.continuation_token.as_deref() {
            Some(token) => decode_continuation_token(token)?,
            None => input.start_after.clone().unwrap_or_default(),
        };
        let page = self
            .meta
            .list_objects(
                &bucket.name,
                &ListQuery {
                    prefix: input.prefix.clone().unwrap_or_default(),
                    delimiter: input.delimiter.clone().unwrap_or_default(),
                    marker,
                    max_keys,
                },
            )
            .await?;

        let key_count = page.objects.len() + page.common_prefixes.len();
        let next_continuation_token = page
            .next_marker
            .as_deref()
            .map(encode_continuation_token);
        debug!(bucket = %bucket.name, key_count, truncated = page.is_truncated, "list_objects_v2 completed");
        Ok(ListObjectsV2Output {
            name: bucket.name,
            prefix: encoding.apply_opt(input.prefix),
            delimiter: encoding.apply_opt(input.delimiter),
            continuation_token: input.continuation_token,
            next_continuation_token,
            start_after: encoding.apply_opt(input.start_after),
            max_keys: max_keys as i32,
            key_count: key_count as i32,
            is_truncated: page.is_truncated,
            contents: page
                .objects
                .into_iter()
                .map(|row| summary(row, input.fetch_owner, encoding))
                .collect(),
            common_prefixes: encoding.apply_all(page.common_prefixes),
            encoding_type: input.encoding_type,
        })
    }

    /// Handle `ListObjectVersions`.
    pub async fn handle_list_object_versions(
        &self,
        req: S3Request<ListObjectVersionsInput>,
    ) -> Result<ListObjectVersionsOutput, S3Error> {
        let S3Request { input, context } = req;
        let encoding = KeyEncoding::parse(input.encoding_type.as_deref())?;
        let max_keys = page_size(input.max_keys, "max-keys")?;
        if input.version_id_marker.is_some() && input.key_marker.is_none() {
            return Err(S3ServiceError::invalid_argument(
                "A version-id marker cannot be specified without a key marker.",
            )
            .into());
        }
        let bucket = self.listable_bucket(&input.bucket, &context).await?;

        let page = self
            .meta
            .list_versions(
                &bucket.name,
                &VersionQuery {
                    prefix: input.prefix.clone().unwrap_or_default(),
                    delimiter: input.delimiter.clone().unwrap_or_default(),
                    key_marker: input.key_marker.clone().unwrap_or_default(),
                    version_id_marker: input.version_id_marker.clone().unwrap_or_default(),
                    max_keys,
                },
            )
            .await?;

        let versions = page
            .versions
            .into_iter()
            .map(|(row, is_latest)| ObjectVersionSummary {
                version_id: row
                    .exposed_version_id()
                    .unwrap_or_else(|| NULL_VERSION_ID.to_owned()),
                key: encoding.apply(row.name.clone()),
                is_latest,
                delete_marker: row.delete_marker,
                last_modified: row.last_modified,
                etag: if row.delete_marker { String::new() } else { row.quoted_etag() },
                size: row.size,
                storage_class: row.storage_class,
                owner: row.owner,
            })
            .collect::<Vec<_>>();

        debug!(bucket = %bucket.name, count = versions.len(), truncated = page.is_truncated, "list_object_versions completed");
        Ok(ListObjectVersionsOutput {
            name: bucket.name,
            prefix: encoding.apply_opt(input.prefix),
            delimiter: encoding.apply_opt(input.delimiter),
            key_marker: encoding.apply_opt(input.key_marker),
            version_id_marker: input.version_id_marker,
            next_key_marker: encoding.apply_opt(page.next_key_marker),
            next_version_id_marker: page.next_version_id_marker,
            max_keys: max_keys as i32,
            is_truncated: page.is_truncated,
            versions,
            common_prefixes: encoding.apply_all(page.common_prefixes),
            encoding_type: input.encoding_type,
        })
    }
}
