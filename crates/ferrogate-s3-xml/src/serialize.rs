//! S3 XML serialization: response bodies.
//!
//! Every type implements [`S3Serialize`] by writing its child elements; the root
//! element and namespace come from [`to_xml`].

use std::io::{self, Write};

use ferrogate_s3_model::output::{
    CompleteMultipartUploadOutput, CopyObjectOutput, CreateMultipartUploadOutput,
    DeleteObjectsOutput, GetAclOutput, GetBucketCorsOutput, GetBucketEncryptionOutput,
    GetBucketLifecycleOutput, GetBucketLocationOutput, GetBucketLoggingOutput,
    GetBucketVersioningOutput, GetBucketWebsiteOutput, ListBucketsOutput,
    ListMultipartUploadsOutput, ListObjectVersionsOutput, ListObjectsOutput, ListObjectsV2Output,
    ListPartsOutput, PostObjectOutput, UploadPartCopyOutput,
};
use ferrogate_s3_model::types::{
    AccessControlPolicy, CorsConfiguration, CorsRule, Grant, Grantee, LifecycleConfiguration,
    LifecycleRule, LoggingStatus, ObjectSummary, Owner, RoutingRule,
    ServerSideEncryptionConfiguration, WebsiteConfiguration,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Trait for serializing S3 types to XML.
///
/// Uses `io::Result` because `quick_xml::Writer` closures require it.
pub trait S3Serialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as a complete XML document rooted at `root_element`.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Format a timestamp as ISO 8601 with milliseconds and a `Z` suffix.
#[must_use]
pub fn format_timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_text<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&str>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, v)?;
    }
    Ok(())
}

fn write_bool<W: Write>(writer: &mut Writer<W>, tag: &str, value: bool) -> io::Result<()> {
    write_text_element(writer, tag, if value { "true" } else { "false" })
}

fn write_number<W: Write, N: ToString>(
    writer: &mut Writer<W>,
    tag: &str,
    value: N,
) -> io::Result<()> {
    write_text_element(writer, tag, &value.to_string())
}

fn write_optional_number<W: Write, N: ToString>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<N>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_number(writer, tag, v)?;
    }
    Ok(())
}

fn write_timestamp<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &chrono::DateTime<chrono::Utc>,
) -> io::Result<()> {
    write_text_element(writer, tag, &format_timestamp(value))
}

fn write_common_prefixes<W: Write>(writer: &mut Writer<W>, prefixes: &[String]) -> io::Result<()> {
    for prefix in prefixes {
        writer
            .create_element("CommonPrefixes")
            .write_inner_content(|w| write_text_element(w, "Prefix", prefix))?;
    }
    Ok(())
}

fn write_owner<W: Write>(writer: &mut Writer<W>, tag: &str, owner: &Owner) -> io::Result<()> {
    writer.create_element(tag).write_inner_content(|w| {
        write_text_element(w, "ID", &owner.id)?;
        write_text_element(w, "DisplayName", &owner.display_name)?;
        Ok(())
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

impl S3Serialize for Owner {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_owner(writer, "Owner", self)
    }
}

impl S3Serialize for Grant {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Grant").write_inner_content(|w| {
            let xsi_type = match &self.grantee {
                Grantee::CanonicalUser { .. } => "CanonicalUser",
                Grantee::Group { .. } => "Group",
                Grantee::Email { .. } => "AmazonCustomerByEmail",
            };
            w.create_element("Grantee")
                .with_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"))
                .with_attribute(("xsi:type", xsi_type))
                .write_inner_content(|g| match &self.grantee {
                    Grantee::CanonicalUser { id, display_name } => {
                        write_text_element(g, "ID", id)?;
                        write_text_element(g, "DisplayName", display_name)
                    }
                    Grantee::Group { uri } => write_text_element(g, "URI", uri),
                    Grantee::Email { email } => write_text_element(g, "EmailAddress", email),
                })?;
            write_text_element(w, "Permission", self.permission.as_str())?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for AccessControlPolicy {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.owner.serialize_xml(writer)?;
        writer
            .create_element("AccessControlList")
            .write_inner_content(|w| {
                for grant in &self.grants {
                    grant.serialize_xml(w)?;
                }
                Ok(())
            })?;
        Ok(())
    }
}

impl S3Serialize for CorsRule {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("CORSRule").write_inner_content(|w| {
            write_optional_text(w, "ID", self.id.as_deref())?;
            for o in &self.allowed_origins {
                write_text_element(w, "AllowedOrigin", o)?;
            }
            for m in &self.allowed_methods {
                write_text_element(w, "AllowedMethod", m)?;
            }
            for h in &self.allowed_headers {
                write_text_element(w, "AllowedHeader", h)?;
            }
            for h in &self.expose_headers {
                write_text_element(w, "ExposeHeader", h)?;
            }
            write_optional_number(w, "MaxAgeSeconds", self.max_age_seconds)?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for CorsConfiguration {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for rule in &self.rules {
            rule.serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for LifecycleRule {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Rule").write_inner_content(|w| {
            write_optional_text(w, "ID", self.id.as_deref())?;
            if let Some(filter) = &self.filter {
                w.create_element("Filter").write_inner_content(|f| {
                    if filter.tags.is_empty() {
                        write_optional_text(f, "Prefix", filter.prefix.as_deref())
                    } else {
                        f.create_element("And").write_inner_content(|a| {
                            write_optional_text(a, "Prefix", filter.prefix.as_deref())?;
                            for tag in &filter.tags {
                                a.create_element("Tag").write_inner_content(|t| {
                                    write_text_element(t, "Key", &tag.key)?;
                                    write_text_element(t, "Value", &tag.value)
                                })?;
                            }
                            Ok(())
                        })?;
                        Ok(())
                    }
                })?;
            } else {
                write_optional_text(w, "Prefix", self.prefix.as_deref())?;
            }
            write_text_element(w, "Status", self.status.as_str())?;
            for t in &self.transitions {
                w.create_element("Transition").write_inner_content(|e| {
                    if let Some(date) = &t.date {
                        write_timestamp(e, "Date", date)?;
                    }
                    write_optional_number(e, "Days", t.days)?;
                    write_text_element(e, "StorageClass", t.storage_class.as_str())
                })?;
            }
            if let Some(exp) = &self.expiration {
                w.create_element("Expiration").write_inner_content(|e| {
                    if let Some(date) = &exp.date {
                        write_timestamp(e, "Date", date)?;
                    }
                    write_optional_number(e, "Days", exp.days)?;
                    if let Some(marker) = exp.expired_object_delete_marker {
                        write_bool(e, "ExpiredObjectDeleteMarker", marker)?;
                    }
                    Ok(())
                })?;
            }
            for t in &self.noncurrent_version_transitions {
                w.create_element("NoncurrentVersionTransition")
                    .write_inner_content(|e| {
                        write_number(e, "NoncurrentDays", t.noncurrent_days)?;
                        write_text_element(e, "StorageClass", t.storage_class.as_str())
                    })?;
            }
            if let Some(exp) = &self.noncurrent_version_expiration {
                w.create_element("NoncurrentVersionExpiration")
                    .write_inner_content(|e| write_number(e, "NoncurrentDays", exp.noncurrent_days))?;
            }
            if let Some(days) = self.abort_incomplete_multipart_upload_days {
                w.create_element("AbortIncompleteMultipartUpload")
                    .write_inner_content(|e| write_number(e, "DaysAfterInitiation", days))?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for LifecycleConfiguration {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for rule in &self.rules {
            rule.serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for RoutingRule {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("RoutingRule").write_inner_content(|w| {
            if let Some(cond) = &self.condition {
                w.create_element("Condition").write_inner_content(|c| {
                    write_optional_text(c, "KeyPrefixEquals", cond.key_prefix_equals.as_deref())?;
                    write_optional_number(
                        c,
                        "HttpErrorCodeReturnedEquals",
                        cond.http_error_code_returned_equals,
                    )
                })?;
            }
            let r = &self.redirect;
            w.create_element("Redirect").write_inner_content(|e| {
                write_optional_text(e, "HostName", r.host_name.as_deref())?;
                write_optional_number(e, "HttpRedirectCode", r.http_redirect_code)?;
                write_optional_text(e, "Protocol", r.protocol.as_deref())?;
                write_optional_text(e, "ReplaceKeyPrefixWith", r.replace_key_prefix_with.as_deref())?;
                write_optional_text(e, "ReplaceKeyWith", r.replace_key_with.as_deref())
            })?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for WebsiteConfiguration {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(redirect) = &self.redirect_all_requests_to {
            writer
                .create_element("RedirectAllRequestsTo")
                .write_inner_content(|w| {
                    write_text_element(w, "HostName", &redirect.host_name)?;
                    write_optional_text(w, "Protocol", redirect.protocol.as_deref())
                })?;
        }
        if let Some(suffix) = &self.index_document_suffix {
            writer
                .create_element("IndexDocument")
                .write_inner_content(|w| write_text_element(w, "Suffix", suffix))?;
        }
        if let Some(key) = &self.error_document_key {
            writer
                .create_element("ErrorDocument")
                .write_inner_content(|w| write_text_element(w, "Key", key))?;
        }
        if !self.routing_rules.is_empty() {
            writer
                .create_element("RoutingRules")
                .write_inner_content(|w| {
                    for rule in &self.routing_rules {
                        rule.serialize_xml(w)?;
                    }
                    Ok(())
                })?;
        }
        Ok(())
    }
}

impl S3Serialize for ServerSideEncryptionConfiguration {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Rule").write_inner_content(|w| {
            w.create_element("ApplyServerSideEncryptionByDefault")
                .write_inner_content(|d| {
                    write_text_element(d, "SSEAlgorithm", self.sse_algorithm.as_str())?;
                    write_optional_text(d, "KMSMasterKeyID", self.kms_master_key_id.as_deref())
                })?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for LoggingStatus {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(target) = &self.target_bucket {
            writer
                .create_element("LoggingEnabled")
                .write_inner_content(|w| {
                    write_text_element(w, "TargetBucket", target)?;
                    write_text_element(w, "TargetPrefix", self.target_prefix.as_deref().unwrap_or(""))
                })?;
        }
        Ok(())
    }
}

impl S3Serialize for ObjectSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Contents").write_inner_content(|w| {
            write_text_element(w, "Key", &self.key)?;
            write_timestamp(w, "LastModified", &self.last_modified)?;
            write_text_element(w, "ETag", &self.etag)?;
            write_number(w, "Size", self.size)?;
            write_text_element(w, "StorageClass", self.storage_class.as_str())?;
            if let Some(owner) = &self.owner {
                owner.serialize_xml(w)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

impl S3Serialize for ListBucketsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.owner.serialize_xml(writer)?;
        writer.create_element("Buckets").write_inner_content(|w| {
            for bucket in &self.buckets {
                w.create_element("Bucket").write_inner_content(|b| {
                    write_text_element(b, "Name", &bucket.name)?;
                    write_timestamp(b, "CreationDate", &bucket.creation_date)
                })?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ListObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", self.prefix.as_deref().unwrap_or(""))?;
        write_text_element(writer, "Marker", self.marker.as_deref().unwrap_or(""))?;
        write_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_optional_text(writer, "EncodingType", self.encoding_type.as_deref())?;
        write_optional_text(writer, "NextMarker", self.next_marker.as_deref())?;
        for obj in &self.contents {
            obj.serialize_xml(writer)?;
        }
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

impl S3Serialize for ListObjectsV2Output {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", self.prefix.as_deref().unwrap_or(""))?;
        write_number(writer, "KeyCount", self.key_count)?;
        write_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_optional_text(writer, "ContinuationToken", self.continuation_token.as_deref())?;
        write_optional_text(
            writer,
            "NextContinuationToken",
            self.next_continuation_token.as_deref(),
        )?;
        write_optional_text(writer, "StartAfter", self.start_after.as_deref())?;
        write_optional_text(writer, "EncodingType", self.encoding_type.as_deref())?;
        for obj in &self.contents {
            obj.serialize_xml(writer)?;
        }
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

impl S3Serialize for ListObjectVersionsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", self.prefix.as_deref().unwrap_or(""))?;
        write_text_element(writer, "KeyMarker", self.key_marker.as_deref().unwrap_or(""))?;
        write_text_element(
            writer,
            "VersionIdMarker",
            self.version_id_marker.as_deref().unwrap_or(""),
        )?;
        write_optional_text(writer, "NextKeyMarker", self.next_key_marker.as_deref())?;
        write_optional_text(
            writer,
            "NextVersionIdMarker",
            self.next_version_id_marker.as_deref(),
        )?;
        write_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_optional_text(writer, "EncodingType", self.encoding_type.as_deref())?;
        for v in &self.versions {
            let tag = if v.delete_marker { "DeleteMarker" } else { "Version" };
            writer.create_element(tag).write_inner_content(|w| {
                write_text_element(w, "Key", &v.key)?;
                write_text_element(w, "VersionId", &v.version_id)?;
                write_bool(w, "IsLatest", v.is_latest)?;
                write_timestamp(w, "LastModified", &v.last_modified)?;
                if !v.delete_marker {
                    write_text_element(w, "ETag", &v.etag)?;
                    write_number(w, "Size", v.size)?;
                    write_text_element(w, "StorageClass", v.storage_class.as_str())?;
                }
                v.owner.serialize_xml(w)
            })?;
        }
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

impl S3Serialize for ListMultipartUploadsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "KeyMarker", self.key_marker.as_deref().unwrap_or(""))?;
        write_text_element(
            writer,
            "UploadIdMarker",
            self.upload_id_marker.as_deref().unwrap_or(""),
        )?;
        write_optional_text(writer, "NextKeyMarker", self.next_key_marker.as_deref())?;
        write_optional_text(
            writer,
            "NextUploadIdMarker",
            self.next_upload_id_marker.as_deref(),
        )?;
        write_number(writer, "MaxUploads", self.max_uploads)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_optional_text(writer, "Prefix", self.prefix.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        for upload in &self.uploads {
            writer.create_element("Upload").write_inner_content(|w| {
                write_text_element(w, "Key", &upload.key)?;
                write_text_element(w, "UploadId", &upload.upload_id)?;
                write_owner(w, "Initiator", &upload.initiator)?;
                upload.owner.serialize_xml(w)?;
                write_text_element(w, "StorageClass", upload.storage_class.as_str())?;
                write_timestamp(w, "Initiated", &upload.initiated)
            })?;
        }
        write_common_prefixes(writer, &self.common_prefixes)
    }
}

impl S3Serialize for ListPartsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "UploadId", &self.upload_id)?;
        write_owner(writer, "Initiator", &self.initiator)?;
        self.owner.serialize_xml(writer)?;
        write_text_element(writer, "StorageClass", self.storage_class.as_str())?;
        write_number(writer, "PartNumberMarker", self.part_number_marker)?;
        write_number(writer, "NextPartNumberMarker", self.next_part_number_marker)?;
        write_number(writer, "MaxParts", self.max_parts)?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        for part in &self.parts {
            writer.create_element("Part").write_inner_content(|w| {
                write_number(w, "PartNumber", part.part_number)?;
                write_timestamp(w, "LastModified", &part.last_modified)?;
                write_text_element(w, "ETag", &part.etag)?;
                write_number(w, "Size", part.size)
            })?;
        }
        Ok(())
    }
}

impl S3Serialize for DeleteObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for deleted in &self.deleted {
            writer.create_element("Deleted").write_inner_content(|w| {
                write_text_element(w, "Key", &deleted.key)?;
                write_optional_text(w, "VersionId", deleted.version_id.as_deref())?;
                if deleted.delete_marker {
                    write_bool(w, "DeleteMarker", true)?;
                    write_optional_text(
                        w,
                        "DeleteMarkerVersionId",
                        deleted.delete_marker_version_id.as_deref(),
                    )?;
                }
                Ok(())
            })?;
        }
        for error in &self.errors {
            writer.create_element("Error").write_inner_content(|w| {
                write_text_element(w, "Key", &error.key)?;
                write_optional_text(w, "VersionId", error.version_id.as_deref())?;
                write_text_element(w, "Code", &error.code)?;
                write_text_element(w, "Message", &error.message)
            })?;
        }
        Ok(())
    }
}

impl S3Serialize for GetBucketVersioningOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_text(writer, "Status", self.status.as_ref().map(|s| s.as_str()))
    }
}

impl S3Serialize for GetBucketLocationOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(location) = &self.location_constraint {
            writer.write_event(Event::Text(BytesText::new(location)))?;
        }
        Ok(())
    }
}

impl S3Serialize for GetAclOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.policy.serialize_xml(writer)
    }
}

impl S3Serialize for GetBucketCorsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.cors_configuration.serialize_xml(writer)
    }
}

impl S3Serialize for GetBucketLifecycleOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.lifecycle_configuration.serialize_xml(writer)
    }
}

impl S3Serialize for GetBucketWebsiteOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.website_configuration.serialize_xml(writer)
    }
}

impl S3Serialize for GetBucketEncryptionOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.server_side_encryption_configuration
            .serialize_xml(writer)
    }
}

impl S3Serialize for GetBucketLoggingOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.bucket_logging_status.serialize_xml(writer)
    }
}

impl S3Serialize for CopyObjectOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_text_element(writer, "ETag", &self.etag)
    }
}

impl S3Serialize for UploadPartCopyOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_text_element(writer, "ETag", &self.etag)
    }
}

impl S3Serialize for CreateMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "UploadId", &self.upload_id)
    }
}

impl S3Serialize for CompleteMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Location", &self.location)?;
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "ETag", &self.etag)
    }
}

impl S3Serialize for PostObjectOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Location", &self.location)?;
        write_text_element(writer, "Bucket", &self.bucket)?;
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "ETag", &self.etag)
    }
}
