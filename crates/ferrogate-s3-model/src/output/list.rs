use crate::types::{
    MultipartUploadSummary, ObjectSummary, ObjectVersionSummary, Owner, PartSummary, StorageClass,
};

/// S3 ListObjectsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOutput {
    /// Bucket name.
    pub name: String,
    /// Echoed prefix.
    pub prefix: Option<String>,
    /// Echoed delimiter.
    pub delimiter: Option<String>,
    /// Echoed marker.
    pub marker: Option<String>,
    /// Set when truncated.
    pub next_marker: Option<String>,
    /// Effective page size.
    pub max_keys: i32,
    /// More entries remain.
    pub is_truncated: bool,
    /// Objects in key order.
    pub contents: Vec<ObjectSummary>,
    /// Folded prefixes in key order.
    pub common_prefixes: Vec<String>,
    /// Echoed encoding type.
    pub encoding_type: Option<String>,
}

/// S3 ListObjectsV2Output.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Output {
    /// Bucket name.
    pub name: String,
    /// Echoed prefix.
    pub prefix: Option<String>,
    /// Echoed delimiter.
    pub delimiter: Option<String>,
    /// Echoed token.
    pub continuation_token: Option<String>,
    /// Token for the next page.
    pub next_continuation_token: Option<String>,
    /// Echoed start-after.
    pub start_after: Option<String>,
    /// Effective page size.
    pub max_keys: i32,
    /// Objects plus prefixes returned.
    pub key_count: i32,
    /// More entries remain.
    pub is_truncated: bool,
    /// Objects in key order.
    pub contents: Vec<ObjectSummary>,
    /// Folded prefixes in key order.
    pub common_prefixes: Vec<String>,
    /// Echoed encoding type.
    pub encoding_type: Option<String>,
}

/// S3 ListObjectVersionsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListObjectVersionsOutput {
    /// Bucket name.
    pub name: String,
    /// Echoed prefix.
    pub prefix: Option<String>,
    /// Echoed delimiter.
    pub delimiter: Option<String>,
    /// Echoed key marker.
    pub key_marker: Option<String>,
    /// Echoed version marker.
    pub version_id_marker: Option<String>,
    /// Key to resume from.
    pub next_key_marker: Option<String>,
    /// Version to resume from.
    pub next_version_id_marker: Option<String>,
    /// Effective page size.
    pub max_keys: i32,
    /// More entries remain.
    pub is_truncated: bool,
    /// Versions and delete markers, latest first within a key.
    pub versions: Vec<ObjectVersionSummary>,
    /// Folded prefixes.
    pub common_prefixes: Vec<String>,
    /// Echoed encoding type.
    pub encoding_type: Option<String>,
}

/// S3 ListMultipartUploadsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsOutput {
    /// Bucket name.
    pub bucket: String,
    /// Echoed prefix.
    pub prefix: Option<String>,
    /// Echoed delimiter.
    pub delimiter: Option<String>,
    /// Echoed key marker.
    pub key_marker: Option<String>,
    /// Echoed upload id marker.
    pub upload_id_marker: Option<String>,
    /// Key to resume from.
    pub next_key_marker: Option<String>,
    /// Upload id to resume from.
    pub next_upload_id_marker: Option<String>,
    /// Effective page size.
    pub max_uploads: i32,
    /// More entries remain.
    pub is_truncated: bool,
    /// Uploads in (key, upload id) order.
    pub uploads: Vec<MultipartUploadSummary>,
    /// Folded prefixes.
    pub common_prefixes: Vec<String>,
}

/// S3 ListPartsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListPartsOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload id.
    pub upload_id: String,
    /// Who started the upload.
    pub initiator: Owner,
    /// Future object owner.
    pub owner: Owner,
    /// Target storage class.
    pub storage_class: StorageClass,
    /// Echoed marker.
    pub part_number_marker: i32,
    /// Marker for the next page.
    pub next_part_number_marker: i32,
    /// Effective page size.
    pub max_parts: i32,
    /// More parts remain.
    pub is_truncated: bool,
    /// Parts in number order.
    pub parts: Vec<PartSummary>,
}
