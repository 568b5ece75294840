/// S3 ListObjectsInput.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP query: `prefix`.
    pub prefix: Option<String>,
    /// HTTP query: `delimiter`.
    pub delimiter: Option<String>,
    /// HTTP query: `marker`.
    pub marker: Option<String>,
    /// HTTP query: `max-keys`.
    pub max_keys: Option<i32>,
    /// HTTP query: `encoding-type`.
    pub encoding_type: Option<String>,
}

/// S3 ListObjectsV2Input.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Input {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP query: `prefix`.
    pub prefix: Option<String>,
    /// HTTP query: `delimiter`.
    pub delimiter: Option<String>,
    /// HTTP query: `continuation-token`.
    pub continuation_token: Option<String>,
    /// HTTP query: `start-after`.
    pub start_after: Option<String>,
    /// HTTP query: `max-keys`.
    pub max_keys: Option<i32>,
    /// HTTP query: `fetch-owner`.
    pub fetch_owner: bool,
    /// HTTP query: `encoding-type`.
    pub encoding_type: Option<String>,
}

/// S3 ListObjectVersionsInput.
#[derive(Debug, Clone, Default)]
pub struct ListObjectVersionsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP query: `prefix`.
    pub prefix: Option<String>,
    /// HTTP query: `delimiter`.
    pub delimiter: Option<String>,
    /// HTTP query: `key-marker`.
    pub key_marker: Option<String>,
    /// HTTP query: `version-id-marker`.
    pub version_id_marker: Option<String>,
    /// HTTP query: `max-keys`.
    pub max_keys: Option<i32>,
    /// HTTP query: `encoding-type`.
    pub encoding_type: Option<String>,
}

/// S3 ListMultipartUploadsInput.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP query: `prefix`.
    pub prefix: Option<String>,
    /// HTTP query: `delimiter`.
    pub delimiter: Option<String>,
    /// HTTP query: `key-marker`.
    pub key_marker: Option<String>,
    /// HTTP query: `upload-id-marker`.
    pub upload_id_marker: Option<String>,
    /// HTTP query: `max-uploads`.
    pub max_uploads: Option<i32>,
}

/// S3 ListPartsInput.
#[derive(Debug, Clone, Default)]
pub struct ListPartsInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP query: `uploadId`.
    pub upload_id: String,
    /// HTTP query: `part-number-marker`.
    pub part_number_marker: Option<i32>,
    /// HTTP query: `max-parts`.
    pub max_parts: Option<i32>,
}
