//! Gateway configuration.
//!
//! Provides [`GatewayConfig`], loaded once at start-up from environment
//! variables and shared read-only by every component afterwards.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Gateway configuration.
///
/// Every field has a default suitable for a single-node development gateway.
/// Values are read from the environment via [`GatewayConfig::from_env`].
///
/// # Examples
///
/// ```
/// use ferrogate_s3_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert_eq!(config.s3_domains, vec!["s3.localhost".to_owned()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Domains under which buckets are addressed as virtual hosts.
    #[builder(default = vec![String::from("s3.localhost")])]
    pub s3_domains: Vec<String>,

    /// Whether virtual-hosted-style addressing is enabled.
    #[builder(default = true)]
    pub s3_virtual_hosting: bool,

    /// Region reported by GetBucketLocation and used for new buckets.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Accept every request as the static credential without checking signatures.
    #[builder(default = false)]
    pub skip_signature_validation: bool,

    /// Access key of the built-in credential.
    #[builder(default = String::from("test"))]
    pub access_key: String,

    /// Secret key of the built-in credential.
    #[builder(default = String::from("test"))]
    #[serde(skip_serializing, default)]
    pub secret_key: String,

    /// Cap on concurrently executing requests; excess requests get `SlowDown`.
    #[builder(default = 1000)]
    pub max_concurrent_requests: usize,

    /// Per-request deadline in seconds.
    #[builder(default = 600)]
    pub request_timeout_secs: u64,

    /// Lifetime of metadata and credential cache entries in seconds.
    #[builder(default = 600)]
    pub cache_ttl_secs: u64,

    /// Backend cluster ids; one in-memory cluster is created per id.
    #[builder(default = vec![String::from("local")])]
    pub cluster_ids: Vec<String>,

    /// Smallest adaptive upload window in bytes.
    #[builder(default = 512 * 1024)]
    pub upload_min_window: usize,

    /// Largest adaptive upload window in bytes.
    #[builder(default = 8 * 1024 * 1024)]
    pub upload_max_window: usize,

    /// Expected backend throughput in bytes per second.
    #[builder(default = 64 * 1024 * 1024)]
    pub upload_expected_rate: u64,

    /// Base64 master key of the local KMS. A random key is generated when unset.
    #[builder(default)]
    #[serde(skip_serializing, default)]
    pub kms_master_key: Option<String>,

    /// Base64 key sealing `X-Amz-Security-Token` values. Tokens are rejected when unset.
    #[builder(default)]
    #[serde(skip_serializing, default)]
    pub sts_encryption_key: Option<String>,

    /// Operation names answered with `NotImplemented`.
    #[builder(default)]
    pub disabled_operations: Vec<String>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// `text` or `json`.
    #[builder(default = String::from("text"))]
    pub log_format: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8080"),
            s3_domains: vec![String::from("s3.localhost")],
            s3_virtual_hosting: true,
            region: String::from("us-east-1"),
            skip_signature_validation: false,
            access_key: String::from("test"),
            secret_key: String::from("test"),
            max_concurrent_requests: 1000,
            request_timeout_secs: 600,
            cache_ttl_secs: 600,
            cluster_ids: vec![String::from("local")],
            upload_min_window: 512 * 1024,
            upload_max_window: 8 * 1024 * 1024,
            upload_expected_rate: 64 * 1024 * 1024,
            kms_master_key: None,
            sts_encryption_key: None,
            disabled_operations: Vec::new(),
            log_level: String::from("info"),
            log_format: String::from("text"),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `S3_DOMAIN` | `s3.localhost` (comma-separated) |
    /// | `S3_VIRTUAL_HOSTING` | `true` |
    /// | `S3_REGION` | `us-east-1` |
    /// | `S3_SKIP_SIGNATURE_VALIDATION` | `false` |
    /// | `ACCESS_KEY` / `SECRET_KEY` | `test` / `test` |
    /// | `MAX_CONCURRENT_REQUESTS` | `1000` |
    /// | `REQUEST_TIMEOUT_SECS` | `600` |
    /// | `CACHE_TTL_SECS` | `600` |
    /// | `CLUSTER_IDS` | `local` |
    /// | `UPLOAD_MIN_WINDOW` / `UPLOAD_MAX_WINDOW` | `512KiB` / `8MiB` |
    /// | `UPLOAD_EXPECTED_RATE` | `64MiB` per second |
    /// | `KMS_MASTER_KEY` | random |
    /// | `STS_ENCRYPTION_KEY` | unset |
    /// | `DISABLED_OPERATIONS` | empty |
    /// | `LOG_LEVEL` / `LOG_FORMAT` | `info` / `text` |
    ///
    /// Unparseable numeric values keep their default.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrogate_s3_core::config::GatewayConfig;
    ///
    /// let config = GatewayConfig::from_env();
    /// assert!(!config.gateway_listen.is_empty());
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("S3_DOMAIN") {
            let domains = parse_list(&v);
            if !domains.is_empty() {
                config.s3_domains = domains;
            }
        }
        if let Ok(v) = std::env::var("S3_VIRTUAL_HOSTING") {
            config.s3_virtual_hosting = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("S3_REGION") {
            config.region = v;
        }
        if let Ok(v) = std::env::var("S3_SKIP_SIGNATURE_VALIDATION") {
            config.skip_signature_validation = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("ACCESS_KEY") {
            config.access_key = v;
        }
        if let Ok(v) = std::env::var("SECRET_KEY") {
            config.secret_key = v;
        }
        if let Ok(v) = std::env::var("MAX_CONCURRENT_REQUESTS") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_concurrent_requests = n;
            }
        }
        if let Ok(v) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.request_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CACHE_TTL_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.cache_ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CLUSTER_IDS") {
            let ids = parse_list(&v);
            if !ids.is_empty() {
                config.cluster_ids = ids;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_MIN_WINDOW") {
            if let Some(n) = parse_size(&v).and_then(|n| usize::try_from(n).ok()) {
                config.upload_min_window = n;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_MAX_WINDOW") {
            if let Some(n) = parse_size(&v).and_then(|n| usize::try_from(n).ok()) {
                config.upload_max_window = n;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_EXPECTED_RATE") {
            if let Some(n) = parse_size(&v) {
                config.upload_expected_rate = n;
            }
        }
        if let Ok(v) = std::env::var("KMS_MASTER_KEY") {
            config.kms_master_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = std::env::var("STS_ENCRYPTION_KEY") {
            config.sts_encryption_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = std::env::var("DISABLED_OPERATIONS") {
            config.disabled_operations = parse_list(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("LOG_FORMAT") {
            config.log_format = v;
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Split a comma-separated list, dropping blank entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse a byte size such as `524288`, `512KiB`, `8MiB` or `1G`.
fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let n: u64 = digits.parse().ok()?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        _ => return None,
    };
    n.checked_mul(multiplier)
}
