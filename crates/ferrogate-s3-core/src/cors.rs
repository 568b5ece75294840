//! CORS rule validation, matching and response header values.
//!
//! Rules live on the bucket record. Matching walks them in document order and
//! the first rule accepting both the origin and the method wins.

use ferrogate_s3_model::types::{CorsConfiguration, CorsRule};

use crate::error::{S3ServiceError, S3ServiceResult};

const ALLOWED_METHODS: [&str; 5] = ["GET", "PUT", "POST", "DELETE", "HEAD"];

/// Values for the `Access-Control-*` response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsMatch {
    /// `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
    /// `Access-Control-Allow-Methods`.
    pub allowed_methods: Vec<String>,
    /// `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<String>,
    /// `Access-Control-Expose-Headers`.
    pub expose_headers: Vec<String>,
    /// `Access-Control-Max-Age`.
    pub max_age_seconds: Option<u32>,
}

impl CorsMatch {
    fn from_rule(rule: &CorsRule, origin: &str) -> Self {
        Self {
            allowed_origin: resolve_origin(&rule.allowed_origins, origin),
            allowed_methods: rule.allowed_methods.clone(),
            allowed_headers: rule.allowed_headers.clone(),
            expose_headers: rule.expose_headers.clone(),
            max_age_seconds: rule.max_age_seconds,
        }
    }
}

/// Match an origin pattern: `*`, an exact origin, or one `*` standing for
/// any run of characters (`https://*.example.com`).
#[must_use]
pub fn match_origin(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once('*') {
        Some((head, tail)) => {
            origin.len() >= head.len() + tail.len()
                && origin.starts_with(head)
                && origin.ends_with(tail)
        }
        None => pattern == origin,
    }
}

fn resolve_origin(allowed_origins: &[String], origin: &str) -> String {
    if allowed_origins.iter().any(|o| o == "*") {
        "*".to_owned()
    } else {
        origin.to_owned()
    }
}

fn headers_allowed(allowed: &[String], requested: &[String]) -> bool {
    requested.iter().all(|req| {
        let req = req.to_ascii_lowercase();
        allowed
            .iter()
            .any(|pattern| match_origin(&pattern.to_ascii_lowercase(), &req))
    })
}

fn rule_accepts(rule: &CorsRule, origin: &str, method: &str) -> bool {
    rule.allowed_origins.iter().any(|p| match_origin(p, origin))
        && rule.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
}

/// Match an actual (non-preflight) request.
#[must_use]
pub fn match_request(config: &CorsConfiguration, origin: &str, method: &str) -> Option<CorsMatch> {
    config
        .rules
        .iter()
        .find(|rule| rule_accepts(rule, origin, method))
        .map(|rule| CorsMatch::from_rule(rule, origin))
}

/// Match a preflight request; the requested headers must all be allowed too.
#[must_use]
pub fn match_preflight(
    config: &CorsConfiguration,
    origin: &str,
    request_method: &str,
    request_headers: &[String],
) -> Option<CorsMatch> {
    config
        .rules
        .iter()
        .find(|rule| {
            rule_accepts(rule, origin, request_method)
                && headers_allowed(&rule.allowed_headers, request_headers)
        })
        .map(|rule| CorsMatch::from_rule(rule, origin))
}

/// Validate a configuration before storing it.
pub fn validate(config: &CorsConfiguration) -> S3ServiceResult<()> {
    if config.rules.is_empty() {
        return Err(invalid("CORS configuration must contain at least one rule"));
    }
    for rule in &config.rules {
        if rule.allowed_origins.is_empty() || rule.allowed_methods.is_empty() {
            return Err(invalid("each CORS rule needs AllowedOrigin and AllowedMethod"));
        }
        if let Some(origin) = rule.allowed_origins.iter().find(|o| o.matches('*').count() > 1) {
            return Err(invalid(format!("origin \"{origin}\" can not have more than one wildcard")));
        }
        if let Some(method) = rule
            .allowed_methods
            .iter()
            .find(|m| !ALLOWED_METHODS.contains(&m.as_str()))
        {
            return Err(invalid(format!("unsupported CORS method: {method}")));
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> S3ServiceError {
    S3ServiceError::InvalidCorsDocument {
        message: message.into(),
    }
}
