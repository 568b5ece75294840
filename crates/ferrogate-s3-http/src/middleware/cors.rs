//! Cross-origin resource sharing against the bucket's CORS rules.
//!
//! Preflight (`OPTIONS`) requests are answered here and never reach the
//! inner stages. For other requests the matching rule's headers are added to
//! whatever response the inner stages produce.

use ferrogate_s3_core::cors::{CorsMatch, match_preflight, match_request};
use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use ferrogate_s3_model::types::CorsConfiguration;
use http::{HeaderMap, HeaderValue};

/// The parts of a preflight request rules are matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightRequest {
    /// `Origin`.
    pub origin: String,
    /// `Access-Control-Request-Method`.
    pub method: String,
    /// `Access-Control-Request-Headers`, split on commas.
    pub headers: Vec<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// The `Origin` of a cross-origin request.
#[must_use]
pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
    header(headers, "origin")
}

/// Read a preflight request.
///
/// # Errors
///
/// `InvalidRequest` when `Origin` or `Access-Control-Request-Method` is
/// missing.
pub fn parse_preflight(headers: &HeaderMap) -> Result<PreflightRequest, S3Error> {
    let (Some(origin), Some(method)) = (
        request_origin(headers),
        header(headers, "access-control-request-method"),
    ) else {
        return Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Insufficient information. Origin request header needed.",
        ));
    };
    let requested = headers
        .get_all("access-control-request-headers")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned)
        .collect();
    Ok(PreflightRequest {
        origin: origin.to_owned(),
        method: method.to_owned(),
        headers: requested,
    })
}

/// Answer a preflight: 200 with `Access-Control-*` headers when a rule
/// matches, a bare 200 otherwise.
#[must_use]
pub fn preflight_response<B: Default>(
    config: Option<&CorsConfiguration>,
    request: &PreflightRequest,
) -> http::Response<B> {
    let mut response = http::Response::new(B::default());
    if let Some(matched) =
        config.and_then(|c| match_preflight(c, &request.origin, &request.method, &request.headers))
    {
        set_headers(response.headers_mut(), &matched, &request.headers);
    }
    response
}

/// Add the headers of the rule matching `origin` and `method`, if any.
pub fn apply_actual(
    headers: &mut HeaderMap,
    config: Option<&CorsConfiguration>,
    origin: &str,
    method: &str,
) {
    if let Some(matched) = config.and_then(|c| match_request(c, origin, method)) {
        set_headers(headers, &matched, &[]);
    }
}

fn set_joined(headers: &mut HeaderMap, name: &'static str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    if let Ok(v) = HeaderValue::from_str(&values.join(", ")) {
        headers.insert(name, v);
    }
}

fn set_headers(headers: &mut HeaderMap, matched: &CorsMatch, requested_headers: &[String]) {
    if let Ok(v) = HeaderValue::from_str(&matched.allowed_origin) {
        headers.insert("access-control-allow-origin", v);
    }
    set_joined(headers, "access-control-allow-methods", &matched.allowed_methods);
    let wildcard = matched.allowed_headers.len() == 1 && matched.allowed_headers[0] == "*";
    if wildcard && !requested_headers.is_empty() {
        set_joined(headers, "access-control-allow-headers", requested_headers);
    } else {
        set_joined(headers, "access-control-allow-headers", &matched.allowed_headers);
    }
    set_joined(headers, "access-control-expose-headers", &matched.expose_headers);
    if let Some(max_age) = matched.max_age_seconds {
        headers.insert("access-control-max-age", HeaderValue::from(max_age));
    }
    if matched.allowed_origin != "*" {
        headers.insert(
            "access-control-allow-credentials",
            HeaderValue::from_static("true"),
        );
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::CorsRule;

    use super::*;

    fn config() -> CorsConfiguration {
        CorsConfiguration {
            rules: vec![CorsRule {
                allowed_origins: vec!["https://*.example.com".to_owned()],
                allowed_methods: vec!["GET".to_owned(), "PUT".to_owned()],
                allowed_headers: vec!["*".to_owned()],
                expose_headers: vec!["ETag".to_owned()],
                max_age_seconds: Some(300),
                ..CorsRule::default()
            }],
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (http::HeaderName::from_static(k), HeaderValue::from_static(v)))
            .collect()
    }

    #[test]
    fn test_should_require_origin_and_method_for_preflight() {
        let err = parse_preflight(&headers(&[("origin", "https://a.example.com")])).unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(parse_preflight(&headers(&[("access-control-request-method", "GET")])).is_err());
    }

    #[test]
    fn test_should_answer_matching_preflight() {
        let req = parse_preflight(&headers(&[
            ("origin", "https://a.example.com"),
            ("access-control-request-method", "PUT"),
            ("access-control-request-headers", "content-type, x-amz-date"),
        ]))
        .unwrap();
        assert_eq!(req.headers, vec!["content-type", "x-amz-date"]);
        let resp: http::Response<()> = preflight_response(Some(&config()), &req);
        let h = resp.headers();
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(h.get("access-control-allow-origin").unwrap(), "https://a.example.com");
        assert_eq!(h.get("access-control-allow-methods").unwrap(), "GET, PUT");
        assert_eq!(h.get("access-control-allow-headers").unwrap(), "content-type, x-amz-date");
        assert_eq!(h.get("access-control-max-age").unwrap(), "300");
    }

    #[test]
    fn test_should_answer_unmatched_preflight_without_cors_headers() {
        let req = PreflightRequest {
            origin: "https://evil.test".to_owned(),
            method: "GET".to_owned(),
            headers: vec![],
        };
        let resp: http::Response<()> = preflight_response(Some(&config()), &req);
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_should_decorate_actual_request() {
        let mut h = HeaderMap::new();
        apply_actual(&mut h, Some(&config()), "https://b.example.com", "GET");
        assert_eq!(h.get("access-control-expose-headers").unwrap(), "ETag");

        let mut h = HeaderMap::new();
        apply_actual(&mut h, Some(&config()), "https://b.example.com", "DELETE");
        assert!(h.is_empty());
    }
}
