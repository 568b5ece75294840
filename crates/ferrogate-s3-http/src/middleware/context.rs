//! Builds the [`RequestContext`] handed to the gateway core.
//!
//! Besides identity and request id, the context carries the values bucket
//! policy conditions are evaluated against: request headers and query
//! parameters (raw and `s3:`-prefixed), the client address, and the
//! `aws:*` globals.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, Utc};
use ferrogate_s3_model::operations::S3Operation;
use ferrogate_s3_model::request::{Identity, RequestContext};
use ferrogate_s3_xml::{CreateBucketConfiguration, from_xml};

use crate::router::RoutingContext;

fn header<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_ip(candidate: &str) -> Option<IpAddr> {
    let candidate = candidate.trim().trim_matches('"');
    if let Ok(ip) = candidate.parse::<IpAddr>() {
        return Some(ip);
    }
    // `[v6]:port` or `v4:port`
    candidate.parse::<SocketAddr>().ok().map(|sa| sa.ip())
}

/// Client address: the first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the `for=` of `Forwarded`, then the peer address.
#[must_use]
pub fn source_ip(headers: &http::HeaderMap, remote: Option<SocketAddr>) -> Option<IpAddr> {
    header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(parse_ip)
        .or_else(|| header(headers, "x-real-ip").and_then(parse_ip))
        .or_else(|| {
            header(headers, "forwarded").and_then(|v| {
                v.split([';', ','])
                    .filter_map(|item| item.trim().split_once('='))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("for"))
                    .and_then(|(_, value)| parse_ip(value))
            })
        })
        .or_else(|| remote.map(|r| r.ip()))
}

/// Whether the client reached the gateway over TLS, as reported by the
/// fronting proxy.
#[must_use]
pub fn is_secure(headers: &http::HeaderMap) -> bool {
    header(headers, "x-forwarded-proto").is_some_and(|p| p.eq_ignore_ascii_case("https"))
        || header(headers, "forwarded").is_some_and(|v| v.to_ascii_lowercase().contains("proto=https"))
}

fn push(values: &mut HashMap<String, Vec<String>>, key: String, value: &str) {
    values.entry(key).or_default().push(value.to_owned());
}

/// Values consulted by bucket policy conditions.
#[must_use]
pub fn condition_values(
    parts: &http::request::Parts,
    routing: &RoutingContext,
    source_ip: Option<IpAddr>,
    body: &[u8],
    now: DateTime<Utc>,
) -> HashMap<String, Vec<String>> {
    let mut values = HashMap::new();

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            push(&mut values, name.as_str().to_owned(), value);
            push(&mut values, format!("s3:{}", name.as_str()), value);
        }
    }
    for (name, value) in &routing.query_params {
        push(&mut values, name.clone(), value);
        push(&mut values, format!("s3:{name}"), value);
    }

    if let Some(ip) = source_ip {
        push(&mut values, "aws:SourceIp".to_owned(), &ip.to_string());
    }
    if let Some(referer) = header(&parts.headers, "referer") {
        push(&mut values, "aws:Referer".to_owned(), referer);
    }
    if let Some(agent) = header(&parts.headers, "user-agent") {
        push(&mut values, "aws:UserAgent".to_owned(), agent);
    }
    let secure = if is_secure(&parts.headers) { "true" } else { "false" };
    push(&mut values, "aws:SecureTransport".to_owned(), secure);
    push(&mut values, "aws:CurrentTime".to_owned(), &now.to_rfc3339());
    push(&mut values, "aws:EpochTime".to_owned(), &now.timestamp().to_string());

    if routing.operation == S3Operation::CreateBucket && !body.is_empty() {
        if let Some(location) = from_xml::<CreateBucketConfiguration>(body)
            .ok()
            .and_then(|c| c.location_constraint)
        {
            push(&mut values, "s3:LocationConstraint".to_owned(), &location);
            push(&mut values, "LocationConstraint".to_owned(), &location);
        }
    }
    values
}

/// Assemble the context for one request.
#[must_use]
pub fn build(
    request_id: &str,
    parts: &http::request::Parts,
    routing: &RoutingContext,
    identity: Option<Identity>,
    remote: Option<SocketAddr>,
    body: &[u8],
) -> RequestContext {
    let ip = source_ip(&parts.headers, remote);
    RequestContext {
        request_id: request_id.to_owned(),
        identity,
        source_ip: ip.map(|ip| ip.to_string()),
        condition_values: condition_values(parts, routing, ip, body, Utc::now()),
        virtual_host: routing.virtual_host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> http::HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (http::HeaderName::from_static(k), http::HeaderValue::from_static(v)))
            .collect()
    }

    fn remote() -> Option<SocketAddr> {
        Some("192.0.2.9:5555".parse().unwrap())
    }

    #[test]
    fn test_should_prefer_forwarded_for_then_real_ip_then_peer() {
        let h = headers(&[("x-forwarded-for", "203.0.113.5, 10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(source_ip(&h, remote()).unwrap().to_string(), "203.0.113.5");

        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(source_ip(&h, remote()).unwrap().to_string(), "198.51.100.2");

        let h = headers(&[("forwarded", "for=\"[2001:db8::1]:4711\";proto=https")]);
        assert_eq!(source_ip(&h, remote()).unwrap().to_string(), "2001:db8::1");
        assert!(is_secure(&h));

        assert_eq!(source_ip(&http::HeaderMap::new(), remote()).unwrap().to_string(), "192.0.2.9");
    }

    #[test]
    fn test_should_collect_condition_values() {
        let (parts, ()) = http::Request::builder()
            .method("GET")
            .uri("/b?prefix=photos/")
            .header("referer", "https://shop.example.com/")
            .header("x-amz-acl", "private")
            .body(())
            .unwrap()
            .into_parts();
        let routing = RoutingContext {
            bucket: Some("b".to_owned()),
            key: None,
            operation: S3Operation::ListObjects,
            query_params: vec![("prefix".to_owned(), "photos/".to_owned())],
            virtual_host: false,
        };
        let ip = "203.0.113.5".parse().ok();
        let values = condition_values(&parts, &routing, ip, b"", Utc::now());
        assert_eq!(values["s3:prefix"], vec!["photos/"]);
        assert_eq!(values["prefix"], vec!["photos/"]);
        assert_eq!(values["aws:SourceIp"], vec!["203.0.113.5"]);
        assert_eq!(values["aws:Referer"], vec!["https://shop.example.com/"]);
        assert_eq!(values["s3:x-amz-acl"], vec!["private"]);
        assert_eq!(values["aws:SecureTransport"], vec!["false"]);
    }

    #[test]
    fn test_should_expose_create_bucket_location_constraint() {
        let (parts, ()) = http::Request::builder()
            .method("PUT")
            .uri("/b")
            .body(())
            .unwrap()
            .into_parts();
        let routing = RoutingContext {
            bucket: Some("b".to_owned()),
            key: None,
            operation: S3Operation::CreateBucket,
            query_params: vec![],
            virtual_host: false,
        };
        let body = b"<CreateBucketConfiguration><LocationConstraint>eu-west-1</LocationConstraint></CreateBucketConfiguration>";
        let ctx = build("r", &parts, &routing, None, None, body);
        assert_eq!(ctx.condition_values["s3:LocationConstraint"], vec!["eu-west-1"]);
        assert!(ctx.is_anonymous());
    }
}
