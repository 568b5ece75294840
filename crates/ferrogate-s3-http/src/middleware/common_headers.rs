//! Headers stamped on every response.

use http::HeaderValue;

/// `Server` header value.
pub const SERVER_NAME: &str = "Ferrogate";

/// Add `x-amz-request-id`, `x-amz-id-2`, `Server`, `Accept-Ranges`, `Vary`
/// and `Date` unless a stage already set them.
pub fn apply<B>(response: &mut http::Response<B>, request_id: &str, host_id: &str) {
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", v);
    }
    if let Ok(v) = HeaderValue::from_str(host_id) {
        headers.insert("x-amz-id-2", v);
    }
    headers.insert(http::header::SERVER, HeaderValue::from_static(SERVER_NAME));
    headers
        .entry(http::header::ACCEPT_RANGES)
        .or_insert(HeaderValue::from_static("bytes"));
    headers.append(http::header::VARY, HeaderValue::from_static("Origin"));
    if !headers.contains_key(http::header::DATE) {
        let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(v) = HeaderValue::from_str(&now) {
            headers.insert(http::header::DATE, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_stamp_common_headers() {
        let mut resp = http::Response::new(());
        apply(&mut resp, "req-1", "host-a");
        let h = resp.headers();
        assert_eq!(h.get("x-amz-request-id").unwrap(), "req-1");
        assert_eq!(h.get("x-amz-id-2").unwrap(), "host-a");
        assert_eq!(h.get("server").unwrap(), SERVER_NAME);
        assert_eq!(h.get("accept-ranges").unwrap(), "bytes");
        assert_eq!(h.get("vary").unwrap(), "Origin");
        assert!(h.contains_key("date"));
    }

    #[test]
    fn test_should_keep_existing_accept_ranges() {
        let mut resp = http::Response::builder()
            .header("accept-ranges", "none")
            .body(())
            .unwrap();
        apply(&mut resp, "r", "h");
        assert_eq!(resp.headers().get("accept-ranges").unwrap(), "none");
    }
}
