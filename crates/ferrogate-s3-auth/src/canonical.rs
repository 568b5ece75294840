//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Query parameters are decoded and re-encoded so that clients using `+` for
//! spaces and clients using `%20` produce the same canonical form.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that must be percent-encoded: everything but the RFC 3986
/// unreserved set.
pub(crate) const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string.
///
/// `headers` must already hold the lowercase names listed in `signed_headers`
/// with their raw values; duplicates are joined with `,`.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host".to_owned(), "examplebucket.s3.amazonaws.com".to_owned())],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(String, String)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string, &[]);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by encoding each path segment; `/` is kept.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/a%20b/c d"), "/a%20b/c%20d");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a raw query string into `(name, value)` pairs.
///
/// `+` decodes to a space, matching HTML form encoding.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Build the canonical query string.
///
/// Parameters are decoded, sorted by name then value, and re-encoded with
/// spaces as `%20`. Parameters named in `exclude` are dropped; presigned
/// verification excludes `X-Amz-Signature`.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("b=2&a=1", &[]), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("k=a+b", &[]), "k=a%20b");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str, exclude: &[&str]) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = parse_query(query)
        .into_iter()
        .filter(|(k, _)| !exclude.contains(&k.as_str()))
        .collect();
    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block.
///
/// Only headers listed in `signed_headers` are included, sorted by name.
/// Values are trimmed and inner whitespace runs collapse to one space.
/// The result has no trailing newline.
#[must_use]
pub fn build_canonical_headers(headers: &[(String, String)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join signed header names with `;` in sorted order.
///
/// # Examples
///
/// ```
/// use ferrogate_s3_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Percent-encode with the SigV4 rules.
pub(crate) fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_should_encode_special_characters_in_path() {
        assert_eq!(build_canonical_uri("/hello world"), "/hello%20world");
        assert_eq!(build_canonical_uri("/dir/a+b"), "/dir/a%2Bb");
    }

    #[test]
    fn test_should_not_double_encode_path() {
        assert_eq!(build_canonical_uri("/photos/a%2Fb"), "/photos/a%2Fb");
    }

    #[test]
    fn test_should_reencode_query_with_spaces_as_percent_20() {
        assert_eq!(
            build_canonical_query_string("prefix=my+dir&delimiter=%2F", &[]),
            "delimiter=%2F&prefix=my%20dir"
        );
    }

    #[test]
    fn test_should_emit_empty_values_with_equals_sign() {
        assert_eq!(build_canonical_query_string("uploads", &[]), "uploads=");
        assert_eq!(build_canonical_query_string("acl=&b=1", &[]), "acl=&b=1");
    }

    #[test]
    fn test_should_exclude_named_parameters() {
        assert_eq!(
            build_canonical_query_string("X-Amz-Signature=abc&X-Amz-Date=1", &["X-Amz-Signature"]),
            "X-Amz-Date=1"
        );
    }

    #[test]
    fn test_should_normalize_raw_and_encoded_colons_identically() {
        assert_eq!(
            build_canonical_query_string("events=s3:ObjectCreated:*", &[]),
            build_canonical_query_string("events=s3%3AObjectCreated%3A%2A", &[])
        );
    }

    #[test]
    fn test_should_collapse_whitespace_and_join_duplicates() {
        let headers = pairs(&[
            ("Host", "  example.com  "),
            ("x-custom", "a   b   c"),
            ("x-custom", "d"),
        ]);
        let result = build_canonical_headers(&headers, &["host", "x-custom"]);
        assert_eq!(result, "host:example.com\nx-custom:a b c,d");
    }

    #[test]
    fn test_should_build_canonical_request_matching_aws_example() {
        use sha2::{Digest, Sha256};

        let headers = pairs(&[
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
            (
                "x-amz-content-sha256",
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
            ("x-amz-date", "20130524T000000Z"),
        ]);
        let signed_headers = ["host", "range", "x-amz-content-sha256", "x-amz-date"];

        let canonical = build_canonical_request(
            "GET",
            "/test.txt",
            "",
            &headers,
            &signed_headers,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );

        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        assert_eq!(
            hash,
            "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972"
        );
    }
}
