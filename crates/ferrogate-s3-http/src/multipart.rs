//! `multipart/form-data` parsing for browser form uploads (PostObject).
//!
//! Works on the already-collected body. Field names are re-keyed to their
//! canonical header form (`x-amz-meta-color` becomes `X-Amz-Meta-Color`) so
//! policy verification and input decoding look fields up one way.

use std::collections::HashMap;

use bytes::Bytes;
use ferrogate_s3_auth::canonicalize_form;
use ferrogate_s3_model::error::{S3Error, S3ErrorCode};

/// A parsed form submission.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// Non-file fields keyed by canonical name.
    pub fields: HashMap<String, String>,
    /// Payload of the file part.
    pub file_data: Bytes,
    /// `filename` of the file part, substituted for `${filename}` in the key.
    pub file_name: Option<String>,
    /// `Content-Type` of the file part.
    pub file_content_type: Option<String>,
}

fn malformed(message: impl Into<String>) -> S3Error {
    S3Error::with_message(S3ErrorCode::MalformedPOSTRequest, message)
}

/// Extract the boundary from `multipart/form-data; boundary=...`.
///
/// # Errors
///
/// `MalformedPOSTRequest` when the type is not `multipart/form-data` or has
/// no boundary.
pub fn extract_boundary(content_type: &str) -> Result<String, S3Error> {
    let mut params = content_type.split(';');
    let media = params.next().unwrap_or_default().trim();
    if !media.eq_ignore_ascii_case("multipart/form-data") {
        return Err(malformed(format!(
            "POST requires multipart/form-data, got: {content_type}"
        )));
    }
    params
        .filter_map(|p| p.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| malformed("missing boundary in Content-Type"))
}

/// Parse a form body. The first part carrying a `filename` is the file; all
/// other parts are fields.
///
/// # Errors
///
/// `MalformedPOSTRequest` when no part carries a file or a part has no name.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<MultipartForm, S3Error> {
    let delimiter = format!("--{boundary}");
    let mut raw_fields: Vec<(String, String)> = Vec::new();
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;

    for part in split_parts(body, delimiter.as_bytes()) {
        let Some((head, content)) = split_headers_body(part) else {
            return Err(malformed("form part without header separator"));
        };
        let head = String::from_utf8_lossy(head);
        let disposition = head
            .split("\r\n")
            .find_map(|line| header_value(line, "content-disposition"))
            .ok_or_else(|| malformed("form part without Content-Disposition"))?;
        let name = disposition_param(disposition, "name")
            .ok_or_else(|| malformed("form part without a name"))?;
        let filename = disposition_param(disposition, "filename");

        if filename.is_some() || name.eq_ignore_ascii_case("file") {
            if file.is_none() {
                let content_type = head
                    .split("\r\n")
                    .find_map(|line| header_value(line, "content-type"))
                    .map(str::to_owned);
                file = Some((Bytes::copy_from_slice(content), filename, content_type));
            }
        } else {
            raw_fields.push((name, String::from_utf8_lossy(content).into_owned()));
        }
    }

    let (file_data, file_name, file_content_type) =
        file.ok_or_else(|| malformed("the form has no file part"))?;
    Ok(MultipartForm {
        fields: canonicalize_form(raw_fields),
        file_data,
        file_name,
        file_content_type,
    })
}

/// Bodies of the parts between boundary lines; the preamble and epilogue are
/// dropped.
fn split_parts<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let Some(first) = find_bytes(body, delimiter) else {
        return parts;
    };
    let mut rest = &body[first + delimiter.len()..];
    loop {
        if rest.starts_with(b"--") {
            break;
        }
        rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        let Some(end) = find_bytes(rest, delimiter) else {
            break;
        };
        let part = &rest[..end];
        parts.push(part.strip_suffix(b"\r\n").unwrap_or(part));
        rest = &rest[end + delimiter.len()..];
    }
    parts
}

fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

/// Value of `name: value` when the line carries header `name`.
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

/// A `;`-separated parameter of a Content-Disposition value. Names match
/// whole, so `name` never matches inside `filename`.
fn disposition_param(disposition: &str, param: &str) -> Option<String> {
    disposition.split(';').skip(1).find_map(|item| {
        let (key, value) = item.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(param)
            .then(|| value.trim().trim_matches('"').to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn form_body(boundary: &str, fields: &[(&str, &str)], file: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    #[test]
    fn test_should_extract_boundary() {
        let b = extract_boundary("multipart/form-data; boundary=----WebKit7MA4").unwrap();
        assert_eq!(b, "----WebKit7MA4");
        let b = extract_boundary(r#"multipart/form-data; charset=utf-8; boundary="abc123""#).unwrap();
        assert_eq!(b, "abc123");
    }

    #[test]
    fn test_should_reject_non_multipart_content_type() {
        let err = extract_boundary("application/json").unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedPOSTRequest);
        assert!(extract_boundary("multipart/form-data").is_err());
    }

    #[test]
    fn test_should_parse_fields_and_file() {
        let body = form_body(
            "XyZ",
            &[("key", "uploads/${filename}"), ("x-amz-meta-color", "blue")],
            b"\x89PNG\r\n--not-a-boundary",
        );
        let form = parse_multipart(&body, "XyZ").unwrap();
        assert_eq!(form.fields.get("Key").map(String::as_str), Some("uploads/${filename}"));
        assert_eq!(form.fields.get("X-Amz-Meta-Color").map(String::as_str), Some("blue"));
        assert_eq!(form.file_data.as_ref(), b"\x89PNG\r\n--not-a-boundary");
        assert_eq!(form.file_name.as_deref(), Some("cat.png"));
        assert_eq!(form.file_content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_should_not_confuse_name_with_filename() {
        assert_eq!(
            disposition_param(r#"form-data; filename="a.txt"; name="file""#, "name").as_deref(),
            Some("file")
        );
    }

    #[test]
    fn test_should_require_file_part() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\nk\r\n--b--\r\n";
        let err = parse_multipart(body, "b").unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedPOSTRequest);
    }
}
