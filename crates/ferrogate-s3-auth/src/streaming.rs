//! Decoding of `STREAMING-AWS4-HMAC-SHA256-PAYLOAD` bodies.
//!
//! The body is a sequence of chunks:
//!
//! ```text
//! hex(size);chunk-signature=<sig>\r\n
//! <size bytes>\r\n
//! ```
//!
//! terminated by a zero-size chunk. Each chunk signature chains from the
//! previous one, starting at the `Authorization` header signature:
//!
//! ```text
//! AWS4-HMAC-SHA256-PAYLOAD\n
//! <iso8601>\n
//! <scope>\n
//! <previous signature>\n
//! SHA256("")\n
//! SHA256(chunk)
//! ```

use bytes::{Buf, Bytes, BytesMut};
use subtle::ConstantTimeEq;

use crate::error::AuthError;
use crate::sigv4::{EMPTY_SHA256, compute_signature, hash_payload};

const CHUNK_ALGORITHM: &str = "AWS4-HMAC-SHA256-PAYLOAD";
const SIGNATURE_PREFIX: &str = "chunk-signature=";
/// Upper bound on a chunk header line.
const MAX_HEADER_LEN: usize = 4096;
/// Largest chunk size accepted, the single-request object limit (5 GiB).
pub const MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Signing state carried from the header verification into the body decoder.
#[derive(Clone)]
pub struct StreamingSeed {
    /// The derived SigV4 signing key.
    pub signing_key: Vec<u8>,
    /// The request timestamp in ISO 8601 basic form.
    pub timestamp: String,
    /// The credential scope string.
    pub scope: String,
    /// The `Authorization` header signature.
    pub seed_signature: String,
}

impl std::fmt::Debug for StreamingSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSeed")
            .field("timestamp", &self.timestamp)
            .field("scope", &self.scope)
            .field("seed_signature", &self.seed_signature)
            .finish_non_exhaustive()
    }
}

impl StreamingSeed {
    /// Signature of one chunk given the previous signature in the chain.
    #[must_use]
    pub fn chunk_signature(&self, previous: &str, chunk: &[u8]) -> String {
        let string_to_sign = format!(
            "{CHUNK_ALGORITHM}\n{}\n{}\n{previous}\n{EMPTY_SHA256}\n{}",
            self.timestamp,
            self.scope,
            hash_payload(chunk)
        );
        compute_signature(&self.signing_key, &string_to_sign)
    }
}

/// Incremental decoder that verifies each chunk and yields payload bytes.
///
/// Feed raw body bytes with [`ChunkedDecoder::push`] as they arrive; call
/// [`ChunkedDecoder::finish`] once the body ends.
#[derive(Debug)]
pub struct ChunkedDecoder {
    seed: StreamingSeed,
    previous_signature: String,
    buf: BytesMut,
    done: bool,
    decoded_len: u64,
    declared_len: Option<u64>,
}

impl ChunkedDecoder {
    /// Create a decoder for a body authenticated with `seed`.
    #[must_use]
    pub fn new(seed: StreamingSeed) -> Self {
        let previous_signature = seed.seed_signature.clone();
        Self {
            seed,
            previous_signature,
            buf: BytesMut::new(),
            done: false,
            decoded_len: 0,
            declared_len: None,
        }
    }

    /// Reject chunks that would carry the payload past `len` bytes, the
    /// `x-amz-decoded-content-length` of the request.
    #[must_use]
    pub fn with_declared_length(mut self, len: Option<u64>) -> Self {
        self.declared_len = len;
        self
    }

    /// Total payload bytes yielded so far.
    #[must_use]
    pub fn decoded_len(&self) -> u64 {
        self.decoded_len
    }

    /// Whether the terminating zero-size chunk has been seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes and return every complete, verified payload chunk.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedChunk`] on framing errors and
    /// [`AuthError::SignatureDoesNotMatch`] when a chunk signature is wrong.
    pub fn push(&mut self, input: &[u8]) -> Result<Vec<Bytes>, AuthError> {
        if self.done {
            if input.iter().all(|b| matches!(b, b'\r' | b'\n')) {
                return Ok(Vec::new());
            }
            return Err(AuthError::MalformedChunk("data after final chunk".to_owned()));
        }
        self.buf.extend_from_slice(input);

        let mut out = Vec::new();
        while !self.done {
            let Some(line_end) = find_crlf(&self.buf) else {
                if self.buf.len() > MAX_HEADER_LEN {
                    return Err(AuthError::MalformedChunk("chunk header too long".to_owned()));
                }
                break;
            };
            let (size, signature) = parse_chunk_header(&self.buf[..line_end])?;
            if let Some(declared) = self.declared_len {
                if self.decoded_len + size as u64 > declared {
                    return Err(AuthError::MalformedChunk(format!(
                        "chunk of {size} bytes exceeds the declared length {declared}"
                    )));
                }
            }
            let frame_len = line_end
                .checked_add(size)
                .and_then(|n| n.checked_add(4))
                .ok_or_else(|| AuthError::MalformedChunk(format!("chunk size {size} overflows")))?;
            if self.buf.len() < frame_len {
                break;
            }

            self.buf.advance(line_end + 2);
            let chunk = self.buf.split_to(size).freeze();
            if &self.buf[..2] != b"\r\n" {
                return Err(AuthError::MalformedChunk("missing chunk terminator".to_owned()));
            }
            self.buf.advance(2);

            let expected = self.seed.chunk_signature(&self.previous_signature, &chunk);
            if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
                return Err(AuthError::SignatureDoesNotMatch);
            }
            self.previous_signature = expected;

            if size == 0 {
                self.done = true;
            } else {
                self.decoded_len += size as u64;
                out.push(chunk);
            }
        }
        Ok(out)
    }

    /// Check that the body ended with the terminating chunk.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedChunk`] for a truncated body.
    pub fn finish(&self) -> Result<u64, AuthError> {
        if self.done {
            Ok(self.decoded_len)
        } else {
            Err(AuthError::MalformedChunk("body ended before final chunk".to_owned()))
        }
    }
}

/// Decode a fully collected streaming body whose payload is declared to be
/// `declared_len` bytes long.
///
/// # Errors
///
/// See [`ChunkedDecoder::push`] and [`ChunkedDecoder::finish`].
pub fn decode_streaming_body(
    seed: StreamingSeed,
    body: &[u8],
    declared_len: Option<u64>,
) -> Result<Bytes, AuthError> {
    let mut decoder = ChunkedDecoder::new(seed).with_declared_length(declared_len);
    let chunks = decoder.push(body)?;
    decoder.finish()?;
    let mut out = BytesMut::with_capacity(usize::try_from(decoder.decoded_len()).unwrap_or(0));
    for chunk in chunks {
        out.extend_from_slice(&chunk);
    }
    Ok(out.freeze())
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn parse_chunk_header(line: &[u8]) -> Result<(usize, String), AuthError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| AuthError::MalformedChunk("chunk header is not UTF-8".to_owned()))?;
    let (size_hex, rest) = line
        .split_once(';')
        .ok_or_else(|| AuthError::MalformedChunk(format!("bad chunk header: {line}")))?;
    let size = u64::from_str_radix(size_hex.trim(), 16)
        .ok()
        .filter(|size| *size <= MAX_CHUNK_SIZE)
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| AuthError::MalformedChunk(format!("bad chunk size: {size_hex}")))?;
    let signature = rest
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| AuthError::MalformedChunk(format!("bad chunk header: {line}")))?;
    Ok((size, signature.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigv4::derive_signing_key;
    use crate::sigv4::tests::TEST_SECRET_KEY;

    fn seed() -> StreamingSeed {
        StreamingSeed {
            signing_key: derive_signing_key(TEST_SECRET_KEY, "20130524", "us-east-1", "s3"),
            timestamp: "20130524T000000Z".to_owned(),
            scope: "20130524/us-east-1/s3/aws4_request".to_owned(),
            seed_signature: "4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9"
                .to_owned(),
        }
    }

    fn encode(seed: &StreamingSeed, chunks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut previous = seed.seed_signature.clone();
        for chunk in chunks.iter().copied().chain(std::iter::once(&b""[..])) {
            let sig = seed.chunk_signature(&previous, chunk);
            out.extend_from_slice(format!("{:x};chunk-signature={sig}\r\n", chunk.len()).as_bytes());
            out.extend_from_slice(chunk);
            out.extend_from_slice(b"\r\n");
            previous = sig;
        }
        out
    }

    #[test]
    fn test_should_decode_verified_chunks() {
        let seed = seed();
        let big = vec![b'a'; 65536];
        let body = encode(&seed, &[big.as_slice(), &[b'a'; 1024][..]]);
        let decoded = decode_streaming_body(seed, &body, Some(65536 + 1024)).unwrap();
        assert_eq!(decoded.len(), 65536 + 1024);
        assert!(decoded.iter().all(|b| *b == b'a'));
    }

    #[test]
    fn test_should_decode_when_fed_byte_by_byte() {
        let seed = seed();
        let body = encode(&seed, &[&b"hello "[..], &b"world"[..]]);
        let mut decoder = ChunkedDecoder::new(seed);
        let mut payload = Vec::new();
        for b in &body {
            for chunk in decoder.push(std::slice::from_ref(b)).unwrap() {
                payload.extend_from_slice(&chunk);
            }
        }
        assert_eq!(decoder.finish().unwrap(), 11);
        assert_eq!(payload, b"hello world");
    }

    #[test]
    fn test_should_reject_tampered_chunk() {
        let seed = seed();
        let mut body = encode(&seed, &[&b"hello world"[..]]);
        let pos = body.windows(5).position(|w| w == b"hello").unwrap();
        body[pos] = b'j';
        assert!(matches!(
            decode_streaming_body(seed, &body, None),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_reject_truncated_body() {
        let seed = seed();
        let body = encode(&seed, &[&b"hello world"[..]]);
        let cut = body.len() - 90;
        assert!(matches!(
            decode_streaming_body(seed, &body[..cut], None),
            Err(AuthError::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_should_reject_bad_chunk_header() {
        assert!(parse_chunk_header(b"zz;chunk-signature=abc").is_err());
        assert!(parse_chunk_header(b"10").is_err());
        let (size, sig) = parse_chunk_header(b"400;chunk-signature=abc").unwrap();
        assert_eq!(size, 1024);
        assert_eq!(sig, "abc");
    }

    #[test]
    fn test_should_reject_oversized_chunk_sizes() {
        let sig = "0".repeat(64);
        for size in ["ffffffffffffffff", "140000001", "fffffffffffffffffff"] {
            let body = format!("{size};chunk-signature={sig}\r\nhello\r\n");
            let mut decoder = ChunkedDecoder::new(seed());
            assert!(
                matches!(decoder.push(body.as_bytes()), Err(AuthError::MalformedChunk(_))),
                "size {size} was accepted"
            );
            assert!(matches!(
                decode_streaming_body(seed(), body.as_bytes(), None),
                Err(AuthError::MalformedChunk(_))
            ));
        }
        // 5 GiB itself is a valid size; the body simply is not complete yet.
        let body = format!("140000000;chunk-signature={sig}\r\nhello");
        assert!(ChunkedDecoder::new(seed()).push(body.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_should_reject_chunks_beyond_declared_length() {
        let seed = seed();
        let body = encode(&seed, &[&b"hello "[..], &b"world"[..]]);
        assert!(matches!(
            decode_streaming_body(seed.clone(), &body, Some(6)),
            Err(AuthError::MalformedChunk(_))
        ));
        assert_eq!(decode_streaming_body(seed, &body, Some(11)).unwrap().as_ref(), b"hello world");
    }
}
