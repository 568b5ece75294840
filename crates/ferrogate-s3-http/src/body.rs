//! S3 response body supporting buffered, streamed and empty modes.
//!
//! - **Buffered**: XML payloads, error bodies and objects already in memory.
//! - **Stream**: object payloads produced by a reader, sent in chunks.
//! - **Empty**: 204 responses, HEAD responses and redirects.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use ferrogate_s3_model::output::ObjectBody;
use http_body_util::Full;
use tokio::io::{AsyncRead, ReadBuf};

const STREAM_CHUNK: usize = 64 * 1024;

/// S3 response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// Buffered body for small responses.
    Buffered(Full<Bytes>),
    /// Object payload read lazily from storage.
    Stream(ObjectStream),
    /// No body.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a buffered body from an XML byte vector.
    #[must_use]
    pub fn from_xml(xml: Vec<u8>) -> Self {
        Self::Buffered(Full::new(Bytes::from(xml)))
    }
}

impl From<ObjectBody> for S3ResponseBody {
    fn from(body: ObjectBody) -> Self {
        match body {
            ObjectBody::Bytes(data) if data.is_empty() => Self::Empty,
            ObjectBody::Bytes(data) => Self::from_bytes(data),
            ObjectBody::Reader { reader, length } => Self::Stream(ObjectStream::new(reader, length)),
        }
    }
}

/// A reader that must yield exactly `remaining` more bytes.
pub struct ObjectStream {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    remaining: u64,
    buf: Vec<u8>,
}

impl ObjectStream {
    /// Wrap `reader`, which must produce exactly `length` bytes.
    #[must_use]
    pub fn new(reader: Pin<Box<dyn AsyncRead + Send>>, length: u64) -> Self {
        Self {
            reader,
            remaining: length,
            buf: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStream")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl ObjectStream {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<std::io::Result<Bytes>>> {
        if self.remaining == 0 {
            return Poll::Ready(None);
        }
        let want = usize::try_from(self.remaining).map_or(STREAM_CHUNK, |r| r.min(STREAM_CHUNK));
        self.buf.resize(want, 0);
        let mut read_buf = ReadBuf::new(&mut self.buf);
        match self.reader.as_mut().poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => Poll::Ready(Some(Err(err))),
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    let missing = self.remaining;
                    self.remaining = 0;
                    return Poll::Ready(Some(Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("object stream ended {missing} bytes early"),
                    ))));
                }
                let chunk = Bytes::copy_from_slice(filled);
                self.remaining -= chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
        }
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Stream(stream) => stream
                .poll_chunk(cx)
                .map(|chunk| chunk.map(|res| res.map(http_body::Frame::data))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Stream(stream) => stream.remaining == 0,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Stream(stream) => http_body::SizeHint::with_exact(stream.remaining),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
