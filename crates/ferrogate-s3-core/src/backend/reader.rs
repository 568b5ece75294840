//! Readers spanning several backend extents.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};

use super::BoxReader;

/// Reads a sequence of readers back to back.
pub struct ChainReader {
    readers: VecDeque<BoxReader>,
}

impl ChainReader {
    /// Chain `readers` in order.
    #[must_use]
    pub fn new(readers: impl IntoIterator<Item = BoxReader>) -> Self {
        Self {
            readers: readers.into_iter().collect(),
        }
    }

    /// Box the chain, or return the single reader unchanged.
    #[must_use]
    pub fn boxed(mut self) -> BoxReader {
        if self.readers.len() == 1 {
            if let Some(reader) = self.readers.pop_front() {
                return reader;
            }
        }
        Box::pin(self)
    }
}

impl std::fmt::Debug for ChainReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainReader")
            .field("remaining_readers", &self.readers.len())
            .finish()
    }
}

impl AsyncRead for ChainReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while let Some(front) = this.readers.front_mut() {
            let before = buf.filled().len();
            ready!(front.as_mut().poll_read(cx, buf))?;
            if buf.filled().len() > before || buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }
            this.readers.pop_front();
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn reader(data: &'static [u8]) -> BoxReader {
        Box::pin(std::io::Cursor::new(data))
    }

    #[tokio::test]
    async fn test_should_read_readers_in_order() {
        let mut chain = ChainReader::new(vec![reader(b"hello "), reader(b""), reader(b"world")]);
        let mut out = Vec::new();
        chain.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_should_read_empty_chain() {
        let mut chain = ChainReader::new(Vec::new()).boxed();
        let mut out = Vec::new();
        chain.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
