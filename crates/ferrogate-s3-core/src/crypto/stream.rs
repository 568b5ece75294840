//! AES-256-CTR keystream positioned by absolute object offset.
//!
//! The counter block is `iv (12 bytes) || u32_be(offset / 16)`, so any byte
//! of an object can be encrypted or decrypted independently of the others.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

use super::{BLOCK_SIZE, CryptoError, IV_LEN, KEY_LEN};

type Aes256Ctr = ctr::Ctr32BE<aes::Aes256>;

/// Build a cipher whose keystream starts at `offset`.
fn cipher_at(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], offset: u64) -> Result<Aes256Ctr, CryptoError> {
    let mut block = [0u8; 16];
    block[..IV_LEN].copy_from_slice(iv);
    let mut cipher = Aes256Ctr::new(key.into(), (&block).into());
    cipher
        .try_seek(offset)
        .map_err(|_| CryptoError::OffsetOutOfRange(offset))?;
    Ok(cipher)
}

/// Encrypt (or decrypt) `data` as the bytes at `offset` of an object.
pub fn apply_at(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    offset: u64,
    data: &[u8],
) -> Result<Bytes, CryptoError> {
    let mut out = data.to_vec();
    cipher_at(key, iv, offset)?.apply_keystream(&mut out);
    Ok(Bytes::from(out))
}

/// Round `offset` down to a cipher block boundary.
///
/// Returns the aligned offset and the number of leading bytes to discard.
#[must_use]
pub fn align_down(offset: u64) -> (u64, usize) {
    let aligned = offset - offset % BLOCK_SIZE;
    #[allow(clippy::cast_possible_truncation)]
    let skip = (offset - aligned) as usize;
    (aligned, skip)
}

/// IV of part `index` of an object whose base IV is `base`.
///
/// The index is folded into the last four IV bytes, which keeps the counter
/// spaces of different parts apart.
#[must_use]
pub fn derive_iv(base: &[u8; IV_LEN], index: u32) -> [u8; IV_LEN] {
    let mut iv = *base;
    let tail = u32::from_be_bytes([iv[8], iv[9], iv[10], iv[11]]) ^ index;
    iv[8..].copy_from_slice(&tail.to_be_bytes());
    iv
}

pin_project! {
    /// Decrypts a backend stream opened at a block-aligned offset.
    ///
    /// The first `skip` plaintext bytes are consumed and dropped so the
    /// caller sees the range it asked for.
    pub struct CtrReader<R> {
        #[pin]
        inner: R,
        cipher: Aes256Ctr,
        skip: usize,
    }
}

impl<R> CtrReader<R> {
    /// Wrap `inner`, whose first byte sits at `aligned_offset` of the object.
    pub fn new(
        inner: R,
        key: &[u8; KEY_LEN],
        iv: &[u8; IV_LEN],
        aligned_offset: u64,
        skip: usize,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            inner,
            cipher: cipher_at(key, iv, aligned_offset)?,
            skip,
        })
    }
}

impl<R> std::fmt::Debug for CtrReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrReader").field("skip", &self.skip).finish_non_exhaustive()
    }
}

impl<R: AsyncRead> AsyncRead for CtrReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let mut this = self.project();

        while *this.skip > 0 {
            let mut scratch = [0u8; 16];
            let want = (*this.skip).min(scratch.len());
            let mut head = ReadBuf::new(&mut scratch[..want]);
            ready!(this.inner.as_mut().poll_read(cx, &mut head))?;
            let n = head.filled().len();
            if n == 0 {
                return Poll::Ready(Ok(()));
            }
            this.cipher.apply_keystream(&mut scratch[..n]);
            *this.skip -= n;
        }

        let before = buf.filled().len();
        ready!(this.inner.as_mut().poll_read(cx, buf))?;
        this.cipher.apply_keystream(&mut buf.filled_mut()[before..]);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    const KEY: [u8; 32] = [7u8; 32];
    const IV: [u8; 12] = [3u8; 12];

    fn plaintext() -> Vec<u8> {
        (0u8..=200).collect()
    }

    #[test]
    fn test_should_encrypt_independently_of_chunking() {
        let data = plaintext();
        let whole = apply_at(&KEY, &IV, 0, &data).unwrap();
        let head = apply_at(&KEY, &IV, 0, &data[..37]).unwrap();
        let tail = apply_at(&KEY, &IV, 37, &data[37..]).unwrap();
        assert_eq!(&whole[..37], &head[..]);
        assert_eq!(&whole[37..], &tail[..]);
        assert_ne!(&whole[..], &data[..]);
    }

    #[test]
    fn test_should_align_offsets() {
        assert_eq!(align_down(0), (0, 0));
        assert_eq!(align_down(5), (0, 5));
        assert_eq!(align_down(32), (32, 0));
        assert_eq!(align_down(33), (32, 1));
    }

    #[test]
    fn test_should_derive_distinct_part_ivs() {
        assert_eq!(derive_iv(&IV, 0), IV);
        assert_ne!(derive_iv(&IV, 1), derive_iv(&IV, 2));
        assert_eq!(&derive_iv(&IV, 1)[..8], &IV[..8]);
    }

    async fn decrypt_range(start: u64, end: u64) -> Vec<u8> {
        let data = plaintext();
        let cipher = apply_at(&KEY, &IV, 0, &data).unwrap();
        let (aligned, skip) = align_down(start);
        #[allow(clippy::cast_possible_truncation)]
        let backend = std::io::Cursor::new(cipher.slice(aligned as usize..end as usize));
        let mut reader = CtrReader::new(backend, &KEY, &IV, aligned, skip).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_should_decrypt_aligned_range() {
        assert_eq!(decrypt_range(16, 48).await, plaintext()[16..48]);
    }

    #[tokio::test]
    async fn test_should_decrypt_unaligned_range() {
        assert_eq!(decrypt_range(5, 21).await, plaintext()[5..21]);
        assert_eq!(decrypt_range(131, 201).await, plaintext()[131..201]);
    }
}
