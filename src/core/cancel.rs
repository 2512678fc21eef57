//! Cooperative cancellation for a scan run

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marker error for work abandoned because the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scan cancelled")]
pub struct Cancelled;

/// Shared cancellation flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Reader that fails every read once the token is cancelled, so a decoder
/// pulling from it stops at its next read.
pub struct CancellableReader<R> {
    inner: R,
    token: CancelToken,
}

impl<R> CancellableReader<R> {
    pub fn new(inner: R, token: CancelToken) -> Self {
        Self { inner, token }
    }
}

impl<R: Read> Read for CancellableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::other(Cancelled));
        }
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for CancellableReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Test source that trips `token` on its first read and then serves the
/// rest in small chunks, so the cancel lands in the middle of a decode.
#[cfg(test)]
pub(crate) struct TrippingReader {
    inner: io::Cursor<Vec<u8>>,
    token: CancelToken,
}

#[cfg(test)]
impl TrippingReader {
    pub(crate) fn new(bytes: Vec<u8>, token: CancelToken) -> Self {
        Self {
            inner: io::Cursor::new(bytes),
            token,
        }
    }
}

#[cfg(test)]
impl Read for TrippingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(8);
        let read = self.inner.read(&mut buf[..len])?;
        self.token.cancel();
        Ok(read)
    }
}

#[cfg(test)]
impl Seek for TrippingReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
