//! Sequential, seekable stream over any `ReadAt`.

use std::io::SeekFrom;

use crate::ReadAt;

/// Turns a `ReadAt` into `std::io::Read + std::io::Seek`.
///
/// The channel owns its cursor; several channels over the same shared reader
/// advance independently. Reads are issued in chunks of at least the reader's
/// preferred minimum I/O size and buffered, so that small reads from a markup
/// parser do not turn into one storage request each.
pub struct ByteChannel<R> {
    inner: R,
    pos: u64,
    size: Option<u64>,
    buf: bytes::Bytes,
    buf_start: u64,
}

impl<R> ByteChannel<R> {
    pub fn new(inner: R) -> Self {
        Self::new_at_position(inner, 0)
    }

    pub fn new_at_position(inner: R, pos: u64) -> Self {
        Self {
            inner,
            pos,
            size: None,
            buf: bytes::Bytes::new(),
            buf_start: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn buffered(&self) -> &[u8] {
        let buf_end = self.buf_start + self.buf.len() as u64;
        if self.pos >= self.buf_start && self.pos < buf_end {
            &self.buf[(self.pos - self.buf_start) as usize..]
        } else {
            &[]
        }
    }
}

impl<R: ReadAt> ByteChannel<R> {
    fn size(&mut self) -> std::io::Result<u64> {
        match self.size {
            Some(size) => Ok(size),
            None => {
                let size = self.inner.size()?;
                self.size = Some(size);
                Ok(size)
            }
        }
    }

    fn fill(&mut self, hint: usize) -> std::io::Result<()> {
        let size = self.size()?;
        let chunk = self.inner.storage_profile().clamp_io_size(hint) as u64;
        let end = size.min(self.pos.saturating_add(chunk));
        self.buf = self.inner.read_at(self.pos..end)?;
        self.buf_start = self.pos;
        Ok(())
    }
}

impl<R: ReadAt> std::io::Read for ByteChannel<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() || self.pos >= self.size()? {
            return Ok(0);
        }
        if self.buffered().is_empty() {
            self.fill(buf.len())?;
        }
        let available = self.buffered();
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: ReadAt> std::io::Seek for ByteChannel<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let size = self.size()?;
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                return Ok(self.pos);
            }
            SeekFrom::End(offset) => (size, offset),
            SeekFrom::Current(offset) => (self.pos, offset),
        };
        self.pos = base.checked_add_signed(offset).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        Ok(self.pos)
    }
}
