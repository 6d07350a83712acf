//! I/O abstractions for OCR sources:
//! - `ReadAt`: positional reader with the ability to fetch a specified byte range from a file/blob.
//! - `SealingWrite`: sequential writer with a `seal()` operation, committing the write activity.
//!
//! Provides the building blocks a source reader composes into one logical byte space:
//! file-based and memory-based readers, slices (regions), padding and concatenation.

use std::{ops::Range, sync::Arc};

use bytes::Bytes;

pub mod concat;
pub mod file;
pub mod memory;
pub mod sliced_read;
pub mod utils;

pub use concat::{ConcatReadAt, PaddingReadAt};
pub use file::{FileReader, FileWriter};
pub use sliced_read::SlicedReadAt;
pub use utils::byte_channel::ByteChannel;

/// Random-access view of a source file, blob or buffer.
///
/// Shared between readers and prefetch threads, hence `Send + Sync`.
pub trait ReadAt: Send + Sync + 'static {
    /// Total size in bytes.
    fn size(&self) -> std::io::Result<u64>;

    /// Returns the bytes in `range`.
    ///
    /// The result is shorter than the range only when the range runs past the
    /// end of the object; a range starting at or past the end yields no bytes.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;

    fn storage_profile(&self) -> StorageProfile;
}

/// Append-only sink that is committed with `seal()`.
///
/// Page index files are produced through this trait, so the same writer code
/// targets local files, object stores and in-memory buffers.
pub trait SealingWrite: Send {
    /// Appends `buf`.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes and commits everything written so far. No writes may follow.
    fn seal(&mut self) -> std::io::Result<()>;

    fn storage_profile(&self) -> StorageProfile;
}

/// Request sizes a storage backend handles well.
///
/// Byte channels and the page cache warmer size their reads with it.
#[derive(Debug, Clone)]
pub struct StorageProfile {
    /// Smaller requests are dominated by round-trip time.
    pub min_io_size: usize,
    /// Larger requests gain nothing.
    pub max_io_size: usize,
}

impl StorageProfile {
    /// Clamps `size` into `min_io_size..=max_io_size`, never below 1.
    pub fn clamp_io_size(&self, size: usize) -> usize {
        let min = self.min_io_size.max(1).min(self.max_io_size);
        let max = self.max_io_size.max(1).max(min);
        size.clamp(min, max)
    }
}

impl Default for StorageProfile {
    fn default() -> StorageProfile {
        Self {
            min_io_size: 4 * 1024,
            max_io_size: 4 * 1024 * 1024,
        }
    }
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.as_ref().read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}

impl<T> SealingWrite for Box<T>
where
    T: SealingWrite + ?Sized,
{
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.as_mut().write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        self.as_mut().seal()
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}
