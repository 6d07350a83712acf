//! Concatenation of several readers into one contiguous logical byte space.

use std::{ops::Range, sync::Arc};

use bytes::{Bytes, BytesMut};

use crate::{ReadAt, StorageProfile, verify};

/// Presents an ordered list of readers as a single reader.
///
/// Part `i` occupies the logical range starting at the sum of the sizes of parts
/// `0..i`. Part sizes are captured at construction; the parts are expected to be
/// immutable for the lifetime of the concatenation.
#[derive(Clone)]
pub struct ConcatReadAt {
    parts: Vec<Part>,
    size: u64,
}

#[derive(Clone)]
struct Part {
    range: Range<u64>,
    reader: Arc<dyn ReadAt>,
}

impl ConcatReadAt {
    pub fn new(readers: Vec<Arc<dyn ReadAt>>) -> std::io::Result<ConcatReadAt> {
        let mut parts = Vec::with_capacity(readers.len());
        let mut pos = 0u64;
        for reader in readers {
            let size = reader.size()?;
            let end = pos.checked_add(size).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "concatenated size overflows u64",
                )
            })?;
            parts.push(Part {
                range: pos..end,
                reader,
            });
            pos = end;
        }
        Ok(ConcatReadAt { parts, size: pos })
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> &Arc<dyn ReadAt> {
        &self.parts[index].reader
    }

    /// Logical ranges of all parts, in order. Empty parts yield empty ranges.
    pub fn part_ranges(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.parts.iter().map(|p| p.range.clone())
    }

    /// Returns the index and logical range of the (non-empty) part containing `offset`.
    pub fn part_range(&self, offset: u64) -> Option<(usize, Range<u64>)> {
        let index = self.part_index(offset)?;
        Some((index, self.parts[index].range.clone()))
    }

    fn part_index(&self, offset: u64) -> Option<usize> {
        if offset >= self.size {
            return None;
        }
        let index = self.parts.partition_point(|p| p.range.end <= offset);
        (index < self.parts.len()).then_some(index)
    }
}

impl ReadAt for ConcatReadAt {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.size);
        let Some(mut index) = self.part_index(range.start) else {
            return Ok(Bytes::new());
        };
        if range.start >= end {
            return Ok(Bytes::new());
        }

        let first = &self.parts[index];
        if end <= first.range.end {
            let base = first.range.start;
            return first.reader.read_at(range.start - base..end - base);
        }

        let mut buf = BytesMut::with_capacity((end - range.start) as usize);
        let mut pos = range.start;
        while pos < end && index < self.parts.len() {
            let part = &self.parts[index];
            let part_end = end.min(part.range.end);
            if pos < part_end {
                let base = part.range.start;
                let bytes = part.reader.read_at(pos - base..part_end - base)?;
                if bytes.len() as u64 != part_end - pos {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                buf.extend_from_slice(&bytes);
                pos = part_end;
            }
            index += 1;
        }
        Ok(buf.freeze())
    }

    fn storage_profile(&self) -> StorageProfile {
        self.parts
            .first()
            .map(|p| p.reader.storage_profile())
            .unwrap_or_default()
    }
}

/// A reader of `len` repetitions of a fill byte.
///
/// Used to present gaps between source regions without touching storage.
#[derive(Debug, Clone)]
pub struct PaddingReadAt {
    len: u64,
    fill: u8,
}

impl PaddingReadAt {
    /// Padding made of ASCII spaces, which never forms or breaks a markup token.
    pub fn spaces(len: u64) -> PaddingReadAt {
        PaddingReadAt { len, fill: b' ' }
    }

    pub fn with_fill(len: u64, fill: u8) -> PaddingReadAt {
        PaddingReadAt { len, fill }
    }
}

impl ReadAt for PaddingReadAt {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.len);
        if range.start >= end {
            return Ok(Bytes::new());
        }
        Ok(Bytes::from(vec![self.fill; (end - range.start) as usize]))
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            ..Default::default()
        }
    }
}
