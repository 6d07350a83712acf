use std::ops::Range;

use bytes::Bytes;

use crate::{ReadAt, StorageProfile};

/// A `ReadAt` adapter exposing one region of the underlying reader.
///
/// All reads are relative to the region start, and are clamped to the region end.
/// A region built from `start..end` over a 100-byte file therefore reports
/// `size() == end - start`, and `read_at(0..n)` reads `start..start + n` from the file.
pub struct SlicedReadAt<R> {
    inner: R,
    range: Range<u64>,
}

impl<R> SlicedReadAt<R> {
    /// # Panics
    ///
    /// Panics if `range.start > range.end`.
    pub fn new(inner: R, range: Range<u64>) -> Self {
        assert!(range.start <= range.end);
        Self { inner, range }
    }

    pub fn slice_size(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// The region within the underlying reader.
    pub fn slice_range(&self) -> Range<u64> {
        self.range.clone()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: ReadAt> SlicedReadAt<R> {
    /// Builds a region over `inner`, clamping an open end (or an end past the
    /// underlying size) to the size of `inner`.
    pub fn clamped(inner: R, start: u64, end: Option<u64>) -> std::io::Result<Self> {
        let size = inner.size()?;
        let end = end.map_or(size, |end| end.min(size));
        let start = start.min(end);
        Ok(Self::new(inner, start..end))
    }
}

impl<R: ReadAt> ReadAt for SlicedReadAt<R> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.slice_size())
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let end = std::cmp::min(self.slice_size(), range.end);
        if range.start >= end {
            return Ok(Bytes::new());
        }
        let inner_start = self.range.start.saturating_add(range.start);
        let inner_end = self.range.start.saturating_add(end);
        self.inner.read_at(inner_start..inner_end)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.inner.storage_profile()
    }
}

impl<R: Clone> Clone for SlicedReadAt<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            range: self.range.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_reads_are_relative() {
        let page = b"<l><w>alpha</w><w>beta</w></l>".to_vec();
        let region = SlicedReadAt::new(page, 3..15);
        assert_eq!(region.size().unwrap(), 12);
        assert_eq!(region.read_at(0..12).unwrap().as_ref(), b"<w>alpha</w>");
        assert_eq!(region.read_at(3..8).unwrap().as_ref(), b"alpha");
        assert_eq!(region.read_at(9..100).unwrap().as_ref(), b"w>");
        assert!(region.read_at(12..20).unwrap().is_empty());
    }

    #[test]
    fn test_clamped_region() {
        let page = b"0123456789".to_vec();
        let open = SlicedReadAt::clamped(page.clone(), 4, None).unwrap();
        assert_eq!(open.slice_range(), 4..10);
        let past_end = SlicedReadAt::clamped(page.clone(), 8, Some(50)).unwrap();
        assert_eq!(past_end.read_at(0..10).unwrap().as_ref(), b"89");
        let inverted = SlicedReadAt::clamped(page, 12, Some(3)).unwrap();
        assert_eq!(inverted.slice_size(), 0);
    }

    #[test]
    #[should_panic]
    fn test_inverted_range_panics() {
        let _ = SlicedReadAt::new(vec![1u8, 2, 3], 2..1);
    }

    #[test]
    fn test_overflow_protection() {
        let region = SlicedReadAt::new(vec![1u8, 2, 3], (u64::MAX - 2)..u64::MAX);
        assert!(region.read_at(0..1).unwrap().is_empty());
    }
}
