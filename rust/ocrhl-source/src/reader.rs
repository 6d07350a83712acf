//! Section-cached random access to the logical byte space of a source pointer.

use std::{cell::RefCell, ops::Range, sync::Arc};

use bytes::{Bytes, BytesMut};
use ocrhl_common::{error::Error, result::verify_range};
use ocrhl_io::{ByteChannel, ConcatReadAt, PaddingReadAt, ReadAt, SlicedReadAt};

use crate::{
    options::SourceReaderOptions,
    pointer::{FileSource, Region, SourcePointer},
    section::{CacheStats, Section, SectionCache},
};

/// Random access to an OCR document addressed by a `SourcePointer`.
///
/// All file sources (or their regions) are laid out back to back in one logical
/// byte space `[0, len())`. Reads go through a small cache of fixed-size sections.
/// Sections are aligned to the start of the segment (file, region or padding gap)
/// containing them and are clipped at its end, so a section never spans two files.
///
/// A reader is meant to be owned by a single request: the cache is not
/// synchronized, and methods take `&self` only so that several break locators can
/// share one reader.
pub struct SourceReader {
    pointer: SourcePointer,
    name: String,
    data: ConcatReadAt,
    segments: Vec<Segment>,
    len: u64,
    is_ascii: bool,
    options: SourceReaderOptions,
    cache: RefCell<SectionCache>,
}

/// Parts of `data`, one per region or padding gap.
#[derive(Debug, Clone, Copy)]
struct Segment {
    /// Index of the file source, `None` for padding.
    source: Option<usize>,
    physical_start: u64,
}

/// Physical position of a logical offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalLocation {
    /// Index of the file source within the pointer.
    pub source: usize,
    /// Byte offset within that file.
    pub offset: u64,
}

impl SourceReader {
    /// Builds a reader from already opened file sources, in pointer order.
    pub fn from_sources(
        pointer: SourcePointer,
        readers: Vec<Arc<dyn ReadAt>>,
        options: SourceReaderOptions,
    ) -> ocrhl_common::Result<SourceReader> {
        options.validate()?;
        if pointer.sources.len() != readers.len() {
            return Err(Error::invalid_arg(
                "readers",
                format!(
                    "{} readers for {} file sources",
                    readers.len(),
                    pointer.sources.len()
                ),
            ));
        }
        let name = pointer.to_string();

        let mut parts: Vec<Arc<dyn ReadAt>> = Vec::new();
        let mut segments = Vec::new();
        let mut cursor = 0u64;
        for (index, (source, reader)) in pointer.sources.iter().zip(readers).enumerate() {
            let size = reader.size().map_err(|e| Error::io(&source.path, e))?;
            if size == 0 {
                return Err(Error::empty_source(&source.path));
            }
            for region in effective_regions(source) {
                let end = region.end.unwrap_or(size);
                if end > size || region.start > end {
                    return Err(Error::malformed(
                        "region",
                        format!("{region} exceeds '{}' ({size} bytes)", source.path),
                    ));
                }
                let logical_start = region.start_offset.unwrap_or(cursor);
                if logical_start < cursor {
                    return Err(Error::malformed(
                        "region",
                        format!(
                            "start offset {logical_start} of {region} in '{}' overlaps data ending at {cursor}",
                            source.path
                        ),
                    ));
                }
                if logical_start > cursor {
                    parts.push(Arc::new(PaddingReadAt::spaces(logical_start - cursor)));
                    segments.push(Segment {
                        source: None,
                        physical_start: 0,
                    });
                }
                parts.push(Arc::new(SlicedReadAt::new(reader.clone(), region.start..end)));
                segments.push(Segment {
                    source: Some(index),
                    physical_start: region.start,
                });
                cursor = logical_start + (end - region.start);
            }
        }
        if cursor == 0 {
            return Err(Error::empty_source(name));
        }

        let data = ConcatReadAt::new(parts).map_err(|e| Error::io(&name, e))?;
        log::debug!(
            "opened source '{name}': {cursor} bytes in {} segments, section size {}",
            segments.len(),
            options.section_size
        );
        Ok(SourceReader {
            is_ascii: pointer.is_ascii(),
            pointer,
            name,
            data,
            segments,
            len: cursor,
            cache: RefCell::new(SectionCache::new(options.max_cached_sections)),
            options,
        })
    }

    /// A reader over a single in-memory or already opened source.
    pub fn from_reader(
        name: impl Into<String>,
        reader: Arc<dyn ReadAt>,
        options: SourceReaderOptions,
    ) -> ocrhl_common::Result<SourceReader> {
        Self::from_sources(
            SourcePointer::single(FileSource::new(name)),
            vec![reader],
            options,
        )
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn pointer(&self) -> &SourcePointer {
        &self.pointer
    }

    pub fn options(&self) -> &SourceReaderOptions {
        &self.options
    }

    pub fn section_size(&self) -> usize {
        self.options.section_size
    }

    /// Whether every file source is flagged as pure ASCII.
    pub fn is_ascii(&self) -> bool {
        self.is_ascii
    }

    /// Returns the section containing `offset`, reading it on a cache miss.
    pub fn get_ascii_section(&self, offset: u64) -> ocrhl_common::Result<Section> {
        let (_, segment) = self
            .data
            .part_range(offset)
            .ok_or_else(|| Error::out_of_bounds(offset, 1, self.len))?;
        let section_size = self.options.section_size as u64;
        let start = segment.start + (offset - segment.start) / section_size * section_size;
        let end = segment.end.min(start + section_size);

        if let Some(section) = self.cache.borrow_mut().get(start) {
            if section.contains(offset) {
                return Ok(section);
            }
            log::warn!(
                "section cache returned {:?} for offset {offset}, rereading",
                section.range()
            );
        }

        if let Some(deadline) = &self.options.deadline {
            deadline.check()?;
        }
        log::trace!("section cache miss: {start}..{end} of '{}'", self.name);
        let bytes = self
            .data
            .read_at(start..end)
            .map_err(|e| Error::io(&self.name, e))?;
        if bytes.len() as u64 != end - start {
            return Err(Error::io(
                &self.name,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read of {start}..{end}: {} bytes", bytes.len()),
                ),
            ));
        }
        let section = Section::new(start, bytes);
        self.cache.borrow_mut().insert(section.clone());
        Ok(section)
    }

    /// Raw bytes of `offset..offset + len`.
    pub fn read_bytes(&self, offset: u64, len: usize) -> ocrhl_common::Result<Bytes> {
        verify_range(offset, len as u64, self.len)?;
        if len == 0 {
            return Ok(Bytes::new());
        }
        let end = offset + len as u64;
        let first = self.get_ascii_section(offset)?;
        if end <= first.end {
            return Ok(first.slice(offset..end));
        }
        let mut buf = BytesMut::with_capacity(len);
        buf.extend_from_slice(&first.slice(offset..end));
        let mut pos = first.end;
        while pos < end {
            let section = self.get_ascii_section(pos)?;
            buf.extend_from_slice(&section.slice(pos..end));
            pos = section.end;
        }
        Ok(buf.freeze())
    }

    /// Reads `len` bytes as single-byte characters (each byte maps to the char
    /// with the same code point), without any alignment requirement.
    pub fn read_ascii_string(&self, offset: u64, len: usize) -> ocrhl_common::Result<String> {
        let bytes = self.read_bytes(offset, len)?;
        Ok(widen_bytes(&bytes))
    }

    /// Decodes the `len` bytes at `offset` as UTF-8.
    ///
    /// Decoding starts at exactly `offset`, so a start inside a multi-byte sequence
    /// yields replacement characters for the stray continuation bytes. A sequence cut
    /// off by the end of the range is dropped. Other malformed bytes are replaced
    /// with U+FFFD.
    pub fn read_utf8_string(&self, offset: u64, len: usize) -> ocrhl_common::Result<String> {
        let bytes = self.read_bytes(offset, len)?;
        if self.is_ascii {
            return Ok(widen_bytes(&bytes));
        }
        Ok(decode_utf8(&bytes))
    }

    /// A seekable stream over the whole logical byte space, bypassing the cache.
    pub fn byte_channel(&self) -> ByteChannel<ConcatReadAt> {
        ByteChannel::new(self.data.clone())
    }

    /// Maps a logical offset to its file source and physical offset.
    ///
    /// Returns `None` past the end or inside padding between regions.
    pub fn locate_physical(&self, offset: u64) -> Option<PhysicalLocation> {
        let (index, range) = self.data.part_range(offset)?;
        let segment = self.segments[index];
        segment.source.map(|source| PhysicalLocation {
            source,
            offset: segment.physical_start + (offset - range.start),
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    /// Logical ranges of the sections currently held in the cache.
    pub fn cached_sections(&self) -> Vec<Range<u64>> {
        self.cache.borrow().cached_ranges()
    }
}

impl std::fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceReader")
            .field("pointer", &self.name)
            .field("len", &self.len)
            .field("is_ascii", &self.is_ascii)
            .field("options", &self.options)
            .finish()
    }
}

fn effective_regions(source: &FileSource) -> Vec<Region> {
    if source.regions.is_empty() {
        vec![Region::new(0, None)]
    } else {
        source.regions.clone()
    }
}

fn widen_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf8(bytes: &[u8]) -> String {
    let end = complete_prefix_len(bytes);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Length of `bytes` without a trailing, incomplete (but so far valid) UTF-8 sequence.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let n = bytes.len();
    for back in 1..=n.min(3) {
        let b = bytes[n - back];
        if b & 0xc0 == 0x80 {
            continue;
        }
        let lead = n - back;
        return match std::str::from_utf8(&bytes[lead..]) {
            Err(e) if e.valid_up_to() == 0 && e.error_len().is_none() => lead,
            _ => n,
        };
    }
    n
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Seek, SeekFrom},
        sync::Arc,
        time::{Duration, Instant},
    };

    use bytes::Bytes;
    use ocrhl_common::{Deadline, error::ErrorKind};
    use ocrhl_io::ReadAt;

    use super::{PhysicalLocation, SourceReader, complete_prefix_len};
    use crate::{
        options::SourceReaderOptions,
        pointer::{FileSource, Region, SourcePointer},
    };

    const SPLICE: &str = "Grüße, 東京 😀!";

    fn mem(data: &'static [u8]) -> Arc<dyn ReadAt> {
        Arc::new(Bytes::from_static(data))
    }

    fn options(section_size: usize, capacity: usize) -> SourceReaderOptions {
        SourceReaderOptions::default()
            .with_section_size(section_size)
            .with_max_cached_sections(capacity)
    }

    #[test]
    fn test_single_source_sections_are_aligned() {
        let data: Vec<u8> = (0..200u8).collect();
        let reader =
            SourceReader::from_reader("mem", Arc::new(data), options(64, 4)).unwrap();
        assert_eq!(reader.len(), 200);
        for offset in [0, 1, 63, 64, 127, 128, 199] {
            let section = reader.get_ascii_section(offset).unwrap();
            assert_eq!(section.start % 64, 0);
            assert!(section.contains(offset));
            assert_eq!(section.bytes()[(offset - section.start) as usize], offset as u8);
        }
        assert_eq!(reader.get_ascii_section(199).unwrap().range(), 192..200);
        let err = reader.get_ascii_section(200).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfBounds { .. }));
    }

    #[test]
    fn test_sections_never_cross_file_boundaries() {
        let pointer = SourcePointer {
            sources: vec![FileSource::new("a"), FileSource::new("b")],
        };
        let reader = SourceReader::from_sources(
            pointer,
            vec![mem(&[b'a'; 100]), mem(&[b'b'; 50])],
            options(32, 10),
        )
        .unwrap();
        let ranges = [0u64, 32, 64, 96, 100, 132]
            .iter()
            .map(|&o| reader.get_ascii_section(o).unwrap().range())
            .collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..32, 32..64, 64..96, 96..100, 100..132, 132..150]);
        assert_eq!(reader.read_ascii_string(98, 4).unwrap(), "aabb");
    }

    #[test]
    fn test_regions_and_padding() {
        let source = FileSource::new("doc").with_regions(vec![
            Region::new(2, Some(5)),
            Region::new(10, Some(12)).with_start_offset(6),
            Region::new(14, None),
        ]);
        let reader = SourceReader::from_sources(
            SourcePointer::single(source),
            vec![mem(b"..<p>.....<l>.<w>")],
            options(16, 4),
        )
        .unwrap();
        assert_eq!(reader.len(), 11);
        assert_eq!(reader.read_ascii_string(0, 11).unwrap(), "<p>   <l<w>");
        assert_eq!(
            reader.locate_physical(0),
            Some(PhysicalLocation {
                source: 0,
                offset: 2
            })
        );
        assert_eq!(reader.locate_physical(4), None);
        assert_eq!(
            reader.locate_physical(7),
            Some(PhysicalLocation {
                source: 0,
                offset: 11
            })
        );
        assert_eq!(
            reader.locate_physical(8),
            Some(PhysicalLocation {
                source: 0,
                offset: 14
            })
        );
        assert_eq!(reader.locate_physical(11), None);
    }

    #[test]
    fn test_overlapping_start_offset_is_malformed() {
        let source = FileSource::new("doc").with_regions(vec![
            Region::new(0, Some(5)),
            Region::new(6, Some(8)).with_start_offset(3),
        ]);
        let err = SourceReader::from_sources(
            SourcePointer::single(source),
            vec![mem(b"0123456789")],
            Default::default(),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Malformed { .. }));
    }

    #[test]
    fn test_region_past_end_is_malformed() {
        let source = FileSource::new("doc").with_regions(vec![Region::new(0, Some(50))]);
        let err = SourceReader::from_sources(
            SourcePointer::single(source),
            vec![mem(b"0123456789")],
            Default::default(),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Malformed { .. }));
    }

    #[test]
    fn test_empty_source_fails_fast() {
        let err = SourceReader::from_reader("empty.xml", mem(b""), Default::default())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EmptySource { path } if path == "empty.xml"));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let err = SourceReader::from_reader("doc", mem(b"<alto/>"), options(4, 1)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_cache_evicts_least_recently_used_section() {
        let data: Vec<u8> = (0..=255u8).collect();
        let reader = SourceReader::from_reader("mem", Arc::new(data.clone()), options(16, 3))
            .unwrap();
        reader.get_ascii_section(0).unwrap();
        reader.get_ascii_section(64).unwrap();
        reader.get_ascii_section(128).unwrap();
        reader.get_ascii_section(5).unwrap();
        reader.get_ascii_section(192).unwrap();

        let mut cached = reader.cached_sections();
        cached.sort_by_key(|r| r.start);
        assert_eq!(cached, vec![0..16, 128..144, 192..208]);
        let stats = reader.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 4, 1));

        let reread = reader.get_ascii_section(70).unwrap();
        assert_eq!(reread.bytes().as_ref(), &data[64..80]);
        assert_eq!(reader.cache_stats().evictions, 2);
    }

    #[test]
    fn test_read_ascii_string_spans_sections() {
        let reader = SourceReader::from_reader(
            "mem",
            mem(b"<String CONTENT=\"caf\xe9\"/>"),
            options(16, 2),
        )
        .unwrap();
        assert_eq!(reader.read_ascii_string(8, 16).unwrap(), "CONTENT=\"café\"/>");
        assert_eq!(reader.read_ascii_string(0, 0).unwrap(), "");
        let err = reader.read_ascii_string(20, 10).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfBounds { .. }));
    }

    #[test]
    fn test_utf8_splice() {
        let reader = SourceReader::from_reader(
            "mem",
            Arc::new(Bytes::from_static(SPLICE.as_bytes())),
            options(18, 4),
        )
        .unwrap();
        assert_eq!(reader.len(), 21);

        assert_eq!(reader.read_utf8_string(0, 21).unwrap(), SPLICE);
        // end inside 'ü' truncates to the last complete char
        assert_eq!(reader.read_utf8_string(0, 3).unwrap(), "Gr");
        assert_eq!(reader.read_utf8_string(0, 4).unwrap(), "Grü");
        // start inside 'ü' is not adjusted
        assert_eq!(reader.read_utf8_string(3, 4).unwrap(), "\u{fffd}ße");
        assert_eq!(reader.read_utf8_string(9, 5).unwrap(), "東");
        assert_eq!(reader.read_utf8_string(16, 3).unwrap(), "");
        let tail = reader.read_utf8_string(17, 4).unwrap();
        assert!(tail.starts_with('\u{fffd}') && tail.ends_with('!'));
        // the emoji straddles the 18-byte section boundary
        assert_eq!(reader.read_utf8_string(15, 6).unwrap(), " 😀!");
    }

    #[test]
    fn test_utf8_invalid_bytes_do_not_fail() {
        let reader =
            SourceReader::from_reader("mem", mem(b"ab\xffcd\xc3"), Default::default()).unwrap();
        assert_eq!(reader.read_utf8_string(0, 6).unwrap(), "ab\u{fffd}cd");
    }

    #[test]
    fn test_ascii_flag_widens_bytes() {
        let source = FileSource::new("doc").with_ascii(true);
        let reader = SourceReader::from_sources(
            SourcePointer::single(source),
            vec![mem(b"<w>abc</w>")],
            Default::default(),
        )
        .unwrap();
        assert!(reader.is_ascii());
        assert_eq!(reader.read_utf8_string(3, 3).unwrap(), "abc");
    }

    #[test]
    fn test_byte_channel_reads_logical_space() {
        let pointer = SourcePointer {
            sources: vec![
                FileSource::new("a").with_regions(vec![Region::new(1, Some(3))]),
                FileSource::new("b"),
            ],
        };
        let reader = SourceReader::from_sources(
            pointer,
            vec![mem(b"xABx"), mem(b"CDE")],
            Default::default(),
        )
        .unwrap();
        let mut channel = reader.byte_channel();
        let mut all = String::new();
        channel.read_to_string(&mut all).unwrap();
        assert_eq!(all, "ABCDE");
        channel.seek(SeekFrom::Start(3)).unwrap();
        let mut rest = Vec::new();
        channel.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"DE");
    }

    #[test]
    fn test_expired_deadline_stops_reads() {
        let reader = SourceReader::from_reader(
            "mem",
            mem(b"<alto><Layout/></alto>"),
            options(16, 2).with_deadline(Some(Deadline::at(
                Instant::now() - Duration::from_millis(1),
            ))),
        )
        .unwrap();
        let err = reader.get_ascii_section(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DeadlineExceeded));

        let reader = SourceReader::from_reader(
            "mem",
            mem(b"<alto><Layout/></alto>"),
            options(16, 2).with_deadline(Some(Deadline::after(Duration::from_secs(3600)))),
        )
        .unwrap();
        assert_eq!(reader.read_ascii_string(0, 6).unwrap(), "<alto>");
    }

    #[test]
    fn test_complete_prefix_len() {
        assert_eq!(complete_prefix_len(b""), 0);
        assert_eq!(complete_prefix_len(b"abc"), 3);
        assert_eq!(complete_prefix_len("é".as_bytes()), 2);
        assert_eq!(complete_prefix_len(&"é".as_bytes()[..1]), 0);
        assert_eq!(complete_prefix_len(&"a😀".as_bytes()[..4]), 1);
        assert_eq!(complete_prefix_len(b"a\xff"), 2);
        assert_eq!(complete_prefix_len(b"\x80\x80\x80\x80"), 4);
    }
}
