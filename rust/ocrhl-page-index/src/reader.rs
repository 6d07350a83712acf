//! Random access to page index files.

use std::sync::Arc;

use byteorder::{ByteOrder, LE};
use bytes::Bytes;
use ocrhl_common::{
    error::{Error, ErrorKind},
    verify_arg, verify_data,
};
use ocrhl_io::ReadAt;

use crate::{
    MAGIC, VERSION,
    record::{Dimensions, Features, PageRecord},
};

/// Identifier strings are read in chunks of this size until their terminator.
const ID_READ_CHUNK: u64 = 64;

/// A record as stored: the page it belongs to and its raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawRecord {
    number: usize,
    offset: u32,
    length: u32,
    id_pointer: u32,
    width: u16,
    height: u16,
}

impl RawRecord {
    fn is_gap(&self) -> bool {
        self.offset == 0
            && self.length == 0
            && self.id_pointer == 0
            && self.width == 0
            && self.height == 0
    }
}

/// Page lookups over an index file.
///
/// Only the header is read on open; every lookup reads the few records its
/// binary search touches.
pub struct PageIndexReader {
    reader: Arc<dyn ReadAt>,
    features: Features,
    header_size: u64,
    record_size: usize,
    num_records: usize,
    size: u64,
}

impl PageIndexReader {
    pub fn open(reader: Arc<dyn ReadAt>) -> ocrhl_common::Result<PageIndexReader> {
        let size = reader.size().map_err(|e| Error::io("page index", e))?;
        let header = read(&reader, 0, size.min(Features::ALL.header_size() as u64))?;
        verify_data!(magic, header.starts_with(MAGIC));
        let base = MAGIC.len() + 2;
        verify_data!(header, header.len() >= base);
        if header[MAGIC.len()] != VERSION {
            return Err(Error::unsupported(format!(
                "page index version {}",
                header[MAGIC.len()]
            )));
        }
        let features = Features::from_bits(header[MAGIC.len() + 1]).ok_or_else(|| {
            Error::malformed("features", format!("unknown flags {:#04x}", header[base - 1]))
        })?;

        let header_size = features.header_size() as u64;
        let record_size = features.record_size();
        verify_data!(header, header.len() as u64 >= header_size);
        let num_records = if features.contains(Features::IDENTIFIER) {
            let count = LE::read_u16(&header[base..base + 2]) as usize;
            verify_data!(
                records,
                header_size + (count * record_size) as u64 <= size
            );
            count
        } else {
            let body = size - header_size;
            verify_data!(records, body % record_size as u64 == 0);
            (body / record_size as u64) as usize
        };
        log::debug!("opened page index: {num_records} records, features {features}");

        Ok(PageIndexReader {
            reader,
            features,
            header_size,
            record_size,
            num_records,
            size,
        })
    }

    /// Opens the index and fails with `MissingFeatures` unless it stores every
    /// feature in `required`.
    pub fn open_requiring(
        reader: Arc<dyn ReadAt>,
        required: Features,
    ) -> ocrhl_common::Result<PageIndexReader> {
        let index = Self::open(reader)?;
        if !index.features.contains(required) {
            return Err(ErrorKind::MissingFeatures {
                required: required.bits(),
                present: index.features.bits(),
            }
            .into());
        }
        Ok(index)
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Number of pages, including pages without a record.
    pub fn num_pages(&self) -> usize {
        self.num_records
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    /// File offset of the record of 1-based page `number`.
    pub fn record_offset(&self, number: usize) -> u64 {
        self.header_size + ((number - 1) * self.record_size) as u64
    }

    /// The record of 1-based page `number`, or `None` for a page without one.
    pub fn page(&self, number: usize) -> ocrhl_common::Result<Option<PageRecord>> {
        verify_arg!(number, number >= 1 && number <= self.num_records);
        let raw = self.raw_record(number)?;
        self.materialize(raw)
    }

    /// Decodes the record stored at `file_offset`, which must be the start of a
    /// record.
    ///
    /// Returns the page number along with the record.
    pub fn read_record_at(
        &self,
        file_offset: u64,
    ) -> ocrhl_common::Result<Option<(usize, PageRecord)>> {
        let records_end = self.record_offset(self.num_records + 1);
        if file_offset < self.header_size
            || (file_offset - self.header_size) % self.record_size as u64 != 0
        {
            return Err(ErrorKind::AlignmentViolation {
                offset: file_offset,
                record_size: self.record_size,
            }
            .into());
        }
        if file_offset >= records_end {
            return Err(Error::out_of_bounds(
                file_offset,
                self.record_size as u64,
                records_end,
            ));
        }
        let number = ((file_offset - self.header_size) / self.record_size as u64) as usize + 1;
        let raw = self.raw_record(number)?;
        Ok(self.materialize(raw)?.map(|record| (number, record)))
    }

    /// The page whose span contains the source offset `offset`.
    ///
    /// Page ends are exclusive: an offset equal to a page's end belongs to the
    /// next page, or to none when there is a gap.
    pub fn locate_page(&self, offset: u64) -> ocrhl_common::Result<Option<PageRecord>> {
        Ok(self.locate(offset)?.map(|(_, record)| record))
    }

    /// Like `locate_page`, also returning the 1-based page number.
    pub fn locate(&self, offset: u64) -> ocrhl_common::Result<Option<(usize, PageRecord)>> {
        let Some(candidate) = self.last_starting_at_or_before(offset)? else {
            log::trace!("offset {offset} precedes the first page");
            return Ok(None);
        };
        let number = candidate.number;
        let Some(record) = self.materialize(candidate)? else {
            return Ok(None);
        };
        Ok(record.contains(offset).then_some((number, record)))
    }

    /// Binary search for the last non-empty record whose offset is at most
    /// `offset`.
    fn last_starting_at_or_before(&self, offset: u64) -> ocrhl_common::Result<Option<RawRecord>> {
        let mut best = None;
        let (mut lo, mut hi) = (1, self.num_records + 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.next_record(mid, hi)? {
                None => hi = mid,
                Some(raw) if raw.offset as u64 <= offset => {
                    lo = raw.number + 1;
                    best = Some(raw);
                }
                Some(_) => hi = mid,
            }
        }
        Ok(best)
    }

    /// First non-empty record among pages `from..to`.
    fn next_record(&self, from: usize, to: usize) -> ocrhl_common::Result<Option<RawRecord>> {
        for number in from..to {
            let raw = self.raw_record(number)?;
            if !raw.is_gap() {
                return Ok(Some(raw));
            }
        }
        Ok(None)
    }

    fn raw_record(&self, number: usize) -> ocrhl_common::Result<RawRecord> {
        let bytes = read(&self.reader, self.record_offset(number), self.record_size as u64)?;
        verify_data!(record, bytes.len() == self.record_size);
        let mut raw = RawRecord {
            number,
            offset: LE::read_u32(&bytes[0..4]),
            length: 0,
            id_pointer: 0,
            width: 0,
            height: 0,
        };
        let mut pos = 4;
        if self.features.contains(Features::LENGTH) {
            raw.length = LE::read_u32(&bytes[pos..pos + 4]);
            pos += 4;
        }
        if self.features.contains(Features::IDENTIFIER) {
            raw.id_pointer = LE::read_u32(&bytes[pos..pos + 4]);
            pos += 4;
        }
        if self.features.contains(Features::DIMENSION) {
            raw.width = LE::read_u16(&bytes[pos..pos + 2]);
            raw.height = LE::read_u16(&bytes[pos + 2..pos + 4]);
        }
        Ok(raw)
    }

    /// Resolves the identifier and the end offset of a stored record.
    fn materialize(&self, raw: RawRecord) -> ocrhl_common::Result<Option<PageRecord>> {
        if raw.is_gap() {
            return Ok(None);
        }
        let end_offset = if raw.length > 0 {
            raw.offset.checked_add(raw.length)
        } else {
            self.next_record(raw.number + 1, self.num_records + 1)?
                .map(|next| next.offset)
        };
        let id = if raw.id_pointer != 0 {
            Some(self.read_id(raw.id_pointer as u64)?)
        } else {
            None
        };
        // a record stored without a size has 0x0 in the dimension slot
        let dimensions = (self.features.contains(Features::DIMENSION)
            && (raw.width, raw.height) != (0, 0))
            .then(|| Dimensions::new(raw.width, raw.height));
        Ok(Some(PageRecord {
            id,
            start_offset: raw.offset,
            end_offset,
            dimensions,
        }))
    }

    fn read_id(&self, pointer: u64) -> ocrhl_common::Result<String> {
        let tail_start = self.record_offset(self.num_records + 1);
        verify_data!(id_pointer, pointer >= tail_start && pointer < self.size);
        let mut id = Vec::new();
        let mut pos = pointer;
        loop {
            let chunk = read(&self.reader, pos, ID_READ_CHUNK.min(self.size - pos))?;
            verify_data!(id, !chunk.is_empty());
            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                id.extend_from_slice(&chunk[..nul]);
                break;
            }
            id.extend_from_slice(&chunk);
            pos += chunk.len() as u64;
        }
        String::from_utf8(id).map_err(|e| Error::malformed("id", e.to_string()))
    }
}

fn read(reader: &Arc<dyn ReadAt>, offset: u64, len: u64) -> ocrhl_common::Result<Bytes> {
    reader
        .read_at(offset..offset + len)
        .map_err(|e| Error::io("page index", e))
}
