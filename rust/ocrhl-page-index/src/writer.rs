//! Encoding of page index files.
//!
//! The whole file is laid out in one buffer sized up front: header, then
//! `records.len()` fixed-width records (zeros for a page without a record), then
//! the NUL-terminated identifiers the records point at.

use byteorder::{LE, WriteBytesExt};
use ocrhl_common::{error::Error, verify_arg};
use ocrhl_io::SealingWrite;

use crate::{
    MAGIC, VERSION,
    record::{Features, PageRecord},
};

/// Collects page records by page number and writes them as an index file.
#[derive(Debug, Clone, Default)]
pub struct PageIndexWriter {
    records: Vec<Option<PageRecord>>,
}

impl PageIndexWriter {
    pub fn new() -> PageIndexWriter {
        Default::default()
    }

    /// Appends the record of the next page.
    pub fn push(&mut self, record: PageRecord) {
        self.records.push(Some(record));
    }

    /// Appends a page without a record.
    pub fn push_gap(&mut self) {
        self.records.push(None);
    }

    /// Sets the record of 1-based page `number`, leaving gaps before it as needed.
    pub fn set(&mut self, number: usize, record: PageRecord) -> ocrhl_common::Result<()> {
        verify_arg!(number, number >= 1);
        if self.records.len() < number {
            self.records.resize(number, None);
        }
        self.records[number - 1] = Some(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Option<PageRecord>] {
        &self.records
    }

    pub fn features(&self) -> Features {
        Features::of(self.records.iter().flatten())
    }

    pub fn encode(&self) -> ocrhl_common::Result<Vec<u8>> {
        encode_index(&self.records)
    }

    /// Writes and seals the index; returns its size in bytes.
    pub fn write(&self, out: &mut dyn SealingWrite) -> ocrhl_common::Result<u64> {
        write_index(&self.records, out)
    }
}

/// Encodes `records` and writes them to `out` as one buffer, then seals `out`.
///
/// Returns the number of bytes written.
pub fn write_index(
    records: &[Option<PageRecord>],
    out: &mut dyn SealingWrite,
) -> ocrhl_common::Result<u64> {
    let buf = encode_index(records)?;
    out.write_all(&buf)
        .and_then(|_| out.seal())
        .map_err(|e| Error::io("page index", e))?;
    log::debug!(
        "wrote page index: {} records, {} bytes",
        records.len(),
        buf.len()
    );
    Ok(buf.len() as u64)
}

/// Encodes `records` (page `i + 1` at index `i`) into the index file format.
pub fn encode_index(records: &[Option<PageRecord>]) -> ocrhl_common::Result<Vec<u8>> {
    let features = Features::of(records.iter().flatten());
    let has_ids = features.contains(Features::IDENTIFIER);
    if has_ids {
        verify_arg!(records, records.len() <= u16::MAX as usize);
    }

    let mut previous_start = None;
    for record in records.iter().flatten() {
        if let Some(end) = record.end_offset {
            // a stored length of 0 reads back as "no length"
            verify_arg!(end_offset, end > record.start_offset);
        }
        if let Some(id) = &record.id {
            verify_arg!(id, !id.contains('\0'));
        }
        verify_arg!(
            start_offset,
            previous_start.is_none_or(|prev| prev < record.start_offset)
        );
        previous_start = Some(record.start_offset);
    }

    let records_end = features.header_size() + records.len() * features.record_size();
    let ids_len: usize = records
        .iter()
        .flatten()
        .filter_map(|r| r.id.as_ref())
        .map(|id| id.len() + 1)
        .sum();
    let total = records_end + ids_len;
    if total > u32::MAX as usize {
        return Err(Error::invalid_arg(
            "records",
            format!("index of {total} bytes exceeds the 4 GiB addressable by identifier pointers"),
        ));
    }

    let mut buf = Vec::with_capacity(total);
    let mut ids = Vec::with_capacity(ids_len);
    buf.extend_from_slice(MAGIC);
    buf.write_u8(VERSION)?;
    buf.write_u8(features.bits())?;
    if has_ids {
        buf.write_u16::<LE>(records.len() as u16)?;
    }

    for record in records {
        let Some(record) = record else {
            buf.resize(buf.len() + features.record_size(), 0);
            continue;
        };
        let record_start = buf.len();
        buf.write_u32::<LE>(record.start_offset)?;
        if features.contains(Features::LENGTH) {
            let len = record
                .end_offset
                .map_or(0, |end| end - record.start_offset);
            buf.write_u32::<LE>(len)?;
        }
        if has_ids {
            let pointer = match &record.id {
                Some(id) => {
                    let pointer = (records_end + ids.len()) as u32;
                    ids.extend_from_slice(id.as_bytes());
                    ids.push(0);
                    pointer
                }
                None => 0,
            };
            buf.write_u32::<LE>(pointer)?;
        }
        if features.contains(Features::DIMENSION) {
            let dims = record.dimensions.unwrap_or(crate::Dimensions::new(0, 0));
            buf.write_u16::<LE>(dims.width)?;
            buf.write_u16::<LE>(dims.height)?;
        }
        if buf[record_start..].iter().all(|&b| b == 0) {
            return Err(Error::invalid_arg(
                "start_offset",
                "a page at offset 0 without length, id or size is indistinguishable from a gap",
            ));
        }
    }
    debug_assert_eq!(buf.len(), records_end);
    buf.extend_from_slice(&ids);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use ocrhl_common::error::ErrorKind;

    use super::{PageIndexWriter, encode_index};
    use crate::record::PageRecord;

    #[test]
    fn test_encode_minimal() {
        let buf = encode_index(&[Some(PageRecord::new(0x10)), None, Some(PageRecord::new(0x0200))])
            .unwrap();
        assert_eq!(
            buf,
            [
                b'O', b'C', b'R', b'I', b'D', b'X', 1, 0, //
                0x10, 0, 0, 0, //
                0, 0, 0, 0, //
                0, 2, 0, 0,
            ]
        );
    }

    #[test]
    fn test_encode_all_features() {
        let buf = encode_index(&[
            Some(PageRecord::new(5).with_end(9).with_id("a").with_dimensions(300, 400)),
            Some(PageRecord::new(9).with_end(12)),
        ])
        .unwrap();
        #[rustfmt::skip]
        let expected: &[u8] = &[
            b'O', b'C', b'R', b'I', b'D', b'X', 1, 0x07, 2, 0,
            5, 0, 0, 0,  4, 0, 0, 0,  42, 0, 0, 0,  0x2c, 0x01, 0x90, 0x01,
            9, 0, 0, 0,  3, 0, 0, 0,  0, 0, 0, 0,   0, 0, 0, 0,
            b'a', 0,
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_rejects_bad_records() {
        let err = encode_index(&[Some(PageRecord::new(10).with_end(5))]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "end_offset"));

        let err = encode_index(&[
            Some(PageRecord::new(10).with_end(10).with_id("a")),
            Some(PageRecord::new(20).with_end(30).with_id("b")),
        ])
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "end_offset"));

        let err = encode_index(&[Some(PageRecord::new(0)), Some(PageRecord::new(50))]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "start_offset"));
        // anything stored alongside the zero offset tells it apart from a gap
        assert!(encode_index(&[Some(PageRecord::new(0).with_end(50))]).is_ok());
        assert!(encode_index(&[Some(PageRecord::new(0).with_id("p0")), None]).is_ok());

        let err = encode_index(&[Some(PageRecord::new(10)), Some(PageRecord::new(10))]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "start_offset"));

        let err = encode_index(&[Some(PageRecord::new(1).with_id("a\0b"))]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "id"));

        let mut records = vec![None; u16::MAX as usize];
        records.push(Some(PageRecord::new(1).with_id("last")));
        let err = encode_index(&records).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "records"));

        // without identifiers there is no stored count to overflow
        let mut records = vec![None; u16::MAX as usize];
        records.push(Some(PageRecord::new(1)));
        assert!(encode_index(&records).is_ok());
    }

    #[test]
    fn test_writer_fills_gaps_and_seals() {
        let mut writer = PageIndexWriter::new();
        writer.push(PageRecord::new(3).with_id("p1"));
        writer.set(4, PageRecord::new(90).with_id("p4")).unwrap();
        assert_eq!(writer.len(), 4);
        assert!(writer.records()[1].is_none() && writer.records()[2].is_none());
        assert!(writer.set(0, PageRecord::new(1)).is_err());

        let mut out = Vec::new();
        let written = writer.write(&mut out).unwrap();
        assert_eq!(written, out.len() as u64);
        assert_eq!(out, writer.encode().unwrap());
        assert!(out.ends_with(b"p1\0p4\0"));
    }
}
