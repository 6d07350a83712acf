//! Building page indexes from OCR markup.

use ocrhl_breaks::{BreakLevel, BreakLocator, OcrFormat, OcrPage};
use ocrhl_common::error::Error;
use ocrhl_io::SealingWrite;
use ocrhl_page_index::{Dimensions, PageRecord, write_index};
use ocrhl_source::SourceReader;

/// Bytes read at a page start to parse its opening tag.
pub const PAGE_FRAGMENT_LEN: u64 = 1024;

/// Finds every page of the document and describes it as a page record.
///
/// A page spans from its opening tag to the opening tag of the next page; the
/// last one extends to the end of the text. Offsets are logical offsets of
/// `reader` and must fit in 32 bits.
pub fn build_page_records(
    reader: &SourceReader,
    format: OcrFormat,
) -> ocrhl_common::Result<Vec<Option<PageRecord>>> {
    let len = reader.len();
    let pages = format.break_locator(reader, BreakLevel::Page);

    let mut starts = Vec::new();
    if parse_page_at(reader, format, 0)?.is_some() {
        starts.push(0);
    }
    let mut pos = 0;
    loop {
        pos = pages.following(pos)?;
        if pos >= len {
            break;
        }
        starts.push(pos);
    }

    let mut records = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(len);
        let page = parse_page_at(reader, format, start)?.unwrap_or_default();
        records.push(Some(page_record(page, start, end)?));
    }
    log::debug!("found {} {format} pages in {len} bytes", records.len());
    Ok(records)
}

/// Builds the page records of the document and writes them as an index file.
///
/// Returns the number of pages.
pub fn write_page_index(
    reader: &SourceReader,
    format: OcrFormat,
    out: &mut dyn SealingWrite,
) -> ocrhl_common::Result<usize> {
    let records = build_page_records(reader, format)?;
    write_index(&records, out)?;
    Ok(records.len())
}

/// Parses the page opening tag at `offset`, if there is one.
pub fn parse_page_at(
    reader: &SourceReader,
    format: OcrFormat,
    offset: u64,
) -> ocrhl_common::Result<Option<OcrPage>> {
    if offset >= reader.len() {
        return Ok(None);
    }
    let len = PAGE_FRAGMENT_LEN.min(reader.len() - offset) as usize;
    let fragment = reader.read_utf8_string(offset, len)?;
    Ok(format.parse_page_fragment(&fragment))
}

pub(crate) fn page_record(page: OcrPage, start: u64, end: u64) -> ocrhl_common::Result<PageRecord> {
    Ok(PageRecord {
        id: page.id,
        start_offset: to_index_offset(start)?,
        end_offset: Some(to_index_offset(end)?),
        dimensions: page.dimensions.map(|(w, h)| Dimensions::new(w, h)),
    })
}

fn to_index_offset(offset: u64) -> ocrhl_common::Result<u32> {
    u32::try_from(offset).map_err(|_| {
        Error::unsupported(format!(
            "offset {offset} is beyond the 4 GiB range of page index files"
        ))
    })
}
