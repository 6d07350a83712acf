//! Section-wise boundary search shared by all markup break locators.
//!
//! A boundary is the offset of a `<` whose tag satisfies a [`TagPredicate`]. The
//! predicate sees the tag from its `<` through the first following `>` (or through
//! the end of the text for a tag cut off by it), exactly as it would on a fully
//! materialized document: a window passed to it always contains the whole tag.
//!
//! Forward scans carry the unclosed tail of a window (everything from the first
//! `<` after the last `>`) into the next one. Backward scans append the head of
//! the previously scanned window, up to and including its first `>`, to the
//! section before it. Either way only O(section size) bytes are held at a time.
//! The predicate sees at most the first [`MAX_CARRY`] bytes of a tag, so longer
//! tags are judged on their prefix in both directions.

use std::ops::Range;

use ocrhl_source::SourceReader;

/// Longest tag prefix shown to a predicate, and so the most partial tag bytes
/// carried from one section to the next.
pub const MAX_CARRY: usize = 64 * 1024;

/// Decides whether a tag marks a boundary.
pub trait TagPredicate {
    /// `tag` starts with `<` and ends with the first `>` after it, or with the end
    /// of the text when the tag is not closed.
    fn matches(&self, tag: &[u8]) -> bool;
}

/// Smallest boundary strictly greater than `offset`, or `reader.len()`.
pub fn following<P: TagPredicate + ?Sized>(
    reader: &SourceReader,
    predicate: &P,
    offset: u64,
) -> ocrhl_common::Result<u64> {
    let len = reader.len();
    let from = match offset.checked_add(1) {
        Some(from) if from < len => from,
        _ => return Ok(len),
    };

    let mut window = Vec::new();
    let mut window_start = from;
    let mut next = from;
    loop {
        let section = reader.get_ascii_section(next)?;
        window.extend_from_slice(&section.slice(next..section.end));
        let is_last = section.end >= len;

        // a `<` at least MAX_CARRY bytes before the window end can be judged now
        let safe_end = if is_last {
            window.len()
        } else {
            unclosed_tail(&window).max((window.len() + 1).saturating_sub(MAX_CARRY))
        };
        if let Some(i) = find_first(&window, 0..safe_end, predicate) {
            return Ok(window_start + i as u64);
        }
        if is_last {
            return Ok(len);
        }

        if window.len() > safe_end {
            log::trace!(
                "carrying {} byte partial tag at {}",
                window.len() - safe_end,
                window_start + safe_end as u64
            );
        }
        window.drain(..safe_end);
        window_start += safe_end as u64;
        next = section.end;
    }
}

/// Largest boundary strictly less than `offset`, or 0.
pub fn preceding<P: TagPredicate + ?Sized>(
    reader: &SourceReader,
    predicate: &P,
    offset: u64,
) -> ocrhl_common::Result<u64> {
    let limit = offset.min(reader.len());
    if limit == 0 {
        return Ok(0);
    }

    // bytes from `hi` through the first `>` at or after it
    let mut tail = closing_run(reader, limit)?;
    let mut hi = limit;
    loop {
        let section = reader.get_ascii_section(hi - 1)?;
        let mut window = section.slice(section.start..hi).to_vec();
        let candidates = 0..window.len();
        window.extend_from_slice(&tail);

        if let Some(i) = find_last(&window, candidates, predicate) {
            return Ok(section.start + i as u64);
        }
        if section.start == 0 {
            return Ok(0);
        }

        let head_end = window
            .iter()
            .position(|&b| b == b'>')
            .map_or(window.len(), |i| i + 1)
            .min(MAX_CARRY);
        window.truncate(head_end);
        tail = window;
        hi = section.start;
    }
}

/// Reads forward from `offset` through the first `>`, the end of the text, or
/// `MAX_CARRY` bytes, whichever comes first.
fn closing_run(reader: &SourceReader, offset: u64) -> ocrhl_common::Result<Vec<u8>> {
    let mut run = Vec::new();
    let mut pos = offset;
    while pos < reader.len() && run.len() < MAX_CARRY {
        let section = reader.get_ascii_section(pos)?;
        let bytes = section.slice(pos..section.end);
        if let Some(i) = bytes.iter().position(|&b| b == b'>') {
            run.extend_from_slice(&bytes[..=i]);
            break;
        }
        run.extend_from_slice(&bytes);
        pos = section.end;
    }
    run.truncate(MAX_CARRY);
    Ok(run)
}

/// Index of the first `<` following the last `>` in `window`, or `window.len()`.
///
/// Every `<` before it is closed within the window.
pub(crate) fn unclosed_tail(window: &[u8]) -> usize {
    let after_gt = window
        .iter()
        .rposition(|&b| b == b'>')
        .map_or(0, |i| i + 1);
    window[after_gt..]
        .iter()
        .position(|&b| b == b'<')
        .map_or(window.len(), |i| after_gt + i)
}

/// The tag opened at `lt`, cut to its first `MAX_CARRY` bytes.
fn tag_at(window: &[u8], lt: usize) -> &[u8] {
    let end = window[lt + 1..]
        .iter()
        .position(|&b| b == b'>')
        .map_or(window.len(), |i| lt + 1 + i + 1);
    &window[lt..end.min(lt + MAX_CARRY)]
}

/// First `<` within `candidates` whose tag satisfies the predicate.
pub(crate) fn find_first<P: TagPredicate + ?Sized>(
    window: &[u8],
    candidates: Range<usize>,
    predicate: &P,
) -> Option<usize> {
    let mut pos = candidates.start;
    while pos < candidates.end {
        let lt = pos + window[pos..candidates.end].iter().position(|&b| b == b'<')?;
        if predicate.matches(tag_at(window, lt)) {
            return Some(lt);
        }
        pos = lt + 1;
    }
    None
}

/// Last `<` within `candidates` whose tag satisfies the predicate.
pub(crate) fn find_last<P: TagPredicate + ?Sized>(
    window: &[u8],
    candidates: Range<usize>,
    predicate: &P,
) -> Option<usize> {
    let mut end = candidates.end;
    while end > candidates.start {
        let lt = candidates.start
            + window[candidates.start..end]
                .iter()
                .rposition(|&b| b == b'<')?;
        if predicate.matches(tag_at(window, lt)) {
            return Some(lt);
        }
        end = lt;
    }
    None
}
