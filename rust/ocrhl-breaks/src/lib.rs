//! Element boundary search over section-cached OCR markup.
//!
//! A break locator finds the byte offsets where elements of one kind (pages,
//! blocks, lines, words) start, without parsing the document: it scans the
//! [`SourceReader`] a section at a time and tests each tag against a match
//! predicate. [`TagBreakLocator`] matches element names, [`ClassBreakLocator`]
//! matches hOCR class names, and [`ContextBreakLocator`] combines two locators
//! into "N units of context, but not past the enclosing unit".
//!
//! Locators borrow their reader and hold no cursor: every call takes the offset
//! to search from.

use ocrhl_source::SourceReader;

pub mod class;
pub mod context;
pub mod format;
pub mod scan;
pub mod tag;

pub use class::{ClassBreakLocator, ClassMatcher};
pub use context::{ContextBreakLocator, passage_bounds};
pub use format::{BreakLevel, OcrFormat, OcrPage};
pub use tag::{TagBreakLocator, TagMatcher};

/// Boundary search in both directions.
///
/// Out-of-range offsets are never an error: `following` returns the text length
/// and `preceding` returns 0 when there is no boundary in that direction. Errors
/// come only from the underlying reader (I/O, deadline).
pub trait BreakLocator {
    /// Smallest boundary strictly greater than `offset`, or `text().len()`.
    fn following(&self, offset: u64) -> ocrhl_common::Result<u64>;

    /// Largest boundary strictly less than `offset`, or 0.
    fn preceding(&self, offset: u64) -> ocrhl_common::Result<u64>;

    /// The text being searched.
    fn text(&self) -> &SourceReader;
}

impl<T: BreakLocator + ?Sized> BreakLocator for &T {
    fn following(&self, offset: u64) -> ocrhl_common::Result<u64> {
        (**self).following(offset)
    }

    fn preceding(&self, offset: u64) -> ocrhl_common::Result<u64> {
        (**self).preceding(offset)
    }

    fn text(&self) -> &SourceReader {
        (**self).text()
    }
}

impl<T: BreakLocator + ?Sized> BreakLocator for Box<T> {
    fn following(&self, offset: u64) -> ocrhl_common::Result<u64> {
        (**self).following(offset)
    }

    fn preceding(&self, offset: u64) -> ocrhl_common::Result<u64> {
        (**self).preceding(offset)
    }

    fn text(&self) -> &SourceReader {
        (**self).text()
    }
}
