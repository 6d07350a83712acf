use std::ops::Range;

use ocrhl_breaks::{BreakLevel, BreakLocator, ContextBreakLocator, OcrFormat};
use ocrhl_page_index::{PageIndexReader, PageRecord};
use ocrhl_source::SourceReader;

use crate::pages::{page_record, parse_page_at};

/// A highlighting passage around a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Logical byte range of the passage.
    pub range: Range<u64>,
    /// The passage markup, decoded as UTF-8.
    pub text: String,
    /// The page holding the start of the match.
    pub page: Option<PageRecord>,
}

/// Turns match ranges into snippets of one document.
///
/// A snippet spans `context_size` units of the base level on each side of the
/// units touched by the match, never crossing a boundary of the limit level.
/// The page comes from the page index when one is attached, and from the
/// markup otherwise.
pub struct SnippetLocator<'a> {
    reader: &'a SourceReader,
    format: OcrFormat,
    base_level: BreakLevel,
    limit_level: Option<BreakLevel>,
    context_size: usize,
    page_index: Option<&'a PageIndexReader>,
}

impl<'a> SnippetLocator<'a> {
    pub const DEFAULT_CONTEXT_SIZE: usize = 2;

    /// Line-level snippets limited to the enclosing block.
    pub fn new(reader: &'a SourceReader, format: OcrFormat) -> SnippetLocator<'a> {
        SnippetLocator {
            reader,
            format,
            base_level: BreakLevel::Line,
            limit_level: Some(BreakLevel::Block),
            context_size: Self::DEFAULT_CONTEXT_SIZE,
            page_index: None,
        }
    }

    pub fn with_levels(mut self, base: BreakLevel, limit: Option<BreakLevel>) -> Self {
        self.base_level = base;
        self.limit_level = limit;
        self
    }

    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }

    pub fn with_page_index(mut self, page_index: &'a PageIndexReader) -> Self {
        self.page_index = Some(page_index);
        self
    }

    pub fn format(&self) -> OcrFormat {
        self.format
    }

    fn context(&self) -> ContextBreakLocator<'a> {
        ContextBreakLocator::new(
            self.format.break_locator(self.reader, self.base_level),
            self.limit_level
                .map(|level| self.format.break_locator(self.reader, level)),
            self.context_size,
        )
    }

    pub fn locate(&self, match_range: Range<u64>) -> ocrhl_common::Result<Snippet> {
        let range = self.context().passage(match_range.clone())?;
        let text = self
            .reader
            .read_utf8_string(range.start, (range.end - range.start) as usize)?;
        let page = self.page_of(match_range.start)?;
        log::debug!(
            "snippet {range:?} for match {match_range:?} on page {:?}",
            page.as_ref().and_then(|p| p.id.as_deref())
        );
        Ok(Snippet { range, text, page })
    }

    /// The page containing `offset`.
    pub fn page_of(&self, offset: u64) -> ocrhl_common::Result<Option<PageRecord>> {
        if let Some(index) = self.page_index {
            return index.locate_page(offset);
        }
        let pages = self.format.break_locator(self.reader, BreakLevel::Page);
        let start = pages.preceding(offset.saturating_add(1))?;
        let Some(page) = parse_page_at(self.reader, self.format, start)? else {
            return Ok(None);
        };
        let end = pages.following(start)?;
        page_record(page, start, end).map(Some)
    }
}
