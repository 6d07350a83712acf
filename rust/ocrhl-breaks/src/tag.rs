use ocrhl_source::SourceReader;

use crate::{
    BreakLocator,
    scan::{self, TagPredicate},
};

/// Matches one element name, either at its opening or at its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    name: Box<[u8]>,
    closing: bool,
}

impl TagMatcher {
    /// Matches `<name` followed by whitespace, `>` or `/`.
    pub fn opening(name: &str) -> TagMatcher {
        TagMatcher {
            name: name.as_bytes().into(),
            closing: false,
        }
    }

    /// Matches `</name` followed by whitespace or `>`.
    pub fn closing(name: &str) -> TagMatcher {
        TagMatcher {
            name: name.as_bytes().into(),
            closing: true,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }
}

impl TagPredicate for TagMatcher {
    fn matches(&self, tag: &[u8]) -> bool {
        let rest = match (self.closing, tag) {
            (false, [b'<', rest @ ..]) => rest,
            (true, [b'<', b'/', rest @ ..]) => rest,
            _ => return false,
        };
        let Some(after) = rest.strip_prefix(&*self.name) else {
            return false;
        };
        match after.first() {
            Some(b'>') => true,
            Some(b'/') => !self.closing,
            Some(b) => b.is_ascii_whitespace(),
            None => false,
        }
    }
}

/// Finds the `<` of every occurrence of one element's opening (or closing) tag.
pub struct TagBreakLocator<'a> {
    reader: &'a SourceReader,
    matcher: TagMatcher,
}

impl<'a> TagBreakLocator<'a> {
    pub fn new(reader: &'a SourceReader, matcher: TagMatcher) -> TagBreakLocator<'a> {
        TagBreakLocator { reader, matcher }
    }

    /// Locator over opening `<name` tags.
    pub fn opening(reader: &'a SourceReader, name: &str) -> TagBreakLocator<'a> {
        Self::new(reader, TagMatcher::opening(name))
    }

    pub fn matcher(&self) -> &TagMatcher {
        &self.matcher
    }
}

impl BreakLocator for TagBreakLocator<'_> {
    fn following(&self, offset: u64) -> ocrhl_common::Result<u64> {
        scan::following(self.reader, &self.matcher, offset)
    }

    fn preceding(&self, offset: u64) -> ocrhl_common::Result<u64> {
        scan::preceding(self.reader, &self.matcher, offset)
    }

    fn text(&self) -> &SourceReader {
        self.reader
    }
}
