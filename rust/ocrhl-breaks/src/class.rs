use aho_corasick::AhoCorasick;
use ocrhl_common::{error::Error, verify_arg};
use ocrhl_source::SourceReader;

use crate::{
    BreakLocator,
    scan::{self, TagPredicate},
};

/// Matches tags carrying any one of a set of class names.
///
/// A class name counts only as a whole token: the bytes on both sides must be a
/// quote or whitespace. Tags of `<meta>` elements (hOCR capability lists) and
/// closing tags never match.
#[derive(Debug, Clone)]
pub struct ClassMatcher {
    names: Vec<String>,
    searcher: AhoCorasick,
}

impl ClassMatcher {
    pub fn new<I, S>(names: I) -> ocrhl_common::Result<ClassMatcher>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect::<Vec<String>>();
        verify_arg!(names, !names.is_empty());
        verify_arg!(names, names.iter().all(|n| !n.is_empty()));
        let searcher =
            AhoCorasick::new(&names).map_err(|e| Error::invalid_arg("names", e.to_string()))?;
        Ok(ClassMatcher { names, searcher })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn is_token_delimiter(b: u8) -> bool {
    b == b'"' || b == b'\'' || b.is_ascii_whitespace()
}

fn is_meta(tag: &[u8]) -> bool {
    tag.len() >= 5
        && tag[1..5].eq_ignore_ascii_case(b"meta")
        && tag.get(5).is_none_or(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
}

impl TagPredicate for ClassMatcher {
    fn matches(&self, tag: &[u8]) -> bool {
        if tag.len() < 2 || matches!(tag[1], b'/' | b'!' | b'?') || is_meta(tag) {
            return false;
        }
        self.searcher.find_overlapping_iter(tag).any(|m| {
            m.start() > 0
                && is_token_delimiter(tag[m.start() - 1])
                && tag.get(m.end()).is_some_and(|&b| is_token_delimiter(b))
        })
    }
}

/// Finds the `<` of every tag whose attributes carry one of a set of class names.
pub struct ClassBreakLocator<'a> {
    reader: &'a SourceReader,
    matcher: ClassMatcher,
}

impl<'a> ClassBreakLocator<'a> {
    pub fn new(reader: &'a SourceReader, matcher: ClassMatcher) -> ClassBreakLocator<'a> {
        ClassBreakLocator { reader, matcher }
    }

    pub fn with_classes(
        reader: &'a SourceReader,
        names: &[&str],
    ) -> ocrhl_common::Result<ClassBreakLocator<'a>> {
        Ok(Self::new(reader, ClassMatcher::new(names.iter().copied())?))
    }

    pub fn matcher(&self) -> &ClassMatcher {
        &self.matcher
    }
}

impl BreakLocator for ClassBreakLocator<'_> {
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
