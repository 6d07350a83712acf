//! The OCR markup dialects and what each one calls a page, block, line and word.

use std::{fmt, str::FromStr};

use ocrhl_common::error::Error;
use ocrhl_source::SourceReader;

use crate::{
    BreakLocator,
    class::{ClassBreakLocator, ClassMatcher},
    scan::TagPredicate,
    tag::{TagBreakLocator, TagMatcher},
};

/// Number of leading bytes inspected by [`OcrFormat::detect`].
pub const DETECT_SAMPLE_LEN: usize = 8 * 1024;

const HOCR_PAGE: &[&str] = &["ocr_page"];
const HOCR_BLOCK: &[&str] = &["ocr_carea", "ocrx_block"];
const HOCR_LINE: &[&str] = &[
    "ocr_line",
    "ocrx_line",
    "ocr_header",
    "ocr_textfloat",
    "ocr_caption",
];
const HOCR_WORD: &[&str] = &["ocrx_word"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrFormat {
    Alto,
    Hocr,
    MiniOcr,
}

/// Granularity of a break locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BreakLevel {
    Page,
    Block,
    Line,
    Word,
}

/// Identifier and pixel dimensions of a page, read from its opening tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OcrPage {
    pub id: Option<String>,
    /// Width and height.
    pub dimensions: Option<(u16, u16)>,
}

enum Rule {
    Tag(&'static str),
    Classes(&'static [&'static str]),
}

enum Matcher {
    Tag(TagMatcher),
    Class(ClassMatcher),
}

impl TagPredicate for Matcher {
    fn matches(&self, tag: &[u8]) -> bool {
        match self {
            Matcher::Tag(m) => m.matches(tag),
            Matcher::Class(m) => m.matches(tag),
        }
    }
}

fn class_matcher(names: &'static [&'static str]) -> ClassMatcher {
    ClassMatcher::new(names.iter().copied()).expect("static class names")
}

impl OcrFormat {
    pub const ALL: [OcrFormat; 3] = [OcrFormat::Alto, OcrFormat::Hocr, OcrFormat::MiniOcr];

    pub fn name(&self) -> &'static str {
        match self {
            OcrFormat::Alto => "alto",
            OcrFormat::Hocr => "hocr",
            OcrFormat::MiniOcr => "miniocr",
        }
    }

    fn rule(&self, level: BreakLevel) -> Rule {
        match (self, level) {
            (OcrFormat::Alto, BreakLevel::Page) => Rule::Tag("Page"),
            (OcrFormat::Alto, BreakLevel::Block) => Rule::Tag("TextBlock"),
            (OcrFormat::Alto, BreakLevel::Line) => Rule::Tag("TextLine"),
            (OcrFormat::Alto, BreakLevel::Word) => Rule::Tag("String"),
            (OcrFormat::Hocr, BreakLevel::Page) => Rule::Classes(HOCR_PAGE),
            (OcrFormat::Hocr, BreakLevel::Block) => Rule::Classes(HOCR_BLOCK),
            (OcrFormat::Hocr, BreakLevel::Line) => Rule::Classes(HOCR_LINE),
            (OcrFormat::Hocr, BreakLevel::Word) => Rule::Classes(HOCR_WORD),
            (OcrFormat::MiniOcr, BreakLevel::Page) => Rule::Tag("p"),
            (OcrFormat::MiniOcr, BreakLevel::Block) => Rule::Tag("b"),
            (OcrFormat::MiniOcr, BreakLevel::Line) => Rule::Tag("l"),
            (OcrFormat::MiniOcr, BreakLevel::Word) => Rule::Tag("w"),
        }
    }

    fn matcher(&self, level: BreakLevel) -> Matcher {
        match self.rule(level) {
            Rule::Tag(name) => Matcher::Tag(TagMatcher::opening(name)),
            Rule::Classes(names) => Matcher::Class(class_matcher(names)),
        }
    }

    /// Locator over the starts of `level` elements of this dialect.
    pub fn break_locator<'a>(
        &self,
        reader: &'a SourceReader,
        level: BreakLevel,
    ) -> Box<dyn BreakLocator + 'a> {
        match self.matcher(level) {
            Matcher::Tag(m) => Box::new(TagBreakLocator::new(reader, m)),
            Matcher::Class(m) => Box::new(ClassBreakLocator::new(reader, m)),
        }
    }

    /// Whether a leading chunk of a document looks like this dialect.
    pub fn has_format(&self, chunk: &str) -> bool {
        match self {
            OcrFormat::Alto => {
                chunk.contains("<alto")
                    || (chunk.contains("<String ") && chunk.contains("CONTENT="))
            }
            OcrFormat::Hocr => HOCR_PAGE
                .iter()
                .chain(HOCR_LINE)
                .chain(HOCR_WORD)
                .any(|class| chunk.contains(class)),
            OcrFormat::MiniOcr => {
                chunk.contains("<ocr>")
                    || chunk.contains("<ocr ")
                    || chunk.contains("<w>")
                    || chunk.contains("<w ")
            }
        }
    }

    /// Guesses the dialect from the first `DETECT_SAMPLE_LEN` bytes of `reader`.
    pub fn detect(reader: &SourceReader) -> ocrhl_common::Result<Option<OcrFormat>> {
        let sample_len = reader.len().min(DETECT_SAMPLE_LEN as u64) as usize;
        let chunk = reader.read_ascii_string(0, sample_len)?;
        let format = Self::ALL.into_iter().find(|f| f.has_format(&chunk));
        log::debug!("detected format {format:?} from {sample_len} bytes");
        Ok(format)
    }

    /// Reads the page id and dimensions from a page's opening tag.
    ///
    /// Anything after the first `>` of `fragment` is ignored. Returns `None` when
    /// the fragment does not open a page of this dialect.
    pub fn parse_page_fragment(&self, fragment: &str) -> Option<OcrPage> {
        let tag = match fragment.find('>') {
            Some(end) => &fragment[..=end],
            None => fragment,
        };
        if !self.matcher(BreakLevel::Page).matches(tag.as_bytes()) {
            return None;
        }
        let page = match self {
            OcrFormat::Alto => OcrPage {
                id: attribute(tag, "ID").map(str::to_string),
                dimensions: attribute(tag, "WIDTH")
                    .and_then(dimension)
                    .zip(attribute(tag, "HEIGHT").and_then(dimension)),
            },
            OcrFormat::Hocr => OcrPage {
                id: attribute(tag, "id").map(str::to_string),
                dimensions: attribute(tag, "title").and_then(bbox_size),
            },
            OcrFormat::MiniOcr => OcrPage {
                id: attribute(tag, "xml:id")
                    .or_else(|| attribute(tag, "id"))
                    .map(str::to_string),
                dimensions: attribute(tag, "wh").and_then(|wh| {
                    let mut parts = wh.split_ascii_whitespace();
                    dimension(parts.next()?).zip(dimension(parts.next()?))
                }),
            },
        };
        Some(page)
    }
}

impl fmt::Display for OcrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OcrFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_arg("format", format!("unknown OCR format '{s}'")))
    }
}

/// Value of attribute `name` within a single tag.
fn attribute<'t>(tag: &'t str, name: &str) -> Option<&'t str> {
    let mut from = 0;
    while let Some(i) = tag[from..].find(name) {
        let at = from + i;
        from = at + name.len();
        if at == 0 || !tag.as_bytes()[at - 1].is_ascii_whitespace() {
            continue;
        }
        let Some(rest) = tag[from..].trim_start().strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') else {
            continue;
        };
        let value = &rest[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}

fn dimension(value: &str) -> Option<u16> {
    pixels(value.trim().parse::<f64>().ok()?)
}

fn pixels(value: f64) -> Option<u16> {
    (value.is_finite() && value >= 0.0).then(|| value.round().min(u16::MAX as f64) as u16)
}

/// Width and height of the `bbox x0 y0 x1 y1` property of an hOCR title.
fn bbox_size(title: &str) -> Option<(u16, u16)> {
    let bbox = title
        .split(';')
        .find_map(|prop| prop.trim().strip_prefix("bbox "))?;
    let coords = bbox
        .split_ascii_whitespace()
        .map(|c| c.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let [x0, y0, x1, y1] = coords[..] else {
        return None;
    };
    pixels(x1 - x0).zip(pixels(y1 - y0))
}
