//! Synthetic OCR documents with known element offsets.
//!
//! The generators write ALTO, hOCR and MiniOCR markup for a grid of pages, blocks,
//! lines and words, and record the byte span of every element as it is written.
//! Tests use the spans as ground truth for boundary searches and page lookups.
//!
//! Word content is drawn from a fixed vocabulary that mixes ASCII with two-, three-
//! and four-byte UTF-8 characters, so offsets are byte offsets, not char offsets.

use std::fmt::Write;

/// Words used for content; several have multi-byte characters.
pub const VOCABULARY: &[&str] = &[
    "alpha", "Grüße", "東京", "river", "naïve", "stone", "café", "😀ok", "ledger", "ÆØÅ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Alto,
    Hocr,
    MiniOcr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Page,
    Block,
    Line,
    Word,
}

/// Shape of a generated document.
#[derive(Debug, Clone)]
pub struct DocShape {
    pub pages: usize,
    pub blocks_per_page: usize,
    pub lines_per_block: usize,
    pub words_per_line: usize,
    pub seed: u64,
}

impl Default for DocShape {
    fn default() -> Self {
        DocShape {
            pages: 3,
            blocks_per_page: 2,
            lines_per_block: 12,
            words_per_line: 4,
            seed: 42,
        }
    }
}

/// Byte span of one element: `start` is the offset of the `<` opening it, `end`
/// is just past its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub start: u64,
    pub end: u64,
    pub id: String,
    /// 1-based page number the element belongs to.
    pub page: usize,
    /// Word content, for word spans.
    pub text: Option<String>,
    /// Page width and height, for page spans.
    pub dimensions: Option<(u16, u16)>,
}

#[derive(Debug, Clone)]
pub struct GeneratedDoc {
    pub dialect: Dialect,
    pub bytes: Vec<u8>,
    pub pages: Vec<ElementSpan>,
    pub blocks: Vec<ElementSpan>,
    pub lines: Vec<ElementSpan>,
    pub words: Vec<ElementSpan>,
}

impl GeneratedDoc {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn spans(&self, level: Level) -> &[ElementSpan] {
        match level {
            Level::Page => &self.pages,
            Level::Block => &self.blocks,
            Level::Line => &self.lines,
            Level::Word => &self.words,
        }
    }

    /// Reference answer for a forward boundary search: the first element start
    /// strictly after `offset`, or the document length.
    pub fn following(&self, level: Level, offset: u64) -> u64 {
        self.spans(level)
            .iter()
            .map(|s| s.start)
            .find(|&start| start > offset)
            .unwrap_or(self.len())
    }

    /// Reference answer for a backward boundary search: the last element start
    /// strictly before `offset`, or 0.
    pub fn preceding(&self, level: Level, offset: u64) -> u64 {
        self.spans(level)
            .iter()
            .map(|s| s.start)
            .take_while(|&start| start < offset)
            .last()
            .unwrap_or(0)
    }

    /// The element of `level` whose span contains `offset`.
    pub fn enclosing(&self, level: Level, offset: u64) -> Option<&ElementSpan> {
        self.spans(level)
            .iter()
            .find(|s| s.start <= offset && offset < s.end)
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).expect("generated markup is UTF-8")
    }
}

pub fn generate(dialect: Dialect, shape: &DocShape) -> GeneratedDoc {
    let mut generator = Generator {
        dialect,
        out: String::new(),
        rng: fastrand::Rng::with_seed(shape.seed),
        doc: GeneratedDoc {
            dialect,
            bytes: Vec::new(),
            pages: Vec::new(),
            blocks: Vec::new(),
            lines: Vec::new(),
            words: Vec::new(),
        },
    };
    generator.document(shape);
    generator.doc.bytes = generator.out.into_bytes();
    generator.doc
}

pub fn generate_alto(shape: &DocShape) -> GeneratedDoc {
    generate(Dialect::Alto, shape)
}

pub fn generate_hocr(shape: &DocShape) -> GeneratedDoc {
    generate(Dialect::Hocr, shape)
}

pub fn generate_mini_ocr(shape: &DocShape) -> GeneratedDoc {
    generate(Dialect::MiniOcr, shape)
}

struct Generator {
    dialect: Dialect,
    out: String,
    rng: fastrand::Rng,
    doc: GeneratedDoc,
}

impl Generator {
    fn pos(&self) -> u64 {
        self.out.len() as u64
    }

    fn document(&mut self, shape: &DocShape) {
        match self.dialect {
            Dialect::Alto => self.out.push_str(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <alto xmlns=\"http://www.loc.gov/standards/alto/ns-v3#\">\
                 <Description><MeasurementUnit>pixel</MeasurementUnit></Description>\n<Layout>\n",
            ),
            Dialect::Hocr => self.out.push_str(
                "<!DOCTYPE html>\n<html><head><title>synthetic</title>\
                 <meta name=\"ocr-system\" content=\"ocrhl-testkit\"/>\
                 <meta name=\"ocr-capabilities\" content=\"ocr_page ocr_carea ocrx_block ocr_line ocrx_word\"/>\
                 </head>\n<body>\n",
            ),
            Dialect::MiniOcr => self.out.push_str("<ocr>\n"),
        }
        for page in 1..=shape.pages {
            self.page(page, shape);
        }
        match self.dialect {
            Dialect::Alto => self.out.push_str("</Layout>\n</alto>\n"),
            Dialect::Hocr => self.out.push_str("</body></html>\n"),
            Dialect::MiniOcr => self.out.push_str("</ocr>\n"),
        }
    }

    fn page(&mut self, page: usize, shape: &DocShape) {
        let (width, height) = (2000 + page as u16 * 10, 3000 + page as u16 * 10);
        let start = self.pos();
        let id = match self.dialect {
            Dialect::Alto => {
                let id = format!("page_{page}");
                let _ = write!(
                    self.out,
                    "<Page ID=\"{id}\" PHYSICAL_IMG_NR=\"{page}\" WIDTH=\"{width}\" HEIGHT=\"{height}\">\
                     <PrintSpace HPOS=\"0\" VPOS=\"0\" WIDTH=\"{width}\" HEIGHT=\"{height}\">\n"
                );
                id
            }
            Dialect::Hocr => {
                let id = format!("page_{page}");
                let _ = write!(
                    self.out,
                    "<div class=\"ocr_page\" id=\"{id}\" title=\"image page{page}.png; bbox 0 0 {width} {height}; ppageno {}\">\n",
                    page - 1
                );
                id
            }
            Dialect::MiniOcr => {
                let id = format!("p{page}");
                let _ = write!(self.out, "<p xml:id=\"{id}\" wh=\"{width} {height}\">\n");
                id
            }
        };
        for block in 1..=shape.blocks_per_page {
            self.block(page, block, shape);
        }
        match self.dialect {
            Dialect::Alto => self.out.push_str("</PrintSpace></Page>"),
            Dialect::Hocr => self.out.push_str("</div>"),
            Dialect::MiniOcr => self.out.push_str("</p>"),
        }
        let end = self.pos();
        self.out.push('\n');
        self.doc.pages.push(ElementSpan {
            start,
            end,
            id,
            page,
            text: None,
            dimensions: Some((width, height)),
        });
    }

    fn block(&mut self, page: usize, block: usize, shape: &DocShape) {
        let start = self.pos();
        let id = format!("block_{page}_{block}");
        match self.dialect {
            Dialect::Alto => {
                let _ = write!(self.out, "<TextBlock ID=\"{id}\">\n");
            }
            Dialect::Hocr => {
                // alternate the two block classes hOCR engines emit
                let class = if block % 2 == 1 { "ocr_carea" } else { "ocrx_block" };
                let _ = write!(
                    self.out,
                    "<div class=\"{class}\" id=\"{id}\" title=\"bbox 10 {} 1990 {}\">\n",
                    block * 100,
                    block * 100 + 90
                );
            }
            Dialect::MiniOcr => self.out.push_str("<b>\n"),
        }
        for line in 1..=shape.lines_per_block {
            self.line(page, block, line, shape);
        }
        match self.dialect {
            Dialect::Alto => self.out.push_str("</TextBlock>"),
            Dialect::Hocr => self.out.push_str("</div>"),
            Dialect::MiniOcr => self.out.push_str("</b>"),
        }
        let end = self.pos();
        self.out.push('\n');
        self.doc.blocks.push(ElementSpan {
            start,
            end,
            id,
            page,
            text: None,
            dimensions: None,
        });
    }

    fn line(&mut self, page: usize, block: usize, line: usize, shape: &DocShape) {
        let start = self.pos();
        let id = format!("line_{page}_{block}_{line}");
        match self.dialect {
            Dialect::Alto => {
                let _ = write!(self.out, "<TextLine ID=\"{id}\" HPOS=\"10\" VPOS=\"{}\">", line * 20);
            }
            Dialect::Hocr => {
                let class = match line % 7 {
                    0 => "ocr_header",
                    3 => "ocrx_line",
                    _ => "ocr_line",
                };
                let _ = write!(
                    self.out,
                    "<span class=\"{class}\" id=\"{id}\" title=\"bbox 10 {} 1990 {}; baseline 0 -3\">",
                    line * 20,
                    line * 20 + 18
                );
            }
            Dialect::MiniOcr => self.out.push_str("<l>"),
        }
        for word in 1..=shape.words_per_line {
            if word > 1 {
                match self.dialect {
                    Dialect::Alto => self.out.push_str("<SP/>"),
                    Dialect::Hocr | Dialect::MiniOcr => self.out.push(' '),
                }
            }
            self.word(page, format!("{id}_{word}"), word);
        }
        match self.dialect {
            Dialect::Alto => self.out.push_str("</TextLine>"),
            Dialect::Hocr => self.out.push_str("</span>"),
            Dialect::MiniOcr => self.out.push_str("</l>"),
        }
        let end = self.pos();
        self.out.push('\n');
        self.doc.lines.push(ElementSpan {
            start,
            end,
            id,
            page,
            text: None,
            dimensions: None,
        });
    }

    fn word(&mut self, page: usize, id: String, word: usize) {
        let text = VOCABULARY[self.rng.usize(..VOCABULARY.len())];
        let hpos = word * 120;
        let start = self.pos();
        match self.dialect {
            Dialect::Alto => {
                let _ = write!(
                    self.out,
                    "<String ID=\"{id}\" HPOS=\"{hpos}\" VPOS=\"0\" WIDTH=\"100\" HEIGHT=\"18\" CONTENT=\"{text}\"/>"
                );
            }
            Dialect::Hocr => {
                let _ = write!(
                    self.out,
                    "<span class=\"ocrx_word\" id=\"{id}\" title=\"bbox {hpos} 0 {} 18; x_wconf 93\">{text}</span>",
                    hpos + 100
                );
            }
            Dialect::MiniOcr => {
                let _ = write!(self.out, "<w x=\"0.{hpos:04} 0.1 0.05 0.01\">{text}</w>");
            }
        }
        let end = self.pos();
        self.doc.words.push(ElementSpan {
            start,
            end,
            id,
            page,
            text: Some(text.to_string()),
            dimensions: None,
        });
    }
}
