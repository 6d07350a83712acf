//! # ocrhl: out-of-core access to OCR markup for highlighting
//!
//! Highlighting a match inside an OCR document needs a few hundred bytes of
//! markup around it and the page it sits on. Documents are large and often
//! split across files, so nothing here loads a whole document: text is read
//! in cached sections, boundaries are found by scanning for tags, and pages
//! are looked up in a compact side file.
//!
//! ## Module Organization
//!
//! * [`source`] - source pointers and the section-cached [`source::SourceReader`]
//! * [`breaks`] - break locators for ALTO, hOCR and MiniOCR markup, and
//!   context-limited passages
//! * [`page_index`] - the page index file format
//! * [`pages`] - page records built from markup, for writing page indexes
//! * [`snippet`] - match ranges to snippets with page metadata
//! * [`io`], [`io_impl`] - random-access I/O and the page cache warmer
//! * [`objectstore`] - URL-addressed sources
//! * [`common`] - errors, deadlines and shared helpers
//!
//! ## Getting Started
//!
//! ```no_run
//! use ocrhl::breaks::OcrFormat;
//! use ocrhl::snippet::SnippetLocator;
//! use ocrhl::source::SourceResolver;
//!
//! # fn main() -> ocrhl::common::Result<()> {
//! let reader = SourceResolver::default().open_str("/data/doc_a.hocr+/data/doc_b.hocr")?;
//! let format = OcrFormat::detect(&reader)?.unwrap_or(OcrFormat::Hocr);
//! let snippet = SnippetLocator::new(&reader, format)
//!     .with_context_size(2)
//!     .locate(10_240..10_250)?;
//! println!("{}", snippet.text);
//! # Ok(())
//! # }
//! ```

pub use ocrhl_breaks as breaks;
pub use ocrhl_common as common;
pub use ocrhl_io as io;
pub use ocrhl_io_impl as io_impl;
pub use ocrhl_objectstore as objectstore;
pub use ocrhl_page_index as page_index;
pub use ocrhl_source as source;

pub mod pages;
pub mod snippet;

pub use pages::{build_page_records, write_page_index};
pub use snippet::{Snippet, SnippetLocator};
