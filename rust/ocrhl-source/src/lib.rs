//! Byte-exact, section-cached access to OCR documents.
//!
//! A [`SourcePointer`] names one or more files (or object URLs) and optional byte
//! regions within them. A [`SourceResolver`] opens the pointer and returns a
//! [`SourceReader`], which presents everything as one logical byte space and
//! serves reads through a small per-reader [`SectionCache`].

pub mod options;
pub mod pointer;
pub mod reader;
pub mod resolver;
pub mod section;

pub use options::SourceReaderOptions;
pub use pointer::{FileSource, Region, SourcePointer};
pub use reader::{PhysicalLocation, SourceReader};
pub use resolver::SourceResolver;
pub use section::{CacheStats, Section, SectionCache};
