//! Page index files: per-page byte spans, identifiers and dimensions of an OCR
//! document, for locating the page of a source offset without reading markup.
//!
//! ```text
//! header   "OCRIDX" | version: u8 | features: u8 | [count: u16, with identifiers]
//! records  offset: u32 | [length: u32] | [id pointer: u32, 0 = none] | [width: u16, height: u16]
//! tail     NUL-terminated UTF-8 identifiers, addressed by absolute file offset
//! ```
//!
//! All integers are little-endian. A record of all zeros stands for a page
//! without a record.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::PageIndexReader;
pub use record::{Dimensions, Features, PageRecord};
pub use writer::{PageIndexWriter, encode_index, write_index};

pub const MAGIC: &[u8] = b"OCRIDX";

pub const VERSION: u8 = 1;
