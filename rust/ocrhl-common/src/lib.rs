//! Core definitions (errors, results, deadlines), relied upon by all ocrhl-* crates.

pub mod deadline;
pub mod error;
pub mod result;

pub use deadline::Deadline;
pub use result::Result;
