//! Test utilities for the ocrhl crates.
//!
//! - `data_gen`: deterministic synthetic ALTO, hOCR and MiniOCR documents, with the
//!   byte span of every page, block, line and word recorded as ground truth
//! - `temp`: writing fixtures to temporary files

pub mod data_gen;
pub mod temp;
