//! Temporary on-disk fixtures.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::data_gen::{Dialect, GeneratedDoc};

/// Writes `content` to a new temporary file with the given suffix.
pub fn write_temp_file(content: &[u8], suffix: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("ocrhl-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Writes a generated document to a temporary file named after its dialect.
pub fn write_doc(doc: &GeneratedDoc) -> anyhow::Result<NamedTempFile> {
    let suffix = match doc.dialect {
        Dialect::Alto => ".alto.xml",
        Dialect::Hocr => ".hocr",
        Dialect::MiniOcr => ".mini.xml",
    };
    write_temp_file(&doc.bytes, suffix)
}

/// Splits `content` into `parts` consecutive temporary files of roughly equal size.
pub fn write_split(content: &[u8], parts: usize) -> anyhow::Result<Vec<NamedTempFile>> {
    anyhow::ensure!(
        parts > 0 && parts <= content.len(),
        "cannot split {} bytes into {parts} parts",
        content.len()
    );
    let chunk = content.len().div_ceil(parts);
    content
        .chunks(chunk)
        .map(|c| write_temp_file(c, ".part"))
        .collect()
}
