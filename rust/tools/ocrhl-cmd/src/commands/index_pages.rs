//! Index-pages command implementation

use anyhow::{Context, Result};
use ocrhl::breaks::OcrFormat;
use ocrhl::write_page_index;

use crate::commands::{ReaderArgs, file_path_to_object_url, index_store, resolve_format};

pub fn run(
    args: &ReaderArgs,
    format: Option<OcrFormat>,
    pointer: String,
    out: String,
) -> Result<()> {
    let reader = args.open(&pointer)?;
    let format = resolve_format(&reader, format)?;
    let out_url = file_path_to_object_url(&out)?;

    let mut writer = index_store()
        .create(&out_url)
        .with_context(|| format!("Failed to create page index: {out_url}"))?;
    let pages = write_page_index(&reader, format, writer.as_mut())
        .with_context(|| format!("Failed to index pages of {pointer}"))?;

    println!("Indexed {pages} {format} pages of {} bytes into {out_url}", reader.len());
    Ok(())
}
