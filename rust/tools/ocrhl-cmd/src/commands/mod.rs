//! Command implementations for ocrhl-cmd

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ocrhl::breaks::OcrFormat;
use ocrhl::objectstore::{ObjectStore, local_store::LocalFsObjectStore, url::ObjectUrl};
use ocrhl::page_index::PageIndexReader;
use ocrhl::source::{SourceReader, SourceReaderOptions, SourceResolver};

pub mod index_pages;
pub mod locate;
pub mod sections;
pub mod snippet;

/// Reader tuning shared by the commands that open a source pointer.
#[derive(clap::Args, Debug, Clone)]
pub struct ReaderArgs {
    /// Size of a cached section in bytes
    #[arg(long, global = true, default_value_t = SourceReaderOptions::DEFAULT_SECTION_SIZE)]
    pub section_size: usize,

    /// Number of sections kept in memory
    #[arg(long, global = true, default_value_t = SourceReaderOptions::DEFAULT_MAX_CACHED_SECTIONS)]
    pub cache_sections: usize,
}

impl ReaderArgs {
    pub fn options(&self) -> SourceReaderOptions {
        SourceReaderOptions::default()
            .with_section_size(self.section_size)
            .with_max_cached_sections(self.cache_sections)
    }

    pub fn open(&self, pointer: &str) -> Result<SourceReader> {
        SourceResolver::default()
            .with_options(self.options())
            .open_str(pointer)
            .with_context(|| format!("Failed to open source pointer: {pointer}"))
    }
}

/// Returns `format`, or the format detected from the start of the text.
pub fn resolve_format(reader: &SourceReader, format: Option<OcrFormat>) -> Result<OcrFormat> {
    if let Some(format) = format {
        return Ok(format);
    }
    OcrFormat::detect(reader)?.with_context(|| {
        format!(
            "Cannot detect the OCR format of {}; pass --format",
            reader.pointer()
        )
    })
}

/// Converts a file path string to an `ObjectUrl`.
///
/// If the input string is already a URL, it validates and returns it.
/// If the input is a file path (absolute or relative), it converts it to a file:// URL.
pub fn file_path_to_object_url(path_or_url: &str) -> Result<ObjectUrl> {
    if let Ok(object_url) = ObjectUrl::parse(path_or_url) {
        return Ok(object_url);
    }

    let path = Path::new(path_or_url);
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .with_context(|| "Failed to get current directory")?
            .join(path)
    };

    ObjectUrl::from_file_path(&absolute_path)
        .with_context(|| format!("Invalid file URL for path: {}", absolute_path.display()))
}

pub fn open_index(index: &str) -> Result<PageIndexReader> {
    let url = file_path_to_object_url(index)?;
    let reader = index_store()
        .open(&url)
        .with_context(|| format!("Failed to open page index: {url}"))?;
    PageIndexReader::open(reader).with_context(|| format!("Invalid page index: {url}"))
}

/// Object store for index files; the local file system, addressed by `file://` URLs.
pub fn index_store() -> Arc<dyn ObjectStore> {
    Arc::new(LocalFsObjectStore::new_unscoped())
}
