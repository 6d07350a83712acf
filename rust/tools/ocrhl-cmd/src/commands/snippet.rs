//! Snippet command implementation

use std::ops::Range;

use anyhow::{Context, Result};
use ocrhl::breaks::OcrFormat;
use ocrhl::snippet::SnippetLocator;

use crate::commands::{ReaderArgs, open_index, resolve_format};

pub fn run(
    args: &ReaderArgs,
    format: Option<OcrFormat>,
    context: usize,
    index: Option<String>,
    pointer: String,
    match_range: Range<u64>,
) -> Result<()> {
    let reader = args.open(&pointer)?;
    let format = resolve_format(&reader, format)?;
    let index = index.as_deref().map(open_index).transpose()?;

    let mut locator = SnippetLocator::new(&reader, format).with_context_size(context);
    if let Some(index) = &index {
        locator = locator.with_page_index(index);
    }
    let snippet = locator
        .locate(match_range.clone())
        .with_context(|| format!("Failed to locate snippet for {match_range:?}"))?;

    match &snippet.page {
        Some(page) => println!(
            "Page {} at {}, snippet {}..{}",
            page.id.as_deref().unwrap_or("-"),
            page.start_offset,
            snippet.range.start,
            snippet.range.end
        ),
        None => println!("No page, snippet {}..{}", snippet.range.start, snippet.range.end),
    }
    println!("{}", snippet.text);

    let stats = reader.cache_stats();
    log::debug!(
        "section cache: {} hits, {} misses, {} evictions",
        stats.hits,
        stats.misses,
        stats.evictions
    );
    Ok(())
}
