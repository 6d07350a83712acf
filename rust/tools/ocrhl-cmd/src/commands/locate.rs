//! Locate command implementation

use anyhow::Result;

use crate::commands::open_index;

pub fn run(index: String, offset: u64) -> Result<()> {
    let index = open_index(&index)?;
    println!(
        "Index: {} pages, features {}",
        index.num_pages(),
        index.features()
    );

    let Some((number, page)) = index.locate(offset)? else {
        println!("Offset {offset}: no page");
        return Ok(());
    };
    println!("Offset {offset}: page {number}");
    println!("  id:     {}", page.id.as_deref().unwrap_or("-"));
    match page.end_offset {
        Some(end) => println!("  span:   {}..{end}", page.start_offset),
        None => println!("  span:   {}..", page.start_offset),
    }
    if let Some(dimensions) = page.dimensions {
        println!("  size:   {}x{}", dimensions.width, dimensions.height);
    }
    Ok(())
}
