//! Sections command implementation

use anyhow::Result;

use crate::commands::ReaderArgs;

pub fn run(args: &ReaderArgs, pointer: String, offset: u64) -> Result<()> {
    let reader = args.open(&pointer)?;
    println!("Pointer: {}", reader.pointer());
    println!(
        "Length:  {} bytes in {} source(s){}",
        reader.len(),
        reader.pointer().sources.len(),
        if reader.is_ascii() { ", ascii" } else { "" }
    );

    let section = reader.get_ascii_section(offset)?;
    println!(
        "Section: {}..{} ({} bytes of {})",
        section.start,
        section.end,
        section.end - section.start,
        reader.section_size()
    );
    match reader.locate_physical(offset) {
        Some(location) => println!(
            "Offset {offset}: source #{} ({}) at byte {}",
            location.source,
            reader.pointer().sources[location.source].path,
            location.offset
        ),
        None => println!("Offset {offset}: padding"),
    }

    let preview_len = (section.end - offset).min(80) as usize;
    let preview = reader.read_ascii_string(offset, preview_len)?;
    println!("Text:    {preview:?}");
    Ok(())
}
