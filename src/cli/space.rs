//! Space-level CLI modes: summary, extents, inodes, indexes, lists.

use std::io::Write;

use colored::Colorize;
use serde_json::json;

use crate::innodb::fsp::XdesListDecoder;
use crate::innodb::space::Space;
use crate::IbsError;

/// Options shared by the space-level modes.
pub struct SpaceOptions {
    /// Path to the tablespace file.
    pub file: String,
    /// Explicit page size, if auto-detection should be bypassed.
    pub page_size: Option<u32>,
    /// Emit JSON instead of text.
    pub json: bool,
}

fn open(options: &SpaceOptions) -> Result<Space, IbsError> {
    match options.page_size {
        Some(size) => Space::open_with_page_size(&options.file, size),
        None => Space::open(&options.file),
    }
}

fn write_err(e: std::io::Error) -> IbsError {
    IbsError::Io(format!("cannot write output: {}", e))
}

fn json_err(e: serde_json::Error) -> IbsError {
    IbsError::Io(format!("cannot serialize output: {}", e))
}

/// `ibspace summary`: header fields and page type regions.
pub fn summary(options: &SpaceOptions, writer: &mut dyn Write) -> Result<(), IbsError> {
    let mut space = open(options)?;

    let mut regions = Vec::new();
    space.each_page_type_region(|region| {
        regions.push(region.clone());
        Ok(())
    })?;

    if options.json {
        let out = json!({
            "file": options.file,
            "page_size": space.page_size(),
            "pages": space.pages(),
            "space_id": space.space_id(),
            "system_space": space.is_system_space(),
            "fsp": space.fsp(),
            "regions": regions,
        });
        let out = serde_json::to_string_pretty(&out).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    writeln!(writer, "{}", options.file.bold()).map_err(write_err)?;
    writeln!(
        writer,
        "  {} pages of {} bytes ({} bytes total)",
        space.pages(),
        space.page_size(),
        space.file_size()
    )
    .map_err(write_err)?;
    if let Some(fsp) = space.fsp() {
        writeln!(
            writer,
            "  space id {}, size {}, free limit {}, flags 0x{:08x}",
            fsp.space_id, fsp.size, fsp.free_limit, fsp.flags
        )
        .map_err(write_err)?;
        writeln!(
            writer,
            "  frag pages used {}, next fseg id {}",
            fsp.frag_n_used, fsp.fseg_id
        )
        .map_err(write_err)?;
        for (name, base) in fsp.each_xdes_list() {
            writeln!(writer, "  list {:<10} length {}", name, base.length).map_err(write_err)?;
        }
    }
    if space.is_system_space() {
        writeln!(writer, "  {}", "system tablespace".cyan()).map_err(write_err)?;
    }

    writeln!(writer).map_err(write_err)?;
    for region in &regions {
        writeln!(
            writer,
            "  {:>8}..{:<8} {:>6} x {}",
            region.start,
            region.end,
            region.count,
            region.page_type.name().green()
        )
        .map_err(write_err)?;
    }
    Ok(())
}

/// `ibspace extents`: one line per extent descriptor.
pub fn extents(options: &SpaceOptions, writer: &mut dyn Write) -> Result<(), IbsError> {
    let mut space = open(options)?;

    let mut entries = Vec::new();
    space.each_xdes(|entry| {
        entries.push(entry.clone());
        Ok(())
    })?;

    if options.json {
        let out = serde_json::to_string_pretty(&entries).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    for entry in &entries {
        writeln!(
            writer,
            "extent {:>8}..{:<8} {:>10} fseg {:<6} {:>2} pages used",
            entry.start_page,
            entry.start_page + crate::innodb::constants::PAGES_PER_EXTENT - 1,
            entry.state.name(),
            entry.fseg_id,
            entry.used_pages()
        )
        .map_err(write_err)?;
    }
    Ok(())
}

/// `ibspace inodes`: one block per in-use file segment.
pub fn inodes(options: &SpaceOptions, writer: &mut dyn Write) -> Result<(), IbsError> {
    let mut space = open(options)?;

    let mut entries = Vec::new();
    space.each_inode(|inode| {
        entries.push(inode.clone());
        Ok(())
    })?;

    if options.json {
        let out = serde_json::to_string_pretty(&entries).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    for inode in &entries {
        writeln!(
            writer,
            "fseg {} at page {} offset {}",
            inode.fseg_id.to_string().bold(),
            inode.position.page,
            inode.position.offset
        )
        .map_err(write_err)?;
        writeln!(
            writer,
            "  frag pages {:?}",
            inode.frag_pages().collect::<Vec<_>>()
        )
        .map_err(write_err)?;
        for (name, base) in inode.each_list() {
            writeln!(writer, "  list {:<9} length {}", name, base.length).map_err(write_err)?;
        }
        writeln!(
            writer,
            "  {} of {} pages used ({:.1}%)",
            inode.used_pages(),
            inode.total_pages(),
            inode.fill_factor() * 100.0
        )
        .map_err(write_err)?;
    }
    Ok(())
}

/// `ibspace indexes`: root page and id of every index in the space.
pub fn indexes(options: &SpaceOptions, writer: &mut dyn Write) -> Result<(), IbsError> {
    let mut space = open(options)?;

    let mut found = Vec::new();
    space.each_index(|descriptor| {
        found.push(*descriptor);
        Ok(())
    })?;

    if options.json {
        let out = serde_json::to_string_pretty(&found).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    for descriptor in &found {
        writeln!(
            writer,
            "index {:>6} root page {}",
            descriptor.index_id, descriptor.root_page_number
        )
        .map_err(write_err)?;
    }
    Ok(())
}

/// `ibspace list`: walk one space-level extent list by name.
pub fn list(
    options: &SpaceOptions,
    name: &str,
    writer: &mut dyn Write,
) -> Result<(), IbsError> {
    let mut space = open(options)?;
    let base = space.xdes_list(name)?;

    let mut entries = Vec::new();
    space.each_list_entry(&base, &XdesListDecoder, |addr, entry| {
        entries.push((addr, entry));
        Ok(())
    })?;

    if options.json {
        let out: Vec<_> = entries
            .iter()
            .map(|(addr, entry)| json!({"address": addr, "entry": entry}))
            .collect();
        let out = serde_json::to_string_pretty(&out).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    writeln!(writer, "list {} length {}", name.bold(), base.length).map_err(write_err)?;
    for (addr, entry) in &entries {
        writeln!(
            writer,
            "  (page {}, offset {}) extent starting at page {}",
            addr.page, addr.offset, entry.start_page
        )
        .map_err(write_err)?;
    }
    Ok(())
}
