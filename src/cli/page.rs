//! Single-page CLI modes: hex dump and page accounting.

use std::io::Write;

use colored::Colorize;

use crate::innodb::space::Space;
use crate::IbsError;

fn write_err(e: std::io::Error) -> IbsError {
    IbsError::Io(format!("cannot write output: {}", e))
}

fn json_err(e: serde_json::Error) -> IbsError {
    IbsError::Io(format!("cannot serialize output: {}", e))
}

fn open(file: &str, page_size: Option<u32>) -> Result<Space, IbsError> {
    match page_size {
        Some(size) => Space::open_with_page_size(file, size),
        None => Space::open(file),
    }
}

/// `ibspace dump`: FIL framing summary plus a hex dump of the page.
pub fn dump(
    file: &str,
    page_number: u64,
    page_size: Option<u32>,
    writer: &mut dyn Write,
) -> Result<(), IbsError> {
    let mut space = open(file, page_size)?;
    let page = space.page(page_number)?;
    let fil = page.fil();

    writeln!(
        writer,
        "page {} type {} space {} lsn {}",
        fil.page_number,
        fil.page_type.to_string().green(),
        fil.space_id,
        fil.lsn
    )
    .map_err(write_err)?;
    writeln!(
        writer,
        "prev {:?} next {:?} checksum 0x{:08x} ({})",
        fil.prev(),
        fil.next(),
        fil.checksum,
        if page.checksum_ok() {
            "ok".green()
        } else {
            "stale".yellow()
        }
    )
    .map_err(write_err)?;
    if !page.lsn_consistent() {
        writeln!(writer, "{}", "trailer LSN does not match header".yellow())
            .map_err(write_err)?;
    }
    writeln!(writer).map_err(write_err)?;

    let data = page.data();
    for (i, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (0x20..0x7F).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        writeln!(writer, "{:06x}  {:<47}  |{}|", i * 16, hex.join(" "), ascii)
            .map_err(write_err)?;
    }
    Ok(())
}

/// `ibspace account`: where one page sits in the space's bookkeeping.
pub fn account(
    file: &str,
    page_number: u32,
    page_size: Option<u32>,
    json: bool,
    writer: &mut dyn Write,
) -> Result<(), IbsError> {
    let mut space = open(file, page_size)?;
    let account = space.page_account(page_number)?;

    if json {
        let out = serde_json::to_string_pretty(&account).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    writeln!(writer, "page {}", account.page_number.to_string().bold()).map_err(write_err)?;
    writeln!(
        writer,
        "  extent descriptor at (page {}, offset {}), state {}",
        account.xdes_position.page, account.xdes_position.offset, account.extent_state
    )
    .map_err(write_err)?;
    writeln!(
        writer,
        "  bitmap says {}",
        if account.free { "free" } else { "in use" }
    )
    .map_err(write_err)?;
    match account.fseg_id {
        Some(id) => writeln!(writer, "  owned by fseg {}", id).map_err(write_err)?,
        None => writeln!(writer, "  not owned by any fseg").map_err(write_err)?,
    }
    if let Some(position) = account.inode_position {
        writeln!(
            writer,
            "  inode entry at (page {}, offset {})",
            position.page, position.offset
        )
        .map_err(write_err)?;
    }
    if let Some(membership) = &account.membership {
        writeln!(writer, "  tracked via {}", membership).map_err(write_err)?;
    }
    if let Some(root) = account.index_root {
        writeln!(writer, "  belongs to the index rooted at page {}", root)
            .map_err(write_err)?;
    }
    Ok(())
}
