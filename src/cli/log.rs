//! Redo log CLI mode.

use std::io::Write;

use colored::Colorize;
use serde_json::json;

use crate::innodb::log::LogFile;
use crate::IbsError;

fn write_err(e: std::io::Error) -> IbsError {
    IbsError::Io(format!("cannot write output: {}", e))
}

fn json_err(e: serde_json::Error) -> IbsError {
    IbsError::Io(format!("cannot serialize output: {}", e))
}

/// `ibspace log`: checkpoints plus one line per data block.
pub fn blocks(file: &str, json: bool, writer: &mut dyn Write) -> Result<(), IbsError> {
    let mut log = LogFile::open(file)?;

    let checkpoints = [log.checkpoint(0)?, log.checkpoint(1)?];

    let mut blocks = Vec::new();
    log.each_block(|block| {
        blocks.push(block.clone());
        Ok(())
    })?;

    if json {
        let out = json!({
            "file": file,
            "data_blocks": log.data_block_count(),
            "checkpoints": checkpoints,
            "blocks": blocks,
        });
        let out = serde_json::to_string_pretty(&out).map_err(json_err)?;
        writeln!(writer, "{}", out).map_err(write_err)?;
        return Ok(());
    }

    writeln!(
        writer,
        "{}: {} data blocks",
        file.bold(),
        log.data_block_count()
    )
    .map_err(write_err)?;
    for (slot, cp) in checkpoints.iter().enumerate() {
        writeln!(
            writer,
            "checkpoint {}: number {} lsn {}",
            slot, cp.number, cp.lsn
        )
        .map_err(write_err)?;
    }

    for block in &blocks {
        let record = match &block.record {
            Some(r) => format!(
                "{} space {} page {}",
                r.record_type, r.space, r.page_number
            ),
            None => "no record group".dimmed().to_string(),
        };
        writeln!(
            writer,
            "block {:>6} len {:>4} first_rec {:>4} {} {}",
            block.number,
            block.header.data_length,
            block.header.first_rec_group,
            if block.checksum_valid {
                "ok".green()
            } else {
                "bad".red()
            },
            record
        )
        .map_err(write_err)?;
    }
    Ok(())
}
