//! B+Tree CLI modes: recursive traversal (text or DOT) and level walks.

use std::cell::RefCell;
use std::io::Write;

use colored::Colorize;

use crate::cli::describer;
use crate::innodb::index::{Btree, IndexPage};
use crate::innodb::space::Space;
use crate::IbsError;

fn write_err(e: std::io::Error) -> IbsError {
    IbsError::Io(format!("cannot write output: {}", e))
}

fn open(file: &str, page_size: Option<u32>) -> Result<Space, IbsError> {
    match page_size {
        Some(size) => Space::open_with_page_size(file, size),
        None => Space::open(file),
    }
}

fn key_string(fields: &[crate::innodb::record::Field]) -> String {
    fields
        .iter()
        .map(|f| format!("{}={}", f.name, f.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `ibspace recurse`: depth-first walk of a tree, as indented text or DOT.
pub fn recurse(
    file: &str,
    root: u32,
    describer_spec: &str,
    dot: bool,
    page_size: Option<u32>,
    writer: &mut dyn Write,
) -> Result<(), IbsError> {
    let schema = describer::resolve(describer_spec)?;
    let mut space = open(file, page_size)?;
    let mut btree = Btree::open(&mut space, root)?;

    // Both traversal callbacks write interleaved output.
    let writer = RefCell::new(writer);

    if dot {
        writeln!(writer.borrow_mut(), "digraph btree {{").map_err(write_err)?;
        writeln!(writer.borrow_mut(), "  node [shape=record];").map_err(write_err)?;
        btree.recurse(
            &schema,
            |page, header, _| {
                writeln!(
                    writer.borrow_mut(),
                    "  page_{} [label=\"page {}|level {}|{} records\"];",
                    page.page_number(),
                    page.page_number(),
                    header.level,
                    header.n_recs
                )
                .map_err(write_err)
            },
            |link, _| {
                writeln!(
                    writer.borrow_mut(),
                    "  page_{} -> page_{} [label=\"{}\"];",
                    link.parent,
                    link.child,
                    key_string(&link.child_min_key)
                )
                .map_err(write_err)
            },
        )?;
        writeln!(writer.borrow_mut(), "}}").map_err(write_err)?;
        return Ok(());
    }

    btree.recurse(
        &schema,
        |page, header, depth| {
            let indent = "  ".repeat(depth as usize);
            writeln!(
                writer.borrow_mut(),
                "{}page {} level {} ({} records)",
                indent,
                page.page_number().to_string().bold(),
                header.level,
                header.n_recs
            )
            .map_err(write_err)
        },
        |link, depth| {
            let indent = "  ".repeat(depth as usize + 1);
            writeln!(
                writer.borrow_mut(),
                "{}-> page {} from key ({})",
                indent,
                link.child,
                key_string(&link.child_min_key)
            )
            .map_err(write_err)
        },
    )?;
    Ok(())
}

/// `ibspace level`: pages at one level, left to right, with records on
/// leaves.
pub fn level(
    file: &str,
    root: u32,
    level: u16,
    describer_spec: &str,
    page_size: Option<u32>,
    writer: &mut dyn Write,
) -> Result<(), IbsError> {
    let schema = describer::resolve(describer_spec)?;
    let mut space = open(file, page_size)?;
    let mut btree = Btree::open(&mut space, root)?;

    btree.each_page_at_level(level, &schema, |page, header| {
        writeln!(
            writer,
            "page {} level {} ({} records, next {:?})",
            page.page_number().to_string().bold(),
            header.level,
            header.n_recs,
            page.fil().next()
        )
        .map_err(write_err)?;
        if level == 0 {
            let view = IndexPage::new(page)?;
            for record in view.records(&schema)? {
                writeln!(
                    writer,
                    "  ({}){}",
                    record.key_string(),
                    if record.deleted() { " [deleted]" } else { "" }
                )
                .map_err(write_err)?;
            }
        }
        Ok(())
    })?;
    Ok(())
}
