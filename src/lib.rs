//! Read-only InnoDB tablespace and redo log forensics.
//!
//! The `innodb-space` crate (library name `ibs`) parses and navigates the
//! on-disk structures of InnoDB tablespace files — pages, extents, file
//! segments, index B+Trees, records — and redo log files, exposing them
//! for inspection. It never opens a running database, never writes, and
//! never interprets transactional state beyond what is statically visible
//! on disk.
//!
//! # Quick example
//!
//! ```no_run
//! use ibs::innodb::space::Space;
//! use ibs::innodb::index::Btree;
//! use ibs::innodb::record::{ColumnDef, TableDescriber};
//!
//! // Open a tablespace; the page size is auto-detected from page 0.
//! let mut space = Space::open("table.ibd").unwrap();
//! println!("{} pages of {} bytes", space.pages(), space.page_size());
//!
//! // Columns are not stored on disk, so describe them to decode records.
//! let describer = TableDescriber {
//!     index_id: None,
//!     key: vec![ColumnDef::int("id", 4)],
//!     row: vec![ColumnDef::int("a", 4)],
//! };
//!
//! let mut btree = Btree::open(&mut space, 3).unwrap();
//! btree
//!     .each_record(&describer, |record| {
//!         println!("{}", record.key_string());
//!         Ok(())
//!     })
//!     .unwrap();
//! ```
//!
//! # Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`innodb::space`] | Open tablespace files, page iteration, accounting |
//! | [`innodb::page`] | FIL framing and the typed page factory |
//! | [`innodb::cursor`] | Positioned byte reads over page buffers |
//! | [`innodb::fsp`] | FSP space header and extent descriptors |
//! | [`innodb::inode`] | File segment inodes |
//! | [`innodb::list`] | Embedded doubly linked list protocol |
//! | [`innodb::index`] | INDEX pages and B+Tree traversal |
//! | [`innodb::record`] | Compact record decoding with describers |
//! | [`innodb::sys`] | Transaction system and data dictionary pages |
//! | [`innodb::log`] | Redo log blocks |
//! | [`innodb::checksum`] | Page checksum algorithms |

#[cfg(feature = "cli")]
pub mod cli;
pub mod innodb;

use thiserror::Error;

/// Errors returned by `ibs` operations.
///
/// The four variants match how a failure should be handled, not where it
/// happened: I/O failures are fatal, corruption names what the file got
/// wrong, schema errors mean the describer and the file disagree, and
/// usage errors are precondition failures on the caller's side.
#[derive(Error, Debug)]
pub enum IbsError {
    /// An I/O error (file missing, short read, permission).
    #[error("I/O error: {0}")]
    Io(String),

    /// Structural corruption: the bytes on disk are not what the format
    /// requires.
    #[error("corruption: {0}")]
    Corrupt(String),

    /// A describer is missing or disagrees with the file.
    #[error("schema error: {0}")]
    Schema(String),

    /// A precondition failure: out-of-range page, unknown list name.
    #[error("usage error: {0}")]
    Usage(String),
}
