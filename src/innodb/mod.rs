//! InnoDB on-disk format parsing.
//!
//! This module contains the read-only parsers for the structures a
//! tablespace file is built from: FIL-framed pages, the FSP space header
//! and extent descriptors, file segment inodes, the embedded list
//! protocol, B+Tree INDEX pages and compact records, the system
//! tablespace's transaction system and data dictionary pages, and redo log
//! blocks.
//!
//! Start with [`space::Space`] to open a tablespace file, or
//! [`log::LogFile`] for a redo log. Typed page views are constructed
//! through [`page::Page::view`].

pub mod checksum;
pub mod constants;
pub mod cursor;
pub mod fsp;
pub mod index;
pub mod inode;
pub mod list;
pub mod log;
pub mod page;
pub mod page_types;
pub mod record;
pub mod space;
pub mod sys;
