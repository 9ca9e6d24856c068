//! InnoDB page type definitions.
//!
//! Maps the 2-byte page type field (bytes 24-25 of the FIL header) to a
//! [`PageType`] enum. Each variant carries its MySQL source name and a
//! human-readable description.
//!
//! Covers the page types a read-only format walk can encounter in an
//! uncompressed, unencrypted tablespace: the space management pages
//! (FSP_HDR, XDES, INODE, IBUF bitmap), the system pages (SYS, TRX_SYS),
//! B+Tree INDEX pages, BLOB pages, and freshly allocated pages. Types this
//! crate does not interpret are preserved as [`PageType::Other`] with their
//! raw value so nothing is silently collapsed.

use serde::Serialize;
use std::fmt;

/// Page types from `fil0fil.h`, keyed by the FIL header type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageType {
    /// Freshly allocated, type field not initialized (FIL_PAGE_TYPE_ALLOCATED = 0)
    Allocated,
    /// Undo log page (FIL_PAGE_UNDO_LOG = 2)
    UndoLog,
    /// File segment inode (FIL_PAGE_INODE = 3)
    Inode,
    /// Insert buffer free list (FIL_PAGE_IBUF_FREE_LIST = 4)
    IbufFreeList,
    /// Insert buffer bitmap (FIL_PAGE_IBUF_BITMAP = 5)
    IbufBitmap,
    /// System internal page (FIL_PAGE_TYPE_SYS = 6)
    Sys,
    /// Transaction system header (FIL_PAGE_TYPE_TRX_SYS = 7)
    TrxSys,
    /// File space header, page 0 of each tablespace (FIL_PAGE_TYPE_FSP_HDR = 8)
    FspHdr,
    /// Extent descriptor (FIL_PAGE_TYPE_XDES = 9)
    Xdes,
    /// Uncompressed BLOB page (FIL_PAGE_TYPE_BLOB = 10)
    Blob,
    /// First compressed BLOB page (FIL_PAGE_TYPE_ZBLOB = 11)
    ZBlob,
    /// Subsequent compressed BLOB page (FIL_PAGE_TYPE_ZBLOB2 = 12)
    ZBlob2,
    /// Unknown/reserved (FIL_PAGE_TYPE_UNKNOWN = 13)
    Unknown,
    /// SDI index page (FIL_PAGE_SDI = 17853, MySQL 8.0+)
    Sdi,
    /// R-tree index page for spatial indexes (FIL_PAGE_RTREE = 17854)
    Rtree,
    /// B+Tree index page for table and index data (FIL_PAGE_INDEX = 17855)
    Index,
    /// Any type code this crate does not interpret; raw value preserved.
    Other(u16),
}

impl PageType {
    /// Parse a page type from a u16 value read from the FIL header.
    pub fn from_u16(val: u16) -> Self {
        match val {
            0 => PageType::Allocated,
            2 => PageType::UndoLog,
            3 => PageType::Inode,
            4 => PageType::IbufFreeList,
            5 => PageType::IbufBitmap,
            6 => PageType::Sys,
            7 => PageType::TrxSys,
            8 => PageType::FspHdr,
            9 => PageType::Xdes,
            10 => PageType::Blob,
            11 => PageType::ZBlob,
            12 => PageType::ZBlob2,
            13 => PageType::Unknown,
            17853 => PageType::Sdi,
            17854 => PageType::Rtree,
            17855 => PageType::Index,
            v => PageType::Other(v),
        }
    }

    /// The raw on-disk type code.
    pub fn to_u16(&self) -> u16 {
        match self {
            PageType::Allocated => 0,
            PageType::UndoLog => 2,
            PageType::Inode => 3,
            PageType::IbufFreeList => 4,
            PageType::IbufBitmap => 5,
            PageType::Sys => 6,
            PageType::TrxSys => 7,
            PageType::FspHdr => 8,
            PageType::Xdes => 9,
            PageType::Blob => 10,
            PageType::ZBlob => 11,
            PageType::ZBlob2 => 12,
            PageType::Unknown => 13,
            PageType::Sdi => 17853,
            PageType::Rtree => 17854,
            PageType::Index => 17855,
            PageType::Other(v) => *v,
        }
    }

    /// MySQL source-style name for this page type.
    pub fn name(&self) -> &'static str {
        match self {
            PageType::Allocated => "ALLOCATED",
            PageType::UndoLog => "UNDO_LOG",
            PageType::Inode => "INODE",
            PageType::IbufFreeList => "IBUF_FREE_LIST",
            PageType::IbufBitmap => "IBUF_BITMAP",
            PageType::Sys => "SYS",
            PageType::TrxSys => "TRX_SYS",
            PageType::FspHdr => "FSP_HDR",
            PageType::Xdes => "XDES",
            PageType::Blob => "BLOB",
            PageType::ZBlob => "ZBLOB",
            PageType::ZBlob2 => "ZBLOB2",
            PageType::Unknown => "UNKNOWN",
            PageType::Sdi => "SDI",
            PageType::Rtree => "RTREE",
            PageType::Index => "INDEX",
            PageType::Other(_) => "OTHER",
        }
    }

    /// Short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            PageType::Allocated => "Freshly allocated page",
            PageType::UndoLog => "Undo log page",
            PageType::Inode => "File segment inode page",
            PageType::IbufFreeList => "Insert buffer free list",
            PageType::IbufBitmap => "Insert buffer bitmap",
            PageType::Sys => "System internal page",
            PageType::TrxSys => "Transaction system header",
            PageType::FspHdr => "File space header",
            PageType::Xdes => "Extent descriptor page",
            PageType::Blob => "Uncompressed BLOB page",
            PageType::ZBlob => "First compressed BLOB page",
            PageType::ZBlob2 => "Subsequent compressed BLOB page",
            PageType::Unknown => "Unknown page type",
            PageType::Sdi => "Serialized dictionary information",
            PageType::Rtree => "Spatial index page",
            PageType::Index => "B+Tree index page",
            PageType::Other(_) => "Uninterpreted page type",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageType::Other(v) => write!(f, "OTHER({})", v),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u16_known_types() {
        assert_eq!(PageType::from_u16(0), PageType::Allocated);
        assert_eq!(PageType::from_u16(3), PageType::Inode);
        assert_eq!(PageType::from_u16(7), PageType::TrxSys);
        assert_eq!(PageType::from_u16(8), PageType::FspHdr);
        assert_eq!(PageType::from_u16(9), PageType::Xdes);
        assert_eq!(PageType::from_u16(17855), PageType::Index);
    }

    #[test]
    fn test_from_u16_other_preserves_value() {
        assert_eq!(PageType::from_u16(999), PageType::Other(999));
        assert_eq!(PageType::Other(999).to_u16(), 999);
        assert_eq!(format!("{}", PageType::Other(999)), "OTHER(999)");
    }

    #[test]
    fn test_round_trip() {
        for v in [0u16, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 17853, 17854, 17855] {
            assert_eq!(PageType::from_u16(v).to_u16(), v);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(format!("{}", PageType::Index), "INDEX");
        assert_eq!(format!("{}", PageType::FspHdr), "FSP_HDR");
    }
}
