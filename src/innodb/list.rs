//! Doubly linked lists embedded in pages.
//!
//! InnoDB threads list structures through fixed offsets inside pages: a
//! base node ([`ListBaseNode`]: length, first, last) lives in whatever
//! structure owns the list, and each member carries a node
//! ([`ListNode`]: prev, next). Pointers are [`FilAddr`] values, a page
//! number plus a byte offset within that page.
//!
//! Nodes are owned by their pages; a list is a lookup protocol, not an
//! owning container. Walking therefore needs page reads and lives on
//! [`Space`](crate::innodb::space::Space); this module supplies the decoded
//! pointer types and the [`ListEntryDecoder`] trait that turns a node
//! address into a typed entry (an XDES entry, an INODE page). The base
//! node's `length` bounds every walk, which is also what makes pointer
//! cycles detectable.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::page::Page;
use crate::IbsError;

/// A 6-byte FIL address: page number and byte offset within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilAddr {
    /// Page number; FIL_NULL marks a null address.
    pub page: u32,
    /// Byte offset within the page.
    pub offset: u16,
}

impl FilAddr {
    /// Parse a FIL address from a 6-byte slice.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FIL_ADDR_SIZE {
            return None;
        }
        Some(FilAddr {
            page: BigEndian::read_u32(&data[0..]),
            offset: BigEndian::read_u16(&data[4..]),
        })
    }

    /// True if the page number is FIL_NULL. The offset is ignored for null
    /// addresses.
    pub fn is_null(&self) -> bool {
        self.page == FIL_NULL
    }

    /// The address as an option, treating FIL_NULL as absent.
    pub fn some(self) -> Option<FilAddr> {
        (!self.is_null()).then_some(self)
    }
}

/// List base node: 4-byte length plus first and last addresses (16 bytes).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ListBaseNode {
    /// Number of nodes in the list.
    pub length: u32,
    /// Address of the first node, if any.
    pub first: Option<FilAddr>,
    /// Address of the last node, if any.
    pub last: Option<FilAddr>,
}

impl ListBaseNode {
    /// Parse a list base node from a 16-byte slice.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FLST_BASE_NODE_SIZE {
            return None;
        }
        Some(ListBaseNode {
            length: BigEndian::read_u32(&data[0..]),
            first: FilAddr::parse(&data[4..])?.some(),
            last: FilAddr::parse(&data[4 + FIL_ADDR_SIZE..])?.some(),
        })
    }

    /// True if the list holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// List node: prev and next addresses (12 bytes).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ListNode {
    /// Address of the previous node, if any.
    pub prev: Option<FilAddr>,
    /// Address of the next node, if any.
    pub next: Option<FilAddr>,
}

impl ListNode {
    /// Parse a list node from a 12-byte slice.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FLST_NODE_SIZE {
            return None;
        }
        Some(ListNode {
            prev: FilAddr::parse(&data[0..])?.some(),
            next: FilAddr::parse(&data[FIL_ADDR_SIZE..])?.some(),
        })
    }
}

/// Turns a list node address into a typed entry.
///
/// A list pointer addresses the embedded [`ListNode`], not the start of the
/// structure that carries it; each decoder knows the node's offset within
/// its entry type and decodes the whole entry from the surrounding page.
pub trait ListEntryDecoder {
    /// The typed entry a node address resolves to.
    type Entry;

    /// Decode the entry whose list node is at `addr` within `page`, and the
    /// node itself for continued traversal.
    fn decode(&self, page: &Page, addr: FilAddr) -> Result<(Self::Entry, ListNode), IbsError>;
}
