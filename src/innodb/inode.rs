//! INODE pages and file segment (FSEG) descriptors.
//!
//! A file segment owns the storage for one half of an index (its leaf pages
//! or its internal pages). Each segment is described by a 192-byte
//! [`InodeEntry`]: the segment id, three extent lists (FREE, NOT_FULL,
//! FULL), a used-page counter for the NOT_FULL list, and an array of 32
//! fragment page slots used before the segment graduates to whole extents.
//!
//! INODE pages carry a list node at byte 38 (linking them into the space's
//! `full_inodes`/`free_inodes` lists) followed by the entry array: 85
//! entries on a 16 KiB page.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::list::{FilAddr, ListBaseNode, ListEntryDecoder, ListNode};
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IbsError;

/// A 10-byte FSEG header pointer: the location of an inode entry.
///
/// Stored in INDEX page roots (leaf and internal segment) and in the
/// transaction system header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FsegPointer {
    /// Space ID of the inode.
    pub space_id: u32,
    /// Page number of the INODE page.
    pub page_number: u32,
    /// Byte offset of the inode entry within the page.
    pub offset: u16,
}

impl FsegPointer {
    /// Parse an FSEG pointer from a 10-byte slice.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FSEG_HEADER_SIZE {
            return None;
        }
        Some(FsegPointer {
            space_id: BigEndian::read_u32(&data[0..]),
            page_number: BigEndian::read_u32(&data[4..]),
            offset: BigEndian::read_u16(&data[8..]),
        })
    }

    /// True if the pointer does not reference an inode (all zero or null
    /// page).
    pub fn is_unset(&self) -> bool {
        self.page_number == FIL_NULL
            || (self.space_id == 0 && self.page_number == 0 && self.offset == 0)
    }
}

/// Names of the per-segment extent lists, in on-disk order.
pub const FSEG_LIST_NAMES: [&str; 3] = ["free", "not_full", "full"];

/// One file segment descriptor (192 bytes within an INODE page).
#[derive(Debug, Clone, Serialize)]
pub struct InodeEntry {
    /// Where this entry lives (INODE page, byte offset).
    pub position: FilAddr,
    /// Segment id; 0 marks a free slot.
    pub fseg_id: u64,
    /// Pages used from extents on the NOT_FULL list.
    pub not_full_n_used: u32,
    /// Extents wholly free, reserved for this segment.
    pub free: ListBaseNode,
    /// Extents partially used by this segment.
    pub not_full: ListBaseNode,
    /// Extents with every page used.
    pub full: ListBaseNode,
    /// FSEG_MAGIC_N; 97937874 on an initialized entry.
    pub magic_n: u32,
    /// Fragment page slots; FIL_NULL marks an empty slot.
    pub frag_array: [u32; FSEG_FRAG_ARR_N_SLOTS],
}

impl InodeEntry {
    /// Parse the entry at `offset` within an INODE page buffer.
    pub fn parse_at(page: &Page, offset: usize) -> Result<Self, IbsError> {
        let data = page.data();
        if offset + FSEG_INODE_SIZE > data.len() {
            return Err(IbsError::Corrupt(format!(
                "inode entry at offset {} exceeds page bounds",
                offset
            )));
        }
        let d = &data[offset..];

        let truncated =
            || IbsError::Corrupt(format!("inode list base truncated at offset {}", offset));

        let mut frag_array = [0u32; FSEG_FRAG_ARR_N_SLOTS];
        for (i, slot) in frag_array.iter_mut().enumerate() {
            *slot = BigEndian::read_u32(&d[FSEG_FRAG_ARR + i * FSEG_FRAG_SLOT_SIZE..]);
        }

        Ok(InodeEntry {
            position: FilAddr {
                page: page.page_number(),
                offset: offset as u16,
            },
            fseg_id: BigEndian::read_u64(&d[FSEG_ID..]),
            not_full_n_used: BigEndian::read_u32(&d[FSEG_NOT_FULL_N_USED..]),
            free: ListBaseNode::parse(&d[FSEG_FREE..]).ok_or_else(truncated)?,
            not_full: ListBaseNode::parse(&d[FSEG_NOT_FULL..]).ok_or_else(truncated)?,
            full: ListBaseNode::parse(&d[FSEG_FULL..]).ok_or_else(truncated)?,
            magic_n: BigEndian::read_u32(&d[FSEG_MAGIC_N..]),
            frag_array,
        })
    }

    /// True if the magic number matches an initialized inode.
    pub fn magic_ok(&self) -> bool {
        self.magic_n == FSEG_MAGIC_N_VALUE
    }

    /// True if the slot describes a live segment.
    pub fn is_in_use(&self) -> bool {
        self.fseg_id != 0 && self.magic_ok()
    }

    /// Fragment pages in use, in slot order.
    pub fn frag_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.frag_array.iter().copied().filter(|&p| p != FIL_NULL)
    }

    /// Number of occupied fragment slots.
    pub fn frag_array_n_used(&self) -> u32 {
        self.frag_pages().count() as u32
    }

    /// Pages allocated to the segment: fragments plus whole extents.
    pub fn total_pages(&self) -> u64 {
        self.frag_array_n_used() as u64
            + (self.free.length + self.not_full.length + self.full.length) as u64
                * PAGES_PER_EXTENT as u64
    }

    /// Pages actually used by the segment.
    pub fn used_pages(&self) -> u64 {
        self.frag_array_n_used() as u64
            + self.not_full_n_used as u64
            + self.full.length as u64 * PAGES_PER_EXTENT as u64
    }

    /// Used fraction of the allocated pages, in [0, 1].
    pub fn fill_factor(&self) -> f64 {
        let total = self.total_pages();
        if total == 0 {
            0.0
        } else {
            self.used_pages() as f64 / total as f64
        }
    }

    /// Look up one of the segment's extent lists by name.
    pub fn list(&self, name: &str) -> Option<&ListBaseNode> {
        match name {
            "free" => Some(&self.free),
            "not_full" => Some(&self.not_full),
            "full" => Some(&self.full),
            _ => None,
        }
    }

    /// Yield every extent list as (name, base node).
    pub fn each_list(&self) -> impl Iterator<Item = (&'static str, &ListBaseNode)> {
        [
            ("free", &self.free),
            ("not_full", &self.not_full),
            ("full", &self.full),
        ]
        .into_iter()
    }
}

/// Number of inode entries on one INODE page.
pub fn inodes_per_page(page_size: u32) -> usize {
    (page_size as usize - FSEG_ARR_OFFSET - SIZE_FIL_TRAILER) / FSEG_INODE_SIZE
}

/// Typed view of an INODE page.
pub struct InodePage<'a> {
    page: &'a Page,
    list_node: ListNode,
}

impl<'a> InodePage<'a> {
    /// Construct the view over an already-read page.
    pub fn new(page: &'a Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::Inode {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not INODE",
                page.page_number(),
                page.page_type()
            )));
        }
        let list_node =
            ListNode::parse(&page.data()[FSEG_INODE_PAGE_NODE..]).ok_or_else(|| {
                IbsError::Corrupt(format!(
                    "page {} too small for an inode page list node",
                    page.page_number()
                ))
            })?;
        Ok(InodePage { page, list_node })
    }

    /// The underlying framed page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// The node linking this page into the space's inode page lists.
    pub fn list_node(&self) -> &ListNode {
        &self.list_node
    }

    /// Every inode slot on this page, in array order, including free slots.
    pub fn inodes(&self) -> Result<Vec<InodeEntry>, IbsError> {
        let count = inodes_per_page(self.page.page_size());
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(InodeEntry::parse_at(
                self.page,
                FSEG_ARR_OFFSET + i * FSEG_INODE_SIZE,
            )?);
        }
        Ok(out)
    }

    /// Only the slots describing live segments.
    pub fn used_inodes(&self) -> Result<Vec<InodeEntry>, IbsError> {
        Ok(self
            .inodes()?
            .into_iter()
            .filter(|e| e.is_in_use())
            .collect())
    }
}

/// Decoder for the space-level inode page lists, whose nodes sit at the
/// head of each INODE page. Entries resolve to the page number.
pub struct InodeListDecoder;

impl ListEntryDecoder for InodeListDecoder {
    type Entry = u32;

    fn decode(&self, page: &Page, addr: FilAddr) -> Result<(u32, ListNode), IbsError> {
        if addr.offset as usize != FSEG_INODE_PAGE_NODE {
            return Err(IbsError::Corrupt(format!(
                "inode page list node at offset {}, expected {}",
                addr.offset, FSEG_INODE_PAGE_NODE
            )));
        }
        let node = ListNode::parse(&page.data()[FSEG_INODE_PAGE_NODE..]).ok_or_else(|| {
            IbsError::Corrupt(format!(
                "page {} too small for an inode page list node",
                page.page_number()
            ))
        })?;
        Ok((page.page_number(), node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS: usize = SIZE_PAGE_DEFAULT as usize;

    fn build_inode_page(page_num: u32) -> Vec<u8> {
        let mut page = vec![0u8; PS];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], page_num);
        BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], 3);
        BigEndian::write_u32(&mut page[FSEG_INODE_PAGE_NODE..], FIL_NULL);
        BigEndian::write_u32(&mut page[FSEG_INODE_PAGE_NODE + 6..], FIL_NULL);
        // Every frag slot of every entry starts empty.
        for entry in 0..inodes_per_page(SIZE_PAGE_DEFAULT) {
            let base = FSEG_ARR_OFFSET + entry * FSEG_INODE_SIZE;
            for list in [FSEG_FREE, FSEG_NOT_FULL, FSEG_FULL] {
                BigEndian::write_u32(&mut page[base + list + 4..], FIL_NULL);
                BigEndian::write_u32(&mut page[base + list + 10..], FIL_NULL);
            }
            for slot in 0..FSEG_FRAG_ARR_N_SLOTS {
                BigEndian::write_u32(
                    &mut page[base + FSEG_FRAG_ARR + slot * FSEG_FRAG_SLOT_SIZE..],
                    FIL_NULL,
                );
            }
        }
        page
    }

    fn init_inode(page: &mut [u8], index: usize, fseg_id: u64, frag_pages: &[u32]) {
        let base = FSEG_ARR_OFFSET + index * FSEG_INODE_SIZE;
        BigEndian::write_u64(&mut page[base + FSEG_ID..], fseg_id);
        BigEndian::write_u32(&mut page[base + FSEG_MAGIC_N..], FSEG_MAGIC_N_VALUE);
        for (slot, &p) in frag_pages.iter().enumerate() {
            BigEndian::write_u32(
                &mut page[base + FSEG_FRAG_ARR + slot * FSEG_FRAG_SLOT_SIZE..],
                p,
            );
        }
    }

    #[test]
    fn test_inodes_per_page() {
        assert_eq!(inodes_per_page(SIZE_PAGE_DEFAULT), 85);
        assert_eq!(inodes_per_page(4096), 21);
    }

    #[test]
    fn test_inode_entry_parse() {
        let mut buf = build_inode_page(2);
        init_inode(&mut buf, 0, 1, &[3, 4, 5]);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let view = InodePage::new(&page).unwrap();
        let inodes = view.inodes().unwrap();
        assert_eq!(inodes.len(), 85);

        let e = &inodes[0];
        assert_eq!(e.fseg_id, 1);
        assert!(e.magic_ok());
        assert!(e.is_in_use());
        assert_eq!(e.frag_array_n_used(), 3);
        assert_eq!(e.frag_pages().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(e.position.page, 2);
        assert_eq!(e.position.offset as usize, FSEG_ARR_OFFSET);

        assert!(!inodes[1].is_in_use());
    }

    #[test]
    fn test_used_inodes_filters_free_slots() {
        let mut buf = build_inode_page(2);
        init_inode(&mut buf, 0, 1, &[3]);
        init_inode(&mut buf, 4, 2, &[]);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let used = InodePage::new(&page).unwrap().used_inodes().unwrap();
        assert_eq!(used.len(), 2);
        assert_eq!(used[0].fseg_id, 1);
        assert_eq!(used[1].fseg_id, 2);
    }

    #[test]
    fn test_page_accounting() {
        let mut buf = build_inode_page(2);
        init_inode(&mut buf, 0, 1, &[3, 4]);
        let base = FSEG_ARR_OFFSET;
        // 1 full extent, 1 not_full extent with 10 pages used.
        BigEndian::write_u32(&mut buf[base + FSEG_FULL..], 1);
        BigEndian::write_u32(&mut buf[base + FSEG_NOT_FULL..], 1);
        BigEndian::write_u32(&mut buf[base + FSEG_NOT_FULL_N_USED..], 10);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let e = InodePage::new(&page).unwrap().inodes().unwrap()[0].clone();

        assert_eq!(e.total_pages(), 2 + 2 * 64);
        assert_eq!(e.used_pages(), 2 + 10 + 64);
        let expected = (2.0 + 10.0 + 64.0) / (2.0 + 128.0);
        assert!((e.fill_factor() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_list_lookup_by_name() {
        let buf = build_inode_page(2);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let e = InodePage::new(&page).unwrap().inodes().unwrap()[0].clone();
        assert!(e.list("not_full").is_some());
        assert!(e.list("nope").is_none());
        let names: Vec<_> = e.each_list().map(|(n, _)| n).collect();
        assert_eq!(names, FSEG_LIST_NAMES);
    }

    #[test]
    fn test_fseg_pointer() {
        let mut data = [0u8; 10];
        BigEndian::write_u32(&mut data[0..], 0);
        BigEndian::write_u32(&mut data[4..], 2);
        BigEndian::write_u16(&mut data[8..], 50);
        let ptr = FsegPointer::parse(&data).unwrap();
        assert_eq!(ptr.page_number, 2);
        assert_eq!(ptr.offset, 50);
        assert!(!ptr.is_unset());

        let unset = FsegPointer::parse(&[0u8; 10]).unwrap();
        assert!(unset.is_unset());
    }

    #[test]
    fn test_inode_view_rejects_wrong_type() {
        let mut buf = build_inode_page(2);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], 8);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        assert!(InodePage::new(&page).is_err());
    }
}
