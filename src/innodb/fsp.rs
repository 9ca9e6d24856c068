//! FSP header and extent descriptor (XDES) pages.
//!
//! Page 0 of every tablespace is an FSP_HDR page: the space header
//! ([`FspHeader`]) at byte 38, followed by the first extent descriptor
//! array. Further descriptor pages (type XDES) repeat at fixed intervals
//! and carry only the array.
//!
//! Each [`XdesEntry`] describes one extent of 64 pages: the owning segment
//! id, the extent state, a list node linking it into exactly one space- or
//! segment-level list, and a 2-bit-per-page bitmap recording which pages
//! are free and clean. Descriptor pages recur every
//! [`pages_per_xdes_page`] pages, so the descriptor position of any page is
//! computable without reading anything ([`xdes_position_for_page`]).

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::list::{FilAddr, ListBaseNode, ListEntryDecoder, ListNode};
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::IbsError;

/// Parsed FSP header (112 bytes at FIL_PAGE_DATA on page 0).
#[derive(Debug, Clone, Serialize)]
pub struct FspHeader {
    /// Space ID.
    pub space_id: u32,
    /// Size of the tablespace in pages.
    pub size: u32,
    /// Minimum page number not yet initialized.
    pub free_limit: u32,
    /// Space flags (page size, format).
    pub flags: u32,
    /// Number of used pages in the FREE_FRAG list.
    pub frag_n_used: u32,
    /// List of wholly free extents.
    pub free: ListBaseNode,
    /// List of partially used fragment extents.
    pub free_frag: ListBaseNode,
    /// List of full fragment extents.
    pub full_frag: ListBaseNode,
    /// Next unused segment id.
    pub fseg_id: u64,
    /// List of INODE pages with no free slots.
    pub full_inodes: ListBaseNode,
    /// List of INODE pages with at least one free slot.
    pub free_inodes: ListBaseNode,
}

/// Names of the space-level XDES lists, in header order.
pub const FSP_XDES_LIST_NAMES: [&str; 3] = ["free", "free_frag", "full_frag"];

impl FspHeader {
    /// Parse the FSP header from a full page-0 buffer.
    pub fn parse(page_data: &[u8]) -> Option<Self> {
        if page_data.len() < FIL_PAGE_DATA + FSP_HEADER_SIZE {
            return None;
        }
        let d = &page_data[FIL_PAGE_DATA..];

        Some(FspHeader {
            space_id: BigEndian::read_u32(&d[FSP_SPACE_ID..]),
            size: BigEndian::read_u32(&d[FSP_SIZE..]),
            free_limit: BigEndian::read_u32(&d[FSP_FREE_LIMIT..]),
            flags: BigEndian::read_u32(&d[FSP_SPACE_FLAGS..]),
            frag_n_used: BigEndian::read_u32(&d[FSP_FRAG_N_USED..]),
            free: ListBaseNode::parse(&d[FSP_FREE..])?,
            free_frag: ListBaseNode::parse(&d[FSP_FREE_FRAG..])?,
            full_frag: ListBaseNode::parse(&d[FSP_FULL_FRAG..])?,
            fseg_id: BigEndian::read_u64(&d[FSP_SEG_ID..]),
            full_inodes: ListBaseNode::parse(&d[FSP_SEG_INODES_FULL..])?,
            free_inodes: ListBaseNode::parse(&d[FSP_SEG_INODES_FREE..])?,
        })
    }

    /// Extract the page size in bytes from the FSP flags.
    ///
    /// An ssize of 0 means the pre-5.6 default of 16 KiB; otherwise the
    /// field encodes `1 << (ssize + 9)`.
    pub fn page_size_from_flags(&self) -> u32 {
        let ssize = (self.flags & FSP_FLAGS_MASK_PAGE_SSIZE) >> FSP_FLAGS_POS_PAGE_SSIZE;
        if ssize == 0 {
            SIZE_PAGE_DEFAULT
        } else {
            1u32 << (ssize + 9)
        }
    }

    /// Look up one of the space-level XDES lists by name.
    pub fn xdes_list(&self, name: &str) -> Option<&ListBaseNode> {
        match name {
            "free" => Some(&self.free),
            "free_frag" => Some(&self.free_frag),
            "full_frag" => Some(&self.full_frag),
            _ => None,
        }
    }

    /// Look up one of the inode-page lists by name.
    pub fn inode_list(&self, name: &str) -> Option<&ListBaseNode> {
        match name {
            "full_inodes" => Some(&self.full_inodes),
            "free_inodes" => Some(&self.free_inodes),
            _ => None,
        }
    }

    /// Yield every space-level XDES list as (name, base node).
    pub fn each_xdes_list(&self) -> impl Iterator<Item = (&'static str, &ListBaseNode)> {
        [
            ("free", &self.free),
            ("free_frag", &self.free_frag),
            ("full_frag", &self.full_frag),
        ]
        .into_iter()
    }
}

/// Number of pages described by one descriptor page.
///
/// From `fsp0fsp.h`: XDES_DESCRIBED_PER_PAGE equals the page size in bytes,
/// read as a page count. A 16 KiB space therefore places descriptor pages
/// every 16384 pages, each carrying 256 entries.
pub fn pages_per_xdes_page(page_size: u32) -> u32 {
    page_size
}

/// The (page, byte offset) where the XDES entry describing `page_number`
/// lives.
pub fn xdes_position_for_page(page_number: u32, page_size: u32) -> FilAddr {
    let interval = pages_per_xdes_page(page_size);
    let xdes_page = (page_number / interval) * interval;
    let entry = (page_number % interval) / PAGES_PER_EXTENT;
    FilAddr {
        page: xdes_page,
        offset: (XDES_ARR_OFFSET + entry as usize * XDES_SIZE) as u16,
    }
}

/// State of an extent, from the XDES entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum XdesState {
    /// Descriptor not yet initialized (state 0).
    NotInitialized,
    /// Extent is in the space free list (state 1).
    Free,
    /// Extent is in the space free fragment list (state 2).
    FreeFrag,
    /// Extent is in the space full fragment list (state 3).
    FullFrag,
    /// Extent belongs to a file segment (state 4).
    Fseg,
    /// Unrecognized state value, preserved raw.
    Other(u32),
}

impl XdesState {
    /// Decode the on-disk state value.
    pub fn from_u32(val: u32) -> Self {
        match val {
            0 => XdesState::NotInitialized,
            1 => XdesState::Free,
            2 => XdesState::FreeFrag,
            3 => XdesState::FullFrag,
            4 => XdesState::Fseg,
            v => XdesState::Other(v),
        }
    }

    /// Display name matching the InnoDB source.
    pub fn name(&self) -> &'static str {
        match self {
            XdesState::NotInitialized => "NOT_INITIALIZED",
            XdesState::Free => "FREE",
            XdesState::FreeFrag => "FREE_FRAG",
            XdesState::FullFrag => "FULL_FRAG",
            XdesState::Fseg => "FSEG",
            XdesState::Other(_) => "OTHER",
        }
    }
}

/// Per-page allocation bits from an XDES bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageStatus {
    /// The page is unallocated.
    pub free: bool,
    /// The clean bit (unused by modern InnoDB but still written).
    pub clean: bool,
}

/// One extent descriptor: 40 bytes within an FSP_HDR or XDES page.
#[derive(Debug, Clone, Serialize)]
pub struct XdesEntry {
    /// Where this entry lives (descriptor page, byte offset).
    pub position: FilAddr,
    /// First page of the described extent.
    pub start_page: u32,
    /// Owning file segment id; 0 when the extent is not in a segment.
    pub fseg_id: u64,
    /// List node linking this extent into a space- or segment-level list.
    pub list_node: ListNode,
    /// Extent state.
    pub state: XdesState,
    bitmap: [u8; XDES_SIZE - XDES_BITMAP],
}

impl XdesEntry {
    /// Parse the entry at `offset` within a descriptor page buffer.
    pub fn parse_at(page: &Page, offset: usize) -> Result<Self, IbsError> {
        let data = page.data();
        if offset + XDES_SIZE > data.len() {
            return Err(IbsError::Corrupt(format!(
                "XDES entry at offset {} exceeds page bounds",
                offset
            )));
        }
        if offset < XDES_ARR_OFFSET || (offset - XDES_ARR_OFFSET) % XDES_SIZE != 0 {
            return Err(IbsError::Usage(format!(
                "offset {} is not an XDES array slot",
                offset
            )));
        }
        let d = &data[offset..];
        let entry_index = (offset - XDES_ARR_OFFSET) / XDES_SIZE;
        let start_page = page.page_number() + (entry_index as u32) * PAGES_PER_EXTENT;

        let mut bitmap = [0u8; XDES_SIZE - XDES_BITMAP];
        bitmap.copy_from_slice(&d[XDES_BITMAP..XDES_SIZE]);

        Ok(XdesEntry {
            position: FilAddr {
                page: page.page_number(),
                offset: offset as u16,
            },
            start_page,
            fseg_id: BigEndian::read_u64(&d[XDES_ID..]),
            list_node: ListNode::parse(&d[XDES_FLST_NODE..]).ok_or_else(|| {
                IbsError::Corrupt(format!("XDES list node truncated at offset {}", offset))
            })?,
            state: XdesState::from_u32(BigEndian::read_u32(&d[XDES_STATE..])),
            bitmap,
        })
    }

    /// True if `page_number` falls within this extent.
    pub fn contains(&self, page_number: u32) -> bool {
        page_number >= self.start_page && page_number < self.start_page + PAGES_PER_EXTENT
    }

    /// Allocation bits for the `index`-th page of the extent.
    pub fn page_status(&self, index: usize) -> Result<PageStatus, IbsError> {
        if index >= PAGES_PER_EXTENT as usize {
            return Err(IbsError::Usage(format!(
                "page index {} outside extent of {} pages",
                index, PAGES_PER_EXTENT
            )));
        }
        let bit = index * XDES_BITS_PER_PAGE;
        let byte = self.bitmap[bit / 8];
        let shift = bit % 8;
        Ok(PageStatus {
            free: (byte >> (shift + XDES_FREE_BIT)) & 1 != 0,
            clean: (byte >> (shift + XDES_CLEAN_BIT)) & 1 != 0,
        })
    }

    /// Allocation bits for an absolute page number within this extent.
    pub fn page_status_of(&self, page_number: u32) -> Result<PageStatus, IbsError> {
        if !self.contains(page_number) {
            return Err(IbsError::Usage(format!(
                "page {} not in extent starting at {}",
                page_number, self.start_page
            )));
        }
        self.page_status((page_number - self.start_page) as usize)
    }

    /// Number of free pages in the extent.
    pub fn free_pages(&self) -> u32 {
        (0..PAGES_PER_EXTENT as usize)
            .filter(|&i| self.page_status(i).map(|s| s.free).unwrap_or(false))
            .count() as u32
    }

    /// Number of allocated pages in the extent.
    pub fn used_pages(&self) -> u32 {
        PAGES_PER_EXTENT - self.free_pages()
    }

    /// True if the extent is owned by a file segment.
    pub fn allocated_to_fseg(&self) -> bool {
        self.state == XdesState::Fseg && self.fseg_id != 0
    }
}

fn xdes_entries_on(page: &Page) -> Result<Vec<XdesEntry>, IbsError> {
    let entries = (pages_per_xdes_page(page.page_size()) / PAGES_PER_EXTENT) as usize;
    let mut out = Vec::with_capacity(entries);
    for i in 0..entries {
        out.push(XdesEntry::parse_at(page, XDES_ARR_OFFSET + i * XDES_SIZE)?);
    }
    Ok(out)
}

/// Typed view of an FSP_HDR page: space header plus descriptor array.
pub struct FspHdrPage<'a> {
    page: &'a Page,
    header: FspHeader,
}

impl<'a> FspHdrPage<'a> {
    /// Construct the view over an already-read page.
    pub fn new(page: &'a Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::FspHdr {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not FSP_HDR",
                page.page_number(),
                page.page_type()
            )));
        }
        let header = FspHeader::parse(page.data()).ok_or_else(|| {
            IbsError::Corrupt(format!(
                "page {} too small for an FSP header",
                page.page_number()
            ))
        })?;
        Ok(FspHdrPage { page, header })
    }

    /// The decoded space header.
    pub fn header(&self) -> &FspHeader {
        &self.header
    }

    /// The underlying framed page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// Every descriptor entry on this page, in array order.
    pub fn xdes_entries(&self) -> Result<Vec<XdesEntry>, IbsError> {
        xdes_entries_on(self.page)
    }
}

/// Typed view of an XDES page: descriptor array only.
pub struct XdesPage<'a> {
    page: &'a Page,
}

impl<'a> XdesPage<'a> {
    /// Construct the view over an already-read page.
    pub fn new(page: &'a Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::Xdes {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not XDES",
                page.page_number(),
                page.page_type()
            )));
        }
        Ok(XdesPage { page })
    }

    /// The underlying framed page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// Every descriptor entry on this page, in array order.
    pub fn xdes_entries(&self) -> Result<Vec<XdesEntry>, IbsError> {
        xdes_entries_on(self.page)
    }
}

/// Decoder for lists whose nodes live inside XDES entries.
pub struct XdesListDecoder;

impl ListEntryDecoder for XdesListDecoder {
    type Entry = XdesEntry;

    fn decode(&self, page: &Page, addr: FilAddr) -> Result<(XdesEntry, ListNode), IbsError> {
        let node_offset = addr.offset as usize;
        if node_offset < XDES_FLST_NODE {
            return Err(IbsError::Corrupt(format!(
                "XDES list node offset {} before array start",
                node_offset
            )));
        }
        let entry = XdesEntry::parse_at(page, node_offset - XDES_FLST_NODE)?;
        let node = entry.list_node;
        Ok((entry, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS: usize = SIZE_PAGE_DEFAULT as usize;

    fn build_fsp_page(space_id: u32, size: u32, free_limit: u32) -> Vec<u8> {
        let mut page = vec![0u8; PS];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], 0);
        BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], 8);
        BigEndian::write_u32(&mut page[FIL_PAGE_SPACE_ID..], space_id);
        let d = FIL_PAGE_DATA;
        BigEndian::write_u32(&mut page[d + FSP_SPACE_ID..], space_id);
        BigEndian::write_u32(&mut page[d + FSP_SIZE..], size);
        BigEndian::write_u32(&mut page[d + FSP_FREE_LIMIT..], free_limit);
        BigEndian::write_u64(&mut page[d + FSP_SEG_ID..], 3);
        // Null out every list pointer.
        for base in [
            FSP_FREE,
            FSP_FREE_FRAG,
            FSP_FULL_FRAG,
            FSP_SEG_INODES_FULL,
            FSP_SEG_INODES_FREE,
        ] {
            BigEndian::write_u32(&mut page[d + base + 4..], FIL_NULL);
            BigEndian::write_u32(&mut page[d + base + 10..], FIL_NULL);
        }
        page
    }

    fn write_xdes(page: &mut [u8], index: usize, fseg_id: u64, state: u32, free_mask: u128) {
        let offset = XDES_ARR_OFFSET + index * XDES_SIZE;
        BigEndian::write_u64(&mut page[offset + XDES_ID..], fseg_id);
        BigEndian::write_u32(&mut page[offset + XDES_FLST_NODE..], FIL_NULL);
        BigEndian::write_u32(&mut page[offset + XDES_FLST_NODE + 6..], FIL_NULL);
        BigEndian::write_u32(&mut page[offset + XDES_STATE..], state);
        for i in 0..PAGES_PER_EXTENT as usize {
            if free_mask & (1u128 << i) != 0 {
                let bit = i * XDES_BITS_PER_PAGE;
                page[offset + XDES_BITMAP + bit / 8] |= 1 << (bit % 8);
            }
        }
    }

    #[test]
    fn test_fsp_header_parse() {
        let buf = build_fsp_page(5, 100, 64);
        let hdr = FspHeader::parse(&buf).unwrap();
        assert_eq!(hdr.space_id, 5);
        assert_eq!(hdr.size, 100);
        assert_eq!(hdr.free_limit, 64);
        assert_eq!(hdr.fseg_id, 3);
        assert!(hdr.free.is_empty());
        assert!(hdr.free_inodes.is_empty());
    }

    #[test]
    fn test_fsp_list_lookup() {
        let buf = build_fsp_page(1, 10, 10);
        let hdr = FspHeader::parse(&buf).unwrap();
        assert!(hdr.xdes_list("free_frag").is_some());
        assert!(hdr.xdes_list("bogus").is_none());
        assert!(hdr.inode_list("free_inodes").is_some());
        let names: Vec<_> = hdr.each_xdes_list().map(|(n, _)| n).collect();
        assert_eq!(names, FSP_XDES_LIST_NAMES);
    }

    #[test]
    fn test_page_size_from_flags() {
        let buf = build_fsp_page(1, 10, 10);
        let mut hdr = FspHeader::parse(&buf).unwrap();
        assert_eq!(hdr.page_size_from_flags(), SIZE_PAGE_DEFAULT);
        hdr.flags = 3 << FSP_FLAGS_POS_PAGE_SSIZE;
        assert_eq!(hdr.page_size_from_flags(), 4096);
        hdr.flags = 5 << FSP_FLAGS_POS_PAGE_SSIZE;
        assert_eq!(hdr.page_size_from_flags(), 16384);
    }

    #[test]
    fn test_xdes_position_for_page() {
        let pos = xdes_position_for_page(0, SIZE_PAGE_DEFAULT);
        assert_eq!(pos.page, 0);
        assert_eq!(pos.offset as usize, XDES_ARR_OFFSET);

        let pos = xdes_position_for_page(65, SIZE_PAGE_DEFAULT);
        assert_eq!(pos.page, 0);
        assert_eq!(pos.offset as usize, XDES_ARR_OFFSET + XDES_SIZE);

        let pos = xdes_position_for_page(16384 + 200, SIZE_PAGE_DEFAULT);
        assert_eq!(pos.page, 16384);
        assert_eq!(pos.offset as usize, XDES_ARR_OFFSET + 3 * XDES_SIZE);
    }

    #[test]
    fn test_xdes_entry_parse_and_bitmap() {
        let mut buf = build_fsp_page(1, 128, 128);
        // Extent 0: segment 7, pages 0..4 used, rest free.
        write_xdes(&mut buf, 0, 7, 4, !0u128 << 4);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let view = FspHdrPage::new(&page).unwrap();
        let entries = view.xdes_entries().unwrap();
        assert_eq!(entries.len(), 256);

        let e = &entries[0];
        assert_eq!(e.fseg_id, 7);
        assert_eq!(e.state, XdesState::Fseg);
        assert!(e.allocated_to_fseg());
        assert_eq!(e.start_page, 0);
        assert!(e.contains(63));
        assert!(!e.contains(64));
        assert!(!e.page_status(0).unwrap().free);
        assert!(!e.page_status(3).unwrap().free);
        assert!(e.page_status(4).unwrap().free);
        assert_eq!(e.used_pages(), 4);
        assert_eq!(e.free_pages(), 60);
    }

    #[test]
    fn test_xdes_page_status_out_of_range() {
        let mut buf = build_fsp_page(1, 128, 128);
        write_xdes(&mut buf, 0, 0, 1, !0u128);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let entries = FspHdrPage::new(&page).unwrap().xdes_entries().unwrap();
        assert!(matches!(
            entries[0].page_status(64),
            Err(IbsError::Usage(_))
        ));
        assert!(matches!(
            entries[0].page_status_of(100),
            Err(IbsError::Usage(_))
        ));
    }

    #[test]
    fn test_xdes_list_decoder_resolves_entry() {
        let mut buf = build_fsp_page(1, 128, 128);
        write_xdes(&mut buf, 1, 0, 2, !0u128);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        let addr = FilAddr {
            page: 0,
            offset: (XDES_ARR_OFFSET + XDES_SIZE + XDES_FLST_NODE) as u16,
        };
        let (entry, node) = XdesListDecoder.decode(&page, addr).unwrap();
        assert_eq!(entry.state, XdesState::FreeFrag);
        assert_eq!(entry.start_page, 64);
        assert!(node.next.is_none());
    }

    #[test]
    fn test_fsp_view_rejects_wrong_type() {
        let mut buf = build_fsp_page(1, 10, 10);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], 17855);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        assert!(FspHdrPage::new(&page).is_err());
    }
}
