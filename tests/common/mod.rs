//! Fixture builders shared by the integration tests.
//!
//! Tablespace fixtures are built page by page as byte buffers and written
//! to a temp file; every helper writes the same on-disk layout the parsers
//! read back, so tests exercise the full file-to-structure path.
#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder};
use std::io::Write;
use tempfile::NamedTempFile;

pub const PS: usize = 16384;

// FIL header offsets.
pub const FIL_PAGE_OFFSET: usize = 4;
pub const FIL_PAGE_PREV: usize = 8;
pub const FIL_PAGE_NEXT: usize = 12;
pub const FIL_PAGE_LSN: usize = 16;
pub const FIL_PAGE_TYPE: usize = 24;
pub const FIL_PAGE_SPACE_ID: usize = 34;
pub const FIL_PAGE_DATA: usize = 38;
pub const FIL_NULL: u32 = 0xFFFFFFFF;

// FSP header offsets, relative to FIL_PAGE_DATA.
pub const FSP_SPACE_ID: usize = 0;
pub const FSP_SIZE: usize = 8;
pub const FSP_FREE_LIMIT: usize = 12;
pub const FSP_FRAG_N_USED: usize = 20;
pub const FSP_FREE: usize = 24;
pub const FSP_FREE_FRAG: usize = 40;
pub const FSP_FULL_FRAG: usize = 56;
pub const FSP_SEG_ID: usize = 72;
pub const FSP_SEG_INODES_FULL: usize = 80;
pub const FSP_SEG_INODES_FREE: usize = 96;

// XDES entries.
pub const XDES_ARR_OFFSET: usize = 150;
pub const XDES_SIZE: usize = 40;
pub const XDES_FLST_NODE: usize = 8;
pub const XDES_STATE: usize = 20;
pub const XDES_BITMAP: usize = 24;

// INODE pages.
pub const FSEG_INODE_PAGE_NODE: usize = 38;
pub const FSEG_ARR_OFFSET: usize = 50;
pub const FSEG_INODE_SIZE: usize = 192;
pub const FSEG_NOT_FULL_N_USED: usize = 8;
pub const FSEG_FREE: usize = 12;
pub const FSEG_NOT_FULL: usize = 28;
pub const FSEG_FULL: usize = 44;
pub const FSEG_MAGIC_N: usize = 60;
pub const FSEG_FRAG_ARR: usize = 64;
pub const FSEG_MAGIC_N_VALUE: u32 = 97937874;

// INDEX pages.
pub const PAGE_HEAP_TOP: usize = 2;
pub const PAGE_N_HEAP: usize = 4;
pub const PAGE_N_DIR_SLOTS: usize = 0;
pub const PAGE_N_RECS: usize = 16;
pub const PAGE_LEVEL: usize = 26;
pub const PAGE_INDEX_ID: usize = 28;
pub const PAGE_BTR_SEG_LEAF: usize = 36;
pub const PAGE_BTR_SEG_TOP: usize = 46;
pub const PAGE_NEW_INFIMUM: usize = 99;
pub const PAGE_NEW_SUPREMUM: usize = 112;
pub const PAGE_NEW_SUPREMUM_END: usize = 120;
pub const REC_EXTRA: usize = 5;

/// A (page, offset) pointer used when wiring lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub page: u32,
    pub offset: u16,
}

pub fn addr(page: u32, offset: usize) -> Addr {
    Addr {
        page,
        offset: offset as u16,
    }
}

fn write_fil_addr(buf: &mut [u8], offset: usize, target: Option<Addr>) {
    match target {
        Some(a) => {
            BigEndian::write_u32(&mut buf[offset..], a.page);
            BigEndian::write_u16(&mut buf[offset + 4..], a.offset);
        }
        None => {
            BigEndian::write_u32(&mut buf[offset..], FIL_NULL);
            BigEndian::write_u16(&mut buf[offset + 4..], 0);
        }
    }
}

/// Write a list base node (length, first, last) at an absolute offset.
pub fn write_list_base(
    buf: &mut [u8],
    offset: usize,
    length: u32,
    first: Option<Addr>,
    last: Option<Addr>,
) {
    BigEndian::write_u32(&mut buf[offset..], length);
    write_fil_addr(buf, offset + 4, first);
    write_fil_addr(buf, offset + 10, last);
}

/// Write a list node (prev, next) at an absolute offset.
pub fn write_list_node(buf: &mut [u8], offset: usize, prev: Option<Addr>, next: Option<Addr>) {
    write_fil_addr(buf, offset, prev);
    write_fil_addr(buf, offset + 6, next);
}

/// Write the FIL header fields shared by every page.
pub fn write_fil(buf: &mut [u8], page_num: u32, page_type: u16, space_id: u32) {
    BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_num);
    BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], FIL_NULL);
    BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], FIL_NULL);
    BigEndian::write_u64(&mut buf[FIL_PAGE_LSN..], 1000);
    BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], page_type);
    BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], space_id);
}

/// Stamp the trailer LSN word and a valid CRC-32C checksum.
pub fn finish_page(buf: &mut [u8]) {
    let lsn = BigEndian::read_u64(&buf[FIL_PAGE_LSN..]);
    let trailer = buf.len() - 8;
    BigEndian::write_u32(&mut buf[trailer + 4..], (lsn & 0xFFFFFFFF) as u32);
    let crc1 = crc32c::crc32c(&buf[4..26]);
    let crc2 = crc32c::crc32c(&buf[FIL_PAGE_DATA..trailer]);
    BigEndian::write_u32(&mut buf[0..], crc1 ^ crc2);
}

/// Mark `used` pages (extent-relative indexes) of an XDES entry as
/// allocated; every other page of the extent gets its free bit.
pub fn write_xdes_entry(
    buf: &mut [u8],
    index: usize,
    fseg_id: u64,
    state: u32,
    used: &[u32],
    node_prev: Option<Addr>,
    node_next: Option<Addr>,
) {
    let offset = XDES_ARR_OFFSET + index * XDES_SIZE;
    BigEndian::write_u64(&mut buf[offset..], fseg_id);
    write_list_node(buf, offset + XDES_FLST_NODE, node_prev, node_next);
    BigEndian::write_u32(&mut buf[offset + XDES_STATE..], state);
    for page in 0..64u32 {
        if !used.contains(&page) {
            let bit = page as usize * 2;
            buf[offset + XDES_BITMAP + bit / 8] |= 1 << (bit % 8);
        }
    }
}

/// Absolute address of an XDES entry's list node on a descriptor page.
pub fn xdes_node_addr(page: u32, index: usize) -> Addr {
    addr(page, XDES_ARR_OFFSET + index * XDES_SIZE + XDES_FLST_NODE)
}

/// Build an FSP_HDR page. Extents and list bases are wired afterwards by
/// the caller with the write_* helpers, then finished with `finish_page`.
pub fn fsp_page(space_id: u32, size: u32, free_limit: u32, fseg_id_counter: u64) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    write_fil(&mut buf, 0, 8, space_id);
    let d = FIL_PAGE_DATA;
    BigEndian::write_u32(&mut buf[d + FSP_SPACE_ID..], space_id);
    BigEndian::write_u32(&mut buf[d + FSP_SIZE..], size);
    BigEndian::write_u32(&mut buf[d + FSP_FREE_LIMIT..], free_limit);
    BigEndian::write_u64(&mut buf[d + FSP_SEG_ID..], fseg_id_counter);
    for list in [
        FSP_FREE,
        FSP_FREE_FRAG,
        FSP_FULL_FRAG,
        FSP_SEG_INODES_FULL,
        FSP_SEG_INODES_FREE,
    ] {
        write_list_base(&mut buf, d + list, 0, None, None);
    }
    buf
}

/// Build an INODE page with every slot empty.
pub fn inode_page(page_num: u32, space_id: u32) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    write_fil(&mut buf, page_num, 3, space_id);
    write_list_node(&mut buf, FSEG_INODE_PAGE_NODE, None, None);
    for entry in 0..85 {
        let base = FSEG_ARR_OFFSET + entry * FSEG_INODE_SIZE;
        for list in [FSEG_FREE, FSEG_NOT_FULL, FSEG_FULL] {
            write_list_base(&mut buf, base + list, 0, None, None);
        }
        for slot in 0..32 {
            BigEndian::write_u32(&mut buf[base + FSEG_FRAG_ARR + slot * 4..], FIL_NULL);
        }
    }
    buf
}

/// Initialize one inode slot with a segment id and fragment pages.
pub fn write_inode_entry(buf: &mut [u8], index: usize, fseg_id: u64, frag_pages: &[u32]) {
    let base = FSEG_ARR_OFFSET + index * FSEG_INODE_SIZE;
    BigEndian::write_u64(&mut buf[base..], fseg_id);
    BigEndian::write_u32(&mut buf[base + FSEG_MAGIC_N..], FSEG_MAGIC_N_VALUE);
    for (slot, &page) in frag_pages.iter().enumerate() {
        BigEndian::write_u32(&mut buf[base + FSEG_FRAG_ARR + slot * 4..], page);
    }
}

/// Absolute offset of an inode entry within its page.
pub fn inode_entry_offset(index: usize) -> usize {
    FSEG_ARR_OFFSET + index * FSEG_INODE_SIZE
}

/// One record for an INDEX page fixture: an integer key plus either a row
/// value (leaves) or a child page number (internal pages).
#[derive(Debug, Clone, Copy)]
pub enum Rec {
    Leaf { id: i32, a: i32, deleted: bool },
    Node { id: i32, child: u32 },
}

/// Build a compact INDEX page holding `records` chained in order.
pub fn index_page(
    page_num: u32,
    space_id: u32,
    index_id: u64,
    level: u16,
    records: &[Rec],
    prev: u32,
    next: u32,
) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    write_fil(&mut buf, page_num, 17855, space_id);
    BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], prev);
    BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], next);

    let d = FIL_PAGE_DATA;
    let n = records.len();
    BigEndian::write_u16(&mut buf[d + PAGE_N_DIR_SLOTS..], 2);
    BigEndian::write_u16(&mut buf[d + PAGE_N_HEAP..], 0x8000 | (n as u16 + 2));
    BigEndian::write_u16(&mut buf[d + PAGE_N_RECS..], n as u16);
    BigEndian::write_u16(&mut buf[d + PAGE_LEVEL..], level);
    BigEndian::write_u64(&mut buf[d + PAGE_INDEX_ID..], index_id);

    let mut origins = Vec::new();
    let mut heap = PAGE_NEW_SUPREMUM_END;
    for (i, rec) in records.iter().enumerate() {
        let origin = heap + REC_EXTRA;
        origins.push(origin);
        let hdr = origin - REC_EXTRA;
        let (rec_type, deleted) = match rec {
            Rec::Leaf { deleted, .. } => (0u16, *deleted),
            Rec::Node { .. } => (1u16, false),
        };
        buf[hdr] = if deleted { 0x21 } else { 0x01 };
        BigEndian::write_u16(&mut buf[hdr + 1..], (((i as u16) + 2) << 3) | rec_type);
        match rec {
            Rec::Leaf { id, a, .. } => {
                BigEndian::write_u32(&mut buf[origin..], (*id as u32) ^ 0x80000000);
                BigEndian::write_u32(&mut buf[origin + 4..], (*a as u32) ^ 0x80000000);
            }
            Rec::Node { id, child } => {
                BigEndian::write_u32(&mut buf[origin..], (*id as u32) ^ 0x80000000);
                BigEndian::write_u32(&mut buf[origin + 4..], *child);
            }
        }
        heap = origin + 8;
    }
    BigEndian::write_u16(&mut buf[d + PAGE_HEAP_TOP..], heap as u16);

    let inf_hdr = PAGE_NEW_INFIMUM - REC_EXTRA;
    buf[inf_hdr] = 1;
    BigEndian::write_u16(&mut buf[inf_hdr + 1..], 2);
    let first = *origins.first().unwrap_or(&PAGE_NEW_SUPREMUM);
    BigEndian::write_i16(
        &mut buf[inf_hdr + 3..],
        (first as i64 - PAGE_NEW_INFIMUM as i64) as i16,
    );

    for (i, &origin) in origins.iter().enumerate() {
        let next_origin = origins.get(i + 1).copied().unwrap_or(PAGE_NEW_SUPREMUM);
        let hdr = origin - REC_EXTRA;
        BigEndian::write_i16(
            &mut buf[hdr + 3..],
            (next_origin as i64 - origin as i64) as i16,
        );
    }

    let sup_hdr = PAGE_NEW_SUPREMUM - REC_EXTRA;
    buf[sup_hdr] = (1 + n.min(8)) as u8;
    BigEndian::write_u16(&mut buf[sup_hdr + 1..], (1 << 3) | 3);
    BigEndian::write_i16(&mut buf[sup_hdr + 3..], 0);

    let top = PS - 8;
    BigEndian::write_u16(&mut buf[top - 2..], PAGE_NEW_INFIMUM as u16);
    BigEndian::write_u16(&mut buf[top - 4..], PAGE_NEW_SUPREMUM as u16);
    buf
}

/// Write root-only FSEG pointers into an INDEX page.
pub fn write_root_fsegs(buf: &mut [u8], space_id: u32, leaf: Addr, internal: Addr) {
    let base = FIL_PAGE_DATA + PAGE_BTR_SEG_LEAF;
    BigEndian::write_u32(&mut buf[base..], space_id);
    BigEndian::write_u32(&mut buf[base + 4..], leaf.page);
    BigEndian::write_u16(&mut buf[base + 8..], leaf.offset);
    let base = FIL_PAGE_DATA + PAGE_BTR_SEG_TOP;
    BigEndian::write_u32(&mut buf[base..], space_id);
    BigEndian::write_u32(&mut buf[base + 4..], internal.page);
    BigEndian::write_u16(&mut buf[base + 8..], internal.offset);
}

/// A page with only its FIL framing (bitmap pages, allocated pages).
pub fn framed_page(page_num: u32, page_type: u16, space_id: u32) -> Vec<u8> {
    let mut buf = vec![0u8; PS];
    write_fil(&mut buf, page_num, page_type, space_id);
    buf
}

/// Finish every page and write the space to a temp file.
pub fn write_space(mut pages: Vec<Vec<u8>>) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    for page in &mut pages {
        finish_page(page);
        file.write_all(page).expect("write page");
    }
    file.flush().expect("flush");
    file
}
