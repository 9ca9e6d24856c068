//! InnoDB page and file structure constants.
//!
//! These values are derived from the MySQL/InnoDB source code headers:
//! - `fil0fil.h` (FIL header/trailer, FIL addresses)
//! - `page0page.h` (INDEX page header)
//! - `fsp0fsp.h` (FSP header, XDES entries, FSEG inodes)
//! - `fut0lst.h` (embedded list base/node layout)
//! - `trx0sys.h` / `dict0dict.h` (system tablespace fixed pages)
//! - `log0log.h` (redo log blocks)

// ── Page sizes ──────────────────────────────────────────────────────

/// Default InnoDB page size (16 KiB).
pub const SIZE_PAGE_DEFAULT: u32 = 16384;
/// Page sizes this crate will open. Smaller-than-default sizes are
/// tolerated opportunistically; anything else is rejected at open time.
pub const SUPPORTED_PAGE_SIZES: [u32; 5] = [1024, 2048, 4096, 8192, 16384];

/// Pages per extent at the default page size.
pub const PAGES_PER_EXTENT: u32 = 64;

// ── FIL Header (38 bytes total) ─────────────────────────────────────

/// Size of the FIL header in bytes.
pub const SIZE_FIL_HEAD: usize = 38;
/// Offset of the checksum (or space id in older formats). 4 bytes.
pub const FIL_PAGE_SPACE_OR_CHKSUM: usize = 0;
/// Offset of the page number within the tablespace. 4 bytes.
pub const FIL_PAGE_OFFSET: usize = 4;
/// Offset of the previous page pointer. 4 bytes.
pub const FIL_PAGE_PREV: usize = 8;
/// Offset of the next page pointer. 4 bytes.
pub const FIL_PAGE_NEXT: usize = 12;
/// Offset of the LSN of newest modification. 8 bytes.
pub const FIL_PAGE_LSN: usize = 16;
/// Offset of the page type field. 2 bytes.
pub const FIL_PAGE_TYPE: usize = 24;
/// Offset of the flush LSN (only page 0 of system tablespace). 8 bytes.
pub const FIL_PAGE_FILE_FLUSH_LSN: usize = 26;
/// Offset of the space ID. 4 bytes.
pub const FIL_PAGE_SPACE_ID: usize = 34;

// ── FIL Trailer (8 bytes total) ─────────────────────────────────────

/// Size of the FIL trailer in bytes.
pub const SIZE_FIL_TRAILER: usize = 8;
// Trailer is at: page_size - SIZE_FIL_TRAILER
// old-style checksum: offset 0 within trailer (4 bytes)
// low 32 bits of LSN: offset 4 within trailer (4 bytes)

/// Start of page data (immediately after FIL header).
pub const FIL_PAGE_DATA: usize = 38;

/// Size of a FIL address: 4-byte page number + 2-byte byte offset.
pub const FIL_ADDR_SIZE: usize = 6;

// ── Embedded list nodes (fut0lst.h) ─────────────────────────────────

/// List base node: 4-byte length + first and last FIL addresses.
pub const FLST_BASE_NODE_SIZE: usize = 4 + 2 * FIL_ADDR_SIZE;
/// List node: prev and next FIL addresses.
pub const FLST_NODE_SIZE: usize = 2 * FIL_ADDR_SIZE;

// ── FSP Header (112 bytes, starts at FIL_PAGE_DATA on page 0) ──────

/// Size of the FSP header in bytes.
pub const FSP_HEADER_SIZE: usize = 32 + 5 * FLST_BASE_NODE_SIZE;
/// Offset of the space ID within the FSP header. 4 bytes.
pub const FSP_SPACE_ID: usize = 0;
/// Unused field in the FSP header. 4 bytes.
pub const FSP_NOT_USED: usize = 4;
/// Offset of the tablespace size (in pages) within the FSP header. 4 bytes.
pub const FSP_SIZE: usize = 8;
/// Offset of the minimum page not yet initialized. 4 bytes.
pub const FSP_FREE_LIMIT: usize = 12;
/// Offset of the FSP flags field. 4 bytes.
pub const FSP_SPACE_FLAGS: usize = 16;
/// Offset of the used-page count in the FSP_FREE_FRAG list. 4 bytes.
pub const FSP_FRAG_N_USED: usize = 20;
/// Base node of the list of wholly free extents.
pub const FSP_FREE: usize = 24;
/// Base node of the list of partially used fragment extents.
pub const FSP_FREE_FRAG: usize = 24 + FLST_BASE_NODE_SIZE;
/// Base node of the list of full fragment extents.
pub const FSP_FULL_FRAG: usize = 24 + 2 * FLST_BASE_NODE_SIZE;
/// Next unused segment id. 8 bytes.
pub const FSP_SEG_ID: usize = 24 + 3 * FLST_BASE_NODE_SIZE;
/// Base node of the list of INODE pages with no free slots.
pub const FSP_SEG_INODES_FULL: usize = 32 + 3 * FLST_BASE_NODE_SIZE;
/// Base node of the list of INODE pages with at least one free slot.
pub const FSP_SEG_INODES_FREE: usize = 32 + 4 * FLST_BASE_NODE_SIZE;

// ── FSP flags bit positions for page size detection ─────────────────

/// Bit position of the page size field within FSP flags.
pub const FSP_FLAGS_POS_PAGE_SSIZE: u32 = 6;
/// Bitmask for the 4-bit page size field within FSP flags.
pub const FSP_FLAGS_MASK_PAGE_SSIZE: u32 = 0xF << FSP_FLAGS_POS_PAGE_SSIZE;

// ── XDES (extent descriptor) entries ────────────────────────────────

/// Offset of the owning segment id within an XDES entry. 8 bytes.
pub const XDES_ID: usize = 0;
/// Offset of the list node within an XDES entry. 12 bytes.
pub const XDES_FLST_NODE: usize = 8;
/// Offset of the extent state within an XDES entry. 4 bytes.
pub const XDES_STATE: usize = FLST_NODE_SIZE + 8;
/// Offset of the per-page bitmap within an XDES entry.
pub const XDES_BITMAP: usize = FLST_NODE_SIZE + 12;
/// Bits tracked per page in the XDES bitmap.
pub const XDES_BITS_PER_PAGE: usize = 2;
/// Index of the free bit within a page's 2-bit bitmap field.
pub const XDES_FREE_BIT: usize = 0;
/// Index of the clean bit within a page's 2-bit bitmap field.
pub const XDES_CLEAN_BIT: usize = 1;
/// Total size of one XDES entry at the default extent size.
pub const XDES_SIZE: usize =
    XDES_BITMAP + (PAGES_PER_EXTENT as usize * XDES_BITS_PER_PAGE).div_ceil(8);
/// Start of the XDES entry array on FSP_HDR and XDES pages.
pub const XDES_ARR_OFFSET: usize = FIL_PAGE_DATA + FSP_HEADER_SIZE;

// ── INODE pages and FSEG entries ────────────────────────────────────

/// List node linking INODE pages, at the start of the page data area.
pub const FSEG_INODE_PAGE_NODE: usize = FIL_PAGE_DATA;
/// Start of the FSEG inode entry array on an INODE page.
pub const FSEG_ARR_OFFSET: usize = FIL_PAGE_DATA + FLST_NODE_SIZE;
/// Offset of the segment id within an inode entry. 8 bytes.
pub const FSEG_ID: usize = 0;
/// Offset of the used-page count of the NOT_FULL list. 4 bytes.
pub const FSEG_NOT_FULL_N_USED: usize = 8;
/// Base node of the segment's list of wholly free extents.
pub const FSEG_FREE: usize = 12;
/// Base node of the segment's list of partially used extents.
pub const FSEG_NOT_FULL: usize = 12 + FLST_BASE_NODE_SIZE;
/// Base node of the segment's list of full extents.
pub const FSEG_FULL: usize = 12 + 2 * FLST_BASE_NODE_SIZE;
/// Offset of the inode magic number. 4 bytes.
pub const FSEG_MAGIC_N: usize = 12 + 3 * FLST_BASE_NODE_SIZE;
/// Offset of the fragment page slot array.
pub const FSEG_FRAG_ARR: usize = 16 + 3 * FLST_BASE_NODE_SIZE;
/// Number of fragment page slots per inode entry.
pub const FSEG_FRAG_ARR_N_SLOTS: usize = 32;
/// Size of one fragment page slot (a page number). 4 bytes.
pub const FSEG_FRAG_SLOT_SIZE: usize = 4;
/// Total size of one FSEG inode entry.
pub const FSEG_INODE_SIZE: usize = FSEG_FRAG_ARR + FSEG_FRAG_ARR_N_SLOTS * FSEG_FRAG_SLOT_SIZE;
/// Value of FSEG_MAGIC_N on an initialized inode entry.
pub const FSEG_MAGIC_N_VALUE: u32 = 97937874;

/// Size of an FSEG header pointer (space, page, offset). 10 bytes.
pub const FSEG_HEADER_SIZE: usize = 10;

// ── Page Header (INDEX page specific, starts at FIL_PAGE_DATA) ──────

/// Offset of the directory slot count. 2 bytes.
pub const PAGE_N_DIR_SLOTS: usize = 0;
/// Offset of the record heap top pointer. 2 bytes.
pub const PAGE_HEAP_TOP: usize = 2;
/// Offset of the heap record count (bit 15 = compact flag). 2 bytes.
pub const PAGE_N_HEAP: usize = 4;
/// Offset of the free record list pointer. 2 bytes.
pub const PAGE_FREE: usize = 6;
/// Offset of the deleted-record byte count (garbage). 2 bytes.
pub const PAGE_GARBAGE: usize = 8;
/// Offset of the last-inserted record pointer. 2 bytes.
pub const PAGE_LAST_INSERT: usize = 10;
/// Offset of the last insert direction. 2 bytes.
pub const PAGE_DIRECTION: usize = 12;
/// Offset of the consecutive same-direction insert count. 2 bytes.
pub const PAGE_N_DIRECTION: usize = 14;
/// Offset of the user record count. 2 bytes.
pub const PAGE_N_RECS: usize = 16;
/// Offset of the maximum transaction ID (secondary indexes only). 8 bytes.
pub const PAGE_MAX_TRX_ID: usize = 18;
/// Offset of the B+Tree level (0 = leaf). 2 bytes.
pub const PAGE_LEVEL: usize = 26;
/// Offset of the index ID. 8 bytes.
pub const PAGE_INDEX_ID: usize = 28;
/// Offset of the leaf segment FSEG header (root pages only). 10 bytes.
pub const PAGE_BTR_SEG_LEAF: usize = 36;
/// Offset of the non-leaf segment FSEG header (root pages only). 10 bytes.
pub const PAGE_BTR_SEG_TOP: usize = 46;
/// Total INDEX page header size including the two FSEG headers.
pub const PAGE_HEADER_SIZE: usize = 36 + 2 * FSEG_HEADER_SIZE;

// ── Record extra bytes and system records (compact pages) ───────────

/// Extra bytes preceding each record in new-style (compact) format.
pub const REC_N_NEW_EXTRA_BYTES: usize = 5;

/// Start of the system record area (FIL header + page header).
pub const PAGE_DATA_OFFSET: usize = FIL_PAGE_DATA + PAGE_HEADER_SIZE; // 94
/// Origin of the infimum record (compact format).
pub const PAGE_NEW_INFIMUM: usize = PAGE_DATA_OFFSET + REC_N_NEW_EXTRA_BYTES; // 99
/// Origin of the supremum record (compact format).
pub const PAGE_NEW_SUPREMUM: usize = PAGE_DATA_OFFSET + 2 * REC_N_NEW_EXTRA_BYTES + 8; // 112
/// First usable heap byte after the supremum record.
pub const PAGE_NEW_SUPREMUM_END: usize = PAGE_NEW_SUPREMUM + 8; // 120

/// Size of one page directory slot. 2 bytes.
pub const PAGE_DIR_SLOT_SIZE: usize = 2;

// ── System tablespace fixed pages ───────────────────────────────────

/// Page number of the transaction system header in the system space.
pub const TRX_SYS_PAGE_NO: u32 = 5;
/// Page number of the data dictionary header in the system space.
pub const DICT_HDR_PAGE_NO: u32 = 7;

/// Offset of the maximum assigned transaction id. 8 bytes.
pub const TRX_SYS_TRX_ID_STORE: usize = 0;
/// Offset of the trx system's own FSEG header. 10 bytes.
pub const TRX_SYS_FSEG_HEADER: usize = 8;
/// Start of the rollback segment slot array.
pub const TRX_SYS_RSEGS: usize = 8 + FSEG_HEADER_SIZE;
/// Number of rollback segment slots.
pub const TRX_SYS_N_RSEGS: usize = 128;
/// Offset of the space id within a rollback segment slot. 4 bytes.
pub const TRX_SYS_RSEG_SPACE: usize = 0;
/// Offset of the page number within a rollback segment slot. 4 bytes.
pub const TRX_SYS_RSEG_PAGE_NO: usize = 4;
/// Size of one rollback segment slot.
pub const TRX_SYS_RSEG_SLOT_SIZE: usize = 8;
/// The doublewrite header sits this many bytes before the end of the page.
pub const TRX_SYS_DOUBLEWRITE_END: usize = 200;
/// Doublewrite magic value marking an initialized doublewrite buffer.
pub const TRX_SYS_DOUBLEWRITE_MAGIC_N: u32 = 536853855;

/// Offset of the row id counter within the dictionary header. 8 bytes.
pub const DICT_HDR_ROW_ID: usize = 0;
/// Offset of the table id counter within the dictionary header. 8 bytes.
pub const DICT_HDR_TABLE_ID: usize = 8;
/// Offset of the index id counter within the dictionary header. 8 bytes.
pub const DICT_HDR_INDEX_ID: usize = 16;
/// Offset of the maximum space id within the dictionary header. 4 bytes.
pub const DICT_HDR_MAX_SPACE_ID: usize = 24;
/// Offset of the mix id low field (unused). 4 bytes.
pub const DICT_HDR_MIX_ID_LOW: usize = 28;
/// Offset of the SYS_TABLES clustered index root page number. 4 bytes.
pub const DICT_HDR_TABLES: usize = 32;
/// Offset of the SYS_TABLE_IDS secondary index root page number. 4 bytes.
pub const DICT_HDR_TABLE_IDS: usize = 36;
/// Offset of the SYS_COLUMNS clustered index root page number. 4 bytes.
pub const DICT_HDR_COLUMNS: usize = 40;
/// Offset of the SYS_INDEXES clustered index root page number. 4 bytes.
pub const DICT_HDR_INDEXES: usize = 44;
/// Offset of the SYS_FIELDS clustered index root page number. 4 bytes.
pub const DICT_HDR_FIELDS: usize = 48;

// ── Redo log blocks ─────────────────────────────────────────────────

/// Size of a redo log block in bytes.
pub const LOG_BLOCK_SIZE: usize = 512;
/// Size of the log block header in bytes.
pub const LOG_BLOCK_HDR_SIZE: usize = 12;
/// Size of the log block trailer in bytes.
pub const LOG_BLOCK_TRL_SIZE: usize = 4;
/// Bitmask for the flush flag in the block number field (bit 31).
pub const LOG_BLOCK_FLUSH_BIT_MASK: u32 = 0x80000000;
/// Byte offset of the block checksum (bytes 508-511).
pub const LOG_BLOCK_CHECKSUM_OFFSET: usize = LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE;
/// Number of reserved header/checkpoint blocks at the start of the file.
pub const LOG_FILE_HDR_BLOCKS: u64 = 4;
/// Offset of the checkpoint number within a checkpoint block. 8 bytes.
pub const LOG_CHECKPOINT_NO: usize = 0;
/// Offset of the checkpoint LSN within a checkpoint block. 8 bytes.
pub const LOG_CHECKPOINT_LSN: usize = 8;
/// Bitmask for the single-record flag on a log record type byte.
pub const MLOG_SINGLE_REC_FLAG: u8 = 0x80;

// ── Special values ──────────────────────────────────────────────────

/// Null page reference (0xFFFFFFFF / 4294967295).
pub const FIL_NULL: u32 = 0xFFFFFFFF;

// ── Checksum constants ──────────────────────────────────────────────

/// First random mask used by `ut_fold_ulint_pair` in legacy InnoDB checksums.
pub const UT_HASH_RANDOM_MASK: u32 = 1463735687;
/// Second random mask used by `ut_fold_ulint_pair` in legacy InnoDB checksums.
pub const UT_HASH_RANDOM_MASK2: u32 = 1653893711;
/// Magic checksum value written when checksums are disabled.
pub const BUF_NO_CHECKSUM_MAGIC: u32 = 0xDEADBEEF;

// ── Insert direction values ─────────────────────────────────────────

/// Insert direction: left.
pub const PAGE_LEFT: u16 = 1;
/// Insert direction: right.
pub const PAGE_RIGHT: u16 = 2;
/// Insert direction: same record position.
pub const PAGE_SAME_REC: u16 = 3;
/// Insert direction: same page.
pub const PAGE_SAME_PAGE: u16 = 4;
/// Insert direction: no direction.
pub const PAGE_NO_DIRECTION: u16 = 5;
