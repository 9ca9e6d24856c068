//! FIL-framed pages and the typed page factory.
//!
//! Every InnoDB page begins with a 38-byte FIL header ([`FilHeader`])
//! containing the checksum, page number, prev/next pointers, LSN, page type,
//! flush LSN, and space ID. The last 8 bytes form the FIL trailer
//! ([`FilTrailer`]) with the old-style checksum and low 32 bits of the LSN.
//!
//! [`Page`] owns one page-sized buffer read from a tablespace and exposes
//! the decoded framing. [`Page::view`] is the page factory: it dispatches on
//! the FIL type tag and constructs the matching typed view ([`PageView`]),
//! which borrows the page buffer and never copies it. Unrecognized types
//! fall back to the generic framed page.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::cursor::Cursor;
use crate::innodb::fsp::{FspHdrPage, XdesPage};
use crate::innodb::index::IndexPage;
use crate::innodb::inode::InodePage;
use crate::innodb::page_types::PageType;
use crate::innodb::sys::TrxSysPage;
use crate::innodb::{checksum, checksum::ChecksumResult};
use crate::IbsError;

/// Parsed FIL header (38 bytes, present at the start of every InnoDB page).
#[derive(Debug, Clone, Serialize)]
pub struct FilHeader {
    /// Checksum (or space id in older formats). Bytes 0-3.
    pub checksum: u32,
    /// Page number within the tablespace. Bytes 4-7.
    pub page_number: u32,
    /// Previous page in the doubly-linked list. Bytes 8-11.
    /// FIL_NULL (0xFFFFFFFF) if not used.
    pub prev_page: u32,
    /// Next page in the doubly-linked list. Bytes 12-15.
    /// FIL_NULL (0xFFFFFFFF) if not used.
    pub next_page: u32,
    /// LSN of newest modification to this page. Bytes 16-23.
    pub lsn: u64,
    /// Page type. Bytes 24-25.
    pub page_type: PageType,
    /// Flush LSN (only meaningful for page 0 of the system space). Bytes 26-33.
    pub flush_lsn: u64,
    /// Space ID this page belongs to. Bytes 34-37.
    pub space_id: u32,
}

impl FilHeader {
    /// Parse a FIL header from a byte slice.
    ///
    /// The slice must be at least SIZE_FIL_HEAD (38) bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_FIL_HEAD {
            return None;
        }

        Some(FilHeader {
            checksum: BigEndian::read_u32(&data[FIL_PAGE_SPACE_OR_CHKSUM..]),
            page_number: BigEndian::read_u32(&data[FIL_PAGE_OFFSET..]),
            prev_page: BigEndian::read_u32(&data[FIL_PAGE_PREV..]),
            next_page: BigEndian::read_u32(&data[FIL_PAGE_NEXT..]),
            lsn: BigEndian::read_u64(&data[FIL_PAGE_LSN..]),
            page_type: PageType::from_u16(BigEndian::read_u16(&data[FIL_PAGE_TYPE..])),
            flush_lsn: BigEndian::read_u64(&data[FIL_PAGE_FILE_FLUSH_LSN..]),
            space_id: BigEndian::read_u32(&data[FIL_PAGE_SPACE_ID..]),
        })
    }

    /// Previous page number, unless FIL_NULL.
    pub fn prev(&self) -> Option<u32> {
        (self.prev_page != FIL_NULL).then_some(self.prev_page)
    }

    /// Next page number, unless FIL_NULL.
    pub fn next(&self) -> Option<u32> {
        (self.next_page != FIL_NULL).then_some(self.next_page)
    }
}

/// Parsed FIL trailer (8 bytes, present at the end of every InnoDB page).
#[derive(Debug, Clone, Serialize)]
pub struct FilTrailer {
    /// Old-style checksum. Bytes 0-3 of the trailer.
    pub checksum: u32,
    /// Low 32 bits of the LSN. Bytes 4-7 of the trailer.
    pub lsn_low32: u32,
}

impl FilTrailer {
    /// Parse a FIL trailer from the last 8 bytes of a page.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_FIL_TRAILER {
            return None;
        }

        Some(FilTrailer {
            checksum: BigEndian::read_u32(&data[0..]),
            lsn_low32: BigEndian::read_u32(&data[4..]),
        })
    }
}

/// One page read from a tablespace, with its FIL framing decoded.
#[derive(Debug)]
pub struct Page {
    data: Vec<u8>,
    page_size: u32,
    fil: FilHeader,
}

impl Page {
    /// Frame a raw page buffer. The buffer must be exactly one page.
    pub fn new(data: Vec<u8>, page_size: u32) -> Result<Self, IbsError> {
        if data.len() != page_size as usize {
            return Err(IbsError::Corrupt(format!(
                "page buffer is {} bytes, expected {}",
                data.len(),
                page_size
            )));
        }
        let fil = FilHeader::parse(&data).ok_or_else(|| {
            IbsError::Corrupt("page too small for a FIL header".to_string())
        })?;
        Ok(Page {
            data,
            page_size,
            fil,
        })
    }

    /// The decoded FIL header.
    pub fn fil(&self) -> &FilHeader {
        &self.fil
    }

    /// The raw page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Page size in bytes.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Page number from the FIL header.
    pub fn page_number(&self) -> u32 {
        self.fil.page_number
    }

    /// Page type from the FIL header.
    pub fn page_type(&self) -> PageType {
        self.fil.page_type
    }

    /// Decode the FIL trailer.
    pub fn trailer(&self) -> FilTrailer {
        let offset = self.page_size as usize - SIZE_FIL_TRAILER;
        FilTrailer {
            checksum: BigEndian::read_u32(&self.data[offset..]),
            lsn_low32: BigEndian::read_u32(&self.data[offset + 4..]),
        }
    }

    /// A cursor positioned at the start of this page's buffer.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.data)
    }

    /// True if every byte of the page is zero (freshly allocated, never
    /// written).
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Validate the stored checksum against both page checksum algorithms.
    pub fn checksum(&self) -> ChecksumResult {
        checksum::validate_checksum(&self.data, self.page_size)
    }

    /// True if the stored checksum matches any algorithm. Advisory only.
    pub fn checksum_ok(&self) -> bool {
        self.checksum().valid
    }

    /// True if the trailer's LSN low word matches the header LSN.
    pub fn lsn_consistent(&self) -> bool {
        self.trailer().lsn_low32 == (self.fil.lsn & 0xFFFFFFFF) as u32
    }

    /// The page factory: construct the typed view matching the FIL type tag.
    ///
    /// The specialized views borrow this page's buffer; nothing is re-read
    /// from the file. Types without a specialized parser come back as
    /// [`PageView::Raw`].
    pub fn view(&self) -> Result<PageView<'_>, IbsError> {
        Ok(match self.fil.page_type {
            PageType::FspHdr => PageView::FspHdr(FspHdrPage::new(self)?),
            PageType::Xdes => PageView::Xdes(XdesPage::new(self)?),
            PageType::Inode => PageView::Inode(InodePage::new(self)?),
            PageType::Index => PageView::Index(IndexPage::new(self)?),
            PageType::TrxSys => PageView::TrxSys(TrxSysPage::new(self)?),
            _ => PageView::Raw(self),
        })
    }
}

/// Typed page views, tagged by the FIL page type.
pub enum PageView<'a> {
    /// FSP_HDR page: space header plus the first XDES array.
    FspHdr(FspHdrPage<'a>),
    /// XDES page: an XDES array without the space header.
    Xdes(XdesPage<'a>),
    /// INODE page: array of file segment descriptors.
    Inode(InodePage<'a>),
    /// INDEX page: B+Tree node.
    Index(IndexPage<'a>),
    /// TRX_SYS page: rollback segment slots and doublewrite header.
    TrxSys(TrxSysPage<'a>),
    /// Any page without a specialized parser.
    Raw(&'a Page),
}

impl<'a> PageView<'a> {
    /// Name of the underlying page type.
    pub fn type_name(&self) -> &'static str {
        match self {
            PageView::FspHdr(_) => "FSP_HDR",
            PageView::Xdes(_) => "XDES",
            PageView::Inode(_) => "INODE",
            PageView::Index(_) => "INDEX",
            PageView::TrxSys(_) => "TRX_SYS",
            PageView::Raw(p) => p.page_type().name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_page(page_type: u16, page_num: u32, lsn: u64) -> Vec<u8> {
        let mut buf = vec![0u8; SIZE_PAGE_DEFAULT as usize];
        BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_num);
        BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], FIL_NULL);
        BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], FIL_NULL);
        BigEndian::write_u64(&mut buf[FIL_PAGE_LSN..], lsn);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], page_type);
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], 1);
        let trailer = buf.len() - SIZE_FIL_TRAILER;
        BigEndian::write_u32(&mut buf[trailer + 4..], (lsn & 0xFFFFFFFF) as u32);
        buf
    }

    #[test]
    fn test_fil_header_parse() {
        let data = make_page(17855, 42, 1000);
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.page_number, 42);
        assert_eq!(hdr.lsn, 1000);
        assert_eq!(hdr.page_type, PageType::Index);
        assert_eq!(hdr.space_id, 1);
        assert_eq!(hdr.prev(), None);
        assert_eq!(hdr.next(), None);
    }

    #[test]
    fn test_fil_header_prev_next_not_null() {
        let mut data = make_page(17855, 5, 0);
        BigEndian::write_u32(&mut data[FIL_PAGE_PREV..], 4);
        BigEndian::write_u32(&mut data[FIL_PAGE_NEXT..], 6);
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.prev(), Some(4));
        assert_eq!(hdr.next(), Some(6));
    }

    #[test]
    fn test_fil_header_too_short() {
        let data = vec![0u8; 10];
        assert!(FilHeader::parse(&data).is_none());
    }

    #[test]
    fn test_page_rejects_wrong_size_buffer() {
        let result = Page::new(vec![0u8; 100], SIZE_PAGE_DEFAULT);
        assert!(matches!(result, Err(IbsError::Corrupt(_))));
    }

    #[test]
    fn test_page_lsn_consistency() {
        let data = make_page(0, 1, 0xAABBCCDDEE);
        let page = Page::new(data, SIZE_PAGE_DEFAULT).unwrap();
        assert!(page.lsn_consistent());

        let mut data = make_page(0, 1, 0xAABBCCDDEE);
        let trailer = data.len() - SIZE_FIL_TRAILER;
        BigEndian::write_u32(&mut data[trailer + 4..], 0x12345678);
        let page = Page::new(data, SIZE_PAGE_DEFAULT).unwrap();
        assert!(!page.lsn_consistent());
    }

    #[test]
    fn test_empty_page_detection() {
        let page = Page::new(vec![0u8; SIZE_PAGE_DEFAULT as usize], SIZE_PAGE_DEFAULT).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page_type(), PageType::Allocated);

        let page = Page::new(make_page(0, 1, 9), SIZE_PAGE_DEFAULT).unwrap();
        assert!(!page.is_empty());
    }

    #[test]
    fn test_view_falls_back_to_raw() {
        let page = Page::new(make_page(999, 3, 0), SIZE_PAGE_DEFAULT).unwrap();
        let view = page.view().unwrap();
        assert!(matches!(view, PageView::Raw(_)));
        assert_eq!(view.type_name(), "OTHER");
    }
}
