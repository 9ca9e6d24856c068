//! Tablespace file I/O and space-level iteration.
//!
//! [`Space`] is the primary entry point: it opens a tablespace file,
//! auto-detects the page size from the FSP flags on page 0 (with an
//! explicit override for damaged headers), and composes the typed page
//! views into file-scoped queries — page iteration, extent and inode
//! enumeration, embedded list walks, index discovery, per-page accounting,
//! and page-type region summaries.
//!
//! A `Space` reads pages on demand and holds no cache beyond the parsed
//! page-0 header; every `page()` call re-reads from the file. The file is
//! treated as immutable.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::fsp::{
    xdes_position_for_page, FspHdrPage, FspHeader, XdesEntry, XdesListDecoder, XdesPage,
};
use crate::innodb::index::IndexPage;
use crate::innodb::inode::{FsegPointer, InodeEntry, InodePage};
use crate::innodb::list::{FilAddr, ListBaseNode, ListEntryDecoder};
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::innodb::sys;
use crate::IbsError;

/// An index discovered in a space: its root page and index id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Root page number.
    pub root_page_number: u32,
    /// Index id from the root page header.
    pub index_id: u64,
}

/// A run of consecutive pages sharing one page type.
#[derive(Debug, Clone, Serialize)]
pub struct PageTypeRegion {
    /// First page of the run.
    pub start: u64,
    /// Last page of the run, inclusive.
    pub end: u64,
    /// Number of pages in the run.
    pub count: u64,
    /// The shared page type.
    pub page_type: PageType,
}

/// Where a page sits in the space's bookkeeping structures.
#[derive(Debug, Clone, Serialize)]
pub struct PageAccount {
    /// The page being accounted for.
    pub page_number: u32,
    /// Location of the page's extent descriptor.
    pub xdes_position: FilAddr,
    /// Extent state name for the descriptor.
    pub extent_state: String,
    /// Whether the XDES bitmap marks the page free.
    pub free: bool,
    /// Owning segment id, when the extent belongs to one.
    pub fseg_id: Option<u64>,
    /// Location of the owning segment's inode entry.
    pub inode_position: Option<FilAddr>,
    /// How the segment tracks the page: an extent list name or the
    /// fragment array.
    pub membership: Option<String>,
    /// Root page of the index whose segment owns the page, if one matches.
    pub index_root: Option<u32>,
}

/// An open tablespace file.
pub struct Space {
    file: File,
    path: PathBuf,
    file_size: u64,
    page_size: u32,
    page_count: u64,
    fsp: Option<FspHeader>,
}

impl Space {
    /// Open a tablespace and auto-detect the page size from page 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IbsError> {
        Self::open_inner(path.as_ref(), None)
    }

    /// Open with an explicit page size, bypassing auto-detection.
    pub fn open_with_page_size<P: AsRef<Path>>(path: P, page_size: u32) -> Result<Self, IbsError> {
        if !SUPPORTED_PAGE_SIZES.contains(&page_size) {
            return Err(IbsError::Usage(format!(
                "unsupported page size {} (supported: {:?})",
                page_size, SUPPORTED_PAGE_SIZES
            )));
        }
        Self::open_inner(path.as_ref(), Some(page_size))
    }

    fn open_inner(path: &Path, explicit_page_size: Option<u32>) -> Result<Self, IbsError> {
        let mut file = File::open(path)
            .map_err(|e| IbsError::Io(format!("cannot open {}: {}", path.display(), e)))?;

        let file_size = file
            .metadata()
            .map_err(|e| IbsError::Io(format!("cannot stat {}: {}", path.display(), e)))?
            .len();

        if file_size < (FIL_PAGE_DATA + FSP_HEADER_SIZE) as u64 {
            return Err(IbsError::Corrupt(format!(
                "{} is too small to be a tablespace ({} bytes)",
                path.display(),
                file_size
            )));
        }

        // Read up to one default-size page to inspect the FSP header.
        let probe_size = std::cmp::min(file_size, SIZE_PAGE_DEFAULT as u64) as usize;
        let mut probe = vec![0u8; probe_size];
        file.read_exact(&mut probe)
            .map_err(|e| IbsError::Io(format!("cannot read page 0: {}", e)))?;

        let fsp = FspHeader::parse(&probe);
        let page_size = match explicit_page_size {
            Some(size) => size,
            None => {
                let detected = fsp
                    .as_ref()
                    .map(|f| f.page_size_from_flags())
                    .unwrap_or(SIZE_PAGE_DEFAULT);
                if SUPPORTED_PAGE_SIZES.contains(&detected) {
                    detected
                } else {
                    return Err(IbsError::Corrupt(format!(
                        "{}: FSP flags name an unsupported page size {}",
                        path.display(),
                        detected
                    )));
                }
            }
        };

        let page_count = file_size / page_size as u64;

        Ok(Space {
            file,
            path: path.to_path_buf(),
            file_size,
            page_size,
            page_count,
            fsp,
        })
    }

    /// The path this space was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected or configured page size in bytes.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of pages in the file.
    pub fn pages(&self) -> u64 {
        self.page_count
    }

    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The FSP header from page 0, if it parsed.
    pub fn fsp(&self) -> Option<&FspHeader> {
        self.fsp.as_ref()
    }

    /// Space id from the FSP header, if available.
    pub fn space_id(&self) -> Option<u32> {
        self.fsp.as_ref().map(|f| f.space_id)
    }

    /// True for the system tablespace (space id 0), which carries the
    /// transaction system and data dictionary pages.
    pub fn is_system_space(&self) -> bool {
        self.space_id() == Some(0)
    }

    /// Read one page by number.
    pub fn page(&mut self, page_number: u64) -> Result<Page, IbsError> {
        if page_number >= self.page_count {
            return Err(IbsError::Usage(format!(
                "page {} out of range (space has {} pages)",
                page_number, self.page_count
            )));
        }

        let offset = page_number * self.page_size as u64;
        let mut buf = vec![0u8; self.page_size as usize];

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IbsError::Io(format!("cannot seek to page {}: {}", page_number, e)))?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| IbsError::Io(format!("cannot read page {}: {}", page_number, e)))?;

        Page::new(buf, self.page_size)
    }

    /// Convenience for u32 page numbers from on-disk pointers.
    pub fn page32(&mut self, page_number: u32) -> Result<Page, IbsError> {
        self.page(page_number as u64)
    }

    /// Iterate pages from `start`, in ascending page-number order.
    ///
    /// An unreadable page does not stop the walk: the callback receives the
    /// error as its diagnostic and iteration continues with the next page.
    pub fn each_page<F>(&mut self, start: u64, mut f: F) -> Result<u64, IbsError>
    where
        F: FnMut(u64, Result<Page, IbsError>) -> Result<(), IbsError>,
    {
        let mut visited = 0u64;
        for page_number in start..self.page_count {
            f(page_number, self.page(page_number))?;
            visited += 1;
        }
        Ok(visited)
    }

    /// Collapse the page sequence into runs of equal page type.
    pub fn each_page_type_region<F>(&mut self, mut f: F) -> Result<(), IbsError>
    where
        F: FnMut(&PageTypeRegion) -> Result<(), IbsError>,
    {
        let mut current: Option<PageTypeRegion> = None;
        for page_number in 0..self.page_count {
            let page_type = self.page(page_number)?.page_type();
            match current.as_mut() {
                Some(region) if region.page_type == page_type => {
                    region.end = page_number;
                    region.count += 1;
                }
                Some(region) => {
                    f(region)?;
                    current = Some(PageTypeRegion {
                        start: page_number,
                        end: page_number,
                        count: 1,
                        page_type,
                    });
                }
                None => {
                    current = Some(PageTypeRegion {
                        start: page_number,
                        end: page_number,
                        count: 1,
                        page_type,
                    });
                }
            }
        }
        if let Some(region) = current.as_ref() {
            f(region)?;
        }
        Ok(())
    }

    /// The extent descriptor covering `page_number`.
    pub fn xdes_for_page(&mut self, page_number: u32) -> Result<XdesEntry, IbsError> {
        if page_number as u64 >= self.page_count {
            return Err(IbsError::Usage(format!(
                "page {} out of range (space has {} pages)",
                page_number, self.page_count
            )));
        }
        let position = xdes_position_for_page(page_number, self.page_size);
        let page = self.page32(position.page)?;
        XdesEntry::parse_at(&page, position.offset as usize)
    }

    /// Iterate every extent descriptor in the space, ascending by extent.
    ///
    /// Only descriptors for extents below the FSP free limit are yielded;
    /// beyond it the array is uninitialized.
    pub fn each_xdes<F>(&mut self, mut f: F) -> Result<u64, IbsError>
    where
        F: FnMut(&XdesEntry) -> Result<(), IbsError>,
    {
        let limit = self
            .fsp
            .as_ref()
            .map(|h| h.free_limit as u64)
            .unwrap_or(self.page_count)
            .min(self.page_count);

        if self.page_count == 0 {
            return Ok(0);
        }

        let interval = crate::innodb::fsp::pages_per_xdes_page(self.page_size) as u64;
        let mut yielded = 0u64;
        let mut descriptor_page = 0u64;
        loop {
            let page = self.page(descriptor_page)?;
            let entries = match page.page_type() {
                PageType::FspHdr => FspHdrPage::new(&page)?.xdes_entries()?,
                PageType::Xdes => XdesPage::new(&page)?.xdes_entries()?,
                other => {
                    return Err(IbsError::Corrupt(format!(
                        "page {} should be a descriptor page but is {}",
                        descriptor_page, other
                    )))
                }
            };
            for entry in &entries {
                if entry.start_page as u64 >= limit {
                    return Ok(yielded);
                }
                f(entry)?;
                yielded += 1;
            }
            descriptor_page += interval;
            if descriptor_page >= self.page_count {
                break;
            }
        }
        Ok(yielded)
    }

    /// Walk an embedded list forward from `first`, decoding each entry.
    ///
    /// The base node's length bounds the walk: a chain still holding nodes
    /// past `length` is corrupt (and this is also what catches pointer
    /// cycles). A chain ending early is corrupt too.
    pub fn each_list_entry<D, F>(
        &mut self,
        base: &ListBaseNode,
        decoder: &D,
        mut f: F,
    ) -> Result<u32, IbsError>
    where
        D: ListEntryDecoder,
        F: FnMut(FilAddr, D::Entry) -> Result<(), IbsError>,
    {
        let mut addr = base.first;
        let mut visited = 0u32;
        while let Some(current) = addr {
            if visited == base.length {
                return Err(IbsError::Corrupt(format!(
                    "list chain exceeds its base length {}",
                    base.length
                )));
            }
            let page = self.page32(current.page)?;
            let (entry, node) = decoder.decode(&page, current)?;
            f(current, entry)?;
            visited += 1;
            addr = node.next;
        }
        if visited != base.length {
            return Err(IbsError::Corrupt(format!(
                "list chain holds {} nodes but base length is {}",
                visited, base.length
            )));
        }
        Ok(visited)
    }

    /// Walk an embedded list backward from `last`, for verification against
    /// the forward order.
    pub fn each_list_entry_reverse<D, F>(
        &mut self,
        base: &ListBaseNode,
        decoder: &D,
        mut f: F,
    ) -> Result<u32, IbsError>
    where
        D: ListEntryDecoder,
        F: FnMut(FilAddr, D::Entry) -> Result<(), IbsError>,
    {
        let mut addr = base.last;
        let mut visited = 0u32;
        while let Some(current) = addr {
            if visited == base.length {
                return Err(IbsError::Corrupt(format!(
                    "list chain exceeds its base length {}",
                    base.length
                )));
            }
            let page = self.page32(current.page)?;
            let (entry, node) = decoder.decode(&page, current)?;
            f(current, entry)?;
            visited += 1;
            addr = node.prev;
        }
        if visited != base.length {
            return Err(IbsError::Corrupt(format!(
                "reverse list chain holds {} nodes but base length is {}",
                visited, base.length
            )));
        }
        Ok(visited)
    }

    /// Every space-level XDES list as (name, base node), in header order.
    pub fn each_xdes_list(&self) -> Result<Vec<(&'static str, ListBaseNode)>, IbsError> {
        let fsp = self.fsp.as_ref().ok_or_else(|| {
            IbsError::Corrupt("space has no parsed FSP header".to_string())
        })?;
        Ok(fsp
            .each_xdes_list()
            .map(|(name, base)| (name, *base))
            .collect())
    }

    /// True if the node at `target` is linked into the list. O(length).
    pub fn list_includes<D: ListEntryDecoder>(
        &mut self,
        base: &ListBaseNode,
        decoder: &D,
        target: FilAddr,
    ) -> Result<bool, IbsError> {
        let mut addr = base.first;
        let mut visited = 0u32;
        while let Some(current) = addr {
            if current == target {
                return Ok(true);
            }
            if visited == base.length {
                return Err(IbsError::Corrupt(format!(
                    "list chain exceeds its base length {}",
                    base.length
                )));
            }
            let page = self.page32(current.page)?;
            let (_, node) = decoder.decode(&page, current)?;
            visited += 1;
            addr = node.next;
        }
        Ok(false)
    }

    /// A space-level XDES list by name ("free", "free_frag", "full_frag").
    pub fn xdes_list(&self, name: &str) -> Result<ListBaseNode, IbsError> {
        let fsp = self.fsp.as_ref().ok_or_else(|| {
            IbsError::Corrupt("space has no parsed FSP header".to_string())
        })?;
        fsp.xdes_list(name).copied().ok_or_else(|| {
            IbsError::Usage(format!(
                "no XDES list named {:?} (expected one of free, free_frag, full_frag)",
                name
            ))
        })
    }

    /// Resolve an FSEG pointer to its inode entry.
    pub fn inode_at(&mut self, ptr: FsegPointer) -> Result<InodeEntry, IbsError> {
        if ptr.is_unset() {
            return Err(IbsError::Usage(
                "FSEG pointer does not reference an inode".to_string(),
            ));
        }
        let page = self.page32(ptr.page_number)?;
        InodeEntry::parse_at(&page, ptr.offset as usize)
    }

    /// Iterate every in-use inode entry in the space, by walking the FSP
    /// header's full and free inode page lists.
    pub fn each_inode<F>(&mut self, mut f: F) -> Result<u64, IbsError>
    where
        F: FnMut(&InodeEntry) -> Result<(), IbsError>,
    {
        let fsp = match self.fsp.as_ref() {
            Some(f) => f.clone(),
            None => return Ok(0),
        };

        let mut yielded = 0u64;
        for base in [&fsp.full_inodes, &fsp.free_inodes] {
            let mut pages = Vec::new();
            self.each_list_entry(base, &crate::innodb::inode::InodeListDecoder, |addr, _| {
                pages.push(addr.page);
                Ok(())
            })?;
            for page_number in pages {
                let page = self.page32(page_number)?;
                let view = InodePage::new(&page)?;
                for inode in view.used_inodes()? {
                    f(&inode)?;
                    yielded += 1;
                }
            }
        }
        Ok(yielded)
    }

    /// Enumerate the indexes stored in this space.
    ///
    /// In the system space the data dictionary is authoritative; elsewhere
    /// the pages are scanned for INDEX roots (the pages carrying both
    /// inline FSEG pointers).
    pub fn each_index<F>(&mut self, mut f: F) -> Result<u64, IbsError>
    where
        F: FnMut(&IndexDescriptor) -> Result<(), IbsError>,
    {
        if self.is_system_space() {
            return sys::each_dictionary_index(self, f);
        }

        let mut yielded = 0u64;
        for page_number in 0..self.page_count {
            let page = self.page(page_number)?;
            if page.page_type() != PageType::Index {
                continue;
            }
            let view = match IndexPage::new(&page) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if view.is_root()? {
                f(&IndexDescriptor {
                    root_page_number: page_number as u32,
                    index_id: view.index_id(),
                })?;
                yielded += 1;
            }
        }
        Ok(yielded)
    }

    /// Account for one page: its extent descriptor, owning segment, list
    /// or fragment membership, and owning index.
    pub fn page_account(&mut self, page_number: u32) -> Result<PageAccount, IbsError> {
        let xdes = self.xdes_for_page(page_number)?;
        let status = xdes.page_status_of(page_number)?;

        let mut account = PageAccount {
            page_number,
            xdes_position: xdes.position,
            extent_state: xdes.state.name().to_string(),
            free: status.free,
            fseg_id: xdes.allocated_to_fseg().then_some(xdes.fseg_id),
            inode_position: None,
            membership: None,
            index_root: None,
        };

        // Fragment pages live in an inode's fragment array rather than an
        // extent owned by the segment, so check every inode for both.
        let mut inodes = Vec::new();
        self.each_inode(|inode| {
            inodes.push(inode.clone());
            Ok(())
        })?;

        for inode in &inodes {
            if inode.frag_pages().any(|p| p == page_number) {
                account.fseg_id = Some(inode.fseg_id);
                account.inode_position = Some(inode.position);
                account.membership = Some("fragment array".to_string());
                break;
            }
            if Some(inode.fseg_id) == account.fseg_id {
                account.inode_position = Some(inode.position);
                for (name, base) in inode.each_list() {
                    let mut found = false;
                    self.walk_xdes_list_for(base, |entry| {
                        if entry.position == xdes.position {
                            found = true;
                        }
                    })?;
                    if found {
                        account.membership = Some(name.to_string());
                        break;
                    }
                }
                break;
            }
        }

        if let Some(inode_position) = account.inode_position {
            account.index_root = self.index_root_for_inode(inode_position)?;
        }

        Ok(account)
    }

    fn walk_xdes_list_for<F>(&mut self, base: &ListBaseNode, mut f: F) -> Result<(), IbsError>
    where
        F: FnMut(&XdesEntry),
    {
        self.each_list_entry(base, &XdesListDecoder, |_, entry| {
            f(&entry);
            Ok(())
        })
        .map(|_| ())
    }

    fn index_root_for_inode(&mut self, inode: FilAddr) -> Result<Option<u32>, IbsError> {
        let mut roots = Vec::new();
        self.each_index(|descriptor| {
            roots.push(descriptor.root_page_number);
            Ok(())
        })?;
        for root in roots {
            let page = self.page32(root)?;
            let view = IndexPage::new(&page)?;
            for ptr in [view.leaf_fseg()?, view.internal_fseg()?] {
                if !ptr.is_unset()
                    && ptr.page_number == inode.page
                    && ptr.offset == inode.offset
                {
                    return Ok(Some(root));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build_page(page_size: usize, page_num: u32, page_type: u16, space_id: u32) -> Vec<u8> {
        let mut buf = vec![0u8; page_size];
        BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_num);
        BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], FIL_NULL);
        BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], FIL_NULL);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], page_type);
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], space_id);
        buf
    }

    fn build_fsp_page(page_size: usize, space_id: u32, pages: u32, ssize: u32) -> Vec<u8> {
        let mut buf = build_page(page_size, 0, 8, space_id);
        let d = FIL_PAGE_DATA;
        BigEndian::write_u32(&mut buf[d + FSP_SPACE_ID..], space_id);
        BigEndian::write_u32(&mut buf[d + FSP_SIZE..], pages);
        BigEndian::write_u32(&mut buf[d + FSP_FREE_LIMIT..], pages);
        BigEndian::write_u32(&mut buf[d + FSP_SPACE_FLAGS..], ssize << FSP_FLAGS_POS_PAGE_SSIZE);
        for list in [
            FSP_FREE,
            FSP_FREE_FRAG,
            FSP_FULL_FRAG,
            FSP_SEG_INODES_FULL,
            FSP_SEG_INODES_FREE,
        ] {
            BigEndian::write_u32(&mut buf[d + list + 4..], FIL_NULL);
            BigEndian::write_u32(&mut buf[d + list + 10..], FIL_NULL);
        }
        buf
    }

    fn write_file(pages: &[Vec<u8>]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        for page in pages {
            file.write_all(page).expect("write page");
        }
        file.flush().expect("flush");
        file
    }

    #[test]
    fn test_open_detects_default_page_size() {
        let ps = SIZE_PAGE_DEFAULT as usize;
        let file = write_file(&[
            build_fsp_page(ps, 7, 2, 0),
            build_page(ps, 1, 0, 7),
        ]);
        let space = Space::open(file.path()).unwrap();
        assert_eq!(space.page_size(), SIZE_PAGE_DEFAULT);
        assert_eq!(space.pages(), 2);
        assert_eq!(space.space_id(), Some(7));
    }

    #[test]
    fn test_open_detects_small_page_size_from_flags() {
        // ssize 3 encodes 4 KiB pages.
        let file = write_file(&[
            build_fsp_page(4096, 3, 2, 3),
            build_page(4096, 1, 0, 3),
        ]);
        let space = Space::open(file.path()).unwrap();
        assert_eq!(space.page_size(), 4096);
        assert_eq!(space.pages(), 2);
    }

    #[test]
    fn test_open_rejects_tiny_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 32]).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            Space::open(file.path()),
            Err(IbsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        assert!(matches!(
            Space::open("/nonexistent/space.ibd"),
            Err(IbsError::Io(_))
        ));
    }

    #[test]
    fn test_page_reads_correct_offsets() {
        let ps = SIZE_PAGE_DEFAULT as usize;
        let file = write_file(&[
            build_fsp_page(ps, 1, 3, 0),
            build_page(ps, 1, 17855, 1),
            build_page(ps, 2, 3, 1),
        ]);
        let mut space = Space::open(file.path()).unwrap();
        assert_eq!(space.page(1).unwrap().page_type(), PageType::Index);
        assert_eq!(space.page(2).unwrap().page_type(), PageType::Inode);
        assert_eq!(space.page(2).unwrap().page_number(), 2);
    }
}
