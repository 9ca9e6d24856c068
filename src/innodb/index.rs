//! INDEX pages and B+Tree traversal.
//!
//! INDEX pages (page type 17855) are the B+Tree nodes that store table data
//! and secondary index entries. Each carries a 36-byte [`IndexHeader`] at
//! byte 38, two 10-byte FSEG pointers (set only on root pages), the
//! infimum/supremum system records, a record heap growing up from byte 120,
//! and a page directory growing down from the trailer.
//!
//! [`IndexPage`] decodes one page: header fields, the record chain from
//! infimum to supremum, the directory slots, and child page links on
//! internal levels. [`Btree`] walks a whole tree from its root page:
//! depth-first recursion with page and link callbacks, per-level
//! enumeration via the leaf/level chains, and record iteration in key
//! order. Any page whose index id differs from the root's stops the walk
//! with a corruption error.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::inode::{FsegPointer, InodeEntry};
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::innodb::record::{
    header_at, parse_record, Field, Record, RecordDescriber, RecordHeader, RecordType,
};
use crate::innodb::space::Space;
use crate::IbsError;

/// Parsed INDEX page header (36 bytes at FIL_PAGE_DATA).
#[derive(Debug, Clone, Serialize)]
pub struct IndexHeader {
    /// Number of directory slots in the page directory.
    pub n_dir_slots: u16,
    /// Pointer to the record heap top.
    pub heap_top: u16,
    /// Number of records in the heap. Bit 15 is the compact format flag.
    pub n_heap_raw: u16,
    /// Pointer to the start of the free record list (0 if none).
    pub free: u16,
    /// Number of bytes in deleted records.
    pub garbage: u16,
    /// Pointer to the last inserted record (0 if reset).
    pub last_insert: u16,
    /// Last insert direction.
    pub direction: u16,
    /// Number of consecutive inserts in the same direction.
    pub n_direction: u16,
    /// Number of user records on the page.
    pub n_recs: u16,
    /// Highest trx id that may have modified a record (secondary indexes).
    pub max_trx_id: u64,
    /// Level in the B+Tree (0 = leaf).
    pub level: u16,
    /// Index ID the page belongs to.
    pub index_id: u64,
}

impl IndexHeader {
    /// Parse an INDEX page header from a full page buffer.
    pub fn parse(page_data: &[u8]) -> Option<Self> {
        if page_data.len() < FIL_PAGE_DATA + 36 {
            return None;
        }
        let d = &page_data[FIL_PAGE_DATA..];

        Some(IndexHeader {
            n_dir_slots: BigEndian::read_u16(&d[PAGE_N_DIR_SLOTS..]),
            heap_top: BigEndian::read_u16(&d[PAGE_HEAP_TOP..]),
            n_heap_raw: BigEndian::read_u16(&d[PAGE_N_HEAP..]),
            free: BigEndian::read_u16(&d[PAGE_FREE..]),
            garbage: BigEndian::read_u16(&d[PAGE_GARBAGE..]),
            last_insert: BigEndian::read_u16(&d[PAGE_LAST_INSERT..]),
            direction: BigEndian::read_u16(&d[PAGE_DIRECTION..]),
            n_direction: BigEndian::read_u16(&d[PAGE_N_DIRECTION..]),
            n_recs: BigEndian::read_u16(&d[PAGE_N_RECS..]),
            max_trx_id: BigEndian::read_u64(&d[PAGE_MAX_TRX_ID..]),
            level: BigEndian::read_u16(&d[PAGE_LEVEL..]),
            index_id: BigEndian::read_u64(&d[PAGE_INDEX_ID..]),
        })
    }

    /// The heap record count with the format flag masked out.
    pub fn n_heap(&self) -> u16 {
        self.n_heap_raw & 0x7FFF
    }

    /// True if the page uses the compact row format.
    pub fn is_compact(&self) -> bool {
        self.n_heap_raw & 0x8000 != 0
    }

    /// True for a leaf-level page.
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    /// Human-readable insert direction.
    pub fn direction_name(&self) -> &'static str {
        match self.direction {
            PAGE_LEFT => "Left",
            PAGE_RIGHT => "Right",
            PAGE_SAME_REC => "Same Record",
            PAGE_SAME_PAGE => "Same Page",
            PAGE_NO_DIRECTION => "No Direction",
            _ => "Unknown",
        }
    }
}

/// One child pointer yielded from an internal page.
#[derive(Debug, Clone, Serialize)]
pub struct ChildLink {
    /// Page number of the parent.
    pub parent: u32,
    /// Page number of the child.
    pub child: u32,
    /// Minimum key of the child's subtree, from the node pointer record.
    pub child_min_key: Vec<Field>,
}

/// Typed view of one INDEX page.
pub struct IndexPage<'a> {
    page: &'a Page,
    header: IndexHeader,
}

impl<'a> IndexPage<'a> {
    /// Construct the view over an already-read page.
    ///
    /// Only the compact row format is supported; a redundant-format page is
    /// reported as corruption rather than misdecoded.
    pub fn new(page: &'a Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::Index {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not INDEX",
                page.page_number(),
                page.page_type()
            )));
        }
        let header = IndexHeader::parse(page.data()).ok_or_else(|| {
            IbsError::Corrupt(format!(
                "page {} too small for an INDEX header",
                page.page_number()
            ))
        })?;
        if !header.is_compact() {
            return Err(IbsError::Corrupt(format!(
                "page {} uses the redundant row format, which is not supported",
                page.page_number()
            )));
        }
        Ok(IndexPage { page, header })
    }

    /// The decoded page header.
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// The underlying framed page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// B+Tree level; 0 is a leaf.
    pub fn level(&self) -> u16 {
        self.header.level
    }

    /// True for leaf pages.
    pub fn is_leaf(&self) -> bool {
        self.header.is_leaf()
    }

    /// Index id from the page header.
    pub fn index_id(&self) -> u64 {
        self.header.index_id
    }

    /// The leaf segment FSEG pointer (meaningful on root pages only).
    pub fn leaf_fseg(&self) -> Result<FsegPointer, IbsError> {
        FsegPointer::parse(&self.page.data()[FIL_PAGE_DATA + PAGE_BTR_SEG_LEAF..]).ok_or_else(
            || {
                IbsError::Corrupt(format!(
                    "page {} too small for FSEG pointers",
                    self.page.page_number()
                ))
            },
        )
    }

    /// The internal (non-leaf) segment FSEG pointer (root pages only).
    pub fn internal_fseg(&self) -> Result<FsegPointer, IbsError> {
        FsegPointer::parse(&self.page.data()[FIL_PAGE_DATA + PAGE_BTR_SEG_TOP..]).ok_or_else(
            || {
                IbsError::Corrupt(format!(
                    "page {} too small for FSEG pointers",
                    self.page.page_number()
                ))
            },
        )
    }

    /// True if this page is a tree root: only roots carry inline FSEG
    /// pointers for both segments.
    pub fn is_root(&self) -> Result<bool, IbsError> {
        Ok(!self.leaf_fseg()?.is_unset() && !self.internal_fseg()?.is_unset())
    }

    /// The infimum record header.
    pub fn infimum(&self) -> Result<RecordHeader, IbsError> {
        header_at(self.page.data(), PAGE_NEW_INFIMUM)
    }

    /// The supremum record header.
    pub fn supremum(&self) -> Result<RecordHeader, IbsError> {
        header_at(self.page.data(), PAGE_NEW_SUPREMUM)
    }

    /// Page directory slots, in ascending slot order.
    ///
    /// Slot 0 owns the infimum record and the last slot owns supremum; the
    /// array itself grows down from the FIL trailer.
    pub fn directory(&self) -> Result<Vec<u16>, IbsError> {
        let data = self.page.data();
        let n = self.header.n_dir_slots as usize;
        let top = data.len() - SIZE_FIL_TRAILER;
        if n * PAGE_DIR_SLOT_SIZE > top {
            return Err(IbsError::Corrupt(format!(
                "page {} directory of {} slots exceeds page bounds",
                self.page.page_number(),
                n
            )));
        }
        let mut slots = Vec::with_capacity(n);
        for i in 0..n {
            let offset = top - (i + 1) * PAGE_DIR_SLOT_SIZE;
            slots.push(BigEndian::read_u16(&data[offset..]));
        }
        Ok(slots)
    }

    /// Walk the record chain from infimum, yielding each user record origin
    /// and header in chain order. Infimum and supremum are not yielded;
    /// delete-marked records are.
    ///
    /// The walk is bounded by `n_recs`: a chain that fails to reach
    /// supremum within `n_recs` steps is corrupt.
    pub fn each_record_origin<F>(&self, mut f: F) -> Result<u32, IbsError>
    where
        F: FnMut(usize, &RecordHeader) -> Result<(), IbsError>,
    {
        let data = self.page.data();
        let mut origin = PAGE_NEW_INFIMUM;
        let mut header = self.infimum()?;
        let mut visited = 0u32;

        loop {
            origin = match header.next_origin(origin) {
                Some(next) => next,
                None => {
                    return Err(IbsError::Corrupt(format!(
                        "page {} record chain ended before supremum",
                        self.page.page_number()
                    )))
                }
            };
            if origin < REC_N_NEW_EXTRA_BYTES || origin >= data.len() {
                return Err(IbsError::Corrupt(format!(
                    "page {} record chain points outside the page ({})",
                    self.page.page_number(),
                    origin
                )));
            }
            header = header_at(data, origin)?;
            if header.record_type == RecordType::Supremum {
                return Ok(visited);
            }
            visited += 1;
            if visited > self.header.n_recs as u32 {
                return Err(IbsError::Corrupt(format!(
                    "page {} record chain exceeds n_recs = {}",
                    self.page.page_number(),
                    self.header.n_recs
                )));
            }
            f(origin, &header)?;
        }
    }

    /// Decode every user record in chain order.
    pub fn records(&self, describer: &dyn RecordDescriber) -> Result<Vec<Record>, IbsError> {
        self.check_describer(describer)?;
        let mut records = Vec::with_capacity(self.header.n_recs as usize);
        let is_leaf = self.is_leaf();
        self.each_record_origin(|origin, _| {
            records.push(parse_record(self.page.data(), origin, is_leaf, describer)?);
            Ok(())
        })?;
        Ok(records)
    }

    /// Yield (child page number, child minimum key) for every record on an
    /// internal page, in key order.
    pub fn each_child_page(
        &self,
        describer: &dyn RecordDescriber,
    ) -> Result<Vec<ChildLink>, IbsError> {
        if self.is_leaf() {
            return Err(IbsError::Usage(format!(
                "page {} is a leaf; only internal pages have child links",
                self.page.page_number()
            )));
        }
        let mut links = Vec::new();
        for record in self.records(describer)? {
            let child = record.child_page_number.ok_or_else(|| {
                IbsError::Corrupt(format!(
                    "internal page {} holds a record without a child pointer",
                    self.page.page_number()
                ))
            })?;
            links.push(ChildLink {
                parent: self.page.page_number(),
                child,
                child_min_key: record.key,
            });
        }
        Ok(links)
    }

    fn check_describer(&self, describer: &dyn RecordDescriber) -> Result<(), IbsError> {
        if let Some(id) = describer.index_id() {
            if id != self.header.index_id {
                return Err(IbsError::Schema(format!(
                    "describer is for index {} but page {} belongs to index {}",
                    id,
                    self.page.page_number(),
                    self.header.index_id
                )));
            }
        }
        Ok(())
    }
}

/// A B+Tree reachable from a root page, traversed through a [`Space`].
pub struct Btree<'a> {
    space: &'a mut Space,
    root_page_number: u32,
    index_id: u64,
}

impl<'a> Btree<'a> {
    /// Open the tree rooted at `root_page_number`.
    pub fn open(space: &'a mut Space, root_page_number: u32) -> Result<Self, IbsError> {
        let root = space.page(root_page_number as u64)?;
        let view = IndexPage::new(&root)?;
        let index_id = view.index_id();
        Ok(Btree {
            space,
            root_page_number,
            index_id,
        })
    }

    /// Root page number.
    pub fn root_page_number(&self) -> u32 {
        self.root_page_number
    }

    /// Index id of the root page.
    pub fn index_id(&self) -> u64 {
        self.index_id
    }

    fn index_page_checked(&mut self, page_number: u32) -> Result<Page, IbsError> {
        let page = self.space.page(page_number as u64)?;
        let view = IndexPage::new(&page)?;
        if view.index_id() != self.index_id {
            return Err(IbsError::Corrupt(format!(
                "page {} belongs to index {}, expected {}",
                page_number,
                view.index_id(),
                self.index_id
            )));
        }
        Ok(page)
    }

    /// Depth-first preorder walk from the root.
    ///
    /// `on_page` runs once per page with its depth below the root;
    /// `on_link` runs for every parent-to-child pointer, in key order,
    /// before the child is descended into.
    pub fn recurse<P, L>(
        &mut self,
        describer: &dyn RecordDescriber,
        mut on_page: P,
        mut on_link: L,
    ) -> Result<(), IbsError>
    where
        P: FnMut(&Page, &IndexHeader, u16) -> Result<(), IbsError>,
        L: FnMut(&ChildLink, u16) -> Result<(), IbsError>,
    {
        self.recurse_from(self.root_page_number, 0, describer, &mut on_page, &mut on_link)
    }

    fn recurse_from<P, L>(
        &mut self,
        page_number: u32,
        depth: u16,
        describer: &dyn RecordDescriber,
        on_page: &mut P,
        on_link: &mut L,
    ) -> Result<(), IbsError>
    where
        P: FnMut(&Page, &IndexHeader, u16) -> Result<(), IbsError>,
        L: FnMut(&ChildLink, u16) -> Result<(), IbsError>,
    {
        let page = self.index_page_checked(page_number)?;
        let view = IndexPage::new(&page)?;
        on_page(&page, view.header(), depth)?;

        if view.is_leaf() {
            return Ok(());
        }

        let links = view.each_child_page(describer)?;
        drop(view);
        for link in links {
            on_link(&link, depth)?;
            self.recurse_from(link.child, depth + 1, describer, on_page, on_link)?;
        }
        Ok(())
    }

    /// The page number of the leftmost page at `level`, found by descending
    /// through the first child pointer of each internal page.
    pub fn leftmost_page_at_level(
        &mut self,
        level: u16,
        describer: &dyn RecordDescriber,
    ) -> Result<u32, IbsError> {
        let mut page_number = self.root_page_number;
        loop {
            let page = self.index_page_checked(page_number)?;
            let view = IndexPage::new(&page)?;
            if view.level() == level {
                return Ok(page_number);
            }
            if view.level() < level {
                return Err(IbsError::Usage(format!(
                    "tree rooted at page {} has no level {}",
                    self.root_page_number, level
                )));
            }
            let links = view.each_child_page(describer)?;
            page_number = links
                .first()
                .map(|l| l.child)
                .ok_or_else(|| {
                    IbsError::Corrupt(format!(
                        "internal page {} has no child pointers",
                        page_number
                    ))
                })?;
        }
    }

    /// Walk every page at `level` left to right, following the FIL next
    /// chain from the leftmost page.
    pub fn each_page_at_level<F>(
        &mut self,
        level: u16,
        describer: &dyn RecordDescriber,
        mut f: F,
    ) -> Result<u32, IbsError>
    where
        F: FnMut(&Page, &IndexHeader) -> Result<(), IbsError>,
    {
        let mut next = Some(self.leftmost_page_at_level(level, describer)?);
        let mut visited = 0u32;
        while let Some(page_number) = next {
            let page = self.index_page_checked(page_number)?;
            let view = IndexPage::new(&page)?;
            if view.level() != level {
                break;
            }
            f(&page, view.header())?;
            visited += 1;
            next = page.fil().next();
        }
        Ok(visited)
    }

    /// Yield every user record of the tree in key order, by walking the
    /// leaf chain.
    pub fn each_record<F>(
        &mut self,
        describer: &dyn RecordDescriber,
        mut f: F,
    ) -> Result<u64, IbsError>
    where
        F: FnMut(&Record) -> Result<(), IbsError>,
    {
        let mut total = 0u64;
        self.each_page_at_level(0, describer, |page, _| {
            let view = IndexPage::new(page)?;
            for record in view.records(describer)? {
                f(&record)?;
                total += 1;
            }
            Ok(())
        })?;
        Ok(total)
    }

    /// Resolve the root's leaf and internal segment inodes.
    pub fn fseg_inodes(&mut self) -> Result<(Option<InodeEntry>, Option<InodeEntry>), IbsError> {
        let root = self.space.page(self.root_page_number as u64)?;
        let view = IndexPage::new(&root)?;
        let leaf_ptr = view.leaf_fseg()?;
        let internal_ptr = view.internal_fseg()?;
        drop(view);
        drop(root);

        let leaf = if leaf_ptr.is_unset() {
            None
        } else {
            Some(self.space.inode_at(leaf_ptr)?)
        };
        let internal = if internal_ptr.is_unset() {
            None
        } else {
            Some(self.space.inode_at(internal_ptr)?)
        };
        Ok((leaf, internal))
    }
}
