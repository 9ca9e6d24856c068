//! System tablespace fixed pages: transaction system and data dictionary.
//!
//! The system space reserves page 5 for the transaction system header
//! (TRX_SYS): the maximum assigned transaction id, 128 rollback segment
//! slots, and the doublewrite buffer bookkeeping near the end of the page.
//! Page 7 is the data dictionary header, which records the root page
//! numbers of the four bootstrap indexes (SYS_TABLES, SYS_COLUMNS,
//! SYS_INDEXES, SYS_FIELDS).
//!
//! The bootstrap indexes have fixed schemas, so this module bundles
//! built-in describers for them; walking SYS_INDEXES with its describer
//! is how indexes are enumerated in the system space.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::index::Btree;
use crate::innodb::inode::FsegPointer;
use crate::innodb::page::Page;
use crate::innodb::page_types::PageType;
use crate::innodb::record::{ColumnDef, TableDescriber, Value};
use crate::innodb::space::{IndexDescriptor, Space};
use crate::IbsError;

/// One rollback segment slot from the TRX_SYS page.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RsegSlot {
    /// Slot index, 0 to 127.
    pub slot: u32,
    /// Space id holding the rollback segment header page.
    pub space_id: u32,
    /// Page number of the rollback segment header.
    pub page_number: u32,
}

impl RsegSlot {
    /// True if the slot does not reference a rollback segment.
    pub fn is_unused(&self) -> bool {
        self.page_number == FIL_NULL
    }
}

/// Doublewrite buffer bookkeeping from the end of the TRX_SYS page.
#[derive(Debug, Clone, Serialize)]
pub struct Doublewrite {
    /// FSEG pointer for the doublewrite segment.
    pub fseg: FsegPointer,
    /// Magic marking an initialized doublewrite buffer.
    pub magic: u32,
    /// First page of doublewrite block 1.
    pub block1: u32,
    /// First page of doublewrite block 2.
    pub block2: u32,
}

impl Doublewrite {
    /// True if the magic marks an initialized doublewrite buffer.
    pub fn magic_ok(&self) -> bool {
        self.magic == TRX_SYS_DOUBLEWRITE_MAGIC_N
    }
}

/// Typed view of the TRX_SYS page (page 5 of the system space).
pub struct TrxSysPage<'a> {
    page: &'a Page,
}

impl<'a> TrxSysPage<'a> {
    /// Construct the view over an already-read page.
    pub fn new(page: &'a Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::TrxSys {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not TRX_SYS",
                page.page_number(),
                page.page_type()
            )));
        }
        Ok(TrxSysPage { page })
    }

    /// The underlying framed page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// Maximum assigned transaction id at the last flush.
    pub fn trx_id(&self) -> u64 {
        BigEndian::read_u64(&self.page.data()[FIL_PAGE_DATA + TRX_SYS_TRX_ID_STORE..])
    }

    /// The transaction system's own segment.
    pub fn fseg(&self) -> Result<FsegPointer, IbsError> {
        FsegPointer::parse(&self.page.data()[FIL_PAGE_DATA + TRX_SYS_FSEG_HEADER..]).ok_or_else(
            || IbsError::Corrupt("TRX_SYS page too small for its FSEG header".to_string()),
        )
    }

    /// All 128 rollback segment slots, including unused ones.
    pub fn rsegs(&self) -> Vec<RsegSlot> {
        let data = self.page.data();
        let base = FIL_PAGE_DATA + TRX_SYS_RSEGS;
        (0..TRX_SYS_N_RSEGS as u32)
            .map(|slot| {
                let offset = base + slot as usize * TRX_SYS_RSEG_SLOT_SIZE;
                RsegSlot {
                    slot,
                    space_id: BigEndian::read_u32(&data[offset + TRX_SYS_RSEG_SPACE..]),
                    page_number: BigEndian::read_u32(&data[offset + TRX_SYS_RSEG_PAGE_NO..]),
                }
            })
            .collect()
    }

    /// Only the slots referencing a rollback segment.
    pub fn used_rsegs(&self) -> Vec<RsegSlot> {
        self.rsegs().into_iter().filter(|s| !s.is_unused()).collect()
    }

    /// The doublewrite buffer header near the end of the page.
    pub fn doublewrite(&self) -> Result<Doublewrite, IbsError> {
        let data = self.page.data();
        let base = data.len() - TRX_SYS_DOUBLEWRITE_END;
        let fseg = FsegPointer::parse(&data[base..]).ok_or_else(|| {
            IbsError::Corrupt("TRX_SYS page too small for the doublewrite header".to_string())
        })?;
        Ok(Doublewrite {
            fseg,
            magic: BigEndian::read_u32(&data[base + FSEG_HEADER_SIZE..]),
            block1: BigEndian::read_u32(&data[base + FSEG_HEADER_SIZE + 4..]),
            block2: BigEndian::read_u32(&data[base + FSEG_HEADER_SIZE + 8..]),
        })
    }
}

/// Parsed data dictionary header (page 7 of the system space).
#[derive(Debug, Clone, Serialize)]
pub struct DictHeader {
    /// Next row id to assign.
    pub max_row_id: u64,
    /// Next table id to assign.
    pub max_table_id: u64,
    /// Next index id to assign.
    pub max_index_id: u64,
    /// Highest space id in use.
    pub max_space_id: u32,
    /// Root page of the SYS_TABLES clustered index.
    pub tables_root: u32,
    /// Root page of the SYS_TABLE_IDS secondary index.
    pub table_ids_root: u32,
    /// Root page of the SYS_COLUMNS clustered index.
    pub columns_root: u32,
    /// Root page of the SYS_INDEXES clustered index.
    pub indexes_root: u32,
    /// Root page of the SYS_FIELDS clustered index.
    pub fields_root: u32,
}

impl DictHeader {
    /// Parse the dictionary header from the page-7 buffer.
    pub fn parse(page: &Page) -> Result<Self, IbsError> {
        if page.page_type() != PageType::Sys {
            return Err(IbsError::Corrupt(format!(
                "page {} is {}, not SYS",
                page.page_number(),
                page.page_type()
            )));
        }
        let d = &page.data()[FIL_PAGE_DATA..];
        Ok(DictHeader {
            max_row_id: BigEndian::read_u64(&d[DICT_HDR_ROW_ID..]),
            max_table_id: BigEndian::read_u64(&d[DICT_HDR_TABLE_ID..]),
            max_index_id: BigEndian::read_u64(&d[DICT_HDR_INDEX_ID..]),
            max_space_id: BigEndian::read_u32(&d[DICT_HDR_MAX_SPACE_ID..]),
            tables_root: BigEndian::read_u32(&d[DICT_HDR_TABLES..]),
            table_ids_root: BigEndian::read_u32(&d[DICT_HDR_TABLE_IDS..]),
            columns_root: BigEndian::read_u32(&d[DICT_HDR_COLUMNS..]),
            indexes_root: BigEndian::read_u32(&d[DICT_HDR_INDEXES..]),
            fields_root: BigEndian::read_u32(&d[DICT_HDR_FIELDS..]),
        })
    }

    /// The four bootstrap index roots as (table name, root page).
    pub fn each_index_root(&self) -> [(&'static str, u32); 4] {
        [
            ("SYS_TABLES", self.tables_root),
            ("SYS_COLUMNS", self.columns_root),
            ("SYS_INDEXES", self.indexes_root),
            ("SYS_FIELDS", self.fields_root),
        ]
    }
}

fn sys_columns(extra: Vec<ColumnDef>) -> Vec<ColumnDef> {
    // Every clustered dictionary index carries the hidden transaction
    // columns ahead of its user columns.
    let mut row = vec![ColumnDef::uint("DB_TRX_ID", 6), ColumnDef::uint("DB_ROLL_PTR", 7)];
    row.extend(extra);
    row
}

/// Describer for the SYS_TABLES clustered index.
pub fn sys_tables_describer() -> TableDescriber {
    TableDescriber {
        index_id: None,
        key: vec![ColumnDef::varchar("NAME", 100)],
        row: sys_columns(vec![
            ColumnDef::uint("ID", 8),
            ColumnDef::uint("N_COLS", 4),
            ColumnDef::uint("TYPE", 4),
            ColumnDef::uint("MIX_ID", 8),
            ColumnDef::uint("MIX_LEN", 4),
            ColumnDef::varchar("CLUSTER_NAME", 100).nullable(),
            ColumnDef::uint("SPACE", 4),
        ]),
    }
}

/// Describer for the SYS_COLUMNS clustered index.
pub fn sys_columns_describer() -> TableDescriber {
    TableDescriber {
        index_id: None,
        key: vec![ColumnDef::uint("TABLE_ID", 8), ColumnDef::uint("POS", 4)],
        row: sys_columns(vec![
            ColumnDef::varchar("NAME", 100),
            ColumnDef::uint("MTYPE", 4),
            ColumnDef::uint("PRTYPE", 4),
            ColumnDef::uint("LEN", 4),
            ColumnDef::uint("PREC", 4),
        ]),
    }
}

/// Describer for the SYS_INDEXES clustered index.
pub fn sys_indexes_describer() -> TableDescriber {
    TableDescriber {
        index_id: None,
        key: vec![ColumnDef::uint("TABLE_ID", 8), ColumnDef::uint("ID", 8)],
        row: sys_columns(vec![
            ColumnDef::varchar("NAME", 100),
            ColumnDef::uint("N_FIELDS", 4),
            ColumnDef::uint("TYPE", 4),
            ColumnDef::uint("SPACE", 4),
            ColumnDef::uint("PAGE_NO", 4),
        ]),
    }
}

/// Describer for the SYS_FIELDS clustered index.
pub fn sys_fields_describer() -> TableDescriber {
    TableDescriber {
        index_id: None,
        key: vec![ColumnDef::uint("INDEX_ID", 8), ColumnDef::uint("POS", 4)],
        row: sys_columns(vec![ColumnDef::varchar("COL_NAME", 100)]),
    }
}

/// Look up a built-in dictionary describer by table name.
pub fn dictionary_describer(name: &str) -> Option<TableDescriber> {
    match name {
        "SYS_TABLES" => Some(sys_tables_describer()),
        "SYS_COLUMNS" => Some(sys_columns_describer()),
        "SYS_INDEXES" => Some(sys_indexes_describer()),
        "SYS_FIELDS" => Some(sys_fields_describer()),
        _ => None,
    }
}

fn record_uint(fields: &[crate::innodb::record::Field], name: &str) -> Option<u64> {
    fields.iter().find(|f| f.name == name).and_then(|f| match &f.value {
        Value::Uint(v) => Some(*v),
        _ => None,
    })
}

/// Enumerate indexes through the data dictionary: the four bootstrap
/// indexes from the dictionary header, then every index recorded in
/// SYS_INDEXES that lives in this space.
pub fn each_dictionary_index<F>(space: &mut Space, mut f: F) -> Result<u64, IbsError>
where
    F: FnMut(&IndexDescriptor) -> Result<(), IbsError>,
{
    let dict_page = space.page(DICT_HDR_PAGE_NO as u64)?;
    let dict = DictHeader::parse(&dict_page)?;
    drop(dict_page);

    let mut yielded = 0u64;
    for (_, root) in dict.each_index_root() {
        let page = space.page32(root)?;
        let view = crate::innodb::index::IndexPage::new(&page)?;
        let descriptor = IndexDescriptor {
            root_page_number: root,
            index_id: view.index_id(),
        };
        drop(view);
        drop(page);
        f(&descriptor)?;
        yielded += 1;
    }

    // User indexes are rows of SYS_INDEXES; PAGE_NO is FIL_NULL for
    // discarded tablespaces.
    let space_id = space.space_id().unwrap_or(0) as u64;
    let describer = sys_indexes_describer();
    let mut found = Vec::new();
    {
        let mut btree = Btree::open(space, dict.indexes_root)?;
        btree.each_record(&describer, |record| {
            let index_space = record_uint(&record.row, "SPACE");
            let page_no = record_uint(&record.row, "PAGE_NO");
            let index_id = record_uint(&record.key, "ID");
            if let (Some(s), Some(p), Some(id)) = (index_space, page_no, index_id) {
                if s == space_id && p != FIL_NULL as u64 {
                    found.push(IndexDescriptor {
                        root_page_number: p as u32,
                        index_id: id,
                    });
                }
            }
            Ok(())
        })?;
    }
    for descriptor in &found {
        f(descriptor)?;
        yielded += 1;
    }
    Ok(yielded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innodb::record::RecordDescriber;

    const PS: usize = SIZE_PAGE_DEFAULT as usize;

    fn build_trx_sys_page() -> Vec<u8> {
        let mut page = vec![0u8; PS];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], TRX_SYS_PAGE_NO);
        BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], 7);
        BigEndian::write_u64(&mut page[FIL_PAGE_DATA + TRX_SYS_TRX_ID_STORE..], 0x1234);
        // Slot 0 in use, rest unused.
        let rsegs = FIL_PAGE_DATA + TRX_SYS_RSEGS;
        BigEndian::write_u32(&mut page[rsegs + TRX_SYS_RSEG_SPACE..], 0);
        BigEndian::write_u32(&mut page[rsegs + TRX_SYS_RSEG_PAGE_NO..], 6);
        for slot in 1..TRX_SYS_N_RSEGS {
            let offset = rsegs + slot * TRX_SYS_RSEG_SLOT_SIZE;
            BigEndian::write_u32(&mut page[offset + TRX_SYS_RSEG_SPACE..], FIL_NULL);
            BigEndian::write_u32(&mut page[offset + TRX_SYS_RSEG_PAGE_NO..], FIL_NULL);
        }
        // Doublewrite header.
        let dblwr = PS - TRX_SYS_DOUBLEWRITE_END;
        BigEndian::write_u32(&mut page[dblwr..], 0); // fseg space
        BigEndian::write_u32(&mut page[dblwr + 4..], 2); // fseg page
        BigEndian::write_u16(&mut page[dblwr + 8..], 242); // fseg offset
        BigEndian::write_u32(&mut page[dblwr + FSEG_HEADER_SIZE..], TRX_SYS_DOUBLEWRITE_MAGIC_N);
        BigEndian::write_u32(&mut page[dblwr + FSEG_HEADER_SIZE + 4..], 64);
        BigEndian::write_u32(&mut page[dblwr + FSEG_HEADER_SIZE + 8..], 128);
        page
    }

    fn build_dict_header_page() -> Vec<u8> {
        let mut page = vec![0u8; PS];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], DICT_HDR_PAGE_NO);
        BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], 6);
        let d = FIL_PAGE_DATA;
        BigEndian::write_u64(&mut page[d + DICT_HDR_ROW_ID..], 256);
        BigEndian::write_u64(&mut page[d + DICT_HDR_TABLE_ID..], 20);
        BigEndian::write_u64(&mut page[d + DICT_HDR_INDEX_ID..], 50);
        BigEndian::write_u32(&mut page[d + DICT_HDR_MAX_SPACE_ID..], 9);
        BigEndian::write_u32(&mut page[d + DICT_HDR_TABLES..], 8);
        BigEndian::write_u32(&mut page[d + DICT_HDR_TABLE_IDS..], 9);
        BigEndian::write_u32(&mut page[d + DICT_HDR_COLUMNS..], 10);
        BigEndian::write_u32(&mut page[d + DICT_HDR_INDEXES..], 11);
        BigEndian::write_u32(&mut page[d + DICT_HDR_FIELDS..], 12);
        page
    }

    #[test]
    fn test_trx_sys_parse() {
        let page = Page::new(build_trx_sys_page(), SIZE_PAGE_DEFAULT).unwrap();
        let view = TrxSysPage::new(&page).unwrap();
        assert_eq!(view.trx_id(), 0x1234);

        let rsegs = view.rsegs();
        assert_eq!(rsegs.len(), 128);
        assert!(!rsegs[0].is_unused());
        assert_eq!(rsegs[0].page_number, 6);
        assert!(rsegs[1].is_unused());
        assert_eq!(view.used_rsegs().len(), 1);
    }

    #[test]
    fn test_doublewrite_parse() {
        let page = Page::new(build_trx_sys_page(), SIZE_PAGE_DEFAULT).unwrap();
        let dblwr = TrxSysPage::new(&page).unwrap().doublewrite().unwrap();
        assert!(dblwr.magic_ok());
        assert_eq!(dblwr.block1, 64);
        assert_eq!(dblwr.block2, 128);
        assert_eq!(dblwr.fseg.page_number, 2);
        assert_eq!(dblwr.fseg.offset, 242);
    }

    #[test]
    fn test_trx_sys_rejects_wrong_type() {
        let mut buf = build_trx_sys_page();
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], 6);
        let page = Page::new(buf, SIZE_PAGE_DEFAULT).unwrap();
        assert!(TrxSysPage::new(&page).is_err());
    }

    #[test]
    fn test_dict_header_parse() {
        let page = Page::new(build_dict_header_page(), SIZE_PAGE_DEFAULT).unwrap();
        let dict = DictHeader::parse(&page).unwrap();
        assert_eq!(dict.max_row_id, 256);
        assert_eq!(dict.max_index_id, 50);
        assert_eq!(dict.tables_root, 8);
        assert_eq!(dict.indexes_root, 11);
        let roots = dict.each_index_root();
        assert_eq!(roots[0], ("SYS_TABLES", 8));
        assert_eq!(roots[3], ("SYS_FIELDS", 12));
    }

    #[test]
    fn test_builtin_describers() {
        let tables = sys_tables_describer();
        assert_eq!(tables.key_columns().len(), 1);
        assert_eq!(tables.key_columns()[0].name, "NAME");
        assert_eq!(tables.row_columns()[0].name, "DB_TRX_ID");

        let indexes = sys_indexes_describer();
        assert_eq!(indexes.key_columns().len(), 2);
        let page_no = indexes.row_columns().last().unwrap();
        assert_eq!(page_no.name, "PAGE_NO");

        assert!(dictionary_describer("SYS_COLUMNS").is_some());
        assert!(dictionary_describer("SYS_NOPE").is_none());
    }
}
