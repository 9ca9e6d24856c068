//! Redo log file parsing.
//!
//! A redo log file is a sequence of 512-byte blocks. The first four blocks
//! are reserved: block 0 is the file header and blocks 1 and 3 hold the
//! two checkpoint slots. Data blocks follow, numbered from 1 at the
//! logical start of the log.
//!
//! Each block carries a 12-byte header ([`LogBlockHeader`]: block number
//! with a flush flag in the high bit, data length, first-record-group
//! offset, checkpoint number) and a 4-byte CRC-32C trailer. This reader
//! decodes one lightweight [`LogRecord`] per block — the (type, space,
//! page number) triple of the first record group — which is enough to scan
//! a log for pages of interest without replaying it.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use std::io::{Cursor as IoCursor, Read, Seek, SeekFrom};

use crate::innodb::constants::*;
use crate::innodb::cursor::Cursor;
use crate::IbsError;

/// Supertrait combining `Read + Seek` for type-erased readers.
trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Log record types from `mtr0types.h` (MySQL 5.7 numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogRecordType {
    /// Write 1 byte to a page (type 1).
    OneByte,
    /// Write 2 bytes to a page (type 2).
    TwoBytes,
    /// Write 4 bytes to a page (type 4).
    FourBytes,
    /// Write 8 bytes to a page (type 8).
    EightBytes,
    /// Insert a record (type 9).
    RecInsert,
    /// Clustered index delete-mark (type 10).
    RecClustDeleteMark,
    /// Secondary index delete-mark (type 11).
    RecSecDeleteMark,
    /// Update a record in place (type 13).
    RecUpdateInPlace,
    /// Delete a record (type 14).
    RecDelete,
    /// Delete from the end of a page list (type 15).
    ListEndDelete,
    /// Delete from the start of a page list (type 16).
    ListStartDelete,
    /// End-copy of a created page list (type 17).
    ListEndCopyCreated,
    /// Reorganize a page (type 18).
    PageReorganize,
    /// Create a page (type 19).
    PageCreate,
    /// Insert an undo log record (type 20).
    UndoInsert,
    /// Erase an undo log page end (type 21).
    UndoEraseEnd,
    /// Initialize an undo log page (type 22).
    UndoInit,
    /// Discard an undo log header (type 23).
    UndoHdrDiscard,
    /// Reuse an undo log header (type 24).
    UndoHdrReuse,
    /// Create an undo log header (type 25).
    UndoHdrCreate,
    /// Set the minimum record mark (type 26).
    RecMinMark,
    /// Initialize an insert buffer bitmap (type 27).
    IbufBitmapInit,
    /// Initialize a file page (type 29).
    InitFilePage,
    /// Write a string to a page (type 30).
    WriteString,
    /// End of a multi-record mini-transaction (type 31).
    MultiRecEnd,
    /// Dummy padding record (type 32).
    DummyRecord,
    /// Create a tablespace file (type 33).
    FileCreate,
    /// Rename a tablespace file (type 34).
    FileRename,
    /// Delete a tablespace file (type 35).
    FileDelete,
    /// Set the minimum record mark, compact format (type 36).
    CompRecMinMark,
    /// Create a compact page (type 37).
    CompPageCreate,
    /// Insert a record, compact format (type 38).
    CompRecInsert,
    /// Clustered delete-mark, compact format (type 39).
    CompRecClustDeleteMark,
    /// Secondary delete-mark, compact format (type 40).
    CompRecSecDeleteMark,
    /// Update in place, compact format (type 41).
    CompRecUpdateInPlace,
    /// Delete a record, compact format (type 42).
    CompRecDelete,
    /// Delete from the end of a list, compact format (type 43).
    CompListEndDelete,
    /// Delete from the start of a list, compact format (type 44).
    CompListStartDelete,
    /// End-copy created, compact format (type 45).
    CompListEndCopyCreated,
    /// Reorganize a compact page (type 46).
    CompPageReorganize,
    /// Create a tablespace file, with flags (type 47).
    FileCreate2,
    /// Write a node pointer in a compressed page (type 48).
    ZipWriteNodePtr,
    /// Write a BLOB pointer in a compressed page (type 49).
    ZipWriteBlobPtr,
    /// Write a header in a compressed page (type 50).
    ZipWriteHeader,
    /// Compress a page (type 51).
    ZipPageCompress,
    /// Unknown or unrecognized record type.
    Unknown(u8),
}

impl LogRecordType {
    /// Convert a type code to a record type.
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => LogRecordType::OneByte,
            2 => LogRecordType::TwoBytes,
            4 => LogRecordType::FourBytes,
            8 => LogRecordType::EightBytes,
            9 => LogRecordType::RecInsert,
            10 => LogRecordType::RecClustDeleteMark,
            11 => LogRecordType::RecSecDeleteMark,
            13 => LogRecordType::RecUpdateInPlace,
            14 => LogRecordType::RecDelete,
            15 => LogRecordType::ListEndDelete,
            16 => LogRecordType::ListStartDelete,
            17 => LogRecordType::ListEndCopyCreated,
            18 => LogRecordType::PageReorganize,
            19 => LogRecordType::PageCreate,
            20 => LogRecordType::UndoInsert,
            21 => LogRecordType::UndoEraseEnd,
            22 => LogRecordType::UndoInit,
            23 => LogRecordType::UndoHdrDiscard,
            24 => LogRecordType::UndoHdrReuse,
            25 => LogRecordType::UndoHdrCreate,
            26 => LogRecordType::RecMinMark,
            27 => LogRecordType::IbufBitmapInit,
            29 => LogRecordType::InitFilePage,
            30 => LogRecordType::WriteString,
            31 => LogRecordType::MultiRecEnd,
            32 => LogRecordType::DummyRecord,
            33 => LogRecordType::FileCreate,
            34 => LogRecordType::FileRename,
            35 => LogRecordType::FileDelete,
            36 => LogRecordType::CompRecMinMark,
            37 => LogRecordType::CompPageCreate,
            38 => LogRecordType::CompRecInsert,
            39 => LogRecordType::CompRecClustDeleteMark,
            40 => LogRecordType::CompRecSecDeleteMark,
            41 => LogRecordType::CompRecUpdateInPlace,
            42 => LogRecordType::CompRecDelete,
            43 => LogRecordType::CompListEndDelete,
            44 => LogRecordType::CompListStartDelete,
            45 => LogRecordType::CompListEndCopyCreated,
            46 => LogRecordType::CompPageReorganize,
            47 => LogRecordType::FileCreate2,
            48 => LogRecordType::ZipWriteNodePtr,
            49 => LogRecordType::ZipWriteBlobPtr,
            50 => LogRecordType::ZipWriteHeader,
            51 => LogRecordType::ZipPageCompress,
            v => LogRecordType::Unknown(v),
        }
    }

    /// MySQL source-style name.
    pub fn name(&self) -> &'static str {
        match self {
            LogRecordType::OneByte => "MLOG_1BYTE",
            LogRecordType::TwoBytes => "MLOG_2BYTES",
            LogRecordType::FourBytes => "MLOG_4BYTES",
            LogRecordType::EightBytes => "MLOG_8BYTES",
            LogRecordType::RecInsert => "MLOG_REC_INSERT",
            LogRecordType::RecClustDeleteMark => "MLOG_REC_CLUST_DELETE_MARK",
            LogRecordType::RecSecDeleteMark => "MLOG_REC_SEC_DELETE_MARK",
            LogRecordType::RecUpdateInPlace => "MLOG_REC_UPDATE_IN_PLACE",
            LogRecordType::RecDelete => "MLOG_REC_DELETE",
            LogRecordType::ListEndDelete => "MLOG_LIST_END_DELETE",
            LogRecordType::ListStartDelete => "MLOG_LIST_START_DELETE",
            LogRecordType::ListEndCopyCreated => "MLOG_LIST_END_COPY_CREATED",
            LogRecordType::PageReorganize => "MLOG_PAGE_REORGANIZE",
            LogRecordType::PageCreate => "MLOG_PAGE_CREATE",
            LogRecordType::UndoInsert => "MLOG_UNDO_INSERT",
            LogRecordType::UndoEraseEnd => "MLOG_UNDO_ERASE_END",
            LogRecordType::UndoInit => "MLOG_UNDO_INIT",
            LogRecordType::UndoHdrDiscard => "MLOG_UNDO_HDR_DISCARD",
            LogRecordType::UndoHdrReuse => "MLOG_UNDO_HDR_REUSE",
            LogRecordType::UndoHdrCreate => "MLOG_UNDO_HDR_CREATE",
            LogRecordType::RecMinMark => "MLOG_REC_MIN_MARK",
            LogRecordType::IbufBitmapInit => "MLOG_IBUF_BITMAP_INIT",
            LogRecordType::InitFilePage => "MLOG_INIT_FILE_PAGE",
            LogRecordType::WriteString => "MLOG_WRITE_STRING",
            LogRecordType::MultiRecEnd => "MLOG_MULTI_REC_END",
            LogRecordType::DummyRecord => "MLOG_DUMMY_RECORD",
            LogRecordType::FileCreate => "MLOG_FILE_CREATE",
            LogRecordType::FileRename => "MLOG_FILE_RENAME",
            LogRecordType::FileDelete => "MLOG_FILE_DELETE",
            LogRecordType::CompRecMinMark => "MLOG_COMP_REC_MIN_MARK",
            LogRecordType::CompPageCreate => "MLOG_COMP_PAGE_CREATE",
            LogRecordType::CompRecInsert => "MLOG_COMP_REC_INSERT",
            LogRecordType::CompRecClustDeleteMark => "MLOG_COMP_REC_CLUST_DELETE_MARK",
            LogRecordType::CompRecSecDeleteMark => "MLOG_COMP_REC_SEC_DELETE_MARK",
            LogRecordType::CompRecUpdateInPlace => "MLOG_COMP_REC_UPDATE_IN_PLACE",
            LogRecordType::CompRecDelete => "MLOG_COMP_REC_DELETE",
            LogRecordType::CompListEndDelete => "MLOG_COMP_LIST_END_DELETE",
            LogRecordType::CompListStartDelete => "MLOG_COMP_LIST_START_DELETE",
            LogRecordType::CompListEndCopyCreated => "MLOG_COMP_LIST_END_COPY_CREATED",
            LogRecordType::CompPageReorganize => "MLOG_COMP_PAGE_REORGANIZE",
            LogRecordType::FileCreate2 => "MLOG_FILE_CREATE2",
            LogRecordType::ZipWriteNodePtr => "MLOG_ZIP_WRITE_NODE_PTR",
            LogRecordType::ZipWriteBlobPtr => "MLOG_ZIP_WRITE_BLOB_PTR",
            LogRecordType::ZipWriteHeader => "MLOG_ZIP_WRITE_HEADER",
            LogRecordType::ZipPageCompress => "MLOG_ZIP_PAGE_COMPRESS",
            LogRecordType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for LogRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogRecordType::Unknown(v) => write!(f, "UNKNOWN({})", v),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Log block header (first 12 bytes of each block).
#[derive(Debug, Clone, Serialize)]
pub struct LogBlockHeader {
    /// Block number with the flush bit masked out.
    pub block_number: u32,
    /// Whether this block was the first written in a flush batch (bit 31).
    pub flush_flag: bool,
    /// Bytes of log data in this block, including the header.
    pub data_length: u16,
    /// Offset of the first log record group starting in this block;
    /// 0 when every byte continues a record from an earlier block.
    pub first_rec_group: u16,
    /// Checkpoint number of the checkpoint this block was written under.
    pub checkpoint_no: u32,
}

impl LogBlockHeader {
    /// Parse a block header from at least 12 bytes.
    pub fn parse(block: &[u8]) -> Option<Self> {
        if block.len() < LOG_BLOCK_HDR_SIZE {
            return None;
        }

        let raw = BigEndian::read_u32(&block[0..]);
        Some(LogBlockHeader {
            block_number: raw & !LOG_BLOCK_FLUSH_BIT_MASK,
            flush_flag: raw & LOG_BLOCK_FLUSH_BIT_MASK != 0,
            data_length: BigEndian::read_u16(&block[4..]),
            first_rec_group: BigEndian::read_u16(&block[6..]),
            checkpoint_no: BigEndian::read_u32(&block[8..]),
        })
    }

    /// True if the block holds log data beyond its header.
    pub fn has_data(&self) -> bool {
        self.data_length as usize > LOG_BLOCK_HDR_SIZE
    }
}

/// Checkpoint record from slot 0 (block 1) or slot 1 (block 3).
#[derive(Debug, Clone, Serialize)]
pub struct LogCheckpoint {
    /// Checkpoint sequence number.
    pub number: u64,
    /// LSN at the time of this checkpoint.
    pub lsn: u64,
}

impl LogCheckpoint {
    /// Parse a checkpoint from a 512-byte block.
    pub fn parse(block: &[u8]) -> Option<Self> {
        if block.len() < LOG_BLOCK_SIZE {
            return None;
        }
        Some(LogCheckpoint {
            number: BigEndian::read_u64(&block[LOG_CHECKPOINT_NO..]),
            lsn: BigEndian::read_u64(&block[LOG_CHECKPOINT_LSN..]),
        })
    }
}

/// The (type, space, page) triple of a block's first record group.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// Record type.
    pub record_type: LogRecordType,
    /// Whether the single-record flag was set on the type byte.
    pub single_record: bool,
    /// Space id the record applies to.
    pub space: u32,
    /// Page number the record applies to.
    pub page_number: u32,
}

/// One decoded data block.
#[derive(Debug, Clone, Serialize)]
pub struct LogBlock {
    /// Position-based block number, counting from 1 after the file header.
    pub number: u64,
    /// Parsed block header.
    pub header: LogBlockHeader,
    /// Stored CRC-32C trailer checksum.
    pub checksum: u32,
    /// Whether the stored checksum matches the block contents. Advisory.
    pub checksum_valid: bool,
    /// The first record group's triple; absent when no record group starts
    /// in this block or the block holds no data.
    pub record: Option<LogRecord>,
}

/// Validate a log block's CRC-32C checksum over bytes 0..508.
pub fn validate_block_checksum(block: &[u8]) -> bool {
    if block.len() < LOG_BLOCK_SIZE {
        return false;
    }
    let stored = BigEndian::read_u32(&block[LOG_BLOCK_CHECKSUM_OFFSET..]);
    stored == crc32c::crc32c(&block[..LOG_BLOCK_CHECKSUM_OFFSET])
}

fn decode_record(block: &[u8], header: &LogBlockHeader) -> Result<Option<LogRecord>, IbsError> {
    if header.first_rec_group == 0 || header.data_length as usize <= LOG_BLOCK_HDR_SIZE {
        return Ok(None);
    }
    let offset = header.first_rec_group as usize;
    if offset < LOG_BLOCK_HDR_SIZE || offset >= LOG_BLOCK_CHECKSUM_OFFSET {
        return Err(IbsError::Corrupt(format!(
            "first_rec_group {} outside the block's data area",
            offset
        )));
    }

    let mut cursor = Cursor::at(block, offset);
    let type_byte = cursor.read_u8()?;
    let single_record = type_byte & MLOG_SINGLE_REC_FLAG != 0;
    let record_type = LogRecordType::from_u8(type_byte & !MLOG_SINGLE_REC_FLAG);

    // Padding and end markers carry no (space, page) operands.
    if matches!(
        record_type,
        LogRecordType::MultiRecEnd | LogRecordType::DummyRecord
    ) {
        return Ok(Some(LogRecord {
            record_type,
            single_record,
            space: 0,
            page_number: 0,
        }));
    }

    let space = cursor.read_ic_u32()?;
    let page_number = cursor.read_ic_u32()?;
    Ok(Some(LogRecord {
        record_type,
        single_record,
        space,
        page_number,
    }))
}

/// An open redo log file.
pub struct LogFile {
    reader: Box<dyn ReadSeek>,
    file_size: u64,
}

impl LogFile {
    /// Open a redo log file from disk.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, IbsError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| IbsError::Io(format!("cannot open {}: {}", path.display(), e)))?;
        let file_size = file
            .metadata()
            .map_err(|e| IbsError::Io(format!("cannot stat {}: {}", path.display(), e)))?
            .len();
        Self::init(Box::new(file), file_size)
    }

    /// Create a log reader over an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, IbsError> {
        let file_size = data.len() as u64;
        Self::init(Box::new(IoCursor::new(data)), file_size)
    }

    fn init(reader: Box<dyn ReadSeek>, file_size: u64) -> Result<Self, IbsError> {
        if file_size < LOG_FILE_HDR_BLOCKS * LOG_BLOCK_SIZE as u64 {
            return Err(IbsError::Corrupt(format!(
                "file is too small for a redo log ({} bytes, minimum {})",
                file_size,
                LOG_FILE_HDR_BLOCKS * LOG_BLOCK_SIZE as u64
            )));
        }
        Ok(LogFile { reader, file_size })
    }

    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Total number of 512-byte blocks, including the header blocks.
    pub fn block_count(&self) -> u64 {
        self.file_size / LOG_BLOCK_SIZE as u64
    }

    /// Number of data blocks after the 4-block header.
    pub fn data_block_count(&self) -> u64 {
        self.block_count().saturating_sub(LOG_FILE_HDR_BLOCKS)
    }

    fn read_raw_block(&mut self, file_block: u64) -> Result<Vec<u8>, IbsError> {
        let offset = file_block * LOG_BLOCK_SIZE as u64;
        if offset + LOG_BLOCK_SIZE as u64 > self.file_size {
            return Err(IbsError::Usage(format!(
                "block {} is beyond the end of the file",
                file_block
            )));
        }
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IbsError::Io(format!("seek error: {}", e)))?;
        let mut buf = vec![0u8; LOG_BLOCK_SIZE];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| IbsError::Io(format!("read error at block {}: {}", file_block, e)))?;
        Ok(buf)
    }

    /// Read a checkpoint slot (0 or 1).
    pub fn checkpoint(&mut self, slot: u8) -> Result<LogCheckpoint, IbsError> {
        let file_block = match slot {
            0 => 1,
            1 => 3,
            _ => {
                return Err(IbsError::Usage(format!(
                    "invalid checkpoint slot {} (must be 0 or 1)",
                    slot
                )))
            }
        };
        let block = self.read_raw_block(file_block)?;
        LogCheckpoint::parse(&block)
            .ok_or_else(|| IbsError::Corrupt("checkpoint block truncated".to_string()))
    }

    /// Read and decode one data block. Numbering starts at 1 for the first
    /// block after the 4-block file header.
    pub fn block(&mut self, number: u64) -> Result<LogBlock, IbsError> {
        if number == 0 || number > self.data_block_count() {
            return Err(IbsError::Usage(format!(
                "block {} out of range (log has {} data blocks)",
                number,
                self.data_block_count()
            )));
        }
        let raw = self.read_raw_block(LOG_FILE_HDR_BLOCKS + number - 1)?;
        let header = LogBlockHeader::parse(&raw)
            .ok_or_else(|| IbsError::Corrupt(format!("block {} header truncated", number)))?;
        let record = decode_record(&raw, &header)?;
        Ok(LogBlock {
            number,
            checksum: BigEndian::read_u32(&raw[LOG_BLOCK_CHECKSUM_OFFSET..]),
            checksum_valid: validate_block_checksum(&raw),
            record,
            header,
        })
    }

    /// Iterate every data block in order.
    pub fn each_block<F>(&mut self, mut f: F) -> Result<u64, IbsError>
    where
        F: FnMut(&LogBlock) -> Result<(), IbsError>,
    {
        let count = self.data_block_count();
        for number in 1..=count {
            let block = self.block(number)?;
            f(&block)?;
        }
        Ok(count)
    }
}
