//! InnoDB page checksum validation.
//!
//! Implements the two checksum algorithms a stock InnoDB tablespace can
//! carry:
//!
//! - **CRC-32C** (MySQL 5.7.7+ default): XOR of two independent CRC-32C
//!   values computed over bytes `[4..26)` and `[38..page_size-8)`. These are
//!   NOT chained — each range is checksummed separately and the results
//!   XORed.
//!
//! - **Legacy InnoDB** (MySQL < 5.7.7): `ut_fold_ulint_pair` with wrapping
//!   `u32` arithmetic, folding bytes one at a time over the same two ranges
//!   and adding the partial folds.
//!
//! Use [`validate_checksum`] to check a page against both. A mismatch is a
//! query result, never an error: legitimate dumps are frequently
//! checksum-stale and callers decide what to do about it.

use byteorder::{BigEndian, ByteOrder};

use crate::innodb::constants::*;

/// Checksum algorithms used by InnoDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// CRC-32C (hardware accelerated, MySQL 5.7.7+ default)
    Crc32c,
    /// Legacy InnoDB checksum (buf_calc_page_new_checksum equivalent)
    InnoDb,
    /// No checksum (all-zero page or innodb_checksum_algorithm=none)
    None,
}

/// Outcome of validating one page.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumResult {
    /// Algorithm that matched, or the last one tried.
    pub algorithm: ChecksumAlgorithm,
    /// Whether any algorithm matched the stored checksum.
    pub valid: bool,
    /// Checksum stored in the FIL header.
    pub stored: u32,
    /// Checksum calculated from the page contents.
    pub calculated: u32,
}

fn fold_pair(n1: u32, n2: u32) -> u32 {
    (((n1 ^ n2 ^ UT_HASH_RANDOM_MASK2) << 8).wrapping_add(n1) ^ UT_HASH_RANDOM_MASK)
        .wrapping_add(n2)
}

fn fold_bytes(buf: &[u8]) -> u32 {
    let mut fold = 0u32;
    for b in buf {
        fold = fold_pair(fold, *b as u32);
    }
    fold
}

/// Calculate the CRC-32C page checksum over the two standard ranges.
pub fn calculate_crc32c(page_data: &[u8], page_size: usize) -> u32 {
    let crc_header = crc32c::crc32c(&page_data[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    let crc_body = crc32c::crc32c(&page_data[FIL_PAGE_DATA..page_size - SIZE_FIL_TRAILER]);
    crc_header ^ crc_body
}

/// Calculate the legacy InnoDB page checksum over the two standard ranges.
pub fn calculate_innodb(page_data: &[u8], page_size: usize) -> u32 {
    let fold_header = fold_bytes(&page_data[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    let fold_body = fold_bytes(&page_data[FIL_PAGE_DATA..page_size - SIZE_FIL_TRAILER]);
    fold_header.wrapping_add(fold_body)
}

/// Validate a page's stored checksum against both algorithms.
///
/// An all-zero page (freshly allocated) and a page carrying the
/// `BUF_NO_CHECKSUM_MAGIC` value are both reported valid with
/// [`ChecksumAlgorithm::None`].
pub fn validate_checksum(page_data: &[u8], page_size: u32) -> ChecksumResult {
    let ps = page_size as usize;
    if page_data.len() < ps {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: false,
            stored: 0,
            calculated: 0,
        };
    }

    let stored = BigEndian::read_u32(&page_data[FIL_PAGE_SPACE_OR_CHKSUM..]);

    if stored == 0 && page_data[..ps].iter().all(|&b| b == 0) {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: true,
            stored: 0,
            calculated: 0,
        };
    }

    if stored == BUF_NO_CHECKSUM_MAGIC {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: true,
            stored,
            calculated: stored,
        };
    }

    let crc = calculate_crc32c(page_data, ps);
    if crc == stored {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::Crc32c,
            valid: true,
            stored,
            calculated: crc,
        };
    }

    let legacy = calculate_innodb(page_data, ps);
    if legacy == stored {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::InnoDb,
            valid: true,
            stored,
            calculated: legacy,
        };
    }

    ChecksumResult {
        algorithm: ChecksumAlgorithm::Crc32c,
        valid: false,
        stored,
        calculated: crc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS: usize = SIZE_PAGE_DEFAULT as usize;

    fn page_with(checksum: u32) -> Vec<u8> {
        let mut page = vec![0u8; PS];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], 7);
        page[100] = 0x5A;
        BigEndian::write_u32(&mut page[FIL_PAGE_SPACE_OR_CHKSUM..], checksum);
        page
    }

    #[test]
    fn test_all_zero_page_is_valid() {
        let page = vec![0u8; PS];
        let result = validate_checksum(&page, PS as u32);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::None);
    }

    #[test]
    fn test_no_checksum_magic_is_valid() {
        let page = page_with(BUF_NO_CHECKSUM_MAGIC);
        let result = validate_checksum(&page, PS as u32);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::None);
    }

    #[test]
    fn test_crc32c_round_trip() {
        let mut page = page_with(0);
        let crc = calculate_crc32c(&page, PS);
        BigEndian::write_u32(&mut page[FIL_PAGE_SPACE_OR_CHKSUM..], crc);
        let result = validate_checksum(&page, PS as u32);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::Crc32c);
        assert_eq!(result.stored, crc);
    }

    #[test]
    fn test_legacy_round_trip() {
        let mut page = page_with(0);
        let fold = calculate_innodb(&page, PS);
        BigEndian::write_u32(&mut page[FIL_PAGE_SPACE_OR_CHKSUM..], fold);
        let result = validate_checksum(&page, PS as u32);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::InnoDb);
    }

    #[test]
    fn test_mismatch_is_reported_not_fatal() {
        let page = page_with(0x12345678);
        let result = validate_checksum(&page, PS as u32);
        assert!(!result.valid);
        assert_eq!(result.stored, 0x12345678);
        assert_ne!(result.calculated, result.stored);
    }

    #[test]
    fn test_short_buffer_invalid() {
        let page = vec![0u8; 100];
        assert!(!validate_checksum(&page, PS as u32).valid);
    }
}
