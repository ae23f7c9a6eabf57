//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. Tree nodes and record pages are decoded from
//! and encoded into whole pages.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes (for efficient Direct I/O with O_DIRECT)
///
/// `Page` is not `Clone`; node and record encoders build fresh pages.
///
/// # Example
/// ```
/// use pageidx::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether every byte of the page is zero (allocated but never written).
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Write a page header.
    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        let checksum_bytes = checksum.to_le_bytes();
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum_bytes);
    }

    /// Read and validate the header of a page expected to hold `expected`.
    ///
    /// `page_id` is only used for error reporting.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the page type differs or the checksum
    /// does not match.
    pub fn checked_header(&self, page_id: PageId, expected: PageType) -> Result<PageHeader> {
        let header = self.header();
        if header.page_type != expected {
            return Err(Error::Corrupted {
                page_id: page_id.0,
                reason: format!("expected {:?} page, found {:?}", expected, header.page_type),
            });
        }
        if !header.verify_checksum(&self.data) {
            return Err(Error::Corrupted {
                page_id: page_id.0,
                reason: "checksum mismatch".to_string(),
            });
        }
        Ok(header)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_new_is_zeroed() {
        let mut page = Page::new();
        assert!(page.is_zeroed());

        page.as_mut_slice()[4095] = 1;
        assert!(!page.is_zeroed());

    }

    #[test]
    fn test_checked_header_accepts_valid_page() {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::BTreeLeaf, 3));
        page.update_checksum();

        let header = page.checked_header(PageId::new(1), PageType::BTreeLeaf).unwrap();
        assert_eq!(header.entry_count, 3);
    }

    #[test]
    fn test_checked_header_rejects_wrong_type() {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::BTreeInternal, 0));
        page.update_checksum();

        let err = page
            .checked_header(PageId::new(7), PageType::BTreeLeaf)
            .unwrap_err();
        assert!(matches!(err, Error::Corrupted { page_id: 7, .. }));
    }

    #[test]
    fn test_checked_header_rejects_bad_checksum() {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::Data, 1));
        page.update_checksum();
        page.as_mut_slice()[200] ^= 0xFF;

        assert!(page.checked_header(PageId::new(2), PageType::Data).is_err());
    }
}
