//! Page header and type definitions.
//!
//! Every node and record page starts with a [`PageHeader`] containing:
//! - [`PageType`] discriminator
//! - CRC32 checksum for integrity
//! - Number of used entry slots

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Never-written or corrupted page.
    #[default]
    Invalid = 0,
    /// Record file data page.
    Data = 1,
    /// B+tree internal (non-leaf) node.
    BTreeInternal = 2,
    /// B+tree leaf node.
    BTreeLeaf = 3,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::BTreeInternal,
            3 => PageType::BTreeLeaf,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every node and record page.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       2     entry_count (little-endian)
/// 7       1     reserved
/// ```
///
/// # Checksum
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. This allows verification without special handling.
///
/// # Entry count
/// Occupancy is stored explicitly instead of being inferred from unused
/// slots, so every key value (zero included) can be stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Number of used entry slots.
    pub entry_count: u16,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Offset of each field within the header.
    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_ENTRY_COUNT: usize = 5;

    /// Create a new header with the given page type and entry count.
    ///
    /// The checksum is zero until [`Page::update_checksum`](super::Page::update_checksum).
    pub fn new(page_type: PageType, entry_count: u16) -> Self {
        Self {
            page_type,
            checksum: 0,
            entry_count,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let checksum = &data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4];
        let count = &data[Self::OFFSET_ENTRY_COUNT..Self::OFFSET_ENTRY_COUNT + 2];
        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            checksum: u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]),
            entry_count: u16::from_le_bytes([count[0], count[1]]),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// The reserved byte is cleared.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4].copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_ENTRY_COUNT..Self::OFFSET_ENTRY_COUNT + 2]
            .copy_from_slice(&self.entry_count.to_le_bytes());
        data[Self::SIZE - 1] = 0;
    }

    /// CRC32 of a whole page, taken as if the checksum field were zero.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let (head, rest) = page_data.split_at(Self::OFFSET_CHECKSUM);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(head);
        hasher.update(&[0u8; 4]);
        hasher.update(&rest[4..]);
        hasher.finalize()
    }

    /// Whether the stored checksum matches `page_data`.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

// ============================================================================
// TESTS
// ============================================================================
