//! Record identifier type.

use std::fmt;

use super::PageId;

/// Locates a tuple in a record file: the page holding it and its slot.
///
/// The index stores these as opaque 8-byte values next to each key.
/// Ordering is by page, then slot, which is also append order.
///
/// # Example
/// ```
/// use pageidx::{PageId, RecordId};
///
/// let rid = RecordId::new(PageId::new(3), 7);
/// assert!(rid < RecordId::new(PageId::new(4), 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId {
    /// Page of the record file holding the tuple.
    pub page_id: PageId,
    /// Slot within that page.
    pub slot: u32,
}

impl RecordId {
    /// Encoded width in bytes.
    pub const SIZE: usize = 8;

    /// Create a new RecordId.
    #[inline]
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    /// The id following this one in a file with `slots_per_page` slots per page.
    pub fn next(self, slots_per_page: u32) -> Self {
        if self.slot + 1 >= slots_per_page {
            Self::new(PageId::new(self.page_id.0 + 1), 0)
        } else {
            Self::new(self.page_id, self.slot + 1)
        }
    }

    /// Encode as little-endian `(page_id, slot)`.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.page_id.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.slot.to_le_bytes());
        bytes
    }

    /// Decode from the first [`RecordId::SIZE`] bytes of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes.len() < RecordId::SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() >= Self::SIZE, "buffer too small for RecordId");
        Self {
            page_id: PageId::new(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            slot: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.0, self.slot)
    }
}
