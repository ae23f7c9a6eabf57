//! Page identifier type.

use std::fmt;

/// Identifies a page in a page file.
///
/// Page 0 of an index file is its metadata page, so no tree node ever
/// lives there.
///
/// # Example
/// ```
/// use pageidx::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Marks "no page": an empty tree's root, the end of the leaf chain,
    /// and an exhausted cursor. On disk it has the same bits as `-1i32`.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The metadata page of an index file.
    pub const META: PageId = PageId(0);

    /// Encoded width in bytes.
    pub const SIZE: usize = 4;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Read a little-endian PageId at `offset`.
    #[inline]
    pub fn read_from(data: &[u8], offset: usize) -> Self {
        PageId(u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]))
    }

    /// Write this PageId little-endian at `offset`.
    #[inline]
    pub fn write_to(self, data: &mut [u8], offset: usize) {
        data[offset..offset + Self::SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
        assert!(pid.is_valid());
    }

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
        assert_eq!(PageId::INVALID.0 as i32, -1);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(1) < PageId::new(2));
        assert!(PageId::new(5) > PageId::new(3));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }

    #[test]
    fn test_page_id_read_write() {
        let mut buf = [0u8; 8];
        PageId::new(0x0A0B0C0D).write_to(&mut buf, 4);
        assert_eq!(buf[4], 0x0D);
        assert_eq!(PageId::read_from(&buf, 4), PageId::new(0x0A0B0C0D));
    }
}
