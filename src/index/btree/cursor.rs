//! Cursor over leaf entries and the iterator built on it.

use crate::common::{Key, PageId, RecordId, Result};

use super::BTreeIndex;

/// Position of one leaf entry: `(leaf page, entry index)`.
///
/// Produced by [`BTreeIndex::locate`] and advanced by
/// [`BTreeIndex::read_forward`]. A cursor whose page is
/// `PageId::INVALID` has run off the end of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    /// Leaf page holding the entry.
    pub page_id: PageId,
    /// Index of the entry within the leaf.
    pub index: usize,
}

impl IndexCursor {
    #[inline]
    pub fn new(page_id: PageId, index: usize) -> Self {
        Self { page_id, index }
    }

    /// A cursor past the last entry of the index.
    #[inline]
    pub fn end() -> Self {
        Self::new(PageId::INVALID, 0)
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        !self.page_id.is_valid()
    }
}

/// Forward scan over an index, yielding `(key, record id)` in key order.
///
/// Created by [`BTreeIndex::scan_from`] and [`BTreeIndex::scan`]. The scan
/// holds the index mutably for its lifetime and stops at the first error.
///
/// # Example
/// ```no_run
/// use pageidx::{BTreeIndex, OpenMode};
///
/// let mut index = BTreeIndex::open("movie.idx", OpenMode::Read)?;
/// for entry in index.scan_from(1000)? {
///     let (key, rid) = entry?;
///     println!("{} -> {}", key, rid);
/// }
/// # Ok::<(), pageidx::Error>(())
/// ```
pub struct IndexScan<'a> {
    index: &'a mut BTreeIndex,
    cursor: IndexCursor,
    done: bool,
}

impl<'a> IndexScan<'a> {
    pub(crate) fn new(index: &'a mut BTreeIndex, cursor: IndexCursor) -> Self {
        Self {
            index,
            cursor,
            done: false,
        }
    }

    /// Where the scan will read next.
    pub fn cursor(&self) -> IndexCursor {
        self.cursor
    }
}

impl Iterator for IndexScan<'_> {
    type Item = Result<(Key, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.index.read_forward(&mut self.cursor) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
