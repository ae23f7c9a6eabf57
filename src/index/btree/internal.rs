//! Internal node - routing entries `(key, child)` plus a leading child.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Key, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// One routing entry of an internal node.
///
/// `child` is the subtree holding keys from `key` up to (not including)
/// the next entry's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalEntry {
    pub key: Key,
    pub child: PageId,
}

/// An internal (non-leaf) node of the B+tree, decoded from one page.
///
/// # Page Layout
/// ```text
/// ┌────────────┬─────────┬─────────┬─────┬──────────┬───────────────┐
/// │ PageHeader │ Entry 0 │ Entry 1 │ ... │ (unused) │ leading child │
/// │  8 bytes   │ 8 bytes │ 8 bytes │     │          │    4 bytes    │
/// └────────────┴─────────┴─────────┴─────┴──────────┴───────────────┘
/// Entry = key (i32 LE) + child PageId (u32 LE)
/// ```
///
/// The leading child holds every key smaller than the first entry's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    entries: Vec<InternalEntry>,
    leading: PageId,
    capacity: usize,
}

impl InternalNode {
    /// Encoded size of one entry.
    pub const ENTRY_SIZE: usize = 4 + PageId::SIZE;

    /// Number of entries a page can physically hold.
    pub const MAX_ENTRIES: usize = (PAGE_SIZE - PageHeader::SIZE - PageId::SIZE) / Self::ENTRY_SIZE;

    const LEADING_OFFSET: usize = PAGE_SIZE - PageId::SIZE;

    /// Create an empty node without a leading child.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            leading: PageId::INVALID,
            capacity: Self::MAX_ENTRIES,
        }
    }

    /// Limit the node to `capacity` routing entries.
    ///
    /// The limit never drops below the entries already stored and never
    /// exceeds [`InternalNode::MAX_ENTRIES`].
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(1, Self::MAX_ENTRIES).max(self.entries.len());
        self
    }

    /// Decode the internal node stored in `page`.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` on a wrong page type, a bad checksum or an
    /// entry count above [`InternalNode::MAX_ENTRIES`].
    pub fn decode(page: &Page, page_id: PageId) -> Result<Self> {
        if page.is_zeroed() {
            return Ok(Self::new());
        }

        let header = page.checked_header(page_id, PageType::BTreeInternal)?;
        let count = header.entry_count as usize;
        if count > Self::MAX_ENTRIES {
            return Err(Error::Corrupted {
                page_id: page_id.0,
                reason: format!(
                    "internal node holds {} entries (max {})",
                    count,
                    Self::MAX_ENTRIES
                ),
            });
        }

        let data = page.as_slice();
        let entries = (0..count)
            .map(|i| {
                let offset = PageHeader::SIZE + i * Self::ENTRY_SIZE;
                InternalEntry {
                    key: Key::from_le_bytes([
                        data[offset],
                        data[offset + 1],
                        data[offset + 2],
                        data[offset + 3],
                    ]),
                    child: PageId::read_from(data, offset + 4),
                }
            })
            .collect();

        Ok(Self {
            entries,
            leading: PageId::read_from(data, Self::LEADING_OFFSET),
            capacity: Self::MAX_ENTRIES,
        })
    }

    /// Encode this node into a fresh page, checksum included.
    pub fn encode(&self) -> Page {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(
            PageType::BTreeInternal,
            self.entries.len() as u16,
        ));

        let data = page.as_mut_slice();
        for (i, entry) in self.entries.iter().enumerate() {
            let offset = PageHeader::SIZE + i * Self::ENTRY_SIZE;
            data[offset..offset + 4].copy_from_slice(&entry.key.to_le_bytes());
            entry.child.write_to(data, offset + 4);
        }
        self.leading.write_to(data, Self::LEADING_OFFSET);

        page.update_checksum();
        page
    }

    /// Number of routing entries (one less than the number of children).
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the node has neither entries nor a leading child.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.leading.is_valid()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// The routing entries in key order.
    pub fn entries(&self) -> &[InternalEntry] {
        &self.entries
    }

    /// Child holding keys smaller than every routing key.
    #[inline]
    pub fn leading_child(&self) -> PageId {
        self.leading
    }

    /// Insert a routing entry for the subtree `child` starting at `key`.
    ///
    /// The entry goes right after the last entry whose key is `<= key`.
    ///
    /// # Errors
    /// Returns `Error::NodeFull` if the node is at capacity.
    pub fn insert(&mut self, key: Key, child: PageId) -> Result<()> {
        self.insert_at(self.insert_position(key), key, child)
    }

    /// Insert `(key, child)` as entry `pos`.
    ///
    /// Used by the tree to put a split child's new sibling directly right of
    /// that child; with duplicate keys the sorted position alone is ambiguous.
    ///
    /// # Errors
    /// Returns `Error::NodeFull` if the node is at capacity and
    /// `Error::OutOfRange` if `pos > entry_count()`.
    pub(crate) fn insert_at(&mut self, pos: usize, key: Key, child: PageId) -> Result<()> {
        if self.is_full() {
            return Err(Error::NodeFull {
                capacity: self.capacity,
            });
        }
        self.check_position(pos)?;

        self.entries.insert(pos, InternalEntry { key, child });
        Ok(())
    }

    /// Insert `(key, child)` and move the upper half of the entries to `sibling`.
    ///
    /// The combined sequence of `entry_count() + 1` entries is cut at
    /// `floor((entry_count() + 1) / 2)`. The entry at the cut is promoted:
    /// its key is returned for the parent and appears in neither node, and
    /// its child becomes the sibling's leading child. Entries after it move
    /// to `sibling`.
    ///
    /// # Errors
    /// Returns `Error::NodeNotEmpty` if `sibling` is not empty, or
    /// `Error::NodeFull` if the upper half would not fit in it.
    pub fn insert_and_split(
        &mut self,
        key: Key,
        child: PageId,
        sibling: &mut InternalNode,
    ) -> Result<Key> {
        self.insert_and_split_at(self.insert_position(key), key, child, sibling)
    }

    /// [`insert_and_split`](Self::insert_and_split) with the new entry
    /// placed at `pos` of the combined sequence.
    pub(crate) fn insert_and_split_at(
        &mut self,
        pos: usize,
        key: Key,
        child: PageId,
        sibling: &mut InternalNode,
    ) -> Result<Key> {
        if !sibling.is_empty() {
            return Err(Error::NodeNotEmpty);
        }
        self.check_position(pos)?;

        let total = self.entries.len() + 1;
        let mid = total / 2;
        if total - mid - 1 > sibling.capacity {
            return Err(Error::NodeFull {
                capacity: sibling.capacity,
            });
        }

        self.entries.insert(pos, InternalEntry { key, child });

        let mut upper = self.entries.split_off(mid).into_iter();
        let Some(promoted) = upper.next() else {
            return Err(Error::OutOfRange {
                index: mid as isize,
                len: total,
            });
        };

        sibling.leading = promoted.child;
        sibling.entries.extend(upper);

        Ok(promoted.key)
    }

    /// Index of the entry to follow for `search_key`.
    ///
    /// Returns the largest index whose key is `<= search_key`, or `-1` when
    /// `search_key` is smaller than every key (follow the leading child).
    pub fn locate(&self, search_key: Key) -> isize {
        self.entries.partition_point(|e| e.key <= search_key) as isize - 1
    }

    /// Like [`locate`](Self::locate) but stops before entries equal to
    /// `search_key`.
    ///
    /// Following this child reaches the leftmost copy of a duplicated key.
    pub fn locate_lower(&self, search_key: Key) -> isize {
        self.entries.partition_point(|e| e.key < search_key) as isize - 1
    }

    /// Child pointer for a [`locate`](Self::locate) result.
    ///
    /// `-1` is the leading child.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` unless `-1 <= index < entry_count()`.
    pub fn read_child(&self, index: isize) -> Result<PageId> {
        if index == -1 {
            return Ok(self.leading);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(|e| e.child)
            .ok_or(Error::OutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    fn insert_position(&self, key: Key) -> usize {
        (self.locate(key) + 1) as usize
    }

    fn check_position(&self, pos: usize) -> Result<()> {
        if pos > self.entries.len() {
            return Err(Error::OutOfRange {
                index: pos as isize,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Turn this empty node into a two-child root: `left`, `key`, `right`.
    ///
    /// # Errors
    /// Returns `Error::NodeNotEmpty` if the node already holds anything.
    pub fn initialize_as_root(&mut self, left: PageId, key: Key, right: PageId) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::NodeNotEmpty);
        }

        self.leading = left;
        self.entries.push(InternalEntry { key, child: right });
        Ok(())
    }
}

impl Default for InternalNode {
    fn default() -> Self {
        Self::new()
    }
}
