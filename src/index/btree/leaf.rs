//! Leaf node - sorted `(key, record id)` entries plus the next-leaf link.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// One entry of a leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: Key,
    pub rid: RecordId,
}

/// A leaf node of the B+tree, decoded from one page.
///
/// # Page Layout
/// ```text
/// ┌────────────┬─────────┬─────────┬─────┬──────────┬───────────┐
/// │ PageHeader │ Entry 0 │ Entry 1 │ ... │ (unused) │ next leaf │
/// │  8 bytes   │12 bytes │12 bytes │     │          │  4 bytes  │
/// └────────────┴─────────┴─────────┴─────┴──────────┴───────────┘
/// Entry = key (i32 LE) + RecordId (page u32 LE, slot u32 LE)
/// ```
///
/// Entries are kept in ascending key order. Equal keys are allowed; a new
/// entry goes in front of the entries already holding its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    entries: Vec<LeafEntry>,
    next: PageId,
    capacity: usize,
}

impl LeafNode {
    /// Encoded size of one entry.
    pub const ENTRY_SIZE: usize = 4 + RecordId::SIZE;

    /// Number of entries a page can physically hold.
    pub const MAX_ENTRIES: usize = (PAGE_SIZE - PageHeader::SIZE - PageId::SIZE) / Self::ENTRY_SIZE;

    const NEXT_OFFSET: usize = PAGE_SIZE - PageId::SIZE;

    /// Create an empty leaf with no next sibling.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: PageId::INVALID,
            capacity: Self::MAX_ENTRIES,
        }
    }

    /// Limit the node to `capacity` entries.
    ///
    /// The limit never drops below the entries already stored and never
    /// exceeds [`LeafNode::MAX_ENTRIES`].
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(1, Self::MAX_ENTRIES).max(self.entries.len());
        self
    }

    /// Decode the leaf stored in `page`.
    ///
    /// A page that was never written decodes as an empty leaf.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` on a wrong page type, a bad checksum or an
    /// entry count above [`LeafNode::MAX_ENTRIES`].
    pub fn decode(page: &Page, page_id: PageId) -> Result<Self> {
        if page.is_zeroed() {
            return Ok(Self::new());
        }

        let header = page.checked_header(page_id, PageType::BTreeLeaf)?;
        let count = header.entry_count as usize;
        if count > Self::MAX_ENTRIES {
            return Err(Error::Corrupted {
                page_id: page_id.0,
                reason: format!("leaf holds {} entries (max {})", count, Self::MAX_ENTRIES),
            });
        }

        let data = page.as_slice();
        let entries = (0..count)
            .map(|i| {
                let offset = PageHeader::SIZE + i * Self::ENTRY_SIZE;
                LeafEntry {
                    key: Key::from_le_bytes([
                        data[offset],
                        data[offset + 1],
                        data[offset + 2],
                        data[offset + 3],
                    ]),
                    rid: RecordId::from_bytes(&data[offset + 4..offset + Self::ENTRY_SIZE]),
                }
            })
            .collect();

        Ok(Self {
            entries,
            next: PageId::read_from(data, Self::NEXT_OFFSET),
            capacity: Self::MAX_ENTRIES,
        })
    }

    /// Encode this leaf into a fresh page, checksum included.
    pub fn encode(&self) -> Page {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(
            PageType::BTreeLeaf,
            self.entries.len() as u16,
        ));

        let data = page.as_mut_slice();
        for (i, entry) in self.entries.iter().enumerate() {
            let offset = PageHeader::SIZE + i * Self::ENTRY_SIZE;
            data[offset..offset + 4].copy_from_slice(&entry.key.to_le_bytes());
            data[offset + 4..offset + Self::ENTRY_SIZE].copy_from_slice(&entry.rid.to_bytes());
        }
        self.next.write_to(data, Self::NEXT_OFFSET);

        page.update_checksum();
        page
    }

    /// Number of used entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// The entries in key order.
    pub fn entries(&self) -> &[LeafEntry] {
        &self.entries
    }

    /// Insert `(key, rid)` at its sorted position.
    ///
    /// # Errors
    /// Returns `Error::NodeFull` if the node is at capacity.
    pub fn insert(&mut self, key: Key, rid: RecordId) -> Result<()> {
        if self.is_full() {
            return Err(Error::NodeFull {
                capacity: self.capacity,
            });
        }

        let pos = self.insert_position(key);
        self.entries.insert(pos, LeafEntry { key, rid });
        Ok(())
    }

    /// Insert `(key, rid)` and move the upper half of the entries to `sibling`.
    ///
    /// The combined sequence of `entry_count() + 1` entries is cut at
    /// `ceil((entry_count() + 1) / 2)`; everything from the cut on moves to
    /// `sibling`. The sibling inherits this node's next pointer; the caller
    /// links this node to the sibling's page once it has one.
    ///
    /// Returns the first key of the sibling. It stays in the sibling and is
    /// copied up into the parent.
    ///
    /// # Errors
    /// Returns `Error::NodeNotEmpty` if `sibling` holds entries, or
    /// `Error::NodeFull` if the upper half would not fit in it.
    pub fn insert_and_split(
        &mut self,
        key: Key,
        rid: RecordId,
        sibling: &mut LeafNode,
    ) -> Result<Key> {
        if !sibling.is_empty() {
            return Err(Error::NodeNotEmpty);
        }

        let total = self.entries.len() + 1;
        let split = total.div_ceil(2);
        if total - split > sibling.capacity {
            return Err(Error::NodeFull {
                capacity: sibling.capacity,
            });
        }

        let pos = self.insert_position(key);
        self.entries.insert(pos, LeafEntry { key, rid });

        sibling.entries = self.entries.split_off(split);
        sibling.next = self.next;

        sibling
            .entries
            .first()
            .map(|e| e.key)
            .ok_or(Error::OutOfRange {
                index: split as isize,
                len: total,
            })
    }

    /// Index of the first entry whose key is `>= search_key`.
    ///
    /// When every entry is smaller, the result is `entry_count()`.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when every entry is smaller and the node is
    /// full, so the scan ran past the node's capacity.
    pub fn locate(&self, search_key: Key) -> Result<usize> {
        let index = self.insert_position(search_key);
        if index >= self.capacity {
            return Err(Error::NotFound { key: search_key });
        }
        Ok(index)
    }

    /// Read the entry at `index`.
    ///
    /// # Errors
    /// Returns `Error::OutOfRange` unless `index < entry_count()`.
    pub fn read_entry(&self, index: usize) -> Result<(Key, RecordId)> {
        self.entries
            .get(index)
            .map(|e| (e.key, e.rid))
            .ok_or(Error::OutOfRange {
                index: index as isize,
                len: self.entries.len(),
            })
    }

    /// Page of the next leaf in key order, or `PageId::INVALID`.
    #[inline]
    pub fn next_sibling(&self) -> PageId {
        self.next
    }

    #[inline]
    pub fn set_next_sibling(&mut self, page_id: PageId) {
        self.next = page_id;
    }

    fn insert_position(&self, key: Key) -> usize {
        self.entries.partition_point(|e| e.key < key)
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}
