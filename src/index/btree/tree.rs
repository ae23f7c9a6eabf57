//! BTreeIndex - root bookkeeping, insertion with split propagation, lookup.

use std::path::Path;

use tracing::{debug, trace};

use crate::common::config::IndexConfig;
use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::page::Page;
use crate::storage::{DiskManager, OpenMode};

use super::cursor::{IndexCursor, IndexScan};
use super::internal::InternalNode;
use super::leaf::LeafNode;

/// What an insert into a subtree asks of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    /// The subtree absorbed the entry.
    Absorbed,
    /// The subtree's top node split; the parent must route `key` and
    /// everything above it to `page_id`.
    Split { key: Key, page_id: PageId },
}

/// A disk-resident B+tree mapping integer keys to record ids.
///
/// # File Layout
/// ```text
/// ┌───────────────┬─────────┬─────────┬─────┐
/// │ Page 0 (meta) │ Page 1  │ Page 2  │ ... │   nodes, in allocation order
/// └───────────────┴─────────┴─────────┴─────┘
/// meta: root page id (u32 LE, u32::MAX when empty) at offset 0,
///       tree height  (u32 LE, 0 when empty)        at offset 4
/// ```
///
/// Height 1 means the root is a leaf. The tree only grows at the root, so
/// every leaf sits at depth `tree_height()`. Leaves are chained left to
/// right for forward scans.
///
/// # Ownership
/// The index owns its page file exclusively for the whole session. There
/// is no locking: one writer, no concurrent readers.
///
/// The metadata page is only rewritten by [`flush`](Self::flush) and
/// [`close`](Self::close); dropping an index without closing it loses
/// root changes made during the session.
pub struct BTreeIndex {
    disk: DiskManager,
    root: PageId,
    height: u32,
    config: IndexConfig,
}

impl BTreeIndex {
    const OFFSET_ROOT: usize = 0;
    const OFFSET_HEIGHT: usize = 4;

    /// Open an index file with the default configuration.
    ///
    /// See [`open_with`](Self::open_with).
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, IndexConfig::default())
    }

    /// Open an index file.
    ///
    /// In [`OpenMode::Write`] a missing file is created with an empty
    /// metadata page. Otherwise root and height are read from page 0.
    ///
    /// # Errors
    /// - `Error::Open` if the file cannot be opened
    /// - `Error::Corrupted` if the metadata page is inconsistent
    pub fn open_with<P: AsRef<Path>>(path: P, mode: OpenMode, config: IndexConfig) -> Result<Self> {
        let mut disk = DiskManager::open(path, mode)?;
        disk.set_sync_on_write(config.sync_on_write);

        let (root, height) = if disk.end_page_id() == PageId::META {
            if mode == OpenMode::Write {
                disk.append_page(&Self::encode_meta(PageId::INVALID, 0))?;
            }
            (PageId::INVALID, 0)
        } else {
            let page = disk.read_page(PageId::META)?;
            Self::decode_meta(&page, disk.end_page_id())?
        };

        debug!(root = %root, height, ?mode, "opened index");

        Ok(Self {
            disk,
            root,
            height,
            config,
        })
    }

    /// Write root and height to the metadata page.
    ///
    /// Does nothing for an index opened read-only.
    pub fn flush(&mut self) -> Result<()> {
        if self.disk.mode() == OpenMode::Read {
            return Ok(());
        }
        self.disk
            .write_page(PageId::META, &Self::encode_meta(self.root, self.height))
    }

    /// Persist the metadata page and close the file.
    ///
    /// # Errors
    /// Returns `Error::Close` if the metadata cannot be written or the file
    /// cannot be synced.
    pub fn close(mut self) -> Result<()> {
        self.flush().map_err(|e| match e {
            Error::Io(io) => Error::Close(io),
            other => other,
        })?;
        debug!(root = %self.root, height = self.height, "closing index");
        self.disk.close()
    }

    /// Page of the root node, `PageId::INVALID` for an empty tree.
    #[inline]
    pub fn root_page_id(&self) -> PageId {
        self.root
    }

    /// Number of levels; 0 for an empty tree, 1 when the root is a leaf.
    #[inline]
    pub fn tree_height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.root.is_valid()
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert `(key, rid)` into the index.
    ///
    /// Full nodes are split on the way back up; a split of the root adds a
    /// new root above it and is the only way the tree gets taller.
    ///
    /// # Errors
    /// Propagates I/O and decoding errors. A failed write may leave the
    /// tree inconsistent; there is no recovery.
    pub fn insert(&mut self, key: Key, rid: RecordId) -> Result<()> {
        if !self.root.is_valid() {
            let mut leaf = self.new_leaf();
            leaf.insert(key, rid)?;
            self.root = self.disk.append_page(&leaf.encode())?;
            self.height = 1;
            debug!(root = %self.root, "created root leaf");
            return Ok(());
        }

        if let InsertOutcome::Split { key: separator, page_id } =
            self.insert_into(self.root, 1, key, rid)?
        {
            let mut new_root = self.new_internal();
            new_root.initialize_as_root(self.root, separator, page_id)?;
            let old_root = self.root;
            self.root = self.disk.append_page(&new_root.encode())?;
            self.height += 1;
            debug!(
                old_root = %old_root,
                new_root = %self.root,
                separator,
                height = self.height,
                "root split, tree grew"
            );
        }
        Ok(())
    }

    fn insert_into(
        &mut self,
        page_id: PageId,
        level: u32,
        key: Key,
        rid: RecordId,
    ) -> Result<InsertOutcome> {
        if level == self.height {
            return self.insert_into_leaf(page_id, key, rid);
        }

        let mut node = self.read_internal(page_id)?;
        let slot = node.locate(key);
        let child = node.read_child(slot)?;

        let (separator, right) = match self.insert_into(child, level + 1, key, rid)? {
            InsertOutcome::Absorbed => return Ok(InsertOutcome::Absorbed),
            InsertOutcome::Split { key, page_id } => (key, page_id),
        };

        // The sibling goes directly right of the child that split, which is
        // not always the sorted position when keys repeat.
        let pos = (slot + 1) as usize;
        match node.insert_at(pos, separator, right) {
            Ok(()) => {
                self.disk.write_page(page_id, &node.encode())?;
                Ok(InsertOutcome::Absorbed)
            }
            Err(Error::NodeFull { .. }) => {
                let mut sibling = self.new_internal();
                let promoted = node.insert_and_split_at(pos, separator, right, &mut sibling)?;
                let sibling_id = self.disk.append_page(&sibling.encode())?;
                self.disk.write_page(page_id, &node.encode())?;
                trace!(
                    page = %page_id,
                    sibling = %sibling_id,
                    promoted,
                    level,
                    "internal node split"
                );
                Ok(InsertOutcome::Split {
                    key: promoted,
                    page_id: sibling_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn insert_into_leaf(&mut self, page_id: PageId, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        let mut leaf = self.read_leaf(page_id)?;

        match leaf.insert(key, rid) {
            Ok(()) => {
                self.disk.write_page(page_id, &leaf.encode())?;
                Ok(InsertOutcome::Absorbed)
            }
            Err(Error::NodeFull { .. }) => {
                let mut sibling = self.new_leaf();
                let copy_up = leaf.insert_and_split(key, rid, &mut sibling)?;
                let sibling_id = self.disk.append_page(&sibling.encode())?;
                leaf.set_next_sibling(sibling_id);
                self.disk.write_page(page_id, &leaf.encode())?;
                trace!(page = %page_id, sibling = %sibling_id, copy_up, "leaf split");
                Ok(InsertOutcome::Split {
                    key: copy_up,
                    page_id: sibling_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Lookup and iteration
    // ========================================================================

    /// Cursor at the first entry whose key is `>= search_key`.
    ///
    /// With duplicate keys this is the earliest copy in scan order.
    /// The cursor is at the end if no such entry exists or the tree is
    /// empty.
    pub fn locate(&mut self, search_key: Key) -> Result<IndexCursor> {
        if !self.root.is_valid() {
            return Ok(IndexCursor::end());
        }

        // Route left of equal separators so duplicates split across leaves
        // are all reached; the sibling hop below covers the other cases.
        let mut page_id = self.root;
        for _ in 1..self.height {
            let node = self.read_internal(page_id)?;
            page_id = node.read_child(node.locate_lower(search_key))?;
        }

        let leaf = self.read_leaf(page_id)?;
        let index = match leaf.locate(search_key) {
            Ok(index) => index,
            Err(Error::NotFound { .. }) => leaf.entry_count(),
            Err(e) => return Err(e),
        };

        if index < leaf.entry_count() {
            Ok(IndexCursor::new(page_id, index))
        } else {
            Ok(IndexCursor::new(leaf.next_sibling(), 0))
        }
    }

    /// Cursor at the smallest entry of the index.
    pub fn locate_first(&mut self) -> Result<IndexCursor> {
        if !self.root.is_valid() {
            return Ok(IndexCursor::end());
        }
        Ok(IndexCursor::new(self.leftmost_leaf()?, 0))
    }

    /// Read the entry under `cursor` and move the cursor past it.
    ///
    /// Returns `Ok(None)` once the cursor has passed the last entry of the
    /// last leaf.
    pub fn read_forward(&mut self, cursor: &mut IndexCursor) -> Result<Option<(Key, RecordId)>> {
        while !cursor.is_end() {
            let leaf = self.read_leaf(cursor.page_id)?;

            if cursor.index < leaf.entry_count() {
                let entry = leaf.read_entry(cursor.index)?;
                cursor.index += 1;
                if cursor.index >= leaf.entry_count() {
                    trace!(from = %cursor.page_id, to = %leaf.next_sibling(), "cursor moved to next leaf");
                    *cursor = IndexCursor::new(leaf.next_sibling(), 0);
                }
                return Ok(Some(entry));
            }

            *cursor = IndexCursor::new(leaf.next_sibling(), 0);
        }
        Ok(None)
    }

    /// Scan entries in key order starting at the first key `>= search_key`.
    pub fn scan_from(&mut self, search_key: Key) -> Result<IndexScan<'_>> {
        let cursor = self.locate(search_key)?;
        Ok(IndexScan::new(self, cursor))
    }

    /// Scan every entry in key order.
    pub fn scan(&mut self) -> Result<IndexScan<'_>> {
        let cursor = self.locate_first()?;
        Ok(IndexScan::new(self, cursor))
    }

    // ========================================================================
    // Node access
    // ========================================================================

    /// Decode the leaf stored at `page_id`, limited to the configured capacity.
    pub fn read_leaf(&mut self, page_id: PageId) -> Result<LeafNode> {
        let page = self.disk.read_page(page_id)?;
        Ok(LeafNode::decode(&page, page_id)?.with_capacity(self.config.leaf_capacity))
    }

    /// Decode the internal node stored at `page_id`, limited to the configured capacity.
    pub fn read_internal(&mut self, page_id: PageId) -> Result<InternalNode> {
        let page = self.disk.read_page(page_id)?;
        Ok(InternalNode::decode(&page, page_id)?.with_capacity(self.config.internal_capacity))
    }

    /// Page ids of every leaf, left to right along the sibling chain.
    pub fn leaf_page_ids(&mut self) -> Result<Vec<PageId>> {
        let mut pages = Vec::new();
        if !self.root.is_valid() {
            return Ok(pages);
        }

        let mut page_id = self.leftmost_leaf()?;
        while page_id.is_valid() {
            pages.push(page_id);
            page_id = self.read_leaf(page_id)?.next_sibling();
        }
        Ok(pages)
    }

    fn leftmost_leaf(&mut self) -> Result<PageId> {
        let mut page_id = self.root;
        for _ in 1..self.height {
            page_id = self.read_internal(page_id)?.read_child(-1)?;
        }
        Ok(page_id)
    }

    fn new_leaf(&self) -> LeafNode {
        LeafNode::new().with_capacity(self.config.leaf_capacity)
    }

    fn new_internal(&self) -> InternalNode {
        InternalNode::new().with_capacity(self.config.internal_capacity)
    }

    // ========================================================================
    // Metadata page
    // ========================================================================

    fn encode_meta(root: PageId, height: u32) -> Page {
        let mut page = Page::new();
        let data = page.as_mut_slice();
        root.write_to(data, Self::OFFSET_ROOT);
        data[Self::OFFSET_HEIGHT..Self::OFFSET_HEIGHT + 4].copy_from_slice(&height.to_le_bytes());
        page
    }

    fn decode_meta(page: &Page, end_page_id: PageId) -> Result<(PageId, u32)> {
        let data = page.as_slice();
        let root = PageId::read_from(data, Self::OFFSET_ROOT);
        let height = u32::from_le_bytes([
            data[Self::OFFSET_HEIGHT],
            data[Self::OFFSET_HEIGHT + 1],
            data[Self::OFFSET_HEIGHT + 2],
            data[Self::OFFSET_HEIGHT + 3],
        ]);

        let consistent = if root.is_valid() {
            height > 0 && root != PageId::META && root < end_page_id
        } else {
            height == 0
        };
        if !consistent {
            return Err(Error::Corrupted {
                page_id: PageId::META.0,
                reason: format!("root {} with height {}", root, height),
            });
        }
        Ok((root, height))
    }
}
