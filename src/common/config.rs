//! Configuration constants and index tuning knobs.

/// Size of a page in bytes (4KB).
///
/// Every node of the index, the metadata page, and every record file page
/// is exactly one page. The leaf and internal node capacities are derived
/// from this value.
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages: 2^32 = 4,294,967,296 pages
/// - Max file size: 4,294,967,296 × 4KB = 16TB
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical file size in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

/// Maximum length in bytes of a value stored in a record file.
pub const MAX_VALUE_LENGTH: usize = 100;

/// Smallest node capacity a split can work with.
///
/// An internal split of a full node must leave at least one routing entry
/// on each side of the promoted key.
pub const MIN_NODE_CAPACITY: usize = 3;

/// Tuning for a [`BTreeIndex`](crate::index::btree::BTreeIndex).
///
/// The defaults use the full physical capacity of a page. Smaller
/// capacities keep the on-disk format unchanged and only make nodes split
/// earlier, which is mostly useful for exercising deep trees.
///
/// # Example
/// ```
/// use pageidx::IndexConfig;
///
/// let config = IndexConfig::new().with_leaf_capacity(4).with_internal_capacity(4);
/// assert_eq!(config.leaf_capacity, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of entries in a leaf node.
    pub leaf_capacity: usize,

    /// Maximum number of routing entries in an internal node.
    pub internal_capacity: usize,

    /// Whether every page write is followed by `fsync()`.
    ///
    /// The store is always synced on close regardless of this flag.
    pub sync_on_write: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: crate::index::btree::LeafNode::MAX_ENTRIES,
            internal_capacity: crate::index::btree::InternalNode::MAX_ENTRIES,
            sync_on_write: false,
        }
    }
}

impl IndexConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leaf capacity, clamped to what a page can physically hold.
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity =
            capacity.clamp(MIN_NODE_CAPACITY, crate::index::btree::LeafNode::MAX_ENTRIES);
        self
    }

    /// Set the internal node capacity, clamped to what a page can physically hold.
    pub fn with_internal_capacity(mut self, capacity: usize) -> Self {
        self.internal_capacity =
            capacity.clamp(MIN_NODE_CAPACITY, crate::index::btree::InternalNode::MAX_ENTRIES);
        self
    }

    /// Enable or disable `fsync()` after every page write.
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}
