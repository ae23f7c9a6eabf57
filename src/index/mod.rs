//! Index structures.
//!
//! - [`btree`] - disk-resident B+tree over integer keys

pub mod btree;

pub use btree::{BTreeIndex, IndexCursor, IndexScan};
