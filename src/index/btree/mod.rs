//! B+tree index over fixed-size pages.
//!
//! # Structure
//! ```text
//!                  ┌──────────────────────┐
//!                  │ internal  [30 | 70]  │  height 2
//!                  └──┬─────────┬───────┬─┘
//!          leading ┌──┘         │       └──┐
//!            ┌─────▼───┐   ┌────▼────┐   ┌─▼───────┐
//!            │ 5 10 20 │──►│ 30 40   │──►│ 70 80   │──► INVALID
//!            └─────────┘   └─────────┘   └─────────┘
//!                leaves hold (key, RecordId), chained by next-sibling
//! ```
//!
//! - [`LeafNode`] / [`InternalNode`] - one page each, decoded into memory,
//!   modified, and encoded back
//! - [`BTreeIndex`] - root bookkeeping, insert with split propagation, lookup
//! - [`IndexCursor`] / [`IndexScan`] - ordered forward iteration

mod cursor;
mod internal;
mod leaf;
mod tree;

pub use cursor::{IndexCursor, IndexScan};
pub use internal::{InternalEntry, InternalNode};
pub use leaf::{LeafEntry, LeafNode};
pub use tree::BTreeIndex;
