//! pageidx - a disk-resident B+tree index over a flat record file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pageidx                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Query Layer (query/)                        │   │
//! │  │      load: file → RecordFile (+ index)                   │   │
//! │  │      select: conditions → index range or full scan       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                 ↓                              ↓                │
//! │  ┌──────────────────────────────┐  ┌──────────────────────┐   │
//! │  │   Index Layer (index/)       │  │ Records (record/)    │   │
//! │  │  BTreeIndex + Leaf/Internal  │  │ RecordFile           │   │
//! │  │  IndexCursor + IndexScan     │  │ (key, value) slots   │   │
//! │  └──────────────────────────────┘  └──────────────────────┘   │
//! │                 ↓                              ↓                │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │          DiskManager + Page + PageHeader                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Key, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - The B+tree index
//! - [`record`] - The record file the index points into
//! - [`query`] - Load and select over tables
//!
//! # Quick Start
//! ```no_run
//! use pageidx::{BTreeIndex, OpenMode, PageId, RecordId};
//!
//! let mut index = BTreeIndex::open("movie.idx", OpenMode::Write)?;
//! index.insert(42, RecordId::new(PageId::new(0), 3))?;
//!
//! let mut cursor = index.locate(40)?;
//! while let Some((key, rid)) = index.read_forward(&mut cursor)? {
//!     println!("{} -> {}", key, rid);
//! }
//! index.close()?;
//! # Ok::<(), pageidx::Error>(())
//! ```

pub mod common;
pub mod index;
pub mod query;
pub mod record;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{IndexConfig, MAX_VALUE_LENGTH, PAGE_SIZE};
pub use common::{Error, Key, PageId, RecordId, Result};

pub use index::btree::{InternalNode, LeafNode};
pub use index::{BTreeIndex, IndexCursor, IndexScan};
pub use query::QueryEngine;
pub use record::RecordFile;
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, OpenMode};
