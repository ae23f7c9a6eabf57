//! Error types for pageidx.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::RecordId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pageidx.
///
/// Node-level `NodeFull` is part of the insert protocol: the index handles
/// it by splitting and it never reaches callers of
/// [`BTreeIndex::insert`](crate::index::btree::BTreeIndex::insert).
/// Reaching the end of an index scan is not an error at all; it is reported
/// as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The backing file could not be flushed and closed.
    #[error("cannot close file: {0}")]
    Close(#[source] io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// A write was attempted on a file opened for reading.
    #[error("file was opened read-only")]
    ReadOnly,

    /// The node has no free entry slot left.
    #[error("node is full ({capacity} entries)")]
    NodeFull {
        /// Capacity of the node.
        capacity: usize,
    },

    /// An entry or child index outside the used part of a node.
    #[error("index {index} out of range (node holds {len} entries)")]
    OutOfRange {
        /// Requested index.
        index: isize,
        /// Number of entries in the node.
        len: usize,
    },

    /// A locate scan ran off the end of a node.
    #[error("no slot for key {key} within node capacity")]
    NotFound {
        /// Key being searched for.
        key: i32,
    },

    /// A split target or fresh root was expected to be empty.
    #[error("target node is not empty")]
    NodeNotEmpty,

    /// A page failed validation while being decoded.
    #[error("corrupted page {page_id}: {reason}")]
    Corrupted {
        /// Page that failed to decode.
        page_id: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// A record value does not fit in a record slot.
    #[error("value too long: {len} bytes (max: {max})")]
    ValueTooLong {
        /// Length of the value.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// No record is stored at the given id.
    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    /// A load file line is not of the form `key, value`.
    #[error("invalid load line: {0:?}")]
    InvalidLoadLine(String),

    /// A selection condition cannot be evaluated.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The table file does not exist.
    #[error("table {0} does not exist")]
    TableNotFound(String),
}
