//! Common types and utilities shared across pageidx.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`](config::IndexConfig)
//! - Error types
//! - Identifiers (PageId, RecordId) and the index key type

pub mod config;
pub mod error;
mod page_id;
mod record_id;

pub use error::{Error, Result};
pub use page_id::PageId;
pub use record_id::RecordId;

/// Search key stored in the index.
///
/// Keys are fixed-width signed integers. Every value, zero included, is a
/// valid key.
pub type Key = i32;
