//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Fixed-size page file with append-only growth
//! - [`page`] - Page types and layouts

mod disk_manager;
pub mod page;

pub use disk_manager::{DiskManager, OpenMode};
