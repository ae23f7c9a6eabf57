//! Disk Manager - fixed-size page file.
//!
//! The [`DiskManager`] is the page store every index and record file sits on:
//! - Reading and writing whole pages by id
//! - Appending new pages at the end of the file
//! - Read-only or read-write sessions

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// How a page file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file only; every write fails with `Error::ReadOnly`.
    Read,
    /// Existing file, or a new empty one if it does not exist.
    Write,
}

/// Manages disk I/O for a single page file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. The file only grows,
/// one page at a time, through [`append_page`](Self::append_page).
///
/// # Ownership
/// `DiskManager` is single-threaded and is owned outright by the index or
/// record file using it for the whole session.
pub struct DiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
    mode: OpenMode,
    /// Whether every write is followed by `fsync()`.
    sync_on_write: bool,
}

impl DiskManager {
    /// Open a page file.
    ///
    /// # Errors
    /// Returns `Error::Open` if the file cannot be opened (or, in
    /// [`OpenMode::Write`], created).
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(path),
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path),
        }
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Calculate page count from file size
        let metadata = file.metadata()?;
        let page_count = (metadata.len() / PAGE_SIZE as u64) as u32;

        debug!(path = %path.display(), ?mode, page_count, "opened page file");

        Ok(Self {
            file,
            page_count,
            mode,
            sync_on_write: false,
        })
    }

    /// Enable or disable `fsync()` after every write.
    pub fn set_sync_on_write(&mut self, sync: bool) {
        self.sync_on_write = sync;
    }

    /// The mode the file was opened with.
    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Overwrite an existing page.
    ///
    /// # Errors
    /// Returns `Error::ReadOnly` in read mode and `Error::PageNotFound` if
    /// the page hasn't been appended yet.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_writable()?;
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        self.write_at(page_id, page)
    }

    /// Append `page` as a new page at the end of the file.
    ///
    /// Returns the `PageId` of the new page.
    ///
    /// # Errors
    /// Returns `Error::ReadOnly` in read mode.
    pub fn append_page(&mut self, page: &Page) -> Result<PageId> {
        self.check_writable()?;

        let page_id = PageId::new(self.page_count);
        self.write_at(page_id, page)?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Id the next appended page will get, i.e. the number of pages.
    ///
    /// Zero means the file was just created.
    #[inline]
    pub fn end_page_id(&self) -> PageId {
        PageId::new(self.page_count)
    }

    /// Flush everything to disk and close the file.
    ///
    /// # Errors
    /// Returns `Error::Close` if the final sync fails.
    pub fn close(self) -> Result<()> {
        if self.mode == OpenMode::Write {
            self.file.sync_all().map_err(Error::Close)?;
        }
        debug!(page_count = self.page_count, "closed page file");
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        match self.mode {
            OpenMode::Read => Err(Error::ReadOnly),
            OpenMode::Write => Ok(()),
        }
    }

    fn write_at(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        if self.sync_on_write {
            self.file.sync_all()?;
        }
        Ok(())
    }
}
