//! Fixed-slot record file over a page file.

use std::path::Path;

use tracing::debug;

use crate::common::config::{MAX_VALUE_LENGTH, PAGE_SIZE};
use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::{DiskManager, OpenMode};

/// Append-only file of `(key, value)` tuples in fixed-size slots.
///
/// # Page Layout
/// ```text
/// ┌────────────┬────────┬────────┬─────┬────────┬──────────┐
/// │ PageHeader │ Slot 0 │ Slot 1 │ ... │ Slot 37│ (unused) │
/// │  8 bytes   │  106   │  106   │     │  106   │          │
/// └────────────┴────────┴────────┴─────┴────────┴──────────┘
/// Slot = key (i32 LE) + value length (u16 LE) + value bytes (padded to 100)
/// ```
///
/// The header's entry count is the number of used slots. Every page but the
/// last is full, so the end of the file is known from the last page alone.
pub struct RecordFile {
    disk: DiskManager,
    end: RecordId,
}

impl RecordFile {
    const SLOT_SIZE: usize = 4 + 2 + MAX_VALUE_LENGTH;

    /// Tuples per page.
    pub const SLOTS_PER_PAGE: u32 = ((PAGE_SIZE - PageHeader::SIZE) / Self::SLOT_SIZE) as u32;

    /// Open a record file. `OpenMode::Write` creates it if missing.
    ///
    /// # Errors
    /// Returns `Error::Open` if the file cannot be opened and
    /// `Error::Corrupted` if its last page is not a valid data page.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let mut disk = DiskManager::open(path, mode)?;

        let end = match disk.end_page_id().0.checked_sub(1) {
            None => RecordId::default(),
            Some(last) => {
                let last = PageId::new(last);
                let used = disk
                    .read_page(last)?
                    .checked_header(last, PageType::Data)?
                    .entry_count as u32;
                if used >= Self::SLOTS_PER_PAGE {
                    RecordId::new(PageId::new(last.0 + 1), 0)
                } else {
                    RecordId::new(last, used)
                }
            }
        };

        debug!(end = %end, "opened record file");
        Ok(Self { disk, end })
    }

    /// Id the next appended tuple will get.
    #[inline]
    pub fn end_rid(&self) -> RecordId {
        self.end
    }

    /// Append a tuple and return where it was stored.
    ///
    /// # Errors
    /// - `Error::ValueTooLong` if `value` exceeds [`MAX_VALUE_LENGTH`] bytes
    /// - `Error::ReadOnly` if the file was opened for reading
    pub fn append(&mut self, key: Key, value: &str) -> Result<RecordId> {
        if value.len() > MAX_VALUE_LENGTH {
            return Err(Error::ValueTooLong {
                len: value.len(),
                max: MAX_VALUE_LENGTH,
            });
        }

        let rid = self.end;
        let mut page = if rid.slot == 0 {
            Page::new()
        } else {
            self.disk.read_page(rid.page_id)?
        };

        Self::write_slot(&mut page, rid.slot, key, value);
        page.set_header(&PageHeader::new(PageType::Data, (rid.slot + 1) as u16));
        page.update_checksum();

        if rid.slot == 0 {
            self.disk.append_page(&page)?;
        } else {
            self.disk.write_page(rid.page_id, &page)?;
        }

        self.end = rid.next(Self::SLOTS_PER_PAGE);
        Ok(rid)
    }

    /// Read the tuple stored at `rid`.
    ///
    /// # Errors
    /// Returns `Error::RecordNotFound` if `rid` is at or past
    /// [`end_rid`](Self::end_rid).
    pub fn read(&mut self, rid: RecordId) -> Result<(Key, String)> {
        if rid >= self.end || rid.slot >= Self::SLOTS_PER_PAGE {
            return Err(Error::RecordNotFound(rid));
        }

        let page = self.disk.read_page(rid.page_id)?;
        let header = page.checked_header(rid.page_id, PageType::Data)?;
        if rid.slot >= header.entry_count as u32 {
            return Err(Error::RecordNotFound(rid));
        }

        let data = page.as_slice();
        let offset = Self::slot_offset(rid.slot);
        let key = Key::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]);
        let len = u16::from_le_bytes([data[offset + 4], data[offset + 5]]) as usize;
        if len > MAX_VALUE_LENGTH {
            return Err(Error::Corrupted {
                page_id: rid.page_id.0,
                reason: format!("slot {} value length {}", rid.slot, len),
            });
        }

        let start = offset + 6;
        let value = String::from_utf8(data[start..start + len].to_vec()).map_err(|_| Error::Corrupted {
            page_id: rid.page_id.0,
            reason: format!("slot {} value is not UTF-8", rid.slot),
        })?;
        Ok((key, value))
    }

    /// Iterate over every tuple in append order.
    pub fn iter(&mut self) -> RecordScan<'_> {
        RecordScan {
            file: self,
            rid: RecordId::default(),
        }
    }

    /// Close the file, syncing it in write mode.
    pub fn close(self) -> Result<()> {
        debug!(end = %self.end, "closing record file");
        self.disk.close()
    }

    fn slot_offset(slot: u32) -> usize {
        PageHeader::SIZE + slot as usize * Self::SLOT_SIZE
    }

    fn write_slot(page: &mut Page, slot: u32, key: Key, value: &str) {
        let offset = Self::slot_offset(slot);
        let data = page.as_mut_slice();
        data[offset..offset + 4].copy_from_slice(&key.to_le_bytes());
        data[offset + 4..offset + 6].copy_from_slice(&(value.len() as u16).to_le_bytes());
        let start = offset + 6;
        data[start..start + MAX_VALUE_LENGTH].fill(0);
        data[start..start + value.len()].copy_from_slice(value.as_bytes());
    }
}

/// Iterator over a [`RecordFile`], created by [`RecordFile::iter`].
pub struct RecordScan<'a> {
    file: &'a mut RecordFile,
    rid: RecordId,
}

impl Iterator for RecordScan<'_> {
    type Item = Result<(RecordId, Key, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rid >= self.file.end {
            return None;
        }
        let rid = self.rid;
        self.rid = rid.next(RecordFile::SLOTS_PER_PAGE);
        Some(self.file.read(rid).map(|(key, value)| (rid, key, value)))
    }
}
