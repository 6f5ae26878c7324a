//! Slotted page layout for moDB
//!
//! A page is a fixed 4096-byte block. The header holds the slot count and
//! the free-space pointer; the slot directory grows forward from byte 4 and
//! row payloads grow backward from the end of the page.
//!
//! ```text
//! bytes 0..2   num_slots        u16 LE
//! bytes 2..4   free_space_ptr   u16 LE
//! bytes 4..    slot directory   (offset u16, length u16) per slot
//!       ...    unallocated gap
//!       [free_space_ptr..4096)  row payloads
//! ```

use crate::error::{Error, Result};
use crate::storage::pager::PAGE_SIZE;

/// Page header size: 2 bytes slot count + 2 bytes free-space pointer
pub const HEADER_SIZE: usize = 4;

/// Slot directory entry size: 2 bytes offset + 2 bytes length
pub const SLOT_SIZE: usize = 4;

/// A 4096-byte buffer viewed as a slotted page
#[derive(Debug)]
pub struct SlottedPage {
    data: Vec<u8>,
}

impl SlottedPage {
    /// Wrap an existing page buffer
    pub fn new(data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    /// Allocate a fresh page with an initialized header
    pub fn empty() -> Self {
        let mut page = Self::new(vec![0u8; PAGE_SIZE]);
        page.init_header();
        page
    }

    /// Set up the metadata for a brand-new page: zero slots, free-space
    /// pointer at the very end of the page
    pub fn init_header(&mut self) {
        self.write_u16(0, 0);
        self.write_u16(2, PAGE_SIZE as u16);
    }

    /// Number of slots in the directory (live and tombstoned)
    pub fn num_slots(&self) -> u16 {
        self.read_u16(0)
    }

    /// Offset of the lowest-addressed payload byte
    pub fn free_space_ptr(&self) -> u16 {
        self.read_u16(2)
    }

    /// Insert a row payload and return its slot ID.
    ///
    /// Fails with `PageFull` when the gap between the slot directory and the
    /// payload heap cannot hold the row plus one directory entry.
    pub fn insert(&mut self, row_data: &[u8]) -> Result<u16> {
        let num_slots = self.num_slots();
        let free_ptr = self.free_space_ptr();
        let dir_end = (HEADER_SIZE + num_slots as usize * SLOT_SIZE) as u16;

        let required = row_data.len() + SLOT_SIZE;
        if required > (free_ptr - dir_end) as usize {
            return Err(Error::PageFull);
        }

        // Payloads grow backward from the free-space pointer
        let new_offset = free_ptr - row_data.len() as u16;
        self.data[new_offset as usize..new_offset as usize + row_data.len()]
            .copy_from_slice(row_data);

        // Record the row's address and size in the directory
        let entry = dir_end as usize;
        self.write_u16(entry, new_offset);
        self.write_u16(entry + 2, row_data.len() as u16);

        self.write_u16(0, num_slots + 1);
        self.write_u16(2, new_offset);

        Ok(num_slots)
    }

    /// Retrieve the payload bytes for a slot.
    ///
    /// Returns `None` for out-of-range slots and for tombstones (a deleted
    /// slot's directory entry is zeroed); callers skip those.
    pub fn get_row(&self, slot_id: u16) -> Option<&[u8]> {
        if slot_id >= self.num_slots() {
            return None;
        }

        let entry = HEADER_SIZE + slot_id as usize * SLOT_SIZE;
        let offset = self.read_u16(entry) as usize;
        let length = self.read_u16(entry + 2) as usize;

        if length == 0 {
            return None;
        }

        Some(&self.data[offset..offset + length])
    }

    /// Overwrite an existing row in place.
    ///
    /// Rows are fixed-width, so the replacement must match the stored length
    /// exactly.
    pub fn update(&mut self, slot_id: u16, row_data: &[u8]) -> Result<()> {
        if slot_id >= self.num_slots() {
            return Err(Error::InvalidSlot(slot_id));
        }

        let entry = HEADER_SIZE + slot_id as usize * SLOT_SIZE;
        let offset = self.read_u16(entry) as usize;
        let length = self.read_u16(entry + 2) as usize;

        if row_data.len() != length {
            return Err(Error::RowSizeMismatch {
                expected: length,
                got: row_data.len(),
            });
        }

        self.data[offset..offset + length].copy_from_slice(row_data);
        Ok(())
    }

    /// Tombstone a slot by zeroing its directory entry.
    ///
    /// The payload heap is left untouched and `num_slots` is not decremented,
    /// so slot IDs stay stable across deletions.
    pub fn delete(&mut self, slot_id: u16) -> Result<()> {
        if slot_id >= self.num_slots() {
            return Err(Error::InvalidSlot(slot_id));
        }

        let entry = HEADER_SIZE + slot_id as usize * SLOT_SIZE;
        self.write_u16(entry, 0);
        self.write_u16(entry + 2, 0);
        Ok(())
    }

    /// Raw page bytes, for writing back through the pager
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.data[at], self.data[at + 1]])
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.data[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }
}
