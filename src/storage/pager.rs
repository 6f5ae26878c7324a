//! Pager for moDB
//!
//! The pager wraps a single heap file and reads/writes it in fixed-size
//! blocks. Every table owns one pager over its `<table>.db` file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = u32;

/// Fixed-size block I/O over a single file
#[derive(Debug)]
pub struct Pager {
    /// Backing file; `None` once the pager has been closed
    file: Option<File>,
}

impl Pager {
    /// Open a pager on the given file, creating it if missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        Ok(Self { file: Some(file) })
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::PagerClosed)
    }

    /// Read the page with the given ID.
    ///
    /// A read past the current end of the file yields a zero-filled page;
    /// this is how a brand-new page is manifested.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Vec<u8>> {
        let mut file = self.file()?;
        let offset = page_id as u64 * PAGE_SIZE as u64;

        let mut data = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(offset))?;

        // Short reads leave the tail zeroed, so a page that only partially
        // exists on disk still comes back as a full PAGE_SIZE buffer.
        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(data)
    }

    /// Write a full page at the given ID, extending the file if needed
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(Error::PageSizeMismatch(data.len(), PAGE_SIZE));
        }

        let mut file = self.file()?;
        let offset = page_id as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    /// Number of whole pages currently in the file
    pub fn total_pages(&self) -> u32 {
        match self.file.as_ref().and_then(|f| f.metadata().ok()) {
            Some(meta) => (meta.len() / PAGE_SIZE as u64) as u32,
            None => 0,
        }
    }

    /// Flush written pages to durable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file()?.sync_all()?;
        Ok(())
    }

    /// Sync and close the pager; any later operation fails
    pub fn close(&mut self) -> Result<()> {
        self.sync()?;
        self.file = None;
        Ok(())
    }
}
