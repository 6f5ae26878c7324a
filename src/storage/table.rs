//! Table heap storage for moDB
//!
//! A table composes a pager, a schema, and the slotted-page layout into
//! row-level CRUD against physical `(page, slot)` addresses. Rows are
//! appended to the last page and spill onto a fresh page when it fills up.

use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::page::SlottedPage;
use crate::storage::pager::{PageId, Pager};
use crate::storage::schema::Schema;
use crate::storage::tuple::{Row, Value};

/// A table: one heap file plus the schema describing its rows
#[derive(Debug)]
pub struct Table {
    pager: Pager,
    schema: Schema,
}

impl Table {
    /// Create a table over an open pager
    pub fn new(pager: Pager, schema: Schema) -> Self {
        Self { pager, schema }
    }

    /// The table's schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert a row, spilling to a new page when the last one is full.
    ///
    /// Every successful mutation is synced before returning, so effects are
    /// durable at page granularity.
    pub fn insert(&mut self, values: &[Value]) -> Result<()> {
        let row_data = self.schema.serialize(values)?;

        let total_pages = self.pager.total_pages();
        let mut target: PageId = total_pages.saturating_sub(1);

        let mut page = SlottedPage::new(self.pager.read_page(target)?);
        if total_pages == 0 {
            page.init_header();
        }

        if let Err(Error::PageFull) = page.insert(&row_data) {
            // Last page is full: manifest a fresh one past the end of file
            target = total_pages;
            page = SlottedPage::empty();
            debug!(page_id = target, "allocating new page");

            if let Err(Error::PageFull) = page.insert(&row_data) {
                return Err(Error::RowTooLarge(row_data.len()));
            }
        }

        self.pager.write_page(target, page.data())?;
        self.pager.sync()
    }

    /// Full table scan, page-major and slot-major, skipping tombstones.
    ///
    /// Each returned row carries its `(page, slot)` physical address.
    pub fn select_all(&mut self) -> Result<Vec<Row>> {
        let mut results = Vec::new();

        for page_id in 0..self.pager.total_pages() {
            let page = SlottedPage::new(self.pager.read_page(page_id)?);

            for slot_id in 0..page.num_slots() {
                let row_data = match page.get_row(slot_id) {
                    Some(data) => data,
                    None => continue,
                };
                let mut row = self.schema.deserialize(row_data)?;
                row.page_id = page_id;
                row.slot_id = slot_id;
                results.push(row);
            }
        }

        Ok(results)
    }

    /// Overwrite the row at a physical address
    pub fn update(&mut self, page_id: PageId, slot_id: u16, values: &[Value]) -> Result<()> {
        let row_data = self.schema.serialize(values)?;

        let mut page = SlottedPage::new(self.pager.read_page(page_id)?);
        page.update(slot_id, &row_data)?;

        self.pager.write_page(page_id, page.data())?;
        self.pager.sync()
    }

    /// Tombstone the row at a physical address
    pub fn delete(&mut self, page_id: PageId, slot_id: u16) -> Result<()> {
        let mut page = SlottedPage::new(self.pager.read_page(page_id)?);
        page.delete(slot_id)?;

        self.pager.write_page(page_id, page.data())?;
        self.pager.sync()
    }

    /// Sync and close the underlying pager
    pub fn close(&mut self) -> Result<()> {
        self.pager.close()
    }
}
