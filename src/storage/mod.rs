//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Paged file I/O
//! - Slotted page layout
//! - Schema and fixed-width row serialization
//! - Table heap CRUD

pub mod page;
pub mod pager;
pub mod schema;
pub mod table;
pub mod tuple;

pub use page::SlottedPage;
pub use pager::{PageId, Pager, PAGE_SIZE};
pub use schema::{Column, DataType, ForeignKeyRef, Schema};
pub use table::Table;
pub use tuple::{Row, Value};
