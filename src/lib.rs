//! moDB - a minimal relational database engine written in Rust
//!
//! This library provides the core components for a small SQL database:
//! - SQL parsing (lexer, parser, AST)
//! - Storage engine (pager, slotted pages, fixed-width rows, table heaps)
//! - Query execution (planner, executor)
//! - System catalog (databases as directories, schema persistence)
//! - TCP server

pub mod catalog;
pub mod error;
pub mod executor;
pub mod server;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
