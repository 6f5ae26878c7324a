//! Query execution module
//!
//! This module contains the query planner and executor.

pub mod executor;
pub mod planner;

pub use executor::{Executor, ResultSet};
pub use planner::{Plan, Planner};
