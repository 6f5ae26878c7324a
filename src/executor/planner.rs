//! Query planner for moDB
//!
//! Pure AST-to-plan transformation with no schema lookups. SELECTs become a
//! Scan with Filter and Project stacked on top as needed; a JOIN replaces
//! the scan entirely. DML and DDL statements map one-to-one to their plan
//! variants.

use crate::sql::ast::*;

/// Logical plan node
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Full scan of a table
    Scan { table: String },
    /// Filter rows by a single comparison
    Filter {
        child: Box<Plan>,
        predicate: WhereClause,
    },
    /// Project a subset of columns
    Project {
        child: Box<Plan>,
        columns: Vec<String>,
    },
    /// Nested-loop inner join of two table scans
    Join {
        left_table: String,
        right_table: String,
        left_key: String,
        right_key: String,
        columns: Vec<String>,
        where_clause: Option<WhereClause>,
    },
    /// Insert a row
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<String>,
    },
    /// Update matching rows
    Update {
        table: String,
        sets: Vec<(String, String)>,
        where_clause: Option<WhereClause>,
    },
    /// Delete matching rows
    Delete {
        table: String,
        where_clause: Option<WhereClause>,
    },
    /// Create a table
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    /// Create a database
    CreateDatabase { name: String },
    /// Select the active database
    UseDatabase { name: String },
}

/// Query planner
pub struct Planner;

impl Planner {
    /// Create a new planner
    pub fn new() -> Self {
        Self
    }

    /// Transform a parsed statement into a logical plan
    pub fn plan(&self, stmt: Statement) -> Plan {
        match stmt {
            Statement::Select(select) => self.plan_select(select),
            Statement::Insert(insert) => Plan::Insert {
                table: insert.table,
                columns: insert.columns,
                values: insert.values,
            },
            Statement::Update(update) => Plan::Update {
                table: update.table,
                sets: update.sets,
                where_clause: update.where_clause,
            },
            Statement::Delete(delete) => Plan::Delete {
                table: delete.table,
                where_clause: delete.where_clause,
            },
            Statement::CreateTable(create) => Plan::CreateTable {
                table: create.table,
                columns: create.columns,
            },
            Statement::CreateDatabase(create) => Plan::CreateDatabase { name: create.name },
            Statement::UseDatabase(use_db) => Plan::UseDatabase { name: use_db.name },
        }
    }

    fn plan_select(&self, select: SelectStatement) -> Plan {
        if let Some(join) = select.join {
            return Plan::Join {
                left_table: select.table,
                right_table: join.table,
                left_key: join.left_key,
                right_key: join.right_key,
                columns: select.columns,
                where_clause: select.where_clause,
            };
        }

        let mut plan = Plan::Scan {
            table: select.table,
        };

        if let Some(predicate) = select.where_clause {
            plan = Plan::Filter {
                child: Box::new(plan),
                predicate,
            };
        }

        if !select.columns.is_empty() && select.columns[0] != "*" {
            plan = Plan::Project {
                child: Box::new(plan),
                columns: select.columns,
            };
        }

        plan
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
