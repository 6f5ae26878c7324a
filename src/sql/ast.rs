//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for the supported SQL subset.

use std::fmt;

use crate::storage::schema::ForeignKeyRef;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select(SelectStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// CREATE DATABASE statement
    CreateDatabase(CreateDatabaseStatement),
    /// USE statement
    UseDatabase(UseDatabaseStatement),
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
}

/// Comparison operators allowed in WHERE clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Single-comparison WHERE clause: `column op literal`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Column name (may be qualified in join queries)
    pub left: String,
    /// Comparison operator
    pub op: CompareOp,
    /// Right-hand literal in its textual form
    pub right: String,
}

/// INNER JOIN clause: right-side table and the ON equality keys
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Right-side table name
    pub table: String,
    /// Qualified column reference on the left, e.g. `orders.user_id`
    pub left_key: String,
    /// Qualified column reference on the right, e.g. `users.id`
    pub right_key: String,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projected columns; `["*"]` selects everything
    pub columns: Vec<String>,
    /// Source table
    pub table: String,
    /// Optional INNER JOIN
    pub join: Option<JoinClause>,
    /// Optional WHERE clause
    pub where_clause: Option<WhereClause>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table
    pub table: String,
    /// Explicit column list; `None` means positional values
    pub columns: Option<Vec<String>>,
    /// Values in their textual form
    pub values: Vec<String>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table
    pub table: String,
    /// SET assignments, column to textual value, in source order
    pub sets: Vec<(String, String)>,
    /// Optional WHERE clause
    pub where_clause: Option<WhereClause>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table
    pub table: String,
    /// Optional WHERE clause
    pub where_clause: Option<WhereClause>,
}

/// CREATE DATABASE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabaseStatement {
    pub name: String,
}

/// USE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UseDatabaseStatement {
    pub name: String,
}

/// Column types accepted in CREATE TABLE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// INT / INTEGER
    Int,
    /// TEXT / VARCHAR
    Text,
}

/// Column definition inside CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
    /// Declared size, e.g. TEXT(255)
    pub size: Option<u32>,
    /// NOT NULL absent?
    pub nullable: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// PRIMARY KEY constraint (implies NOT NULL and UNIQUE)
    pub primary_key: bool,
    /// REFERENCES parent(col) constraint
    pub references: Option<ForeignKeyRef>,
}

impl ColumnDef {
    /// A plain nullable column with no constraints
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: None,
            nullable: true,
            unique: false,
            primary_key: false,
            references: None,
        }
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table: String,
    /// Column definitions
    pub columns: Vec<ColumnDef>,
}
