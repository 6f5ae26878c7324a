//! Error types for moDB
//!
//! This module defines all error types used throughout the database engine.

use thiserror::Error;

/// The main error type for moDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Parser Errors ==========
    // Lex errors surface here too: the lexer emits ILLEGAL tokens and the
    // parser turns them into positioned messages.
    #[error("Parsing error: {0}")]
    Parse(String),

    // ========== Catalog Errors ==========
    #[error("Catalog error: database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("Catalog error: database '{0}' does not exist")]
    DatabaseNotFound(String),

    #[error("Catalog error: no active database")]
    NoActiveDatabase,

    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Catalog error: column '{0}' not found")]
    ColumnNotFound(String),

    // ========== Schema Errors ==========
    #[error("Schema error: column count mismatch: expected {expected}, got {got}")]
    ColumnCountMismatch { expected: usize, got: usize },

    #[error("Schema error: column '{0}' cannot be NULL")]
    NullNotAllowed(String),

    #[error("Schema error: column '{column}' expects {expected}")]
    TypeMismatch { column: String, expected: String },

    // ========== Constraint Errors ==========
    #[error("UNIQUE constraint violation on column '{column}': value {value} already exists")]
    UniqueViolation { column: String, value: String },

    #[error(
        "FK constraint violation: cannot delete parent row, child record exists in '{table}.{column}'"
    )]
    ForeignKeyViolation { table: String, column: String },

    // ========== Type Errors ==========
    #[error("Type error: invalid value for column '{column}' ({data_type}): {value}")]
    InvalidValue {
        column: String,
        data_type: String,
        value: String,
    },

    #[error("Type error: invalid {data_type} literal in comparison: {value}")]
    InvalidLiteral { data_type: String, value: String },

    // ========== Storage Errors ==========
    #[error("Storage error: page is full")]
    PageFull,

    #[error("Storage error: row of {0} bytes does not fit in an empty page")]
    RowTooLarge(usize),

    #[error("Storage error: invalid slot ID {0}")]
    InvalidSlot(u16),

    #[error("Storage error: buffer size {0} does not match page size {1}")]
    PageSizeMismatch(usize, usize),

    #[error("Storage error: row size mismatch: expected {expected}, got {got}")]
    RowSizeMismatch { expected: usize, got: usize },

    #[error("Storage error: pager is closed")]
    PagerClosed,

    // ========== Execution Errors ==========
    #[error("Execution error: {0}")]
    Execution(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema error: {0}")]
    SchemaJson(#[from] serde_json::Error),
}

/// Result type alias for moDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "Catalog error: table 'users' not found");

        let err = Error::NullNotAllowed("id".to_string());
        assert_eq!(err.to_string(), "Schema error: column 'id' cannot be NULL");

        let err = Error::PageFull;
        assert_eq!(err.to_string(), "Storage error: page is full");
    }
}
