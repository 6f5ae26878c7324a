//! Schema definitions and row serialization for moDB
//!
//! A schema is an ordered list of fixed-width columns. Rows are encoded as a
//! null bitmap followed by one fixed-size cell per column, so every row of a
//! table occupies exactly `total_size` bytes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};
use crate::storage::tuple::{Row, Value};

/// Column data types.
///
/// Serialized to JSON as the integer tag used in the schema file format:
/// 0 = Int32, 1 = Uint32, 2 = FixedText.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Signed 32-bit integer, 4 bytes
    Int32,
    /// Unsigned 32-bit integer, 4 bytes
    Uint32,
    /// Fixed-width text, zero-padded to the column size
    FixedText,
}

impl DataType {
    fn tag(self) -> u8 {
        match self {
            DataType::Int32 => 0,
            DataType::Uint32 => 1,
            DataType::FixedText => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Int32),
            1 => Some(DataType::Uint32),
            2 => Some(DataType::FixedText),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int32 => write!(f, "INT"),
            DataType::Uint32 => write!(f, "UINT"),
            DataType::FixedText => write!(f, "TEXT"),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.tag())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = u8::deserialize(deserializer)?;
        DataType::from_tag(tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown data type tag: {}", tag)))
    }
}

/// A REFERENCES parent_table(parent_col) constraint on a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced (parent) table
    pub table: String,
    /// Referenced column in the parent table
    pub column: String,
}

/// Column definition in a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Cell size in bytes (always 4 for integer types)
    pub size: u32,
    /// Can this column hold NULL?
    pub is_nullable: bool,
    /// Must values be unique across the table?
    pub is_unique: bool,
    /// Is this the primary key?
    pub is_primary_key: bool,
    /// Foreign key reference, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyRef>,
}

impl Column {
    /// Create a column with defaults: nullable, not unique, no constraints.
    /// Integer columns are always 4 bytes; text defaults to 32.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let size = match data_type {
            DataType::Int32 | DataType::Uint32 => 4,
            DataType::FixedText => 32,
        };
        Self {
            name: name.into(),
            data_type,
            size,
            is_nullable: true,
            is_unique: false,
            is_primary_key: false,
            references: None,
        }
    }

    /// Set the cell size (meaningful for text columns)
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Mark the column NOT NULL
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Mark the column UNIQUE
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Mark the column PRIMARY KEY (implies NOT NULL and UNIQUE)
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_unique = true;
        self.is_nullable = false;
        self
    }

    /// Attach a REFERENCES constraint
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Table schema: ordered columns plus the derived row layout sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of columns
    pub columns: Vec<Column>,
    /// Fixed row size in bytes: bitmap + all cells
    pub total_size: u32,
    /// Null bitmap size in bytes: one bit per column, rounded up
    pub bitmap_size: u32,
}

impl Schema {
    /// Build a schema from columns, computing the row layout sizes
    pub fn new(columns: Vec<Column>) -> Self {
        let bitmap_size = (columns.len() as u32 + 7) / 8;
        let total_size = bitmap_size + columns.iter().map(|c| c.size).sum::<u32>();
        Self {
            columns,
            total_size,
            bitmap_size,
        }
    }

    /// Look up a column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of the primary key column, if the table declares one
    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_primary_key)
    }

    /// All column names, in order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Encode a row into its fixed-width byte representation.
    ///
    /// Layout: `[null bitmap | cell_0 | cell_1 | ...]`. The bit for column
    /// `i` lives at byte `i / 8`, bit `7 - (i % 8)`; a set bit means NULL.
    /// The cell slot of a NULL column is reserved but its contents are
    /// undefined. Text longer than the column size is silently truncated at
    /// the byte boundary.
    pub fn serialize(&self, values: &[Value]) -> Result<Vec<u8>> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }

        let mut data = vec![0u8; self.total_size as usize];
        let mut offset = self.bitmap_size as usize;

        for (i, col) in self.columns.iter().enumerate() {
            let value = &values[i];

            if value.is_null() {
                if !col.is_nullable {
                    return Err(Error::NullNotAllowed(col.name.clone()));
                }
                data[i / 8] |= 1 << (7 - (i % 8));
                offset += col.size as usize;
                continue;
            }

            match (col.data_type, value) {
                (DataType::Int32, Value::Int32(v)) => {
                    data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                }
                (DataType::Uint32, Value::Uint32(v)) => {
                    data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                }
                (DataType::FixedText, Value::Text(s)) => {
                    let bytes = s.as_bytes();
                    let len = bytes.len().min(col.size as usize);
                    data[offset..offset + len].copy_from_slice(&bytes[..len]);
                }
                _ => {
                    return Err(Error::TypeMismatch {
                        column: col.name.clone(),
                        expected: col.data_type.to_string(),
                    });
                }
            }

            offset += col.size as usize;
        }

        Ok(data)
    }

    /// Decode a fixed-width byte slice back into cell values.
    ///
    /// Text cells are returned up to the first zero byte.
    pub fn deserialize(&self, data: &[u8]) -> Result<Row> {
        if data.len() < self.total_size as usize {
            return Err(Error::RowSizeMismatch {
                expected: self.total_size as usize,
                got: data.len(),
            });
        }

        let mut values = Vec::with_capacity(self.columns.len());
        let mut offset = self.bitmap_size as usize;

        for (i, col) in self.columns.iter().enumerate() {
            let is_null = data[i / 8] & (1 << (7 - (i % 8))) != 0;
            if is_null {
                values.push(Value::Null);
                offset += col.size as usize;
                continue;
            }

            let cell = &data[offset..offset + col.size as usize];
            let value = match col.data_type {
                DataType::Int32 => {
                    Value::Int32(i32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]))
                }
                DataType::Uint32 => {
                    Value::Uint32(u32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]))
                }
                DataType::FixedText => {
                    let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
                    Value::Text(String::from_utf8_lossy(&cell[..end]).into_owned())
                }
            };

            values.push(value);
            offset += col.size as usize;
        }

        Ok(Row::new(values))
    }
}
