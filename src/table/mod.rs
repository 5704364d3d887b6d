//! Table Module
//!
//! Typed rows on top of the block layer.
//!
//! ## Responsibilities
//! - Describe a relation's columns and the values they hold
//! - Marshal rows to and from record bytes
//! - Heap-organized relations: insert anywhere there is room, scan to find
//!
//! ## Row Format
//! ```text
//! ┌──────────────┬────────────────────────────┬─────┐
//! │ Column 1     │ Column 2                   │ ... │
//! │ INT: i32 (4) │ TEXT: len u16 (2) | bytes  │     │
//! └──────────────┴────────────────────────────┴─────┘
//! ```
//! Columns appear in schema order with no presence bitmap; integers are
//! little-endian.

mod codec;
mod heap_table;

use std::collections::BTreeMap;
use std::fmt;

pub use codec::RowCodec;
pub use heap_table::HeapTable;

use crate::error::Result;
use crate::storage::{BlockId, RecordId};

/// Name of a relation or column
pub type Identifier = String;

/// Column names in schema order
pub type ColumnNames = Vec<Identifier>;

/// Column attributes, parallel to `ColumnNames`
pub type ColumnAttributes = Vec<ColumnAttribute>;

/// A row: column name → value
pub type Row = BTreeMap<Identifier, Value>;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Text,
    /// Known to the value model but not storable in a heap table
    Boolean,
}

/// Per-column schema information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAttribute {
    data_type: DataType,
}

impl ColumnAttribute {
    pub fn new(data_type: DataType) -> Self {
        Self { data_type }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A typed scalar value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Stable reference to a stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    pub block_id: BlockId,
    pub record_id: RecordId,
}

impl Handle {
    pub fn new(block_id: BlockId, record_id: RecordId) -> Self {
        Self {
            block_id,
            record_id,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_id, self.record_id)
    }
}

/// What a relation offers, independent of how it is organized
pub trait DbRelation {
    /// Create the relation; fails with `AlreadyExists` if present
    fn create(&mut self) -> Result<()>;

    /// Create the relation, or open it if it already exists
    fn create_if_not_exists(&mut self) -> Result<()>;

    /// Delete the relation and all of its rows
    fn drop(&mut self) -> Result<()>;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Store a row, returning its handle
    fn insert(&mut self, row: &Row) -> Result<Handle>;

    /// Overwrite some columns of a stored row
    fn update(&mut self, handle: Handle, new_values: &Row) -> Result<()>;

    /// Delete a stored row; its handle is never reused
    fn del(&mut self, handle: Handle) -> Result<()>;

    /// Handles of every row
    fn select(&mut self) -> Result<Vec<Handle>>;

    /// Handles of every row whose columns equal all of `where_clause`
    fn select_where(&mut self, where_clause: &Row) -> Result<Vec<Handle>>;

    /// Every column of a stored row
    fn project(&mut self, handle: Handle) -> Result<Row>;

    /// The named columns of a stored row; unknown names are omitted
    fn project_columns(&mut self, handle: Handle, column_names: &[&str]) -> Result<Row>;
}
