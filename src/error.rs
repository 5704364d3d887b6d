//! Error types for heapdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::storage::{BlockId, RecordId};
use crate::table::DataType;

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for heapdb operations
#[derive(Debug, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    /// Recoverable: the caller may retry on a fresh block
    #[error("Not enough room in block {block_id} for {requested} bytes")]
    OutOfSpace { block_id: BlockId, requested: usize },

    #[error("Block {0} does not exist")]
    BlockNotFound(BlockId),

    #[error("Record {record_id} not found in block {block_id}")]
    RecordNotFound { block_id: BlockId, record_id: RecordId },

    // -------------------------------------------------------------------------
    // Row Errors
    // -------------------------------------------------------------------------
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Unsupported column type: {0:?}")]
    UnsupportedType(DataType),

    #[error("Record of {size} bytes exceeds the maximum of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Relation already exists: {0}")]
    AlreadyExists(String),

    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// True for the capacity error that insert recovers from by allocating a block
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, DbError::OutOfSpace { .. })
    }
}

impl From<bincode::Error> for DbError {
    fn from(e: bincode::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}
