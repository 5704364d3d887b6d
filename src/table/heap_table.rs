//! Heap Table
//!
//! A relation whose rows live wherever there is room, found by full scan.
//!
//! ## Responsibilities
//! - Validate and marshal rows against the table's schema
//! - Append records to the last block, spilling into a new block when full
//! - Scan every block for handles and project rows back out
//!
//! ## Lifecycle
//! ```text
//!            create / create_if_not_exists / open
//!   Closed ─────────────────────────────────────────▶ Open
//!     ▲                                               │
//!     └──────────────────── close ────────────────────┘
//! ```
//! Row operations open a closed table first.

use crate::error::{DbError, Result};
use crate::storage::{DbBlock, HeapFile, StoreEnv, MAX_RECORD_SIZE};

use super::{ColumnAttributes, ColumnNames, DbRelation, Handle, Identifier, Row, RowCodec};

/// Heap-organized relation over a `HeapFile`
pub struct HeapTable {
    table_name: Identifier,
    codec: RowCodec,
    file: HeapFile,
}

impl HeapTable {
    /// Create a (closed) table handle; does not touch storage
    pub fn new(
        env: &StoreEnv,
        table_name: &str,
        column_names: ColumnNames,
        column_attributes: ColumnAttributes,
    ) -> Result<Self> {
        Ok(Self {
            table_name: table_name.to_string(),
            codec: RowCodec::new(column_names, column_attributes)?,
            file: HeapFile::new(env, table_name)?,
        })
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.table_name
    }

    /// Get the column names in schema order
    pub fn column_names(&self) -> &[Identifier] {
        self.codec.column_names()
    }

    /// Get the underlying heap file (for inspection)
    pub fn file(&self) -> &HeapFile {
        &self.file
    }

    pub fn is_open(&self) -> bool {
        self.file.is_open()
    }

    /// Check `row` against the schema and keep only schema columns
    pub fn validate(&self, row: &Row) -> Result<Row> {
        self.codec.validate(row)
    }

    /// Store already-marshaled record bytes
    ///
    /// Tries the last block first and allocates a new block when it is full.
    /// The handle names the block the record was actually written to.
    /// Records that cannot fit in an empty block are rejected before any
    /// block is allocated.
    pub fn append(&mut self, data: &[u8]) -> Result<Handle> {
        if data.len() > MAX_RECORD_SIZE {
            return Err(DbError::RecordTooLarge {
                size: data.len(),
                max: MAX_RECORD_SIZE,
            });
        }
        self.file.open()?;

        let last = self.file.last_block_id();
        let mut block = if last == 0 {
            self.file.get_new()?
        } else {
            self.file.get(last)?
        };

        let record_id = match block.add(data) {
            Ok(id) => id,
            Err(e) if e.is_out_of_space() => {
                tracing::debug!(
                    "Block {} of {} is full, allocating a new block",
                    block.block_id(),
                    self.table_name
                );
                block = self.file.get_new()?;
                block.add(data)?
            }
            Err(e) => return Err(e),
        };

        self.file.put(&block)?;
        Ok(Handle::new(block.block_id(), record_id))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Unmarshal the full row behind a handle
    fn fetch(&mut self, handle: Handle) -> Result<Row> {
        self.file.open()?;
        let block = self.file.get(handle.block_id)?;
        let data = block.get(handle.record_id).ok_or(DbError::RecordNotFound {
            block_id: handle.block_id,
            record_id: handle.record_id,
        })?;
        self.codec.unmarshal(data)
    }
}

impl DbRelation for HeapTable {
    fn create(&mut self) -> Result<()> {
        self.file.create()?;
        tracing::info!("Created table {}", self.table_name);
        Ok(())
    }

    fn create_if_not_exists(&mut self) -> Result<()> {
        match self.create() {
            Err(DbError::AlreadyExists(_)) => self.open(),
            other => other,
        }
    }

    fn drop(&mut self) -> Result<()> {
        self.file.drop()?;
        tracing::info!("Dropped table {}", self.table_name);
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.file.open()
    }

    fn close(&mut self) -> Result<()> {
        self.file.close()
    }

    fn insert(&mut self, row: &Row) -> Result<Handle> {
        let full = self.codec.validate(row)?;
        let data = self.codec.marshal(&full)?;
        self.append(&data)
    }

    fn update(&mut self, handle: Handle, new_values: &Row) -> Result<()> {
        let mut row = self.fetch(handle)?;
        for (name, value) in new_values {
            row.insert(name.clone(), value.clone());
        }
        let full = self.codec.validate(&row)?;
        let data = self.codec.marshal(&full)?;

        let mut block = self.file.get(handle.block_id)?;
        block.put(handle.record_id, &data)?;
        self.file.put(&block)
    }

    fn del(&mut self, handle: Handle) -> Result<()> {
        self.file.open()?;
        let mut block = self.file.get(handle.block_id)?;
        block.del(handle.record_id)?;
        self.file.put(&block)
    }

    fn select(&mut self) -> Result<Vec<Handle>> {
        self.file.open()?;
        let mut handles = Vec::new();
        for block_id in self.file.block_ids() {
            let block = self.file.get(block_id)?;
            handles.extend(
                block
                    .ids()
                    .into_iter()
                    .map(|record_id| Handle::new(block_id, record_id)),
            );
        }
        Ok(handles)
    }

    fn select_where(&mut self, where_clause: &Row) -> Result<Vec<Handle>> {
        let mut matching = Vec::new();
        for handle in self.select()? {
            let row = self.fetch(handle)?;
            if where_clause
                .iter()
                .all(|(name, value)| row.get(name) == Some(value))
            {
                matching.push(handle);
            }
        }
        Ok(matching)
    }

    fn project(&mut self, handle: Handle) -> Result<Row> {
        self.fetch(handle)
    }

    fn project_columns(&mut self, handle: Handle, column_names: &[&str]) -> Result<Row> {
        let mut row = self.fetch(handle)?;
        row.retain(|name, _| column_names.contains(&name.as_str()));
        Ok(row)
    }
}
