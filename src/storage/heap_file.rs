//! Heap File
//!
//! Hands out slotted pages for one relation and writes them back.
//!
//! ## Responsibilities
//! - Create, open, close and drop the relation's backing file
//! - Allocate new blocks with sequential ids
//! - Track the last allocated block id
//! - List every block id for full scans

use std::ops::RangeInclusive;

use crate::error::{DbError, Result};

use super::{BlockId, DbBlock, PageStore, SlottedPage, StoreEnv};

/// Block store adapter for a single relation
///
/// Blocks are owned by the caller between `get`/`get_new` and `put`;
/// changes to a page are lost unless it is written back.
pub struct HeapFile {
    /// Relation name
    name: String,

    /// Page store holding the blocks
    store: Box<dyn PageStore>,

    /// Highest block id ever allocated
    last: BlockId,

    closed: bool,
}

impl HeapFile {
    /// Create a (closed) heap file for the named relation
    pub fn new(env: &StoreEnv, name: &str) -> Result<Self> {
        Ok(Self::with_store(env.page_store(name)?))
    }

    /// Create a (closed) heap file over an explicit page store
    pub fn with_store(store: Box<dyn PageStore>) -> Self {
        Self {
            name: store.name().to_string(),
            store,
            last: 0,
            closed: true,
        }
    }

    /// Create the backing file and its first block
    ///
    /// Fails with `AlreadyExists` if the relation is already there.
    pub fn create(&mut self) -> Result<()> {
        self.create_with(false)
    }

    /// Like `create`, but truncates an existing backing file
    pub fn create_or_truncate(&mut self) -> Result<()> {
        self.create_with(true)
    }

    /// Close if open, then delete the backing file
    pub fn drop(&mut self) -> Result<()> {
        self.close()?;
        self.store.remove()?;
        self.last = 0;
        tracing::debug!("Dropped heap file {}", self.name);
        Ok(())
    }

    /// Open the backing file (no-op if already open)
    pub fn open(&mut self) -> Result<()> {
        if !self.closed {
            return Ok(());
        }
        self.store.open()?;
        self.last = self.store.block_count()?;
        self.closed = false;
        tracing::debug!("Opened heap file {} ({} blocks)", self.name, self.last);
        Ok(())
    }

    /// Close the backing file (no-op if already closed)
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.store.close()?;
        self.closed = true;
        Ok(())
    }

    /// Allocate the next block id and return its initialized page
    ///
    /// The id follows the store's current block count, so another heap file
    /// on the same relation cannot hand out the same block. The initialized
    /// block is written to the store first and the page is rebuilt from the
    /// store's copy.
    pub fn get_new(&mut self) -> Result<SlottedPage> {
        let block_id = self.store.block_count()? + 1;
        let page = SlottedPage::new_block(block_id);
        self.store.put(block_id, page.bytes())?;
        self.last = block_id;

        tracing::debug!("Allocated block {} for {}", block_id, self.name);
        SlottedPage::from_bytes(block_id, self.store.get(block_id)?)
    }

    /// Fetch an existing block
    pub fn get(&mut self, block_id: BlockId) -> Result<SlottedPage> {
        if block_id > self.last {
            // Blocks may have been allocated through another heap file
            self.last = self.store.block_count()?;
        }
        if block_id == 0 || block_id > self.last {
            return Err(DbError::BlockNotFound(block_id));
        }
        SlottedPage::from_bytes(block_id, self.store.get(block_id)?)
    }

    /// Write a block back to the store
    pub fn put(&mut self, block: &SlottedPage) -> Result<()> {
        self.store.put(block.block_id(), block.bytes())
    }

    /// Every allocated block id, ascending
    pub fn block_ids(&self) -> RangeInclusive<BlockId> {
        1..=self.last
    }

    /// Get the last allocated block id (0 if none)
    pub fn last_block_id(&self) -> BlockId {
        self.last
    }

    /// Get the relation name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn create_with(&mut self, truncate: bool) -> Result<()> {
        self.store.create(truncate)?;
        self.closed = false;
        self.last = 0;

        let block = self.get_new()?;
        self.put(&block)?;

        tracing::debug!("Created heap file {}", self.name);
        Ok(())
    }
}
