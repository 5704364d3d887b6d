//! Memory Page Store
//!
//! Keeps blocks in a registry shared by every store of one environment.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DbError, Result};
use crate::storage::{BlockData, BlockId};

use super::{MemoryFiles, PageStore};

/// Page store whose "files" live in process memory
pub struct MemoryPageStore {
    name: String,
    /// Registry shared with the environment that created this store
    files: Arc<Mutex<MemoryFiles>>,
    open: bool,
}

impl MemoryPageStore {
    /// Create a store with a private registry
    pub fn new(name: &str) -> Self {
        Self::shared(name, Arc::new(Mutex::new(HashMap::new())))
    }

    pub(crate) fn shared(name: &str, files: Arc<Mutex<MemoryFiles>>) -> Self {
        Self {
            name: name.to_string(),
            files,
            open: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.open {
            return Err(DbError::Storage(format!("Relation {} is not open", self.name)));
        }
        Ok(())
    }
}

impl PageStore for MemoryPageStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.files.lock().contains_key(&self.name)
    }

    fn create(&mut self, truncate: bool) -> Result<()> {
        let mut files = self.files.lock();
        if !truncate && files.contains_key(&self.name) {
            return Err(DbError::AlreadyExists(self.name.clone()));
        }
        files.insert(self.name.clone(), Vec::new());
        self.open = true;
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if !self.exists() {
            return Err(DbError::RelationNotFound(self.name.clone()));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.open = false;
        match self.files.lock().remove(&self.name) {
            Some(_) => Ok(()),
            None => Err(DbError::RelationNotFound(self.name.clone())),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn block_count(&self) -> Result<BlockId> {
        self.ensure_open()?;
        let files = self.files.lock();
        let blocks = files
            .get(&self.name)
            .ok_or_else(|| DbError::RelationNotFound(self.name.clone()))?;
        Ok(blocks.len() as BlockId)
    }

    fn get(&mut self, block_id: BlockId) -> Result<Box<BlockData>> {
        self.ensure_open()?;
        let files = self.files.lock();
        let blocks = files
            .get(&self.name)
            .ok_or_else(|| DbError::RelationNotFound(self.name.clone()))?;

        block_id
            .checked_sub(1)
            .and_then(|index| blocks.get(index as usize))
            .cloned()
            .ok_or(DbError::BlockNotFound(block_id))
    }

    fn put(&mut self, block_id: BlockId, data: &BlockData) -> Result<()> {
        self.ensure_open()?;
        let mut files = self.files.lock();
        let blocks = files
            .get_mut(&self.name)
            .ok_or_else(|| DbError::RelationNotFound(self.name.clone()))?;

        let count = blocks.len() as BlockId;
        match block_id {
            0 => Err(DbError::Storage(format!(
                "Cannot write block 0 to {}",
                self.name
            ))),
            id if id <= count => {
                *blocks[id as usize - 1] = *data;
                Ok(())
            }
            id if id == count + 1 => {
                blocks.push(Box::new(*data));
                Ok(())
            }
            id => Err(DbError::Storage(format!(
                "Cannot write block {} to {}: only {} blocks allocated",
                id, self.name, count
            ))),
        }
    }
}
