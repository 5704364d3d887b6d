//! Page Store Module
//!
//! Durable homes for fixed-size blocks, addressed by block id.
//!
//! ## Responsibilities
//! - Create, open, close and remove one backing "file" per relation
//! - Read and write whole blocks by id
//! - Allocate ids sequentially (a put may extend the file by one block)
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                       │
//! │   Magic: "HPDB" (4) | Version: u16 (2) | BlockSz: u32   │
//! │   (4) | Padding (6)                                     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Block 1: Data (BLOCK_SZ) | CRC32 (4)                    │
//! │ Block 2: Data (BLOCK_SZ) | CRC32 (4)                    │
//! │   ... repeated for each block ...                       │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod file;
mod memory;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

pub use file::FilePageStore;
pub use memory::MemoryPageStore;

use crate::config::{Backend, Config};
use crate::error::{DbError, Result};

use super::{BlockData, BlockId};

// =============================================================================
// Shared Constants (used by the file store)
// =============================================================================

/// Magic bytes identifying a heapdb relation file
pub(crate) const MAGIC: &[u8; 4] = b"HPDB";

/// Current relation file format version
pub(crate) const VERSION: u16 = 1;

/// File header size, padded past the encoded header
pub(crate) const FILE_HEADER_SIZE: u64 = 16;

/// Extension of relation files under the data directory
const FILE_EXTENSION: &str = "db";

/// Blocks of every in-memory relation, keyed by relation name
pub(crate) type MemoryFiles = HashMap<String, Vec<Box<BlockData>>>;

// =============================================================================
// Page Store Contract
// =============================================================================

/// Persists whole blocks for one relation
///
/// Implementations serialize access to a block; callers hold a block
/// exclusively between `get` and `put`.
pub trait PageStore: Send {
    /// Relation this store backs
    fn name(&self) -> &str;

    /// Does the backing file exist?
    fn exists(&self) -> bool;

    /// Create an empty backing file and leave it open
    ///
    /// Fails with `AlreadyExists` unless `truncate` is set.
    fn create(&mut self, truncate: bool) -> Result<()>;

    /// Open an existing backing file (no-op if already open)
    fn open(&mut self) -> Result<()>;

    /// Close the backing file (no-op if already closed)
    fn close(&mut self) -> Result<()>;

    /// Close and delete the backing file
    fn remove(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Highest block id stored
    fn block_count(&self) -> Result<BlockId>;

    /// Read a block; `BlockNotFound` if it was never written
    fn get(&mut self, block_id: BlockId) -> Result<Box<BlockData>>;

    /// Write a block; `block_id` may be at most `block_count() + 1`
    fn put(&mut self, block_id: BlockId, data: &BlockData) -> Result<()>;
}

// =============================================================================
// Store Environment
// =============================================================================

/// Session object that hands out page stores for relations
///
/// Carries the configuration every store needs. Cloning is cheap; clones
/// share the same in-memory relations.
#[derive(Clone)]
pub struct StoreEnv {
    config: Config,
    memory: Arc<Mutex<MemoryFiles>>,
}

impl StoreEnv {
    /// Open an environment, creating the data directory for file storage
    pub fn open(config: Config) -> Result<Self> {
        if config.backend == Backend::File {
            fs::create_dir_all(&config.data_dir)?;
        }

        tracing::debug!(
            "Store environment opened ({:?} backend, data dir {})",
            config.backend,
            config.data_dir.display()
        );

        Ok(Self {
            config,
            memory: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Environment whose relations live only in this process
    pub fn in_memory() -> Self {
        Self {
            config: Config::builder().backend(Backend::Memory).build(),
            memory: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a (closed) page store for the named relation
    pub fn page_store(&self, name: &str) -> Result<Box<dyn PageStore>> {
        validate_name(name)?;

        let store: Box<dyn PageStore> = match self.config.backend {
            Backend::File => Box::new(FilePageStore::new(
                name,
                self.relation_path(name),
                self.config.sync_strategy,
            )),
            Backend::Memory => Box::new(MemoryPageStore::shared(name, Arc::clone(&self.memory))),
        };
        Ok(store)
    }

    /// Path of the relation file for `name` (file backend)
    pub fn relation_path(&self, name: &str) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.{}", name, FILE_EXTENSION))
    }
}

/// Relation names become file names
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DbError::Config(format!("Invalid relation name: {:?}", name)));
    }
    Ok(())
}
