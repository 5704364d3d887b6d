//! File Page Store
//!
//! One relation file holding a fixed header followed by checksummed blocks.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::SyncStrategy;
use crate::error::{DbError, Result};
use crate::storage::{BlockData, BlockId, BLOCK_SZ};

use super::{PageStore, FILE_HEADER_SIZE, MAGIC, VERSION};

/// On-disk size of one block: data + CRC32
const BLOCK_SLOT_SIZE: u64 = BLOCK_SZ as u64 + 4;

/// Leading bytes of every relation file
#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 4],
    version: u16,
    block_size: u32,
}

impl FileHeader {
    fn current() -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            block_size: BLOCK_SZ as u32,
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = bincode::serialize(self)?;
        buf.resize(FILE_HEADER_SIZE as usize, 0);
        Ok(buf)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if &self.magic != MAGIC {
            return Err(DbError::Corruption(format!(
                "Invalid relation file magic in {}: expected HPDB, got {:?}",
                path.display(),
                self.magic
            )));
        }
        if self.version != VERSION {
            return Err(DbError::Corruption(format!(
                "Unsupported relation file version {} in {}",
                self.version,
                path.display()
            )));
        }
        if self.block_size as usize != BLOCK_SZ {
            return Err(DbError::Corruption(format!(
                "Block size {} in {} does not match {}",
                self.block_size,
                path.display(),
                BLOCK_SZ
            )));
        }
        Ok(())
    }
}

/// Page store backed by a single file per relation
pub struct FilePageStore {
    /// Relation name (for errors and logging)
    name: String,
    /// Relation file path
    path: PathBuf,
    /// Open file handle; `None` while closed
    file: Option<File>,
    sync_strategy: SyncStrategy,
}

impl FilePageStore {
    /// Create a closed store for the relation file at `path`
    pub fn new(name: &str, path: impl Into<PathBuf>, sync_strategy: SyncStrategy) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            file: None,
            sync_strategy,
        }
    }

    /// Get the relation file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| DbError::Storage(format!("Relation {} is not open", self.name)))
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        let name = &self.name;
        self.file
            .as_mut()
            .ok_or_else(|| DbError::Storage(format!("Relation {} is not open", name)))
    }

    /// File offset of block `block_id` (1-based)
    fn block_offset(block_id: BlockId) -> u64 {
        FILE_HEADER_SIZE + (block_id as u64 - 1) * BLOCK_SLOT_SIZE
    }
}

impl PageStore for FilePageStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn create(&mut self, truncate: bool) -> Result<()> {
        if !truncate && self.exists() {
            return Err(DbError::AlreadyExists(self.name.clone()));
        }

        // Drop any handle to the old file before truncating it
        self.file = None;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        file.write_all(&FileHeader::current().encode()?)?;
        file.sync_all()?;

        tracing::debug!("Created relation file {}", self.path.display());
        self.file = Some(file);
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }
        if !self.exists() {
            return Err(DbError::RelationNotFound(self.name.clone()));
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;

        let mut buf = [0u8; FILE_HEADER_SIZE as usize];
        file.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DbError::Corruption(format!(
                "Relation file {} is shorter than its header",
                self.path.display()
            )),
            _ => DbError::Io(e),
        })?;

        let header: FileHeader = bincode::deserialize(&buf)?;
        header.validate(&self.path)?;

        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.close()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed relation file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DbError::RelationNotFound(self.name.clone()))
            }
            Err(e) => Err(DbError::Io(e)),
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn block_count(&self) -> Result<BlockId> {
        let len = self.file()?.metadata()?.len();
        let body = len.saturating_sub(FILE_HEADER_SIZE);
        if body % BLOCK_SLOT_SIZE != 0 {
            return Err(DbError::Corruption(format!(
                "Relation file {} ends with a partial block",
                self.path.display()
            )));
        }
        Ok((body / BLOCK_SLOT_SIZE) as BlockId)
    }

    fn get(&mut self, block_id: BlockId) -> Result<Box<BlockData>> {
        if block_id == 0 || block_id > self.block_count()? {
            return Err(DbError::BlockNotFound(block_id));
        }

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(Self::block_offset(block_id)))?;

        let mut data = Box::new([0u8; BLOCK_SZ]);
        file.read_exact(&mut data[..])?;
        let mut crc = [0u8; 4];
        file.read_exact(&mut crc)?;

        let stored = u32::from_le_bytes(crc);
        let actual = crc32fast::hash(&data[..]);
        if stored != actual {
            tracing::warn!(
                "Checksum mismatch for block {} of {}: stored {:08x}, computed {:08x}",
                block_id,
                self.name,
                stored,
                actual
            );
            return Err(DbError::Corruption(format!(
                "Checksum mismatch for block {} of {}",
                block_id, self.name
            )));
        }

        Ok(data)
    }

    fn put(&mut self, block_id: BlockId, data: &BlockData) -> Result<()> {
        let count = self.block_count()?;
        if block_id == 0 || block_id > count + 1 {
            return Err(DbError::Storage(format!(
                "Cannot write block {} to {}: only {} blocks allocated",
                block_id, self.name, count
            )));
        }

        let sync_every_put = self.sync_strategy == SyncStrategy::EveryPut;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(Self::block_offset(block_id)))?;
        file.write_all(&data[..])?;
        file.write_all(&crc32fast::hash(&data[..]).to_le_bytes())?;

        if sync_every_put {
            file.sync_data()?;
        }
        Ok(())
    }
}
