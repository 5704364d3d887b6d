//! Storage Module
//!
//! Block-level storage: slotted pages, the heap file that hands them out,
//! and the page stores that persist them.
//!
//! ## Responsibilities
//! - Pack variable-length records into fixed-size blocks
//! - Allocate blocks sequentially and track the last block id
//! - Persist blocks by id through a pluggable page store
//!
//! ## Block Layout
//! ```text
//! offset 0                                                   BLOCK_SZ
//! ┌──────────┬──────────┬─────┬───────────────┬──────────┬──────────┐
//! │ Slot 0   │ Slot 1   │ ... │  free space   │ Record 2 │ Record 1 │
//! │count|end │size|off  │     │               │          │          │
//! └──────────┴──────────┴─────┴───────────────┴──────────┴──────────┘
//!   header array grows →          ← records grow from the high end
//! ```
//!
//! All header fields are little-endian `u16`. A slot with offset 0 is a
//! tombstone; its record id is never handed out again.

mod heap_file;
mod page_store;
mod slotted_page;

pub use heap_file::HeapFile;
pub use page_store::{FilePageStore, MemoryPageStore, PageStore, StoreEnv};
pub use slotted_page::SlottedPage;

use crate::error::Result;

// =============================================================================
// Shared Constants
// =============================================================================

/// Size of every block in bytes
pub const BLOCK_SZ: usize = 4096;

/// Size of one header slot: size (2) + offset (2)
pub const SLOT_SIZE: usize = 4;

/// Largest record a freshly initialized block accepts
///
/// Free pointer starts at `BLOCK_SZ - 1`; slot 0 and the record's own slot
/// must stay below it.
pub const MAX_RECORD_SIZE: usize = BLOCK_SZ - 1 - 2 * SLOT_SIZE;

/// Block identifier, 1-based and allocated sequentially
pub type BlockId = u32;

/// Record identifier within a block, 1-based and never reused
pub type RecordId = u16;

/// Raw contents of one block
pub type BlockData = [u8; BLOCK_SZ];

// =============================================================================
// Block Capability
// =============================================================================

/// What a block offers to the layers above it
pub trait DbBlock {
    /// Id of this block within its file
    fn block_id(&self) -> BlockId;

    /// Append a record, returning its new id
    fn add(&mut self, data: &[u8]) -> Result<RecordId>;

    /// Borrow a record's bytes; `None` if deleted or never written
    fn get(&self, record_id: RecordId) -> Option<&[u8]>;

    /// Replace a record's bytes in place
    fn put(&mut self, record_id: RecordId, data: &[u8]) -> Result<()>;

    /// Delete a record, leaving a tombstone
    fn del(&mut self, record_id: RecordId) -> Result<()>;

    /// Live record ids in ascending order
    fn ids(&self) -> Vec<RecordId>;

    /// The full block buffer, as it should be persisted
    fn bytes(&self) -> &BlockData;
}
