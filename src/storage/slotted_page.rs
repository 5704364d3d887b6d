//! Slotted Page
//!
//! In-memory view over one block: a header array of (size, offset) slots at
//! the low end and record bytes packed downward from the high end.
//!
//! ## Header
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │ Slot 0: record_count (2)     │ end_of_free_space (2)        │
//! ├──────────────────────────────┼──────────────────────────────┤
//! │ Slot i: size (2)             │ offset (2), 0 = tombstone    │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! `end_of_free_space` is the offset of the highest free byte. The next
//! record is written so that it ends right above it.

use crate::error::{DbError, Result};

use super::{BlockData, BlockId, DbBlock, RecordId, BLOCK_SZ, SLOT_SIZE};

/// A block of variable-length records addressed by stable record ids
///
/// Records never move between blocks. Updates and deletes compact the
/// record area in place ("slide") and re-home the offsets of every record
/// packed below the change, so record ids stay valid.
pub struct SlottedPage {
    block_id: BlockId,
    data: Box<BlockData>,
    /// Mirror of slot 0, first half
    num_records: u16,
    /// Mirror of slot 0, second half
    end_free: u16,
}

impl SlottedPage {
    /// Initialize an empty block
    pub fn new_block(block_id: BlockId) -> Self {
        let mut page = Self {
            block_id,
            data: Box::new([0u8; BLOCK_SZ]),
            num_records: 0,
            end_free: (BLOCK_SZ - 1) as u16,
        };
        page.put_block_header();
        page
    }

    /// Wrap an existing block, reading its header from slot 0
    ///
    /// Rejects buffers whose header could not have been written by this
    /// codec (free pointer out of range or a record overlapping the header).
    pub fn from_bytes(block_id: BlockId, data: Box<BlockData>) -> Result<Self> {
        let num_records = get_n(&data, 0);
        let end_free = get_n(&data, 2);

        let header_end = SLOT_SIZE * (num_records as usize + 1);
        if end_free as usize >= BLOCK_SZ || (end_free as usize) < header_end {
            return Err(DbError::Corruption(format!(
                "Block {}: free pointer {} inconsistent with {} records",
                block_id, end_free, num_records
            )));
        }

        let page = Self {
            block_id,
            data,
            num_records,
            end_free,
        };

        for id in page.ids() {
            let (size, loc) = page.get_header(id);
            let (size, loc) = (size as usize, loc as usize);
            if loc <= page.end_free as usize || loc + size > BLOCK_SZ {
                return Err(DbError::Corruption(format!(
                    "Block {}: record {} at [{}, {}) lies outside the record area",
                    block_id,
                    id,
                    loc,
                    loc + size
                )));
            }
        }

        Ok(page)
    }

    /// Number of record ids ever assigned in this block (including tombstones)
    pub fn record_count(&self) -> u16 {
        self.num_records
    }

    /// Offset of the highest free byte
    pub fn end_of_free_space(&self) -> u16 {
        self.end_free
    }

    /// Bytes available for one more record after reserving its slot
    pub fn free_space(&self) -> usize {
        let header_end = SLOT_SIZE * (self.num_records as usize + 2);
        (self.end_free as usize).saturating_sub(header_end)
    }

    /// Can `size` more bytes be stored, keeping room for one more slot?
    pub fn has_room(&self, size: usize) -> bool {
        let header_end = SLOT_SIZE * (self.num_records as usize + 2);
        self.end_free as isize - header_end as isize >= size as isize
    }

    // =========================================================================
    // Compaction
    // =========================================================================

    /// Shift the record area so that the byte at `start` ends up at `end`
    ///
    /// Moves `[end_free + 1, start)` by `end - start` bytes and re-homes every
    /// live record whose offset is at or below `start`. A positive shift
    /// closes a gap above the moved region, a negative one opens a gap.
    pub(crate) fn slide(&mut self, start: usize, end: usize) {
        let shift = end as isize - start as isize;
        if shift == 0 {
            return;
        }

        let from = self.end_free as usize + 1;
        let to = (from as isize + shift) as usize;
        self.data.copy_within(from..start, to);

        for id in self.ids() {
            let (size, loc) = self.get_header(id);
            if loc as usize <= start {
                let loc = (loc as isize + shift) as u16;
                self.put_header(id, size, loc);
            }
        }

        self.end_free = (self.end_free as isize + shift) as u16;
        self.put_block_header();
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// (size, offset) of a record that is still live
    fn live_header(&self, record_id: RecordId) -> Result<(u16, u16)> {
        if record_id == 0 || record_id > self.num_records {
            return Err(self.not_found(record_id));
        }
        let (size, loc) = self.get_header(record_id);
        if loc == 0 {
            return Err(self.not_found(record_id));
        }
        Ok((size, loc))
    }

    fn not_found(&self, record_id: RecordId) -> DbError {
        DbError::RecordNotFound {
            block_id: self.block_id,
            record_id,
        }
    }

    /// Read slot `id` as (size, offset); slot 0 yields (count, end_free)
    fn get_header(&self, id: RecordId) -> (u16, u16) {
        let at = SLOT_SIZE * id as usize;
        (get_n(&self.data, at), get_n(&self.data, at + 2))
    }

    fn put_header(&mut self, id: RecordId, size: u16, loc: u16) {
        let at = SLOT_SIZE * id as usize;
        put_n(&mut self.data, at, size);
        put_n(&mut self.data, at + 2, loc);
    }

    fn put_block_header(&mut self) {
        let (count, end_free) = (self.num_records, self.end_free);
        self.put_header(0, count, end_free);
    }
}

impl DbBlock for SlottedPage {
    fn block_id(&self) -> BlockId {
        self.block_id
    }

    fn add(&mut self, data: &[u8]) -> Result<RecordId> {
        if !self.has_room(data.len()) {
            return Err(DbError::OutOfSpace {
                block_id: self.block_id,
                requested: data.len(),
            });
        }

        let size = data.len() as u16;
        self.num_records += 1;
        self.end_free -= size;
        let id = self.num_records;
        let loc = self.end_free + 1;

        let at = loc as usize;
        self.data[at..at + data.len()].copy_from_slice(data);
        self.put_block_header();
        self.put_header(id, size, loc);

        tracing::trace!("Block {}: added record {} ({} bytes)", self.block_id, id, size);
        Ok(id)
    }

    fn get(&self, record_id: RecordId) -> Option<&[u8]> {
        let (size, loc) = self.live_header(record_id).ok()?;
        let at = loc as usize;
        Some(&self.data[at..at + size as usize])
    }

    fn put(&mut self, record_id: RecordId, data: &[u8]) -> Result<()> {
        let (size, loc) = self.live_header(record_id)?;
        let (size, loc) = (size as usize, loc as usize);
        let new_size = data.len();

        if new_size > size {
            let extra = new_size - size;
            if !self.has_room(extra) {
                return Err(DbError::OutOfSpace {
                    block_id: self.block_id,
                    requested: extra,
                });
            }
            // Open a gap of `extra` bytes below the record, then fill both
            self.slide(loc, loc - extra);
            let at = loc - extra;
            self.data[at..at + new_size].copy_from_slice(data);
        } else {
            self.data[loc..loc + new_size].copy_from_slice(data);
            self.slide(loc + new_size, loc + size);
        }

        // slide() already moved this record's offset
        let (_, loc) = self.get_header(record_id);
        self.put_header(record_id, new_size as u16, loc);

        tracing::trace!(
            "Block {}: updated record {} ({} -> {} bytes)",
            self.block_id,
            record_id,
            size,
            new_size
        );
        Ok(())
    }

    fn del(&mut self, record_id: RecordId) -> Result<()> {
        let (size, loc) = self.live_header(record_id)?;
        self.put_header(record_id, 0, 0);
        self.slide(loc as usize, loc as usize + size as usize);

        tracing::trace!("Block {}: deleted record {}", self.block_id, record_id);
        Ok(())
    }

    fn ids(&self) -> Vec<RecordId> {
        (1..=self.num_records)
            .filter(|&id| self.get_header(id).1 != 0)
            .collect()
    }

    fn bytes(&self) -> &BlockData {
        &self.data
    }
}

impl std::fmt::Debug for SlottedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlottedPage")
            .field("block_id", &self.block_id)
            .field("num_records", &self.num_records)
            .field("end_free", &self.end_free)
            .finish()
    }
}

fn get_n(data: &BlockData, offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn put_n(data: &mut BlockData, offset: usize, n: u16) {
    data[offset..offset + 2].copy_from_slice(&n.to_le_bytes());
}
