//! # heapdb
//!
//! A heap-organized relation store built on slotted pages:
//! - Variable-length records packed into fixed 4 KB blocks
//! - Stable `(block, record)` handles that survive in-block compaction
//! - Typed rows marshaled against a fixed column schema
//! - File-backed or in-memory page stores
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Shell (SQL echo prompt)                    │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HeapTable                             │
//! │            insert / select / project / update / del          │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//!         ┌─────────────┐                 ┌─────────────┐
//!         │  RowCodec   │                 │  HeapFile   │
//!         │ (marshal)   │                 │ (block ids) │
//!         └─────────────┘                 └──────┬──────┘
//!                                                │
//!                                  ┌─────────────┴─────────────┐
//!                                  ▼                           ▼
//!                          ┌──────────────┐           ┌──────────────┐
//!                          │ SlottedPage  │           │  PageStore   │
//!                          │  (records)   │           │ (file / mem) │
//!                          └──────────────┘           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod table;
pub mod sql;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DbError, Result};
pub use config::Config;
pub use storage::{DbBlock, HeapFile, SlottedPage, StoreEnv};
pub use table::{DbRelation, Handle, HeapTable, Row, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of heapdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
