//! Configuration for heapdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a heapdb store environment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for relation files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {relation}.db
    ///     └── ...
    pub data_dir: PathBuf,

    /// Where blocks live
    pub backend: Backend,

    /// Sync strategy: how often to fsync relation files
    pub sync_strategy: SyncStrategy,
}

/// Page store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// One file per relation under `data_dir`
    File,

    /// Process-local blocks, shared by every store of one environment
    Memory,
}

/// File sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every block write (safest, slowest)
    EveryPut,

    /// fsync when the relation is closed
    OnClose,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./heapdb_data"),
            backend: Backend::File,
            sync_strategy: SyncStrategy::OnClose,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all relation files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the page store backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
