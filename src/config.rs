//! Indexer configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// Number of job completions between periodic syncs. Quiescence always
/// triggers a sync regardless of this counter.
pub const SYNC_INTERVAL: u32 = 10;

/// Configuration for the [`Indexer`](crate::indexer::Indexer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Base directory for the persistent databases. Must be absolute.
    pub root: PathBuf,

    /// Directory holding per-file compile information records.
    pub resource_dir: PathBuf,

    /// Maximum number of extraction jobs running in parallel.
    pub max_workers: usize,

    /// Completions between periodic syncs.
    pub sync_interval: u32,
}

impl IndexerConfig {
    /// Build a configuration rooted at `root` with defaults for
    /// everything else.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let resource_dir = root.join("resources");
        Self {
            root,
            resource_dir,
            max_workers: num_cpus::get().max(1),
            sync_interval: SYNC_INTERVAL,
        }
    }

    /// Check the invariants the coordinator relies on.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if !self.root.is_absolute() {
            return Err(IndexerError::InvalidRoot(self.root.clone()));
        }
        Ok(())
    }
}
