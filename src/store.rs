//! sled-backed store for the four cross-reference databases.
//!
//! The databases live as named trees inside a single sled database
//! under the indexer root. The store is opened for the duration of one
//! sync cycle and dropped afterwards, so external readers can open the
//! same path between cycles.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::staging::Category;

/// Directory name of the sled database under the indexer root.
const STORE_DIR: &str = "xref";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open xref store at {path}: {source}")]
    Open {
        path: PathBuf,
        source: sled::Error,
    },

    #[error("failed to open database '{name}': {source}")]
    Tree {
        name: &'static str,
        source: sled::Error,
    },

    #[error("point read failed: {0}")]
    Read(#[source] sled::Error),

    #[error("batch commit failed: {0}")]
    Commit(#[source] sled::Error),

    #[error("flush failed: {0}")]
    Flush(#[source] sled::Error),
}

/// Handle to the on-disk cross-reference databases.
pub struct XrefStore {
    db: sled::Db,
}

impl XrefStore {
    /// Open the store under `root`, creating it if missing.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let path = root.join(STORE_DIR);
        let db = sled::Config::default()
            .path(&path)
            .open()
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "opened xref store");
        Ok(Self { db })
    }

    /// Open the database tree for one category.
    pub fn tree(&self, category: Category) -> Result<sled::Tree, StoreError> {
        let name = category.tree_name();
        self.db
            .open_tree(name)
            .map_err(|source| StoreError::Tree { name, source })
    }

    /// Point-read the raw value stored under `key` in `tree`.
    pub fn read(tree: &sled::Tree, key: &[u8]) -> Result<Option<sled::IVec>, StoreError> {
        tree.get(key).map_err(StoreError::Read)
    }

    /// Commit a write batch to `tree`.
    pub fn commit(tree: &sled::Tree, batch: sled::Batch) -> Result<(), StoreError> {
        tree.apply_batch(batch).map_err(StoreError::Commit)
    }

    /// Flush the underlying database to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(StoreError::Flush)?;
        Ok(())
    }
}
