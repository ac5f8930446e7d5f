//! Error types for the indexing coordinator.

use std::path::PathBuf;

/// Errors surfaced by [`Indexer`](crate::indexer::Indexer) operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// The input path already has an active job.
    #[error("already indexing {0}")]
    DuplicateInput(PathBuf),

    /// No usable compile information record exists for the file.
    #[error("no compile information stored for {0}")]
    MissingResource(PathBuf),

    /// The database root must be an absolute path.
    #[error("indexer root is not absolute: {0}")]
    InvalidRoot(PathBuf),

    /// The indexer no longer accepts work.
    #[error("indexer is shutting down")]
    ShuttingDown,

    /// Creating the root directory failed.
    #[error("failed to prepare indexer directories: {0}")]
    Io(#[from] std::io::Error),
}
