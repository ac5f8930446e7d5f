//! Per-file compile information records.
//!
//! The intake surface records, for every file it has seen, the input
//! path and compile arguments it was indexed with. `reindex` reads the
//! record back and resubmits it. Records are JSON arrays
//! `[input, arg0, arg1, …]` stored under the hex SHA-256 of the file
//! path.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

/// Suffix for compile information records.
const INFORMATION_SUFFIX: &str = "information";

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to read resource record: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed resource record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A stored `[input, arguments…]` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationRecord {
    pub input: PathBuf,
    pub arguments: Vec<String>,
}

/// Directory of per-file records addressed by hashed path.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    dir: PathBuf,
}

impl ResourceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// On-disk location of the information record for `filename`.
    pub fn information_path(&self, filename: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(filename.to_string_lossy().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{digest}.{INFORMATION_SUFFIX}"))
    }

    /// Read the record for `filename`.
    ///
    /// Returns `Ok(None)` when no usable record exists: file missing,
    /// empty list, or empty input path.
    pub fn read_information(
        &self,
        filename: &Path,
    ) -> Result<Option<InformationRecord>, ResourceError> {
        let path = self.information_path(filename);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(record = %path.display(), "no information record");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut items: Vec<String> = serde_json::from_slice(&bytes)?;
        if items.is_empty() || items[0].is_empty() {
            debug!(record = %path.display(), "empty information record");
            return Ok(None);
        }

        let input = PathBuf::from(items.remove(0));
        Ok(Some(InformationRecord {
            input,
            arguments: items,
        }))
    }

    /// Write the record for `filename`, creating the directory first.
    pub fn write_information(
        &self,
        filename: &Path,
        record: &InformationRecord,
    ) -> Result<(), ResourceError> {
        fs::create_dir_all(&self.dir)?;

        let mut items = Vec::with_capacity(record.arguments.len() + 1);
        items.push(record.input.to_string_lossy().into_owned());
        items.extend(record.arguments.iter().cloned());

        let bytes = serde_json::to_vec(&items)?;
        fs::write(self.information_path(filename), bytes)?;
        Ok(())
    }
}
