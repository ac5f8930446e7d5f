//! Path resolution for location and inclusion keys.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolves parser-reported paths to stable absolute keys.
///
/// Canonicalisation is preferred so symlinked include roots collapse to
/// one key. Paths that cannot be canonicalised (files deleted since the
/// parse, virtual buffers) fall back to a lexical cleanup so extraction
/// still produces a usable key.
#[derive(Debug, Default, Clone)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// Absolute canonical form of `path`.
    pub fn resolved(&self, path: &Path) -> PathBuf {
        match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(_) => Self::normalize(path),
        }
    }

    /// Lexically eliminate `.` and `..` and anchor relative paths at
    /// the current directory.
    fn normalize(path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path.to_path_buf(),
            }
        };

        let mut out = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other.as_os_str()),
            }
        }
        out
    }
}
