pub mod walk;

use std::path::{Path, PathBuf};

pub use walk::{compile_ignore_patterns, filtered_walk, WalkOptions};

/// Absolute form of `path` without touching the file system. Falls back to
/// the path as given if the working directory cannot be read.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
