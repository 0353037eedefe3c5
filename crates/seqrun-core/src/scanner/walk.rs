use crate::error::Result;
use glob::Pattern;
use rayon::prelude::*;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

/// Restrictions applied while walking a production tree.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Only files whose directory has one of these names as a path
    /// component, or matches them as a regex alternation, are considered.
    pub include_dirs: Vec<String>,
    /// Directories with one of these names as a component, or matching them
    /// as a regex alternation, are skipped entirely.
    pub exclude_dirs: Vec<String>,
    /// Glob patterns; matching paths are pruned.
    pub ignore_patterns: Vec<String>,
    /// Return directories instead of files.
    pub dirs_only: bool,
}

impl WalkOptions {
    pub fn ignoring(ignore_patterns: &[String]) -> Self {
        Self {
            ignore_patterns: ignore_patterns.to_vec(),
            ..Default::default()
        }
    }

    pub fn dirs_only(mut self) -> Self {
        self.dirs_only = true;
        self
    }
}

struct DirMatcher {
    names: Vec<String>,
    pattern: Regex,
}

impl DirMatcher {
    fn new(names: &[String]) -> Result<Option<Self>> {
        if names.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            names: names.to_vec(),
            pattern: Regex::new(&names.join("|"))?,
        }))
    }

    fn matches(&self, dir: &Path) -> bool {
        dir.components()
            .any(|c| self.names.iter().any(|n| c.as_os_str() == n.as_str()))
            || self.pattern.is_match(&dir.to_string_lossy())
    }
}

/// Compile glob ignore patterns. Invalid patterns are logged and dropped.
pub fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Walk `root` and return the paths whose base name passes `filter`, in
/// walk order (entries sorted by file name). A missing root yields an empty
/// list. Directories that cannot be read for lack of permission are logged
/// and skipped.
pub fn filtered_walk<F>(root: &Path, filter: F, options: &WalkOptions) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool + Sync,
{
    if !root.exists() {
        debug!("Walk root {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let ignore_patterns = compile_ignore_patterns(&options.ignore_patterns);
    let include = DirMatcher::new(&options.include_dirs)?;
    let exclude = DirMatcher::new(&options.exclude_dirs)?;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let path = entry.path();
            if ignore_patterns.iter().any(|p| p.matches_path(path)) {
                return false;
            }
            !(entry.file_type().is_dir() && exclude.as_ref().is_some_and(|m| m.matches(path)))
        });

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let denied = err
                    .io_error()
                    .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied);
                if denied {
                    error!("Access denied while walking {}: {}", root.display(), err);
                    continue;
                }
                return Err(err.into());
            }
        };
        if entry.depth() == 0 || entry.file_type().is_dir() != options.dirs_only {
            continue;
        }
        if let Some(include) = &include {
            let parent = entry.path().parent().unwrap_or(root);
            if !include.matches(parent) {
                continue;
            }
        }
        candidates.push(entry.into_path());
    }

    let matched: Vec<PathBuf> = candidates
        .into_par_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| filter(&name.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    debug!("Walk of {} matched {} paths", root.display(), matched.len());
    Ok(matched)
}
