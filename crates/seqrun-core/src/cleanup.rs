use crate::error::Result;
use crate::scanner::{filtered_walk, WalkOptions};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files a finished sample directory keeps: configuration, commands, raw
/// reads, pipeline summaries and job bookkeeping.
pub const KEEP_PATTERNS: [&str; 11] = [
    "-post_process.yaml$",
    "-post_process.yaml.bak$",
    "-bcbb-config.yaml$",
    "-bcbb-config.yaml.bak$",
    "-bcbb-command.txt$",
    "-bcbb-command.txt.bak$",
    "_[0-9]+.fastq$",
    "_[0-9]+.fastq.gz$",
    "^[0-9][0-9]_.*.txt$",
    "JOBID",
    "PID",
];

lazy_static! {
    static ref KEEP_REGEX: Regex = Regex::new(&KEEP_PATTERNS.join("|")).unwrap();
}

pub fn is_kept(name: &str) -> bool {
    KEEP_REGEX.is_match(name)
}

#[derive(Debug, Clone, Default)]
pub struct CleanupPlan {
    pub files: Vec<PathBuf>,
    /// Deepest first, so each directory is empty by the time it is removed.
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub failed: usize,
}

/// Everything under `workdir` that is not on the keep-list.
pub fn plan_cleanup(workdir: &Path, options: &WalkOptions) -> Result<CleanupPlan> {
    let remove = |name: &str| !is_kept(name);
    let files = filtered_walk(workdir, remove, options)?;
    let mut dirs = filtered_walk(workdir, remove, &options.clone().dirs_only())?;
    dirs.sort_by_key(|d| std::cmp::Reverse(d.as_os_str().len()));
    info!(
        "Cleanup of {}: {} files and {} directories",
        workdir.display(),
        files.len(),
        dirs.len()
    );
    Ok(CleanupPlan { files, dirs })
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Remove the planned files, then the planned directories. Directories
    /// that still hold kept files are left in place.
    pub fn execute(&self, dry_run: bool) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        for file in &self.files {
            if dry_run {
                info!("(DRY_RUN) rm {}", file.display());
                continue;
            }
            match fs::remove_file(file) {
                Ok(()) => summary.files_removed += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", file.display(), e);
                    summary.failed += 1;
                }
            }
        }
        for dir in &self.dirs {
            if dry_run {
                info!("(DRY_RUN) rmdir {}", dir.display());
                continue;
            }
            match fs::remove_dir(dir) {
                Ok(()) => summary.dirs_removed += 1,
                Err(e) => {
                    warn!("Not removing directory {}: {}", dir.display(), e);
                    summary.failed += 1;
                }
            }
        }
        info!(
            "Removed {} files and {} directories ({} failed)",
            summary.files_removed, summary.dirs_removed, summary.failed
        );
        summary
    }
}
