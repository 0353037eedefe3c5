//! Planned file-system actions for a delivery and their execution.
//!
//! A [`TransferPlan`] is built without touching the disk. Executing it runs
//! each action in order through a [`FileTransfer`] policy, or only logs the
//! actions in dry-run mode.

use crate::error::Result;
use crate::progress::ProgressReporter;
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    /// The target was already up to date.
    Skipped,
}

/// How a single file reaches its target.
pub trait FileTransfer: Send + Sync {
    fn name(&self) -> &'static str;
    fn transfer(&self, source: &Path, target: &Path) -> io::Result<TransferOutcome>;
}

pub struct CopyTransfer;

impl FileTransfer for CopyTransfer {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn transfer(&self, source: &Path, target: &Path) -> io::Result<TransferOutcome> {
        fs::copy(source, target)?;
        Ok(TransferOutcome::Transferred)
    }
}

/// Renames when possible; falls back to copy and remove, e.g. across
/// devices.
pub struct MoveTransfer;

impl FileTransfer for MoveTransfer {
    fn name(&self) -> &'static str {
        "move"
    }

    fn transfer(&self, source: &Path, target: &Path) -> io::Result<TransferOutcome> {
        if let Err(err) = fs::rename(source, target) {
            debug!(
                "Rename of {} failed ({}), copying instead",
                source.display(),
                err
            );
            fs::copy(source, target)?;
            fs::remove_file(source)?;
        }
        Ok(TransferOutcome::Transferred)
    }
}

/// Copies only when the target is missing, differs in size, or is older
/// than the source.
pub struct SyncTransfer;

impl SyncTransfer {
    fn up_to_date(source: &Path, target: &Path) -> io::Result<bool> {
        let target_meta = match fs::metadata(target) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        let source_meta = fs::metadata(source)?;
        Ok(source_meta.len() == target_meta.len()
            && target_meta.modified()? >= source_meta.modified()?)
    }
}

impl FileTransfer for SyncTransfer {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn transfer(&self, source: &Path, target: &Path) -> io::Result<TransferOutcome> {
        if Self::up_to_date(source, target)? {
            return Ok(TransferOutcome::Skipped);
        }
        fs::copy(source, target)?;
        Ok(TransferOutcome::Transferred)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
    Sync,
}

impl TransferMode {
    pub fn transfer(self) -> Box<dyn FileTransfer> {
        match self {
            TransferMode::Copy => Box::new(CopyTransfer),
            TransferMode::Move => Box::new(MoveTransfer),
            TransferMode::Sync => Box::new(SyncTransfer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    CreateDir(PathBuf),
    Transfer { source: PathBuf, target: PathBuf },
    WriteDescriptor { path: PathBuf, contents: String },
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::CreateDir(path) => write!(f, "mkdir -p {}", path.display()),
            PlannedAction::Transfer { source, target } => {
                write!(f, "{} -> {}", source.display(), target.display())
            }
            PlannedAction::WriteDescriptor { path, .. } => write!(f, "write {}", path.display()),
        }
    }
}

/// Ordered actions. Directory creation is recorded once per directory and
/// always precedes the first action that needs it.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    actions: Vec<PlannedAction>,
    dirs: AHashSet<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionSummary {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

impl TransferPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_dir(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.dirs.insert(path.clone()) {
            self.actions.push(PlannedAction::CreateDir(path));
        }
    }

    fn create_parent(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            self.create_dir(parent);
        }
    }

    pub fn transfer(&mut self, source: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        let target = target.into();
        self.create_parent(&target);
        self.actions.push(PlannedAction::Transfer {
            source: source.into(),
            target,
        });
    }

    pub fn write_descriptor(&mut self, path: impl Into<PathBuf>, contents: String) {
        let path = path.into();
        self.create_parent(&path);
        self.actions
            .push(PlannedAction::WriteDescriptor { path, contents });
    }

    pub fn extend(&mut self, other: TransferPlan) {
        for action in other.actions {
            match action {
                PlannedAction::CreateDir(path) => self.create_dir(path),
                action => self.actions.push(action),
            }
        }
    }

    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn transfer_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, PlannedAction::Transfer { .. }))
            .count()
    }

    /// Run the plan. Failed transfers are logged and counted; failing to
    /// create a directory or write a descriptor aborts execution.
    pub fn execute(
        &self,
        transfer: &dyn FileTransfer,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionSummary> {
        let started_at = Utc::now();
        let mut summary = ExecutionSummary {
            succeeded: 0,
            failed: 0,
            skipped: 0,
            dry_run,
            started_at,
            finished_at: started_at,
        };
        reporter.on_transfer_start(self.actions.len());

        for (i, action) in self.actions.iter().enumerate() {
            if dry_run {
                info!("(DRY_RUN) {}: {}", transfer.name(), action);
                summary.skipped += 1;
                reporter.on_transfer_progress(i + 1, &action.to_string());
                continue;
            }
            match action {
                PlannedAction::CreateDir(path) => {
                    if path.is_dir() {
                        debug!("Directory {} already exists", path.display());
                        summary.skipped += 1;
                    } else {
                        fs::create_dir_all(path)?;
                        info!("Created directory {}", path.display());
                        summary.succeeded += 1;
                    }
                }
                PlannedAction::Transfer { source, target } => {
                    if !source.exists() {
                        warn!("Source {} no longer exists, skipping", source.display());
                        summary.failed += 1;
                    } else {
                        match transfer.transfer(source, target) {
                            Ok(TransferOutcome::Transferred) => {
                                info!(
                                    "{}: {} -> {}",
                                    transfer.name(),
                                    source.display(),
                                    target.display()
                                );
                                summary.succeeded += 1;
                            }
                            Ok(TransferOutcome::Skipped) => {
                                debug!("{} is up to date", target.display());
                                summary.skipped += 1;
                            }
                            Err(e) => {
                                error!(
                                    "Failed to {} '{}' to '{}': {}",
                                    transfer.name(),
                                    source.display(),
                                    target.display(),
                                    e
                                );
                                summary.failed += 1;
                            }
                        }
                    }
                }
                PlannedAction::WriteDescriptor { path, contents } => {
                    fs::write(path, contents)?;
                    info!("Wrote {}", path.display());
                    summary.succeeded += 1;
                }
            }
            reporter.on_transfer_progress(i + 1, &action.to_string());
        }

        summary.finished_at = Utc::now();
        reporter.on_transfer_complete(summary.succeeded, summary.failed, summary.duration_secs());
        info!(
            "Plan executed at {}: {} succeeded, {} failed, {} skipped",
            summary.finished_at.to_rfc3339(),
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }
}
