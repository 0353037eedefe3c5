//! Delivery layouts.
//!
//! A classified flowcell is delivered either as one directory per sample
//! (`data/<sample>/<fc_id>/`) or as one directory per flowcell
//! (`data/<fc_id>/` plus `intermediate/<fc_id>/`). The transformer only
//! computes targets: it returns a [`TransferPlan`] and the rewritten tables,
//! whose rows point at the target paths.

use crate::error::{Error, Result};
use crate::flowcell::{Field, FlowcellTable};
use crate::transfer::TransferPlan;
use ahash::AHashSet;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{debug, info};

/// Suffix of the descriptor written into each sample directory.
pub const SAMPLE_DESCRIPTOR_SUFFIX: &str = "-bcbb-config.yaml";
/// Descriptor written into a flowcell data directory.
pub const FLOWCELL_DESCRIPTOR: &str = "project_run_info.yaml";
pub const DEFAULT_COMPRESS_SUFFIX: &str = ".gz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum LayoutConvention {
    /// One directory per sample and flowcell ("casava").
    PerSample,
    /// One directory per flowcell ("pre-casava").
    SingleFlowcell,
}

/// `{project_root}/{dir}`, where `dir` is an explicit transfer directory or
/// the project name lower-cased with dots replaced by underscores.
#[derive(Debug, Clone)]
pub struct DeliveryRoot {
    base: PathBuf,
}

impl DeliveryRoot {
    pub fn new(project_root: &Path, project: &str, transfer_dir: Option<&str>) -> Self {
        let dir = match transfer_dir {
            Some(dir) => dir.to_string(),
            None => project_dir_name(project),
        };
        Self {
            base: project_root.join(dir),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn sample_dir(&self, sample: &str, fc_id: &str) -> PathBuf {
        self.data_dir().join(sample).join(fc_id)
    }

    pub fn flowcell_dirs(&self, fc_id: &str) -> TargetDirs {
        TargetDirs {
            data: self.data_dir().join(fc_id),
            intermediate: self.base.join("intermediate").join(fc_id),
        }
    }
}

pub fn project_dir_name(project: &str) -> String {
    project.replace('.', "_").to_lowercase()
}

/// Where sequence files (`data`) and result files (`intermediate`) go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDirs {
    pub data: PathBuf,
    pub intermediate: PathBuf,
}

#[derive(Debug)]
pub struct LayoutOutcome {
    pub plan: TransferPlan,
    /// Rewritten tables, keyed by the path their descriptor is written to.
    pub tables: Vec<(PathBuf, FlowcellTable)>,
}

pub struct LayoutTransformer {
    root: DeliveryRoot,
    convention: LayoutConvention,
    compress_suffix: String,
}

impl LayoutTransformer {
    pub fn new(root: DeliveryRoot, convention: LayoutConvention) -> Self {
        Self {
            root,
            convention,
            compress_suffix: DEFAULT_COMPRESS_SUFFIX.to_string(),
        }
    }

    pub fn with_compress_suffix(mut self, suffix: &str) -> Self {
        self.compress_suffix = suffix.to_string();
        self
    }

    pub fn convention(&self) -> LayoutConvention {
        self.convention
    }

    /// Plan the delivery of a classified table. The table must have been
    /// populated by `collect_files`, which records the search root that
    /// source paths are rebased from.
    pub fn transform(&self, table: &FlowcellTable) -> Result<LayoutOutcome> {
        let search_root = table.search_root().ok_or(Error::MissingSearchRoot)?;
        let fc_id = table.fc_id()?;
        info!(
            "Planning {} delivery of {} samples from {} ({})",
            self.convention,
            table.len(),
            search_root.display(),
            fc_id
        );
        match self.convention {
            LayoutConvention::PerSample => self.per_sample(table, search_root, &fc_id),
            LayoutConvention::SingleFlowcell => self.single_flowcell(table, search_root, &fc_id),
        }
    }

    /// One directory and one descriptor per sample. A sample sequenced in
    /// several lanes keeps all of its rows in that descriptor.
    fn per_sample(
        &self,
        table: &FlowcellTable,
        search_root: &Path,
        fc_id: &str,
    ) -> Result<LayoutOutcome> {
        let mut plan = TransferPlan::new();
        let mut names: Vec<&str> = Vec::new();
        for row in table.iter() {
            if !names.contains(&row.sample.name.as_str()) {
                names.push(&row.sample.name);
            }
        }
        let mut tables = Vec::with_capacity(names.len());

        for name in names {
            let dir = self.root.sample_dir(name, fc_id);
            let dirs = TargetDirs {
                data: dir.clone(),
                intermediate: dir.clone(),
            };
            plan.create_dir(&dir);

            let mut sample_fc = table.subset(Field::Name, name);
            let keys: Vec<String> = sample_fc.iter().map(|r| r.key()).collect();
            for key in &keys {
                self.rewrite_row(&mut sample_fc, key, search_root, &dirs, &mut plan)?;
            }

            // Lane files are referenced from the sample directory but not
            // copied there.
            let lane_files: Vec<(String, Vec<String>)> = sample_fc
                .lane_files()
                .iter()
                .map(|(lane, files)| {
                    let moved = files.iter().map(|f| rebase_flat(f, &dir)).collect();
                    (lane.clone(), moved)
                })
                .collect();
            for (lane, files) in lane_files {
                sample_fc.set_lane_files(&lane, files);
            }
            set_metadata_from_fc_id(&mut sample_fc, fc_id);

            let descriptor = dir.join(format!("{}{}", name, SAMPLE_DESCRIPTOR_SUFFIX));
            plan.write_descriptor(&descriptor, sample_fc.serialize_to_hierarchical()?);
            tables.push((descriptor, sample_fc));
        }
        Ok(LayoutOutcome { plan, tables })
    }

    fn single_flowcell(
        &self,
        table: &FlowcellTable,
        search_root: &Path,
        fc_id: &str,
    ) -> Result<LayoutOutcome> {
        let mut plan = TransferPlan::new();
        let dirs = self.root.flowcell_dirs(fc_id);
        plan.create_dir(&dirs.data);
        plan.create_dir(&dirs.intermediate);

        let mut out = table.clone();
        for row in table.iter() {
            self.rewrite_row(&mut out, &row.key(), search_root, &dirs, &mut plan)?;
        }

        for (lane, files) in table.lane_files() {
            let moved: Vec<String> = files
                .iter()
                .map(|source| {
                    let target = rebase(source, search_root, &dirs.data);
                    plan.transfer(source, &target);
                    target.to_string_lossy().into_owned()
                })
                .collect();
            out.set_lane_files(lane, moved);
        }
        set_metadata_from_fc_id(&mut out, fc_id);

        let descriptor = dirs.data.join(FLOWCELL_DESCRIPTOR);
        plan.write_descriptor(&descriptor, out.serialize_to_hierarchical()?);
        Ok(LayoutOutcome {
            plan,
            tables: vec![(descriptor, out)],
        })
    }

    /// Plan transfers for one row's files and point the row in `target` at
    /// the new locations.
    fn rewrite_row(
        &self,
        target: &mut FlowcellTable,
        key: &str,
        search_root: &Path,
        dirs: &TargetDirs,
        plan: &mut TransferPlan,
    ) -> Result<()> {
        let row = target.get_sample(key)?;
        let files = prefer_compressed(&row.sample.files, &self.compress_suffix);
        let results = row.sample.results.clone();

        let mut move_all = |sources: &[String], dir: &Path| -> Vec<String> {
            sources
                .iter()
                .map(|source| {
                    let dest = rebase(source, search_root, dir);
                    plan.transfer(source, &dest);
                    dest.to_string_lossy().into_owned()
                })
                .collect()
        };
        let new_files = move_all(&files, &dirs.data);
        let new_results = move_all(&results, &dirs.intermediate);
        debug!(
            "{}: {} files, {} results",
            key,
            new_files.len(),
            new_results.len()
        );

        target.set_entry(key, Field::Files, new_files.into())?;
        target.set_entry(key, Field::Results, new_results.into())?;
        Ok(())
    }
}

/// Replace the `search_root` prefix of `source` with `target_dir`. Paths
/// outside the search root land directly in `target_dir`.
pub fn rebase(source: &str, search_root: &Path, target_dir: &Path) -> PathBuf {
    match Path::new(source).strip_prefix(search_root) {
        Ok(relative) => target_dir.join(relative),
        Err(_) => rebase_flat(source, target_dir).into(),
    }
}

fn rebase_flat(source: &str, target_dir: &Path) -> String {
    let name = Path::new(source)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    target_dir.join(name).to_string_lossy().into_owned()
}

/// Collapse compressed/uncompressed variants of the same file, keeping the
/// compressed one. Order follows the first occurrence of each file.
pub fn prefer_compressed(files: &[String], suffix: &str) -> Vec<String> {
    let mut stems: Vec<&str> = Vec::new();
    let mut compressed: AHashSet<&str> = AHashSet::new();
    for file in files {
        let (stem, is_compressed) = match file.strip_suffix(suffix) {
            Some(stem) if !suffix.is_empty() => (stem, true),
            _ => (file.as_str(), false),
        };
        if !stems.contains(&stem) {
            stems.push(stem);
        }
        if is_compressed {
            compressed.insert(stem);
        }
    }
    stems
        .into_iter()
        .map(|stem| {
            if compressed.contains(stem) {
                format!("{}{}", stem, suffix)
            } else {
                stem.to_string()
            }
        })
        .collect()
}

fn set_metadata_from_fc_id(table: &mut FlowcellTable, fc_id: &str) {
    if let Some((date, name)) = fc_id.split_once('_') {
        table.set_flowcell_metadata(Some(date.to_string()), Some(name.to_string()));
    }
}
