//! Assignment of file-system paths to flowcell rows.
//!
//! Classification is an ordered cascade of tiers; the first tier that
//! recognises a file name decides where the file goes. Deciding is a
//! read-only pass over the table, so a batch of files can be classified in
//! parallel and the resulting [`Attribution`]s applied afterwards in order.

pub mod patterns;

use crate::error::Result;
use crate::flowcell::row::{sample_key, FileKind};
use crate::flowcell::FlowcellTable;
use crate::scanner;
use patterns::{
    INDEXED_SAMPLE_REGEX, LANE_FILE_REGEX, PRE_DEMUX_SEQUENCE_MARKER, SEQUENCE_FILE_REGEX,
    UNMATCHED_INDEX,
};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Where a classified file belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// A file describing a whole lane.
    LaneFile { lane: String, path: String },
    /// A sequence or result file of the row with composite key `key`.
    SampleFile {
        key: String,
        kind: FileKind,
        path: String,
    },
    /// Recognised as a sample file, but its barcode id has no sequence in
    /// the lane.
    Unresolved {
        lane: String,
        barcode_id: String,
        path: String,
    },
    Unmatched,
}

/// One step of the classification cascade.
pub trait ClassifierTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` if the tier does not recognise `base_name`; otherwise the
    /// decision, which ends the cascade.
    fn classify(&self, table: &FlowcellTable, base_name: &str, path: &str) -> Option<Attribution>;
}

/// Barcode/filter metrics and unsplit lane reads.
pub struct LaneFileTier;

impl ClassifierTier for LaneFileTier {
    fn name(&self) -> &'static str {
        "lane"
    }

    fn classify(&self, _table: &FlowcellTable, base_name: &str, path: &str) -> Option<Attribution> {
        if !LANE_FILE_REGEX.is_match(base_name) {
            return None;
        }
        let lane = base_name.split('_').next().unwrap_or_default();
        Some(Attribution::LaneFile {
            lane: lane.to_string(),
            path: path.to_string(),
        })
    }
}

/// `<lane>_<run>_<flowcell>[_nophix]_<index>...`: pre-demultiplexed sample
/// files named by numeric barcode id.
pub struct IndexedSampleTier;

impl ClassifierTier for IndexedSampleTier {
    fn name(&self) -> &'static str {
        "indexed-sample"
    }

    fn classify(&self, table: &FlowcellTable, base_name: &str, path: &str) -> Option<Attribution> {
        let cap = INDEXED_SAMPLE_REGEX.captures(base_name)?;
        let lane = cap[1].to_string();
        let index = &cap[3];
        if index == UNMATCHED_INDEX {
            return Some(Attribution::LaneFile {
                lane,
                path: path.to_string(),
            });
        }

        let sequence = index
            .parse::<u32>()
            .ok()
            .and_then(|id| table.barcode_id_to_sequence(&lane).remove(&id));
        let Some(sequence) = sequence else {
            return Some(Attribution::Unresolved {
                lane,
                barcode_id: index.to_string(),
                path: path.to_string(),
            });
        };

        let kind = if base_name.contains(PRE_DEMUX_SEQUENCE_MARKER) {
            FileKind::Files
        } else {
            FileKind::Results
        };
        Some(Attribution::SampleFile {
            key: sample_key(&lane, Some(&sequence)),
            kind,
            path: path.to_string(),
        })
    }
}

/// Demultiplexed files whose names start with a sample name.
pub struct NamedSampleTier {
    names: Option<Regex>,
}

impl NamedSampleTier {
    pub fn new(table: &FlowcellTable) -> Result<Self> {
        let names: Vec<String> = table.iter().map(|r| r.sample.name.clone()).collect();
        Ok(Self {
            names: patterns::sample_names_regex(&names)?,
        })
    }
}

impl ClassifierTier for NamedSampleTier {
    fn name(&self) -> &'static str {
        "named-sample"
    }

    fn classify(&self, table: &FlowcellTable, base_name: &str, path: &str) -> Option<Attribution> {
        let cap = self.names.as_ref()?.captures(base_name)?;
        let row = table.row_by_name(&cap[1])?;
        let kind = if SEQUENCE_FILE_REGEX.is_match(base_name) {
            FileKind::Files
        } else {
            FileKind::Results
        };
        Some(Attribution::SampleFile {
            key: row.key(),
            kind,
            path: path.to_string(),
        })
    }
}

/// The full cascade, in priority order.
pub struct FileClassifier {
    tiers: Vec<Box<dyn ClassifierTier>>,
}

impl FileClassifier {
    pub fn new(table: &FlowcellTable) -> Result<Self> {
        Ok(Self::with_tiers(vec![
            Box::new(LaneFileTier),
            Box::new(IndexedSampleTier),
            Box::new(NamedSampleTier::new(table)?),
        ]))
    }

    pub fn with_tiers(tiers: Vec<Box<dyn ClassifierTier>>) -> Self {
        Self { tiers }
    }

    pub fn classify(&self, table: &FlowcellTable, path: &Path) -> Attribution {
        let Some(base_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return Attribution::Unmatched;
        };
        let absolute = scanner::absolute(path).to_string_lossy().into_owned();
        for tier in &self.tiers {
            if let Some(attribution) = tier.classify(table, &base_name, &absolute) {
                trace!("{} tier matched {}", tier.name(), base_name);
                return attribution;
            }
        }
        trace!("No tier matched {}", base_name);
        Attribution::Unmatched
    }

    /// Classify a batch of files in parallel. Results are in input order.
    pub fn classify_all(&self, table: &FlowcellTable, paths: &[PathBuf]) -> Vec<Attribution> {
        paths
            .par_iter()
            .map(|path| self.classify(table, path))
            .collect()
    }
}
