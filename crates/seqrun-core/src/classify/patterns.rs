//! File-name conventions of the production pipeline.
//!
//! Pre-demultiplexed (lane/index) output:
//!
//! ```text
//! 1_120829_AA001AAAXX_nophix.bc_metrics          lane file
//! 1_120829_AA001AAAXX_nophix.filter_metrics      lane file
//! 1_120829_AA001AAAXX_nophix_1_fastq.txt         lane file
//! 1_120829_AA001AAAXX_nophix_10_1_fastq.txt      sample sequence file
//! 1_120829_AA001AAAXX_nophix_10-sort-dup.bam     sample result
//! ```
//!
//! Per-sample demultiplexed output:
//!
//! ```text
//! P003_101_index6_CGTTAA_L004_R2_001.fastq       sample sequence file
//! P003_101_index6-bcbb-command.txt               sample result
//! 09_realign_sample.txt                          pipeline summary
//! ```

use crate::flowcell::FlowcellTable;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref LANE_FILE_REGEX: Regex = Regex::new(concat!(
        r"^([0-9]+)_[0-9]+_[A-Za-z0-9]+(_nophix)?\.(filter|bc)_metrics",
        r"|^([0-9]+)_[0-9]+_[A-Za-z0-9]+(_nophix)?_[12]_fastq.txt"
    ))
    .unwrap();
    pub static ref INDEXED_SAMPLE_REGEX: Regex =
        Regex::new(r"^([0-9]+)_[0-9]+_[A-Za-z0-9]+(_nophix)?_([0-9]+|unmatched).*").unwrap();
    pub static ref SEQUENCE_FILE_REGEX: Regex = Regex::new(r"fastq(\.gz)?$").unwrap();
}

/// Index token marking reads that matched no barcode.
pub const UNMATCHED_INDEX: &str = "unmatched";

/// Substring identifying sequence files in the pre-demultiplexed layout.
pub const PRE_DEMUX_SEQUENCE_MARKER: &str = "fastq.txt";

/// Pipeline-level summary files; never attributed to a sample.
pub const PIPELINE_PATTERNS: [&str; 2] = [r"^[0-1][0-9].*\.txt", r"^bcbb_software_versions\.txt"];

/// Prefix covering the lane/index artifacts of one row. `None` when the row
/// lacks a flowcell id or barcode id.
pub fn indexed_prefix(
    lane: &str,
    flowcell_id: Option<&str>,
    barcode_id: Option<u32>,
) -> Option<String> {
    Some(format!(
        "{}_[0-9]+_.?{}(_nophix)?_{}*",
        lane,
        regex::escape(flowcell_id?),
        barcode_id?
    ))
}

/// Prefix covering per-sample demultiplexed files.
pub fn sample_name_prefix(name: &str) -> String {
    format!(r"^{}[_\-].*\.*", regex::escape(name))
}

pub fn glob_prefix_patterns(table: &FlowcellTable) -> Vec<String> {
    let mut out = Vec::with_capacity(table.len() * 2 + PIPELINE_PATTERNS.len());
    for row in table.iter() {
        if let Some(prefix) = indexed_prefix(
            &row.lane.lane,
            row.lane.flowcell_id.as_deref(),
            row.sample.barcode_id,
        ) {
            out.push(prefix);
        }
        out.push(sample_name_prefix(&row.sample.name));
    }
    out.extend(PIPELINE_PATTERNS.iter().map(|p| p.to_string()));
    out
}

/// `^(name1|name2|...)`, alternatives in row order. `None` for an empty table.
pub fn sample_names_regex(names: &[String]) -> Result<Option<Regex>, regex::Error> {
    if names.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    Regex::new(&format!("^({})", alternatives.join("|"))).map(Some)
}
