//! Reading and writing run descriptors.
//!
//! Two input formats are supported: the hierarchical `run_info.yaml` layout
//! (lanes with nested `multiplex` sample lists) and the flat Illumina
//! samplesheet (`.csv`). Both are flattened into one [`Row`] per
//! (lane, sample) pair.

use super::row::{scalar, LaneInfo, Row, SampleInfo};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Lane analysis assigned to every samplesheet-derived row.
pub const SAMPLESHEET_ANALYSIS: &str = "Align_standard_seqcap";
/// Barcode type marking a row as samplesheet-derived.
pub const SAMPLESHEET_BARCODE_TYPE: &str = "Samplesheet";

/// A parsed descriptor: flowcell metadata plus flattened rows.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub fc_date: Option<String>,
    pub fc_name: Option<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct FlowcellRecord {
    #[serde(default, deserialize_with = "scalar::opt_string")]
    fc_date: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string")]
    fc_name: Option<String>,
    details: Vec<LaneRecord>,
}

#[derive(Debug, Deserialize)]
struct LaneRecord {
    #[serde(flatten)]
    lane: LaneInfo,
    multiplex: Vec<SampleInfo>,
}

/// Top level of the hierarchical output.
#[derive(Debug, Serialize)]
pub(crate) struct HierarchicalDocument {
    pub details: Vec<LaneOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LaneOutput {
    #[serde(flatten)]
    pub lane: LaneInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Vec<SampleInfo>>,
}

/// Read a descriptor, dispatching on the file extension.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_descriptor(path: &Path) -> Result<Option<Descriptor>> {
    if !path.exists() {
        debug!("No descriptor at {}", path.display());
        return Ok(None);
    }
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let descriptor = if is_csv {
        parse_samplesheet(File::open(path)?)?
    } else {
        let mut text = String::new();
        File::open(path)?.read_to_string(&mut text)?;
        parse_hierarchical(&text)?
    };
    debug!(
        "Read {} rows from {}",
        descriptor.rows.len(),
        path.display()
    );
    Ok(Some(descriptor))
}

/// Parse the hierarchical format. The document is either a mapping with
/// `fc_date`, `fc_name` and `details`, or a bare sequence of lane entries.
pub fn parse_hierarchical(text: &str) -> Result<Descriptor> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    let record = if value.is_sequence() {
        FlowcellRecord {
            fc_date: None,
            fc_name: None,
            details: serde_yaml::from_value(value)?,
        }
    } else {
        serde_yaml::from_value(value)?
    };

    let mut rows = Vec::new();
    for lane in record.details {
        for sample in lane.multiplex {
            rows.push(Row::new(lane.lane.clone(), sample));
        }
    }

    Ok(Descriptor {
        fc_date: record.fc_date,
        fc_name: record.fc_name,
        rows,
    })
}

/// Samplesheet columns, in file order. The project column appears twice;
/// the later one wins when present.
const SAMPLESHEET_COLUMNS: [&str; 10] = [
    "flowcell_id",
    "lane",
    "name",
    "genome_build",
    "sequence",
    "sample_prj",
    "control",
    "recipe",
    "operator",
    "sample_prj",
];

/// Parse a samplesheet, skipping its single header line.
pub fn parse_samplesheet<R: Read>(reader: R) -> Result<Descriptor> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let optional = |i: usize| {
            record
                .get(i)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let required = |i: usize| {
            optional(i).ok_or(Error::MissingColumn {
                line,
                column: SAMPLESHEET_COLUMNS[i],
            })
        };

        let flowcell_id = required(0)?;
        let lane = required(1)?;
        let name = required(2)?;
        let project = match optional(9) {
            Some(prj) => prj,
            None => required(5)?,
        };
        let project_label = project.replace("__", ".");

        rows.push(Row::new(
            LaneInfo {
                description: Some(format!("Lane {}, {}", lane, project_label)),
                lane,
                flowcell_id: Some(flowcell_id),
                analysis: Some(SAMPLESHEET_ANALYSIS.to_string()),
                genome_build: optional(3),
            },
            SampleInfo {
                analysis: None,
                barcode_id: None,
                barcode_type: Some(SAMPLESHEET_BARCODE_TYPE.to_string()),
                description: Some(format!("{}_{}", project_label, name)),
                sample_prj: Some(project),
                name,
                sequence: optional(4),
                files: Vec::new(),
                genomes_filter_out: None,
                results: Vec::new(),
            },
        ));
    }

    Ok(Descriptor {
        fc_date: None,
        fc_name: None,
        rows,
    })
}
