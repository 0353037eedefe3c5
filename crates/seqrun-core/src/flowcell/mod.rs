//! The flowcell table: one row per (lane, sample) pair, indexed by the
//! composite `"{lane}_{sequence}"` key.

pub mod descriptor;
pub mod row;

use crate::classify::{patterns, Attribution, FileClassifier};
use crate::error::{Error, Result};
use crate::scanner::{self, WalkOptions};
use ahash::AHashMap;
use descriptor::{Descriptor, HierarchicalDocument, LaneOutput};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

pub use row::{Field, FieldValue, FileKind, LaneInfo, Row, SampleInfo};

lazy_static! {
    static ref FLOWCELL_DIR_REGEX: Regex =
        Regex::new(r"([0-9]+)_[A-Za-z0-9]+_[A-Za-z0-9]+_([A-Z0-9]+)").unwrap();
}

/// Per-lane files that are not attributable to a single sample. The lists
/// are shared with tables derived through [`FlowcellTable::subset`] and are
/// copied on first write.
pub type LaneFiles = BTreeMap<String, Arc<Vec<String>>>;

/// Columns of the tab-separated table rendering.
const TABLE_COLUMNS: [Field; 11] = [
    Field::Lane,
    Field::LaneDescription,
    Field::FlowcellId,
    Field::LaneAnalysis,
    Field::GenomeBuild,
    Field::BarcodeId,
    Field::BarcodeType,
    Field::SampleProject,
    Field::Name,
    Field::Sequence,
    Field::GenomesFilterOut,
];

#[derive(Debug, Clone, Default)]
pub struct FlowcellTable {
    rows: Vec<Row>,
    index: AHashMap<String, usize>,
    lane_files: LaneFiles,
    filename: Option<PathBuf>,
    search_root: Option<PathBuf>,
    fc_date: Option<String>,
    fc_name: Option<String>,
    unique_lanes: bool,
}

impl FlowcellTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, rejecting duplicate composite keys.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        let mut table = Self {
            rows,
            ..Default::default()
        };
        table.rebuild_index()?;
        table.reset_lane_files();
        Ok(table)
    }

    fn from_descriptor(descriptor: Descriptor, filename: PathBuf) -> Result<Self> {
        let mut table = Self::from_rows(descriptor.rows)?;
        table.fc_date = descriptor.fc_date;
        table.fc_name = descriptor.fc_name;
        table.filename = Some(filename);
        Ok(table)
    }

    /// Read a descriptor file. Returns `Ok(None)` if it does not exist.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        match descriptor::read_descriptor(path)? {
            Some(descriptor) => {
                let filename = fs::canonicalize(path)?;
                Ok(Some(Self::from_descriptor(descriptor, filename)?))
            }
            None => Ok(None),
        }
    }

    /// Look for `runinfo_name` in each candidate directory in turn; the first
    /// descriptor found replaces the contents of this table.
    pub fn load<P: AsRef<Path>>(&mut self, dirs: &[P], runinfo_name: &str) -> Result<bool> {
        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.exists() {
                debug!("Skipping missing directory {}", dir.display());
                continue;
            }
            if let Some(table) = Self::open(&dir.join(runinfo_name))? {
                info!(
                    "Loaded {} samples from {}",
                    table.len(),
                    dir.join(runinfo_name).display()
                );
                *self = table;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let mut index = AHashMap::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            if index.insert(row.key(), i).is_some() {
                return Err(Error::DuplicateKey(row.key()));
            }
        }
        self.index = index;
        Ok(())
    }

    fn reset_lane_files(&mut self) {
        self.lane_files = self
            .lanes()
            .into_iter()
            .map(|lane| (lane, Arc::new(Vec::new())))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows in table order. Each call starts a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn search_root(&self) -> Option<&Path> {
        self.search_root.as_deref()
    }

    pub fn set_search_root(&mut self, root: &Path) {
        self.search_root = Some(scanner::absolute(root));
    }

    pub fn fc_date(&self) -> Option<&str> {
        self.fc_date.as_deref()
    }

    pub fn fc_name(&self) -> Option<&str> {
        self.fc_name.as_deref()
    }

    pub fn set_flowcell_metadata(&mut self, fc_date: Option<String>, fc_name: Option<String>) {
        self.fc_date = fc_date;
        self.fc_name = fc_name;
    }

    pub fn is_unique_lanes(&self) -> bool {
        self.unique_lanes
    }

    pub fn lane_files(&self) -> &LaneFiles {
        &self.lane_files
    }

    pub fn lane_files_for(&self, lane: &str) -> &[String] {
        self.lane_files
            .get(lane)
            .map(|files| files.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_lane_files(&mut self, lane: &str, files: Vec<String>) {
        self.lane_files.insert(lane.to_string(), Arc::new(files));
    }

    pub fn append_lane_file(&mut self, lane: &str, path: String) {
        let files = Arc::make_mut(self.lane_files.entry(lane.to_string()).or_default());
        if !files.contains(&path) {
            files.push(path);
        }
    }

    /// `"{date}_{name}"` of the flowcell, derived from the descriptor's
    /// directory (`<date>_<machine>_<run>_<flowcell>`) when possible and from
    /// the stored metadata otherwise.
    pub fn fc_id(&self) -> Result<String> {
        let derived = self
            .filename
            .as_deref()
            .and_then(Path::parent)
            .and_then(|dir| {
                let dir = dir.to_string_lossy();
                FLOWCELL_DIR_REGEX
                    .captures(&dir)
                    .map(|cap| (cap[1].to_string(), cap[2].to_string()))
            });
        match derived {
            Some((date, name)) => Ok(format!("{}_{}", date, name)),
            None => match (&self.fc_date, &self.fc_name) {
                (Some(date), Some(name)) => Ok(format!("{}_{}", date, name)),
                _ => Err(Error::MissingFlowcellId(self.filename.clone())),
            },
        }
    }

    fn position(&self, key: &str) -> Result<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| Error::UnknownKey(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get_sample(&self, key: &str) -> Result<&Row> {
        Ok(&self.rows[self.position(key)?])
    }

    pub fn get_entry(&self, key: &str, field: Field) -> Result<Option<FieldValue>> {
        Ok(self.get_sample(key)?.get(field))
    }

    /// Overwrite one cell. Changing a lane or sequence re-keys the row; a
    /// change that would collide with another row is rolled back.
    pub fn set_entry(&mut self, key: &str, field: Field, value: FieldValue) -> Result<()> {
        let i = self.position(key)?;
        let previous = self.rows[i].clone();
        self.rows[i].set(field, value)?;
        if matches!(field, Field::Lane | Field::Sequence) {
            if let Err(err) = self.rebuild_index() {
                self.rows[i] = previous;
                self.rebuild_index()?;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Append a path to a list field. Paths already present are not added
    /// again.
    pub fn append_to_entry(&mut self, key: &str, field: Field, value: String) -> Result<()> {
        let i = self.position(key)?;
        let list = self.rows[i].list_mut(field)?;
        if !list.contains(&value) {
            list.push(value);
        }
        Ok(())
    }

    /// All non-null values of `field`, in row order.
    pub fn column(&self, field: Field) -> Vec<FieldValue> {
        self.rows.iter().filter_map(|row| row.get(field)).collect()
    }

    /// Distinct projects, in first-seen order.
    pub fn projects(&self) -> Vec<String> {
        distinct(self.rows.iter().filter_map(|r| r.sample.sample_prj.clone()))
    }

    /// Distinct lanes, in first-seen order.
    pub fn lanes(&self) -> Vec<String> {
        distinct(self.rows.iter().map(|r| r.lane.lane.clone()))
    }

    fn in_lane<'a>(&'a self, lane: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.lane.lane == lane)
    }

    pub fn barcodes(&self, lane: &str) -> Vec<u32> {
        self.in_lane(lane).filter_map(|r| r.sample.barcode_id).collect()
    }

    pub fn names(&self, lane: &str) -> Vec<String> {
        self.in_lane(lane).map(|r| r.sample.name.clone()).collect()
    }

    pub fn barcode_sequences(&self, lane: &str) -> Vec<String> {
        self.in_lane(lane)
            .filter_map(|r| r.sample.sequence.clone())
            .collect()
    }

    fn pair_in_lane<K, V>(
        &self,
        lane: &str,
        key: impl Fn(&Row) -> Option<K>,
        value: impl Fn(&Row) -> Option<V>,
    ) -> HashMap<K, V>
    where
        K: Eq + Hash,
    {
        self.in_lane(lane)
            .filter_map(|r| Some((key(r)?, value(r)?)))
            .collect()
    }

    pub fn barcode_id_to_name(&self, lane: &str) -> HashMap<u32, String> {
        self.pair_in_lane(lane, |r| r.sample.barcode_id, |r| Some(r.sample.name.clone()))
    }

    pub fn barcode_name_to_id(&self, lane: &str) -> HashMap<String, u32> {
        self.pair_in_lane(lane, |r| Some(r.sample.name.clone()), |r| r.sample.barcode_id)
    }

    pub fn barcode_sequence_to_name(&self, lane: &str) -> HashMap<String, String> {
        self.pair_in_lane(
            lane,
            |r| r.sample.sequence.clone(),
            |r| Some(r.sample.name.clone()),
        )
    }

    pub fn barcode_name_to_sequence(&self, lane: &str) -> HashMap<String, String> {
        self.pair_in_lane(
            lane,
            |r| Some(r.sample.name.clone()),
            |r| r.sample.sequence.clone(),
        )
    }

    pub fn barcode_id_to_sequence(&self, lane: &str) -> HashMap<u32, String> {
        self.pair_in_lane(lane, |r| r.sample.barcode_id, |r| r.sample.sequence.clone())
    }

    /// First row carrying sample `name`.
    pub fn row_by_name(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.sample.name == name)
    }

    fn derived_filename(&self, suffix: &str) -> Option<PathBuf> {
        let filename = self.filename.as_ref()?;
        let stem = filename.file_stem()?.to_string_lossy();
        let name = match filename.extension() {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, suffix),
        };
        Some(filename.with_file_name(name))
    }

    /// New table holding the rows where `field == value`, in order. Lane
    /// files are restricted to the lanes that remain.
    pub fn subset(&self, field: Field, value: impl Into<FieldValue>) -> FlowcellTable {
        let value = value.into();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|r| r.matches(field, &value))
            .cloned()
            .collect();
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key(), i))
            .collect();
        let mut pruned = FlowcellTable {
            rows,
            index,
            filename: self.derived_filename("-pruned"),
            search_root: self.search_root.clone(),
            fc_date: self.fc_date.clone(),
            fc_name: self.fc_name.clone(),
            unique_lanes: self.unique_lanes,
            ..Default::default()
        };
        pruned.lane_files = pruned
            .lanes()
            .into_iter()
            .filter_map(|lane| {
                let files = self.lane_files.get(&lane)?.clone();
                Some((lane, files))
            })
            .collect();
        trace!("subset {}={} kept {} of {} rows", field, value, pruned.len(), self.len());
        pruned
    }

    /// Independent copy with every row on its own lane, numbered from 1 in
    /// row order. Lane files follow their rows: new lane `n` sees the files of the lane
    /// its row was on before.
    pub fn renumber_lanes_to_unique(&self) -> FlowcellTable {
        let mut unique = self.clone();
        let mut lane_files = LaneFiles::new();
        for (i, row) in unique.rows.iter_mut().enumerate() {
            let lane = (i + 1).to_string();
            let files = self
                .lane_files
                .get(&row.lane.lane)
                .map(|files| files.as_ref().clone())
                .unwrap_or_default();
            lane_files.insert(lane.clone(), Arc::new(files));
            row.lane.lane = lane;
        }
        unique.index = unique
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key(), i))
            .collect();
        unique.lane_files = lane_files;
        unique.filename = self.derived_filename("-unique-lane");
        unique.unique_lanes = true;
        unique
    }

    /// Render the table in the hierarchical descriptor format.
    pub fn serialize_to_hierarchical(&self) -> Result<String> {
        let mut lanes: Vec<LaneOutput> = Vec::new();
        for row in &self.rows {
            if row.sample.sequence.is_none() {
                continue;
            }
            let pos = match lanes.iter().position(|l| l.lane.lane == row.lane.lane) {
                Some(pos) => pos,
                None => {
                    lanes.push(LaneOutput {
                        lane: row.lane.clone(),
                        multiplex: (!self.unique_lanes).then(Vec::new),
                    });
                    lanes.len() - 1
                }
            };
            let entry = &mut lanes[pos];

            let mut sample = row.sample.clone();
            if sample.analysis.is_none() {
                sample.analysis = entry.lane.analysis.clone();
            }
            if sample.description.is_none() {
                sample.description = Some(format!(
                    "{}_{}",
                    sample.sample_prj.as_deref().unwrap_or("None"),
                    sample.name
                ));
            }
            sorted_unique(&mut sample.files);
            sorted_unique(&mut sample.results);

            match entry.multiplex.as_mut() {
                Some(multiplex) => multiplex.push(sample),
                None => entry.lane.description = sample.description,
            }
        }

        let document = HierarchicalDocument {
            details: lanes,
            fc_date: self.fc_date.clone(),
            fc_name: self.fc_name.clone(),
        };
        Ok(serde_yaml::to_string(&document)?)
    }

    pub fn write_hierarchical(&self, path: &Path) -> Result<()> {
        fs::write(path, self.serialize_to_hierarchical()?)?;
        info!("Wrote {} samples to {}", self.len(), path.display());
        Ok(())
    }

    /// Tab-separated, fully quoted rendering of the indexed samples.
    pub fn to_table_string(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(Vec::new());
        writer.write_record(TABLE_COLUMNS.iter().map(|f| f.name()))?;
        for row in self.rows.iter().filter(|r| r.sample.barcode_id.is_some()) {
            writer.write_record(TABLE_COLUMNS.iter().map(|&f| {
                row.get(f)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "None".to_string())
            }))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Other(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Other(e.to_string()))
    }

    /// Regular-expression prefixes covering every row's files, plus the
    /// pipeline-level summary files.
    pub fn glob_prefix_patterns(&self) -> Vec<String> {
        patterns::glob_prefix_patterns(self)
    }

    /// Apply one classification decision to the table.
    pub fn apply(&mut self, attribution: Attribution) -> Result<()> {
        match attribution {
            Attribution::LaneFile { lane, path } => {
                debug!("Adding lane file {} to lane {}", path, lane);
                self.append_lane_file(&lane, path);
            }
            Attribution::SampleFile { key, kind, path } => {
                debug!("Adding {:?} file {} to key {}", kind, path, key);
                self.append_to_entry(&key, kind.into(), path)?;
            }
            Attribution::Unresolved {
                lane,
                barcode_id,
                path,
            } => {
                warn!(
                    "No barcode sequence for id {} in lane {}; not attributing {}",
                    barcode_id, lane, path
                );
            }
            Attribution::Unmatched => {}
        }
        Ok(())
    }

    /// Classify a single file and record it in the table.
    pub fn classify_file(&mut self, path: &Path) -> Result<()> {
        let classifier = FileClassifier::new(self)?;
        let attribution = classifier.classify(self, path);
        self.apply(attribution)
    }

    /// Walk `root` for files belonging to this flowcell (optionally only to
    /// `project`) and classify them. Returns the populated table, which
    /// records `root` as its search root.
    pub fn collect_files(
        &self,
        root: &Path,
        project: Option<&str>,
        options: &WalkOptions,
    ) -> Result<FlowcellTable> {
        let mut fc = match project {
            Some(project) => self.subset(Field::SampleProject, project),
            None => self.clone(),
        };
        let filter = Regex::new(&fc.glob_prefix_patterns().join("|"))?;
        let files = scanner::filtered_walk(root, |name| filter.is_match(name), options)?;
        info!(
            "Found {} candidate files for {} samples under {}",
            files.len(),
            fc.len(),
            root.display()
        );

        let classifier = FileClassifier::new(&fc)?;
        for attribution in classifier.classify_all(&fc, &files) {
            fc.apply(attribution)?;
        }
        fc.set_search_root(root);
        Ok(fc)
    }
}

impl fmt::Display for FlowcellTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.to_table_string().map_err(|_| fmt::Error)?;
        f.write_str(&table)
    }
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn sorted_unique(items: &mut Vec<String>) {
    items.sort();
    items.dedup();
}
