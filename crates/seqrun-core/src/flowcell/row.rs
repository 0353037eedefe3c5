use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use strum::{EnumString, IntoStaticStr};

/// Placeholder used in the composite key of samples without an index sequence.
pub const NO_SEQUENCE: &str = "NoIndex";

/// Named columns of a flowcell table, in canonical order.
///
/// The string forms are the field names used in run descriptors and on the
/// command line (`"sample_prj"`, `"barcode_id"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Lane,
    LaneDescription,
    FlowcellId,
    LaneAnalysis,
    GenomeBuild,
    MpAnalysis,
    BarcodeId,
    BarcodeType,
    #[strum(serialize = "sample_prj")]
    SampleProject,
    Name,
    Sequence,
    Files,
    GenomesFilterOut,
    MpDescription,
    Results,
}

impl Field {
    pub fn from_name(name: &str) -> Result<Field> {
        name.parse()
            .map_err(|_| Error::UnknownField(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed cell value, used by the name-based accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(u32),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Which per-sample file list a classified path is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Files,
    Results,
}

impl From<FileKind> for Field {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Files => Field::Files,
            FileKind::Results => Field::Results,
        }
    }
}

/// Lane-level fields, shared by every sample sequenced in the lane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneInfo {
    #[serde(deserialize_with = "scalar::string")]
    pub lane: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub flowcell_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genome_build: Option<String>,
}

/// Per-sample (multiplex) fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_u32", skip_serializing_if = "Option::is_none")]
    pub barcode_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sample_prj: Option<String>,
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genomes_filter_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub results: Vec<String>,
}

/// One (lane, sample) pair of a flowcell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub lane: LaneInfo,
    pub sample: SampleInfo,
}

impl Row {
    pub fn new(lane: LaneInfo, sample: SampleInfo) -> Self {
        Self { lane, sample }
    }

    /// The composite `"{lane}_{sequence}"` key.
    pub fn key(&self) -> String {
        sample_key(&self.lane.lane, self.sample.sequence.as_deref())
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        match field {
            Field::Lane => Some(FieldValue::Text(self.lane.lane.clone())),
            Field::LaneDescription => text(&self.lane.description),
            Field::FlowcellId => text(&self.lane.flowcell_id),
            Field::LaneAnalysis => text(&self.lane.analysis),
            Field::GenomeBuild => text(&self.lane.genome_build),
            Field::MpAnalysis => text(&self.sample.analysis),
            Field::BarcodeId => self.sample.barcode_id.map(FieldValue::Integer),
            Field::BarcodeType => text(&self.sample.barcode_type),
            Field::SampleProject => text(&self.sample.sample_prj),
            Field::Name => Some(FieldValue::Text(self.sample.name.clone())),
            Field::Sequence => text(&self.sample.sequence),
            Field::Files => Some(FieldValue::List(self.sample.files.clone())),
            Field::GenomesFilterOut => text(&self.sample.genomes_filter_out),
            Field::MpDescription => text(&self.sample.description),
            Field::Results => Some(FieldValue::List(self.sample.results.clone())),
        }
    }

    /// Whether `field` holds exactly `value`. Null cells never match.
    pub fn matches(&self, field: Field, value: &FieldValue) -> bool {
        self.get(field).as_ref() == Some(value)
    }

    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<()> {
        match field {
            Field::BarcodeId => match value {
                FieldValue::Integer(i) => {
                    self.sample.barcode_id = Some(i);
                    Ok(())
                }
                _ => Err(Error::TypeMismatch {
                    field: field.name(),
                    expected: "an integer",
                }),
            },
            Field::Files | Field::Results => match value {
                FieldValue::List(items) => {
                    *self.list_mut(field)? = items;
                    Ok(())
                }
                _ => Err(Error::TypeMismatch {
                    field: field.name(),
                    expected: "a list of paths",
                }),
            },
            _ => {
                let FieldValue::Text(text) = value else {
                    return Err(Error::TypeMismatch {
                        field: field.name(),
                        expected: "text",
                    });
                };
                match field {
                    Field::Lane => self.lane.lane = text,
                    Field::Name => self.sample.name = text,
                    Field::LaneDescription => self.lane.description = Some(text),
                    Field::FlowcellId => self.lane.flowcell_id = Some(text),
                    Field::LaneAnalysis => self.lane.analysis = Some(text),
                    Field::GenomeBuild => self.lane.genome_build = Some(text),
                    Field::MpAnalysis => self.sample.analysis = Some(text),
                    Field::BarcodeType => self.sample.barcode_type = Some(text),
                    Field::SampleProject => self.sample.sample_prj = Some(text),
                    Field::Sequence => self.sample.sequence = Some(text),
                    Field::GenomesFilterOut => self.sample.genomes_filter_out = Some(text),
                    Field::MpDescription => self.sample.description = Some(text),
                    Field::BarcodeId | Field::Files | Field::Results => unreachable!(),
                }
                Ok(())
            }
        }
    }

    pub fn list_mut(&mut self, field: Field) -> Result<&mut Vec<String>> {
        match field {
            Field::Files => Ok(&mut self.sample.files),
            Field::Results => Ok(&mut self.sample.results),
            _ => Err(Error::TypeMismatch {
                field: field.name(),
                expected: "a list of paths",
            }),
        }
    }
}

pub fn sample_key(lane: &str, sequence: Option<&str>) -> String {
    format!("{}_{}", lane, sequence.unwrap_or(NO_SEQUENCE))
}

/// Lenient scalar deserializers: descriptor files written by hand often carry
/// lanes, dates and barcode ids as either numbers or strings.
pub(crate) mod scalar {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Scalar::Str(s) => s,
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Bool(b) => b.to_string(),
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
        Scalar::deserialize(de).map(Scalar::into_string)
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(de)?.map(Scalar::into_string))
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<u32>, D::Error> {
        use serde::de::Error as _;
        match Option::<Scalar>::deserialize(de)? {
            None => Ok(None),
            Some(Scalar::Int(i)) => u32::try_from(i)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("barcode id {} out of range", i))),
            Some(Scalar::Str(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid barcode id '{}'", s))),
            Some(_) => Err(D::Error::custom("barcode id must be an integer")),
        }
    }

    pub fn list<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
        Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
    }
}
