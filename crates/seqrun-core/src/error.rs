use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Duplicate sample key '{0}': (lane, sequence) must be unique")]
    DuplicateKey(String),

    #[error("No sample with key '{0}'")]
    UnknownKey(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{field}' expects {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Samplesheet line {line}: missing column '{column}'")]
    MissingColumn { line: u64, column: &'static str },

    #[error("Cannot derive a flowcell id for {0:?}")]
    MissingFlowcellId(Option<PathBuf>),

    #[error("Flowcell has no recorded search root; collect files first")]
    MissingSearchRoot,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
