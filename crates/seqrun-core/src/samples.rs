use crate::error::Result;
use crate::scanner::{self, filtered_walk, WalkOptions};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::info;

pub const SAMPLE_CONFIG_PATTERN: &str = "-bcbb-config.yaml$";
/// Written by the analysis pipeline when a sample completes.
pub const SUMMARY_FILE: &str = "project-summary.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SampleStatus {
    Pass,
    Fail,
}

pub fn sample_status(config: &Path) -> SampleStatus {
    let summary = config
        .parent()
        .map(|dir| dir.join(SUMMARY_FILE))
        .unwrap_or_else(|| PathBuf::from(SUMMARY_FILE));
    if summary.exists() {
        SampleStatus::Pass
    } else {
        SampleStatus::Fail
    }
}

#[derive(Debug, Clone, Default)]
pub struct SampleQuery {
    /// A file listing config paths one per line, or a sample-name prefix.
    pub sample: Option<String>,
    /// Defaults to [`SAMPLE_CONFIG_PATTERN`].
    pub pattern: Option<String>,
    pub only_failed: bool,
}

/// Find sample configuration files under `path`. Returned paths are
/// absolute.
pub fn find_samples(
    path: &Path,
    query: &SampleQuery,
    options: &WalkOptions,
) -> Result<Vec<PathBuf>> {
    let mut pattern = query
        .pattern
        .clone()
        .unwrap_or_else(|| SAMPLE_CONFIG_PATTERN.to_string());

    let mut found: Vec<PathBuf> = Vec::new();
    if let Some(sample) = &query.sample {
        if Path::new(sample).is_file() {
            found = fs::read_to_string(sample)?
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect();
        } else {
            pattern = format!("{}{}", sample, pattern);
        }
    }

    if found.is_empty() {
        let re = Regex::new(&pattern)?;
        found = filtered_walk(path, |name| re.is_match(name), options)?;
    }
    if query.only_failed {
        found.retain(|config| sample_status(config) == SampleStatus::Fail);
    }
    if found.is_empty() {
        if let Some(sample) = &query.sample {
            info!("No such sample {}", sample);
        }
    }
    Ok(found.iter().map(|p| scanner::absolute(p)).collect())
}
