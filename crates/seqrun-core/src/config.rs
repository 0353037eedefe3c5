use crate::error::Result;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Archived flowcells, searched first for run descriptors.
    pub archive_root: String,
    /// Pipeline output, one directory per flowcell or project.
    pub production_root: String,
    /// Delivery target.
    pub project_root: String,
    pub ignore_patterns: Vec<String>,
    pub runinfo_name: String,
    pub compress_suffix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            archive_root: "archive".to_string(),
            production_root: "production".to_string(),
            project_root: "projects".to_string(),
            ignore_patterns: Vec::new(),
            runinfo_name: "run_info.yaml".to_string(),
            compress_suffix: ".gz".to_string(),
        }
    }
}

impl AppConfig {
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load `Config.toml` from the working directory (or `path` if given),
/// overridden by `SEQRUN_*` environment variables, e.g.
/// `SEQRUN_PROJECT_ROOT=/proj` or `SEQRUN_IGNORE_PATTERNS=*/tmp/*,*/tx/*`.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };
    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("SEQRUN")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
