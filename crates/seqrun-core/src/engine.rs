use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::flowcell::FlowcellTable;
use crate::layout::{DeliveryRoot, LayoutConvention, LayoutOutcome, LayoutTransformer};
use crate::progress::ProgressReporter;
use crate::samples::SAMPLE_CONFIG_PATTERN;
use crate::scanner::{self, filtered_walk, WalkOptions};
use crate::transfer::TransferPlan;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to deliver and from which layout to which.
#[derive(Debug, Clone, Default)]
pub struct DeliveryRequest {
    pub project: String,
    /// Flowcell directory name; required for pre-casava input.
    pub flowcell: Option<String>,
    pub from_pre_casava: bool,
    pub to_pre_casava: bool,
    pub transfer_dir: Option<String>,
}

impl DeliveryRequest {
    pub fn convention(&self) -> LayoutConvention {
        if self.to_pre_casava {
            LayoutConvention::SingleFlowcell
        } else {
            LayoutConvention::PerSample
        }
    }
}

pub struct DeliveryEngine {
    config: AppConfig,
}

impl DeliveryEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions::ignoring(&self.config.ignore_patterns)
    }

    fn collect(
        &self,
        table: &FlowcellTable,
        root: &Path,
        project: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FlowcellTable> {
        reporter.on_collect_start(&root.to_string_lossy());
        let start = Instant::now();
        let collected = table.collect_files(root, Some(project), &self.walk_options())?;
        reporter.on_collect_complete(collected.len(), start.elapsed().as_secs_f64());
        Ok(collected)
    }

    /// Load the run descriptor of `flowcell` (archive first, then
    /// production) and collect the project's files from the production
    /// flowcell directory. `None` if no descriptor exists.
    pub fn gather_pre_casava(
        &self,
        project: &str,
        flowcell: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<Option<FlowcellTable>> {
        let dirs = [
            Path::new(&self.config.archive_root).join(flowcell),
            Path::new(&self.config.production_root).join(flowcell),
        ];
        let mut fc = FlowcellTable::new();
        if !fc.load(&dirs, &self.config.runinfo_name)? {
            warn!("No run information available for {}", flowcell);
            return Ok(None);
        }
        let indir = Path::new(&self.config.production_root).join(flowcell);
        let collected = self.collect(&fc, &indir, project, reporter)?;
        info!(
            "Collected {} samples of {} from {}",
            collected.len(),
            project,
            indir.display()
        );
        Ok(Some(collected))
    }

    /// Collect every per-sample descriptor of `project` under the production
    /// root, each with the files found next to it.
    pub fn gather_casava(
        &self,
        project: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<FlowcellTable>> {
        let root = Path::new(&self.config.production_root).join(project);
        let pattern = Regex::new(SAMPLE_CONFIG_PATTERN)?;
        let configs = filtered_walk(&root, |name| pattern.is_match(name), &self.walk_options())?;
        info!("Found {} sample descriptors under {}", configs.len(), root.display());

        let mut tables = Vec::with_capacity(configs.len());
        for config in configs {
            let Some(fc) = FlowcellTable::open(&config)? else {
                continue;
            };
            let dir = config.parent().unwrap_or(&root);
            tables.push(self.collect(&fc, dir, project, reporter)?);
        }
        Ok(tables)
    }

    /// Plan the delivery of `tables` into the project directory.
    pub fn plan_delivery(
        &self,
        tables: &[FlowcellTable],
        project: &str,
        convention: LayoutConvention,
        transfer_dir: Option<&str>,
    ) -> Result<LayoutOutcome> {
        let project_root = scanner::absolute(Path::new(&self.config.project_root));
        let root = DeliveryRoot::new(&project_root, project, transfer_dir);
        let transformer = LayoutTransformer::new(root, convention)
            .with_compress_suffix(&self.config.compress_suffix);

        let mut plan = TransferPlan::new();
        let mut rewritten: Vec<(PathBuf, FlowcellTable)> = Vec::new();
        for table in tables {
            let outcome = transformer.transform(table)?;
            debug!(
                "{} actions for {} samples",
                outcome.plan.len(),
                table.len()
            );
            plan.extend(outcome.plan);
            rewritten.extend(outcome.tables);
        }
        Ok(LayoutOutcome {
            plan,
            tables: rewritten,
        })
    }

    /// Gather and plan a delivery. `None` when there is nothing to deliver
    /// or the requested direction is not supported.
    pub fn deliver(
        &self,
        request: &DeliveryRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<Option<LayoutOutcome>> {
        if !request.from_pre_casava && request.to_pre_casava {
            warn!("Not delivering from casava input to pre-casava output");
            return Ok(None);
        }

        let tables = if request.from_pre_casava {
            let flowcell = request.flowcell.as_deref().ok_or_else(|| {
                Error::Other("a flowcell is required for pre-casava input".to_string())
            })?;
            self.gather_pre_casava(&request.project, flowcell, reporter)?
                .into_iter()
                .collect::<Vec<_>>()
        } else {
            self.gather_casava(&request.project, reporter)?
        };
        if tables.iter().all(|t| t.is_empty()) {
            warn!("No samples of {} to deliver", request.project);
            return Ok(None);
        }

        let outcome = self.plan_delivery(
            &tables,
            &request.project,
            request.convention(),
            request.transfer_dir.as_deref(),
        )?;
        Ok(Some(outcome))
    }
}
