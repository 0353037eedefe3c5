mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, TransferArgs};
use dotenv::dotenv;
use progress::CliReporter;
use seqrun_core::cleanup::plan_cleanup;
use seqrun_core::config::{load_configuration, non_overlapping_directories};
use seqrun_core::samples::{find_samples, SampleQuery};
use seqrun_core::scanner::WalkOptions;
use seqrun_core::{AppConfig, DeliveryEngine, DeliveryRequest, Field, FlowcellTable, TransferMode};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Runinfo {
            descriptor,
            yaml,
            unique_lanes,
            project,
        }) => run_runinfo(&descriptor, yaml, unique_lanes, project.as_deref()),
        Some(Commands::Collect {
            descriptor,
            root,
            project,
        }) => run_collect(&config, &descriptor, &root, project.as_deref()),
        Some(Commands::Transfer(transfer)) => run_transfer(&config, &transfer),
        Some(Commands::FindSamples {
            paths,
            sample,
            only_failed,
        }) => run_find_samples(&config, &paths, sample, only_failed),
        Some(Commands::Clean {
            workdir,
            dry_run,
            force,
        }) => run_clean(&config, &workdir, dry_run, force),
        Some(Commands::PrintConfig) => config
            .to_toml()
            .map(|rendered| print!("{}", rendered))
            .context("rendering configuration"),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn open_descriptor(path: &Path) -> Result<FlowcellTable> {
    match FlowcellTable::open(path).with_context(|| format!("reading {}", path.display()))? {
        Some(fc) => Ok(fc),
        None => bail!("No run descriptor at {}", path.display()),
    }
}

fn run_runinfo(
    descriptor: &Path,
    yaml: bool,
    unique_lanes: bool,
    project: Option<&str>,
) -> Result<()> {
    let mut fc = open_descriptor(descriptor)?;
    if let Some(project) = project {
        fc = fc.subset(Field::SampleProject, project);
    }
    if unique_lanes {
        fc = fc.renumber_lanes_to_unique();
    }
    if yaml {
        print!("{}", fc.serialize_to_hierarchical()?);
    } else {
        print!("{}", fc.to_table_string()?);
    }
    Ok(())
}

fn run_collect(
    config: &AppConfig,
    descriptor: &Path,
    root: &Path,
    project: Option<&str>,
) -> Result<()> {
    let fc = open_descriptor(descriptor)?;
    let options = WalkOptions::ignoring(&config.ignore_patterns);
    let collected = fc
        .collect_files(root, project, &options)
        .with_context(|| format!("collecting files under {}", root.display()))?;

    print!("{}", collected.serialize_to_hierarchical()?);
    for (lane, files) in collected.lane_files() {
        for file in files.iter() {
            println!("{}\t{}", format!("lane {}", lane).cyan(), file);
        }
    }
    Ok(())
}

fn run_transfer(config: &AppConfig, args: &TransferArgs) -> Result<()> {
    let engine = DeliveryEngine::new(config.clone());
    let reporter = CliReporter::new();
    let request = DeliveryRequest {
        project: args.project.clone(),
        flowcell: args.flowcell.clone(),
        from_pre_casava: args.from_pre_casava,
        to_pre_casava: args.to_pre_casava,
        transfer_dir: args.transfer_dir.clone(),
    };
    let Some(outcome) = engine.deliver(&request, &reporter)? else {
        return Ok(());
    };

    let mode = if args.move_files {
        TransferMode::Move
    } else if args.sync {
        TransferMode::Sync
    } else {
        TransferMode::Copy
    };
    info!(
        "{} files to {}, {} descriptors to write",
        format!("{}", outcome.plan.transfer_count()).green(),
        mode,
        format!("{}", outcome.tables.len()).green(),
    );

    if !args.dry_run && !args.force {
        let prompt = format!(
            "Going to {} {} files... Are you sure you want to continue?",
            mode,
            outcome.plan.transfer_count()
        );
        if !prompt_confirm(&prompt, Some(false))? {
            return Ok(());
        }
    }

    let transfer = mode.transfer();
    let summary = outcome
        .plan
        .execute(transfer.as_ref(), args.dry_run, &reporter)?;
    if summary.failed > 0 {
        bail!("{} actions failed", summary.failed);
    }
    Ok(())
}

fn run_find_samples(
    config: &AppConfig,
    paths: &[std::path::PathBuf],
    sample: Option<String>,
    only_failed: bool,
) -> Result<()> {
    let roots: Vec<String> = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let query = SampleQuery {
        sample,
        pattern: None,
        only_failed,
    };
    let options = WalkOptions::ignoring(&config.ignore_patterns);
    for root in non_overlapping_directories(roots) {
        for found in find_samples(Path::new(&root), &query, &options)? {
            println!("{}", found.display());
        }
    }
    Ok(())
}

fn run_clean(config: &AppConfig, workdir: &Path, dry_run: bool, force: bool) -> Result<()> {
    let plan = plan_cleanup(workdir, &WalkOptions::ignoring(&config.ignore_patterns))?;
    if plan.is_empty() {
        info!("Nothing to remove in {}", workdir.display());
        return Ok(());
    }
    if !dry_run && !force {
        let prompt = format!(
            "Going to remove {} files and {} directories... Are you sure you want to continue?",
            plan.files.len(),
            plan.dirs.len()
        );
        if !prompt_confirm(&prompt, Some(false))? {
            return Ok(());
        }
    }
    let summary = plan.execute(dry_run);
    info!(
        "{} files and {} directories removed",
        format!("{}", summary.files_removed).red(),
        format!("{}", summary.dirs_removed).red(),
    );
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
