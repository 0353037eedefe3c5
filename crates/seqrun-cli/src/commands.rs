use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "seqrun")]
#[command(about = "Flowcell metadata and delivery for sequencing runs", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the samples of a run descriptor
    Runinfo {
        /// run_info.yaml or samplesheet .csv
        descriptor: PathBuf,
        /// Print the hierarchical (YAML) form instead of the table
        #[arg(long)]
        yaml: bool,
        /// Give every sample its own lane
        #[arg(long)]
        unique_lanes: bool,
        /// Only samples of this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Attribute the files under a directory to the samples of a descriptor
    Collect {
        descriptor: PathBuf,
        root: PathBuf,
        #[arg(long)]
        project: Option<String>,
    },
    /// Deliver a project's files into the project directory
    Transfer(TransferArgs),
    /// Find sample configuration files
    FindSamples {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Sample name prefix, or a file listing config paths
        #[arg(long)]
        sample: Option<String>,
        /// Only samples without a project summary
        #[arg(long)]
        only_failed: bool,
    },
    /// Remove intermediate files from a sample directory
    Clean {
        workdir: PathBuf,
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(long)]
        force: bool,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    pub project: String,
    /// Flowcell directory, e.g. 120829_SN0001_0001_AA001AAAXX
    #[arg(short, long)]
    pub flowcell: Option<String>,
    /// Input is organised by lane and barcode index
    #[arg(long)]
    pub from_pre_casava: bool,
    /// Deliver one directory per flowcell instead of one per sample
    #[arg(long)]
    pub to_pre_casava: bool,
    /// Deliver into this directory instead of the project's
    #[arg(long)]
    pub transfer_dir: Option<String>,
    #[arg(long = "move", conflicts_with = "sync")]
    pub move_files: bool,
    /// Only copy files that are missing or changed
    #[arg(long)]
    pub sync: bool,
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Do not ask for confirmation
    #[arg(long)]
    pub force: bool,
}
