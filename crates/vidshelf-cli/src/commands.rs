use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vidshelf")]
#[command(about = "Files finished downloads into a bucketed video library", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the search directory and place new files into storage
    Run(RunArgs),
    /// Pull episodes out of nested folders inside each show directory
    Flatten {
        /// Only log what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Merge nested seasons, drop recursive folders and broken links under a directory
    Cleanup {
        dir: PathBuf,
        /// Only log what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect the fingerprint registry of a category
    Registry {
        /// Category directory name, e.g. Films or Séries
        category: String,
        #[command(subcommand)]
        action: RegistryAction,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Compute every placement without touching the disk
    #[arg(long)]
    pub dry_run: bool,
    /// Re-ingest files whose fingerprint is already registered
    #[arg(long)]
    pub force: bool,
    /// Ignore the time window and consider every file
    #[arg(long, conflicts_with = "days")]
    pub full_rescan: bool,
    /// Only consider files changed in the last N days
    #[arg(long)]
    pub days: Option<f64>,
    /// JSON classifications keyed by file name
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    /// Ask what to do when a film looks like one already stored
    #[arg(long)]
    pub interactive: bool,
}

#[derive(Debug, Subcommand)]
pub enum RegistryAction {
    /// Number of known fingerprints
    Count,
    /// Show the stored file for a fingerprint
    Lookup { hash: String },
    /// Forget a fingerprint
    Remove { hash: String },
}
