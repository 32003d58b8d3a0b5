mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, RegistryAction, RunArgs};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};
use vidshelf_core::cleanup::CleanupSweeper;
use vidshelf_core::fs_ops::FileOps;
use vidshelf_core::storage::hash_registry::registry_file_name;
use vidshelf_core::storage::HashRegistry;
use vidshelf_core::{
    AppConfig, Category, Classifier, ConflictDecision, ConflictResolver, ManifestClassifier,
    PlacementEngine, RunOptions, VideoRecord,
};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match vidshelf_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Run(run)) => run_placement(&config, &run),
        Some(Commands::Flatten { dry_run }) => run_flatten(&config, dry_run),
        Some(Commands::Cleanup { dir, dry_run }) => run_cleanup(&config, &dir, dry_run),
        Some(Commands::Registry { category, action }) => run_registry(&config, &category, action),
        Some(Commands::PrintConfig) => print_config(&config),
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

fn run_placement(config: &AppConfig, args: &RunArgs) -> Result<()> {
    let classifier: Box<dyn Classifier> = match &args.manifest {
        Some(path) => Box::new(
            ManifestClassifier::from_path(path)
                .with_context(|| format!("Cannot load manifest {}", path.display()))?,
        ),
        None => {
            warn!("No manifest given: every file will be left unclassified");
            Box::new(ManifestClassifier::default())
        }
    };

    let options = RunOptions {
        dry_run: args.dry_run,
        force: args.force,
        full_rescan: args.full_rescan,
        days: args.days,
    };
    let mut engine = PlacementEngine::new(config.clone(), classifier).with_options(options);
    if args.interactive {
        engine = engine.with_conflict_resolver(Box::new(PromptResolver));
    }

    let cancel = engine.cancel_token();
    ctrlc::set_handler(move || {
        if !cancel.swap(true, Ordering::Relaxed) {
            warn!("Interrupted: stopping after the current file");
        }
    })
    .context("Cannot install the interrupt handler")?;

    let reporter = CliReporter::new(args.interactive);
    let report = engine.run(&reporter).context("Placement run failed")?;

    println!();
    if report.dry_run {
        info!("{}", "SIMULATION - nothing was changed".yellow());
        for placement in &report.placements {
            info!(
                "{} -> {}",
                placement.original.display(),
                placement.storage_path.display()
            );
        }
    }
    info!(
        "Scan: {}, Placement: {}",
        format!("{:.2}s", report.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.placement_duration.as_secs_f64()).green(),
    );
    info!(
        "{} scanned, {} placed, {} skipped, {} quarantined, {} failed",
        format!("{}", report.scanned).cyan(),
        format!("{}", report.succeeded).green(),
        format!("{}", report.skipped).cyan(),
        format!("{}", report.quarantined).yellow(),
        format!("{}", report.failed).red(),
    );
    info!(
        "{} series folders flattened, {} seasons merged, {} recursive folders and {} broken links removed",
        report.flattened_dirs,
        report.merged_seasons,
        report.removed_recursive,
        report.removed_broken_links,
    );

    Ok(())
}

fn run_flatten(config: &AppConfig, dry_run: bool) -> Result<()> {
    let sweeper = CleanupSweeper::new(FileOps::new(dry_run), config.max_depth);
    let flattened = sweeper
        .flatten_series(&config.search_dir)
        .with_context(|| format!("Cannot flatten {}", config.search_dir.display()))?;
    info!("{} series folders flattened", format!("{}", flattened).green());
    Ok(())
}

fn run_cleanup(config: &AppConfig, dir: &Path, dry_run: bool) -> Result<()> {
    if !dry_run
        && !prompt_confirm(
            &format!("Remove recursive folders and broken links under {}?", dir.display()),
            Some(false),
        )?
    {
        return Ok(());
    }

    let sweeper = CleanupSweeper::new(FileOps::new(dry_run), config.max_depth);
    let merged = sweeper.dedupe_seasons(dir)?;
    let recursive = sweeper.sweep_recursive(dir)?;
    let links = sweeper.repair_symlinks(dir)?;
    info!(
        "{} seasons merged, {} recursive folders removed, {} broken links removed",
        format!("{}", merged).green(),
        format!("{}", recursive).green(),
        format!("{}", links).green(),
    );
    Ok(())
}

fn run_registry(config: &AppConfig, category: &str, action: RegistryAction) -> Result<()> {
    let category = Category::from_dir_name(category);
    let path = config.storage_dir.join(registry_file_name(&category));
    if !path.exists() {
        anyhow::bail!("No registry for {} at {}", category, path.display());
    }
    let registry = HashRegistry::open(&path)
        .with_context(|| format!("Cannot open registry {}", path.display()))?;

    match action {
        RegistryAction::Count => {
            info!(
                "{} fingerprints known for {}",
                format!("{}", registry.count()?).cyan(),
                category
            );
        }
        RegistryAction::Lookup { hash } => match registry.lookup(&hash)? {
            Some(record) => println!(
                "{}\n  file: {}\n  name: {}\n  size: {}",
                record.hash, record.filepath, record.filename, record.file_size
            ),
            None => println!("{} is not registered", hash),
        },
        RegistryAction::Remove { hash } => {
            if registry.remove(&hash)? {
                info!("Removed {}", hash);
            } else {
                warn!("{} was not registered", hash);
            }
        }
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Cannot render configuration")?;
    println!("{}", rendered);
    Ok(())
}

/// Asks on the terminal whether to keep the incoming film, the stored one,
/// or both.
struct PromptResolver;

impl ConflictResolver for PromptResolver {
    fn decide(&self, incoming: &VideoRecord, existing: &Path) -> ConflictDecision {
        println!();
        println!("{}", "Possible duplicate".yellow().bold());
        println!("  new:    {} ({} bytes)", incoming.original.display(), incoming.size);
        println!("  stored: {}", existing.display());

        match prompt_choice(
            "1) keep new  2) keep stored  3) keep both",
            &["1", "2", "3"],
            "3",
        ) {
            Ok(choice) if choice == "1" => ConflictDecision::KeepNew,
            Ok(choice) if choice == "2" => ConflictDecision::KeepOld,
            Ok(_) => ConflictDecision::KeepBoth,
            Err(e) => {
                warn!("Cannot read answer, keeping both: {}", e);
                ConflictDecision::KeepBoth
            }
        }
    }
}

fn prompt_choice(prompt: &str, choices: &[&str], default: &str) -> io::Result<String> {
    let mut input = String::new();

    loop {
        input.clear();
        print!("{} [{}]: ", prompt, default);
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.to_string());
        }

        let answer = input.trim();
        if answer.is_empty() {
            return Ok(default.to_string());
        }
        if choices.contains(&answer) {
            return Ok(answer.to_string());
        }
    }
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
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
