use crate::cleanup::CleanupSweeper;
use crate::collab::{Classifier, ConflictResolver, KeepBothResolver};
use crate::config::{AppConfig, RunOptions};
use crate::error::Error;
use crate::fs_ops::FileOps;
use crate::migrator::{StagedMigrator, StagingDirs};
use crate::model::{Category, ConflictDecision, Placement, VideoRecord};
use crate::placement::{DuplicateDetector, PlacementResolver};
use crate::platform;
use crate::progress::ProgressReporter;
use crate::scanner::{self, BatchScanner, FileOutcome, ScanContext, TimeWindow};
use crate::storage::{HashRegistries, WatermarkStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct PlacementEngine {
    config: AppConfig,
    options: RunOptions,
    classifier: Box<dyn Classifier>,
    conflicts: Box<dyn ConflictResolver>,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub quarantined: usize,
    pub placements: Vec<Placement>,
    pub flattened_dirs: usize,
    pub merged_seasons: usize,
    pub removed_recursive: usize,
    pub removed_broken_links: usize,
    pub scan_duration: Duration,
    pub placement_duration: Duration,
}

enum PlaceOutcome {
    Placed(Placement),
    Quarantined,
    Vanished,
}

impl PlacementEngine {
    pub fn new(config: AppConfig, classifier: Box<dyn Classifier>) -> Self {
        Self {
            config,
            options: RunOptions::default(),
            classifier,
            conflicts: Box::new(KeepBothResolver),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_conflict_resolver(mut self, resolver: Box<dyn ConflictResolver>) -> Self {
        self.conflicts = resolver;
        self
    }

    /// Setting the returned flag stops enumeration and dispatch; files
    /// already promoted stay where they are.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the full placement pipeline:
    /// 1. Prepare staging directories and flatten legacy series nesting
    /// 2. Scan, time-filter, fingerprint, classify and stage new files
    /// 3. Per file: duplicate check, resolve, materialize, promote
    /// 4. Publish the work tree and repair the output structure
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let config = &self.config;
        let ops = FileOps::new(self.options.dry_run);
        let mut report = RunReport {
            dry_run: ops.is_dry_run(),
            ..Default::default()
        };

        let dirs = StagingDirs::for_output(&config.output_dir);
        dirs.prepare(&ops)?;
        let migrator = StagedMigrator::new(ops, dirs.clone(), &config.storage_dir);
        let sweeper = CleanupSweeper::new(ops, config.max_depth);

        // Phase 1: Pre-pass
        reporter.on_cleanup_start("flatten");
        report.flattened_dirs = sweeper
            .flatten_series(&config.search_dir)
            .unwrap_or_else(|e| {
                warn!("Series flattening failed: {}", e);
                0
            });
        reporter.on_cleanup_complete("flatten", report.flattened_dirs);

        // Phase 2: Scan
        info!("Scanning {}...", config.search_dir.display());
        let scan_start = Instant::now();
        let discovered = scanner::discover_categories(&config.search_dir, &config.categories);
        let categories: Vec<_> = discovered.iter().map(|(c, _)| c.clone()).collect();
        let roots: Vec<PathBuf> = discovered.into_iter().map(|(_, dir)| dir).collect();

        let registries = self.open_registries(&categories);
        let state = self.open_watermark();
        let window = TimeWindow::resolve(
            &self.options,
            config,
            state.as_ref(),
            platform::now_secs(),
        );

        let files: Vec<PathBuf> = scanner::enumerate_files(&roots, config, &self.cancel)?
            .into_iter()
            .filter(|path| window.admits(path))
            .collect();
        report.scanned = files.len();
        reporter.on_scan_start(files.len());

        let ctx = ScanContext {
            classifier: self.classifier.as_ref(),
            registries: &registries,
            migrator: &migrator,
            categories: &config.categories,
            force: self.options.force,
        };
        let outcomes = BatchScanner::new(config.parallel_min_batch, self.cancel_token())
            .run(&files, &ctx, reporter)?;

        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Accepted(record) => records.push(record),
                FileOutcome::Skipped { .. } => report.skipped += 1,
                FileOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(records.len(), report.scan_duration.as_secs_f64());

        if let Err(e) = migrator.snapshot_staging() {
            warn!("Cannot snapshot staged links: {}", e);
        }

        // Phase 3: Place
        let place_start = Instant::now();
        let resolver = PlacementResolver::new(config.max_depth);
        let detector = DuplicateDetector::new(
            config.similarity_threshold,
            config.year_tolerance,
            config.max_depth,
        );
        reporter.on_place_start(records.len());

        for (i, mut record) in records.into_iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                warn!("Run cancelled after {} placements", report.succeeded);
                return Err(Error::Cancelled);
            }
            match self.place(&mut record, &migrator, &resolver, &detector, &registries) {
                Ok(PlaceOutcome::Placed(placement)) => {
                    report.succeeded += 1;
                    report.placements.push(placement);
                }
                Ok(PlaceOutcome::Quarantined) => report.quarantined += 1,
                Ok(PlaceOutcome::Vanished) => report.skipped += 1,
                Err(e) => {
                    error!("Error placing {}: {}", record.original.display(), e);
                    report.failed += 1;
                }
            }
            reporter.on_place_progress(i + 1, &record.original.to_string_lossy());
        }
        report.placement_duration = place_start.elapsed();
        reporter.on_place_complete(
            report.succeeded,
            report.failed,
            report.placement_duration.as_secs_f64(),
        );
        debug!(
            "Placement cache: {} hits, {} misses",
            resolver.cache().hits(),
            resolver.cache().misses()
        );

        // Phase 4: Publish and repair
        reporter.on_cleanup_start("seasons");
        report.merged_seasons = sweeper.dedupe_seasons(&dirs.work).unwrap_or_else(|e| {
            warn!("Season cleanup failed: {}", e);
            0
        });
        reporter.on_cleanup_complete("seasons", report.merged_seasons);

        if let Err(e) = migrator.publish(&config.output_dir) {
            error!("Cannot publish {}: {}", dirs.work.display(), e);
        }

        reporter.on_cleanup_start("recursive");
        report.removed_recursive = sweeper
            .sweep_recursive(&config.output_dir)
            .unwrap_or_else(|e| {
                warn!("Recursive sweep failed: {}", e);
                0
            });
        reporter.on_cleanup_complete("recursive", report.removed_recursive);

        reporter.on_cleanup_start("links");
        report.removed_broken_links = sweeper
            .repair_symlinks(&config.output_dir)
            .unwrap_or_else(|e| {
                warn!("Symlink repair failed: {}", e);
                0
            });
        reporter.on_cleanup_complete("links", report.removed_broken_links);

        Ok(report)
    }

    fn place(
        &self,
        record: &mut VideoRecord,
        migrator: &StagedMigrator,
        resolver: &PlacementResolver,
        detector: &DuplicateDetector,
        registries: &HashRegistries,
    ) -> Result<PlaceOutcome, Error> {
        let overlay = migrator.overlay();
        if let Some(existing) =
            detector.find_similar(record, &self.config.storage_dir, resolver, &overlay)
        {
            match self.conflicts.decide(record, &existing) {
                ConflictDecision::KeepOld => {
                    migrator.quarantine_new(record)?;
                    return Ok(PlaceOutcome::Quarantined);
                }
                ConflictDecision::KeepNew => {
                    migrator.quarantine_existing(&existing)?;
                }
                ConflictDecision::KeepBoth => {}
            }
        }

        let (_, sub_directory) = resolver.library_destination(record, &self.config.symlinks_dir);
        record.sub_directory = sub_directory;

        migrator.materialize(record)?;

        let registry = if self.options.dry_run || self.options.force {
            None
        } else {
            registries.for_category(&record.category)
        };
        match migrator.promote(record, registry)? {
            Some(storage_path) => Ok(PlaceOutcome::Placed(Placement {
                original: record.original.clone(),
                work_path: record.work_path.clone().unwrap_or_default(),
                storage_path,
            })),
            None => Ok(PlaceOutcome::Vanished),
        }
    }

    /// In a dry run only registries that already exist are opened, read-only.
    fn open_registries(&self, categories: &[Category]) -> HashRegistries {
        HashRegistries::open_for(&self.config.storage_dir, categories, self.options.dry_run)
    }

    fn open_watermark(&self) -> Option<WatermarkStore> {
        let path = &self.config.state_db_path;
        if self.options.dry_run && !path.exists() {
            return None;
        }
        let opened = if self.options.dry_run {
            WatermarkStore::open_read_only(path)
        } else {
            WatermarkStore::open(path)
        };
        match opened {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(
                    "Watermark store {} unavailable, time filtering falls back to defaults: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}
