use crate::collab::Classifier;
use crate::error::Error;
use crate::hasher;
use crate::migrator::StagedMigrator;
use crate::model::{Category, VideoRecord};
use crate::progress::ProgressReporter;
use crate::storage::HashRegistries;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why a file was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCategory,
    AlreadyKnown,
    Unclassified,
    Cancelled,
}

#[derive(Debug)]
pub enum FileOutcome {
    Accepted(VideoRecord),
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: Error },
}

/// Read-only collaborators shared by every worker.
pub struct ScanContext<'a> {
    pub classifier: &'a dyn Classifier,
    pub registries: &'a HashRegistries,
    pub migrator: &'a StagedMigrator,
    pub categories: &'a [String],
    /// Re-ingest files whose fingerprint is already registered.
    pub force: bool,
}

/// Fingerprints, classifies and stages a batch of files.
///
/// Each file is an independent unit: it reads only its own path and the
/// shared read-only context and hands back an owned outcome. Batches of at
/// least `min_parallel` files run on a dedicated thread pool sized to the
/// available cores; smaller ones run inline.
pub struct BatchScanner {
    min_parallel: usize,
    cancel: Arc<AtomicBool>,
}

impl BatchScanner {
    pub fn new(min_parallel: usize, cancel: Arc<AtomicBool>) -> Self {
        Self {
            min_parallel,
            cancel,
        }
    }

    pub fn run(
        &self,
        files: &[PathBuf],
        ctx: &ScanContext<'_>,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<FileOutcome>, Error> {
        let done = AtomicUsize::new(0);
        let unit = |path: &PathBuf| {
            if self.cancel.load(Ordering::Relaxed) {
                return FileOutcome::Skipped {
                    path: path.clone(),
                    reason: SkipReason::Cancelled,
                };
            }
            let outcome = process_file(path, ctx);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_scan_progress(n, &path.to_string_lossy());
            outcome
        };

        let outcomes: Vec<FileOutcome> = if files.len() >= self.min_parallel {
            let threads = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            debug!("Scanning {} files on {} threads", files.len(), threads);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?;
            pool.install(|| files.par_iter().map(unit).collect())
        } else {
            files.iter().map(unit).collect()
        };

        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        Ok(outcomes)
    }
}

/// The per-file unit of work.
pub fn process_file(path: &Path, ctx: &ScanContext<'_>) -> FileOutcome {
    try_process_file(path, ctx).unwrap_or_else(|error| {
        error!("Error processing {}: {}", path.display(), error);
        FileOutcome::Failed {
            path: path.to_path_buf(),
            error,
        }
    })
}

fn skipped(path: &Path, reason: SkipReason) -> FileOutcome {
    debug!("Skipping {} ({:?})", path.display(), reason);
    FileOutcome::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

fn try_process_file(path: &Path, ctx: &ScanContext<'_>) -> Result<FileOutcome, Error> {
    let category = match Category::detect(path, ctx.categories) {
        Some(category) => category,
        None => return Ok(skipped(path, SkipReason::NoCategory)),
    };

    let mut record = VideoRecord::new(path, category);
    record.size = fs::metadata(path).map_err(|e| Error::access(path, e))?.len();

    record.fingerprint = match hasher::fingerprint(path) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!("{}; continuing without deduplication", e);
            None
        }
    };

    if !ctx.force {
        if let (Some(hash), Some(registry)) = (
            record.fingerprint.as_deref(),
            ctx.registries.for_category(&record.category),
        ) {
            match registry.exists(hash) {
                Ok(true) => return Ok(skipped(path, SkipReason::AlreadyKnown)),
                Ok(false) => {}
                Err(e) => warn!("Hash registry lookup failed for {}: {}", path.display(), e),
            }
        }
    }

    let classification = match ctx.classifier.classify(path, &record.category)? {
        Some(classification) => classification,
        None => return Ok(skipped(path, SkipReason::Unclassified)),
    };
    record.apply(classification);

    ctx.migrator.stage_in(&mut record)?;
    Ok(FileOutcome::Accepted(record))
}
