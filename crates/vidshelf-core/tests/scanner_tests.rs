use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use vidshelf_core::fs_ops::FileOps;
use vidshelf_core::hasher;
use vidshelf_core::migrator::{StagedMigrator, StagingDirs};
use vidshelf_core::scanner::{BatchScanner, FileOutcome, ScanContext};
use vidshelf_core::storage::{HashRegistries, HashRegistry};
use vidshelf_core::{AppConfig, Category, Classification, ManifestClassifier, ProgressReporter};

#[derive(Default)]
struct CountingReporter {
    seen: AtomicUsize,
}

impl ProgressReporter for CountingReporter {
    fn on_scan_progress(&self, _files_done: usize, _current_path: &str) {
        self.seen.fetch_add(1, Ordering::Relaxed);
    }
}

/// Twelve films (even ones classified, one of them already registered) and
/// one file outside any category folder.
fn create_download_tree(base: &Path) -> (Vec<PathBuf>, ManifestClassifier) {
    let films = base.join("search/Films");
    let misc = base.join("search/misc");
    fs::create_dir_all(&films).unwrap();
    fs::create_dir_all(&misc).unwrap();

    let mut manifest = ManifestClassifier::default();
    let mut files = Vec::new();
    for i in 0..12 {
        let name = format!("film_{:02}.mkv", i);
        let path = films.join(&name);
        fs::write(&path, format!("content {}", i)).unwrap();
        if i % 2 == 0 {
            manifest.insert(
                name,
                Classification {
                    title_fr: format!("Film {}", i),
                    year: 2000 + i,
                    genre: "Drame".to_string(),
                    ..Default::default()
                },
            );
        }
        files.push(path);
    }
    let stray = misc.join("stray.mkv");
    fs::write(&stray, "stray").unwrap();
    files.push(stray);
    (files, manifest)
}

fn summarize(outcomes: &[FileOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            FileOutcome::Accepted(record) => format!(
                "accepted {} -> {}",
                record.original.display(),
                record.staged_path.as_deref().unwrap_or(Path::new("")).display()
            ),
            FileOutcome::Skipped { path, reason } => {
                format!("skipped {} {:?}", path.display(), reason)
            }
            FileOutcome::Failed { path, error } => format!("failed {} {}", path.display(), error),
        })
        .collect()
}

fn scan(
    min_parallel: usize,
    base: &Path,
    files: &[PathBuf],
    manifest: &ManifestClassifier,
) -> (Vec<String>, usize) {
    let config = AppConfig::default();
    let mut registries = HashRegistries::default();
    let registry = HashRegistry::open_in_memory().unwrap();
    let known = hasher::fingerprint(&files[4]).unwrap();
    registry.add(&known, Path::new("/s/known.mkv"), "known.mkv", 9).unwrap();
    registries.insert(&Category::Films, registry);

    let migrator = StagedMigrator::new(
        FileOps::new(true),
        StagingDirs::for_output(&base.join("out")),
        base.join("storage"),
    );
    let ctx = ScanContext {
        classifier: manifest,
        registries: &registries,
        migrator: &migrator,
        categories: &config.categories,
        force: false,
    };
    let reporter = CountingReporter::default();
    let outcomes = BatchScanner::new(min_parallel, Arc::new(AtomicBool::new(false)))
        .run(files, &ctx, &reporter)
        .unwrap();
    (summarize(&outcomes), reporter.seen.load(Ordering::Relaxed))
}

#[test]
fn test_parallel_scan_matches_sequential_scan() {
    let tmp = tempdir().unwrap();
    let (files, manifest) = create_download_tree(tmp.path());

    let (parallel, parallel_seen) = scan(1, tmp.path(), &files, &manifest);
    let (sequential, sequential_seen) = scan(usize::MAX, tmp.path(), &files, &manifest);

    assert_eq!(parallel, sequential);
    assert_eq!(parallel_seen, files.len());
    assert_eq!(sequential_seen, files.len());

    let count = |prefix: &str| parallel.iter().filter(|s| s.contains(prefix)).count();
    assert_eq!(count("accepted"), 5);
    assert_eq!(count("AlreadyKnown"), 1);
    assert_eq!(count("Unclassified"), 6);
    assert_eq!(count("NoCategory"), 1);
    assert_eq!(count("failed"), 0);
}

#[test]
fn test_cancelled_scan_reports_cancellation() {
    let tmp = tempdir().unwrap();
    let (files, manifest) = create_download_tree(tmp.path());
    let config = AppConfig::default();
    let registries = HashRegistries::default();
    let migrator = StagedMigrator::new(
        FileOps::new(true),
        StagingDirs::for_output(&tmp.path().join("out")),
        tmp.path().join("storage"),
    );
    let ctx = ScanContext {
        classifier: &manifest,
        registries: &registries,
        migrator: &migrator,
        categories: &config.categories,
        force: false,
    };

    let result = BatchScanner::new(1, Arc::new(AtomicBool::new(true))).run(
        &files,
        &ctx,
        &CountingReporter::default(),
    );
    assert!(matches!(result, Err(vidshelf_core::Error::Cancelled)));
}
