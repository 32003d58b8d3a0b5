use super::resolver::PlacementResolver;
use crate::model::VideoRecord;
use rapidfuzz::distance::indel;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

lazy_static::lazy_static! {
    static ref TITLE_YEAR: Regex = Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap();
}

/// Storage changes made earlier in the same run. A dry run never writes
/// them to disk, so the detector lays them over what it walks.
#[derive(Debug, Default, Clone)]
pub struct RunOverlay {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Looks for a file already in storage that is probably the same work as
/// an incoming film, by fuzzy title and release year.
pub struct DuplicateDetector {
    threshold: f64,
    year_tolerance: i32,
    max_depth: usize,
}

impl DuplicateDetector {
    pub fn new(threshold: f64, year_tolerance: i32, max_depth: usize) -> Self {
        Self {
            threshold,
            year_tolerance,
            max_depth,
        }
    }

    /// Searches every genre root of `record` under `storage_dir` and returns
    /// the best match of the first root that has one. Files stored earlier
    /// in the run count wherever they sit under the genre root.
    pub fn find_similar(
        &self,
        record: &VideoRecord,
        storage_dir: &Path,
        resolver: &PlacementResolver,
        overlay: &RunOverlay,
    ) -> Option<PathBuf> {
        if !record.category.is_film_like() {
            return None;
        }

        let folder = storage_dir.join("Films");
        for genre in record.genres.iter().filter(|g| !g.is_empty()) {
            let root = folder.join(genre);
            let mut candidates: Vec<PathBuf> = overlay
                .added
                .iter()
                .filter(|p| p.starts_with(&root))
                .cloned()
                .collect();
            if root.exists() {
                let subfolder = resolver.resolve(record, &root);
                if subfolder.exists() {
                    candidates.extend(self.files_under(&subfolder));
                }
            }
            candidates.retain(|p| !overlay.removed.contains(p));
            candidates.sort();
            candidates.dedup();

            if let Some(found) = self.best_match(record, candidates) {
                debug!(
                    "Similar file for {}: {}",
                    record.original.display(),
                    found.display()
                );
                return Some(found);
            }
        }
        None
    }

    /// Walks `folder` for `Title (Year)` files.
    pub fn find_in_folder(&self, record: &VideoRecord, folder: &Path) -> Option<PathBuf> {
        if !folder.exists() {
            return None;
        }
        self.best_match(record, self.files_under(folder))
    }

    /// A candidate replaces the current best only with a strictly higher
    /// score, so ties keep the first one in `files`.
    fn best_match(&self, record: &VideoRecord, files: Vec<PathBuf>) -> Option<PathBuf> {
        let wanted = record.title_fr.to_lowercase();
        if wanted.is_empty() || record.year == 0 {
            return None;
        }

        let mut best: Option<PathBuf> = None;
        let mut highest = 0.0_f64;

        for file in files {
            let (title, year) = match file
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(extract_title_year)
            {
                Some(found) => found,
                None => continue,
            };

            let score = similarity(&wanted, &title);
            if score <= self.threshold || score <= highest {
                continue;
            }
            if (record.year - year).abs() > self.year_tolerance {
                continue;
            }
            highest = score;
            best = Some(file);
        }
        best
    }

    fn files_under(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut stack = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            if depth > self.max_depth {
                warn!("Duplicate search depth limit reached at {}", dir.display());
                continue;
            }
            let mut entries: Vec<PathBuf> = match fs::read_dir(&dir) {
                Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
                Err(e) => {
                    warn!("Cannot read {}: {}", dir.display(), e);
                    continue;
                }
            };
            entries.sort();
            // reversed so the stack pops subdirectories in name order
            for path in entries.into_iter().rev() {
                if path.is_dir() {
                    if !path.is_symlink() {
                        stack.push((path, depth + 1));
                    }
                } else if path.is_file() {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }
}

/// Parses `Title (YYYY)...` into a lowercased title and the year.
pub fn extract_title_year(file_name: &str) -> Option<(String, i32)> {
    let caps = TITLE_YEAR.captures(file_name)?;
    let title = caps.get(1)?.as_str().trim().to_lowercase();
    let year = caps.get(2)?.as_str().parse().ok()?;
    if title.is_empty() {
        return None;
    }
    Some((title, year))
}

/// Normalized Indel similarity on a 0-100 scale.
pub fn similarity(a: &str, b: &str) -> f64 {
    indel::normalized_similarity(a.chars(), b.chars()) * 100.0
}
