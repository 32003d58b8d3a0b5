use super::cache::PlacementCache;
use super::range::RangeFolder;
use crate::model::VideoRecord;
use ahash::RandomState;
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Bucket for films whose title could not be resolved.
pub const UNDETECTED_FALLBACK: &str = "non détectés";

/// Bucket for series that matched no range folder.
pub const SERIES_FALLBACK: &str = "#";

/// Finds the deepest alphabetical bucket for a title.
///
/// Starting at a root, each level is scanned in name order. A child named
/// `start-end` matches when the title's first characters fall inside the
/// padded range; any other child matches when the title starts with its
/// name. The first matching child is descended into with the same, full
/// title. Results are memoized per (original file, root) for the run.
pub struct PlacementResolver {
    cache: PlacementCache,
    ranges: DashMap<String, Option<RangeFolder>, RandomState>,
    max_depth: usize,
    walks: AtomicUsize,
}

impl PlacementResolver {
    pub fn new(max_depth: usize) -> Self {
        Self {
            cache: PlacementCache::new(),
            ranges: DashMap::with_hasher(RandomState::new()),
            max_depth,
            walks: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &PlacementCache {
        &self.cache
    }

    /// Number of directory walks actually performed.
    pub fn walk_count(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }

    /// Destination folder for `record` under `root`.
    pub fn resolve(&self, record: &VideoRecord, root: &Path) -> PathBuf {
        if let Some(hit) = self.cache.get(&record.original, root) {
            return hit;
        }

        let resolved = if record.category.is_film_like() && record.title_fr.trim().is_empty() {
            root.join(UNDETECTED_FALLBACK)
        } else {
            let series = record.category.is_series();
            let found = self.find_deepest(&record.sort_key(), root, series);
            if series && found == root {
                root.join(SERIES_FALLBACK)
            } else {
                found
            }
        };

        debug!(
            "Placement for {}: {}",
            record.original.display(),
            resolved.display()
        );
        self.cache.insert(&record.original, root, resolved.clone());
        resolved
    }

    /// Resolves `record` inside the library and returns the folder along
    /// with its path relative to `library_root`.
    pub fn library_destination(
        &self,
        record: &VideoRecord,
        library_root: &Path,
    ) -> (PathBuf, PathBuf) {
        let target = if record.category.is_film_like() {
            library_root.join("Films").join(&record.genre)
        } else {
            library_root.join(record.category.library_subtree())
        };

        let resolved = self.resolve(record, &target);
        let sub_directory = match resolved.strip_prefix(library_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(e) => {
                warn!(
                    "Cannot express {} relative to {}: {}",
                    resolved.display(),
                    library_root.display(),
                    e
                );
                PathBuf::new()
            }
        };
        (resolved, sub_directory)
    }

    /// Uncached descent. Returns `root` itself when nothing matches.
    pub fn find_deepest(&self, title: &str, root: &Path, series: bool) -> PathBuf {
        self.walks.fetch_add(1, Ordering::Relaxed);
        let mut current = root.to_path_buf();
        let mut depth = 0;

        loop {
            if depth >= self.max_depth {
                warn!(
                    "Placement depth limit ({}) reached at {}",
                    self.max_depth,
                    current.display()
                );
                return current;
            }

            let children = match sorted_subdirs(&current) {
                Ok(children) => children,
                Err(e) => {
                    warn!("Cannot read {}: {}", current.display(), e);
                    return current;
                }
            };

            let mut next = None;
            for child in children {
                let name = match child.file_name() {
                    Some(name) => name.to_string_lossy().to_lowercase(),
                    None => continue,
                };
                if !self.matches(&name, title) {
                    continue;
                }
                if series {
                    let leaf = child.join(title);
                    if leaf.is_dir() {
                        return leaf;
                    }
                }
                next = Some(child);
                break;
            }

            match next {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => return current,
            }
        }
    }

    fn matches(&self, folder_name: &str, title: &str) -> bool {
        let range = self
            .ranges
            .entry(folder_name.to_string())
            .or_insert_with(|| RangeFolder::parse(folder_name))
            .value()
            .clone();
        match range {
            Some(range) => range.contains(title),
            None => title.starts_with(folder_name),
        }
    }
}

pub(crate) fn sorted_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use tempfile::tempdir;

    fn film(title: &str) -> VideoRecord {
        let mut record = VideoRecord::new(format!("/dl/Films/{}.mkv", title), Category::Films);
        record.title_fr = title.to_string();
        record.genre = "Drame".to_string();
        record
    }

    #[test]
    fn test_literal_bucket_uses_untruncated_prefix() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("star")).unwrap();
        let resolver = PlacementResolver::new(20);
        assert_eq!(
            resolver.find_deepest("star wars", dir.path(), false),
            dir.path().join("star")
        );
        assert_eq!(resolver.find_deepest("sta", dir.path(), false), dir.path());
    }

    #[test]
    fn test_empty_title_film_goes_to_undetected() {
        let dir = tempdir().unwrap();
        let resolver = PlacementResolver::new(20);
        let record = film("");
        assert_eq!(
            resolver.resolve(&record, dir.path()),
            dir.path().join(UNDETECTED_FALLBACK)
        );
    }

    #[test]
    fn test_depth_cap_stops_descent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a-z/a-z/a-z")).unwrap();
        let resolver = PlacementResolver::new(2);
        assert_eq!(
            resolver.find_deepest("matrix", dir.path(), false),
            dir.path().join("a-z/a-z")
        );
    }

    #[test]
    fn test_missing_root_returns_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("missing");
        let resolver = PlacementResolver::new(20);
        assert_eq!(resolver.find_deepest("matrix", &root, false), root);
    }
}
