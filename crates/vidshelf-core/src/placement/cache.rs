use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolved folders for the lifetime of one run, keyed by
/// (original file, search root).
#[derive(Default)]
pub struct PlacementCache {
    entries: DashMap<(PathBuf, PathBuf), PathBuf>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PlacementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: &Path, root: &Path) -> Option<PathBuf> {
        let key = (original.to_path_buf(), root.to_path_buf());
        match self.entries.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, original: &Path, root: &Path, resolved: PathBuf) {
        self.entries
            .insert((original.to_path_buf(), root.to_path_buf()), resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}
