//! Structural repairs run before and after placement.

use crate::error::Error;
use crate::fs_ops::FileOps;
use crate::migrator::season::is_season_dir;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const SERIES_ROOT: &str = "Séries";

pub struct CleanupSweeper {
    ops: FileOps,
    max_depth: usize,
}

impl CleanupSweeper {
    pub fn new(ops: FileOps, max_depth: usize) -> Self {
        Self { ops, max_depth }
    }

    /// Pulls files out of second-level folders inside each show directory
    /// (`Séries/<show>/<sub>/file` becomes `Séries/<show>/file`) and removes
    /// the emptied folders. A file whose name is already taken one level up
    /// stays put. Returns the number of folders flattened.
    pub fn flatten_series(&self, search_dir: &Path) -> Result<usize, Error> {
        let mut flattened = 0;

        for series_root in self.find_dirs_named(search_dir, SERIES_ROOT) {
            for show in list_dirs(&series_root) {
                for sub in list_dirs(&show) {
                    for file in list_non_dirs(&sub) {
                        let name = match file.file_name() {
                            Some(name) => name.to_owned(),
                            None => continue,
                        };
                        let target = show.join(&name);
                        if target.exists() || target.is_symlink() {
                            warn!("Not flattening {}: {} exists", file.display(), target.display());
                            continue;
                        }
                        self.ops.rename(&file, &target)?;
                    }
                    match self.ops.remove_dir(&sub) {
                        Ok(()) => {
                            debug!("Flattened {}", sub.display());
                            flattened += 1;
                        }
                        Err(e) => warn!("Cannot remove {}: {}", sub.display(), e),
                    }
                }
            }
        }

        if flattened > 0 {
            info!("Flattened {} series folders", flattened);
        }
        Ok(flattened)
    }

    /// Merges `Saison NN/Saison NN` nesting: files of the inner season move
    /// to the outer one and the inner folder is removed. Every directory is
    /// visited whether or not it matched.
    pub fn dedupe_seasons(&self, root: &Path) -> Result<usize, Error> {
        let mut merged = 0;
        let mut stack = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            if depth > self.max_depth {
                warn!("Season cleanup depth limit reached at {}", dir.display());
                continue;
            }

            if dir_name_is_season(&dir) {
                for inner in list_dirs(&dir).into_iter().filter(|d| dir_name_is_season(d)) {
                    for file in list_non_dirs(&inner) {
                        let name = match file.file_name() {
                            Some(name) => name.to_owned(),
                            None => continue,
                        };
                        let target = dir.join(&name);
                        if target.exists() || target.is_symlink() {
                            warn!("Not merging {}: {} exists", file.display(), target.display());
                            continue;
                        }
                        self.ops.rename(&file, &target)?;
                    }
                    match self.ops.remove_dir(&inner) {
                        Ok(()) => {
                            info!("Merged nested season {}", inner.display());
                            merged += 1;
                        }
                        Err(e) => warn!("Cannot remove {}: {}", inner.display(), e),
                    }
                }
            }

            for child in list_dirs(&dir) {
                stack.push((child, depth + 1));
            }
        }
        Ok(merged)
    }

    /// Deletes any directory whose last three path segments repeat a name,
    /// the signature of a copy or link loop. Destructive.
    pub fn sweep_recursive(&self, root: &Path) -> Result<usize, Error> {
        let mut removed = 0;
        let mut stack = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            if depth > self.max_depth {
                warn!(
                    "{}",
                    Error::StructuralAnomaly { path: dir.clone() }
                );
                continue;
            }

            for child in list_dirs(&dir) {
                if has_repeated_tail(&child) {
                    warn!(
                        "{}; removing the whole subtree",
                        Error::StructuralAnomaly { path: child.clone() }
                    );
                    self.ops.clear_dir(&child)?;
                    removed += 1;
                } else {
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(removed)
    }

    /// Removes symlinks whose target no longer resolves.
    pub fn repair_symlinks(&self, root: &Path) -> Result<usize, Error> {
        let mut removed = 0;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path_is_symlink());

        for entry in walker {
            if let Err(e) = fs::canonicalize(entry.path()) {
                debug!("Broken link {}: {}", entry.path().display(), e);
                self.ops.remove_file(entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Removed {} broken links under {}", removed, root.display());
        }
        Ok(removed)
    }

    fn find_dirs_named(&self, root: &Path, name: &str) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir() && entry.file_name() == name)
            .map(|entry| entry.into_path())
            .collect()
    }
}

fn dir_name_is_season(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(is_season_dir)
        .unwrap_or(false)
}

fn has_repeated_tail(path: &Path) -> bool {
    let parts: Vec<_> = path.components().map(|c| c.as_os_str()).collect();
    if parts.len() <= 3 {
        return false;
    }
    let tail: HashSet<_> = parts[parts.len() - 3..].iter().collect();
    tail.len() < 3
}

/// Real subdirectories, sorted; symlinked directories are not followed.
fn list_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    dirs.sort();
    dirs
}

/// Files and symlinks directly inside `dir`.
fn list_non_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    files.sort();
    files
}
