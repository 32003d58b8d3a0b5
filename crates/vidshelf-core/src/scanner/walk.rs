use crate::config::AppConfig;
use crate::error::Error;
use crate::model::Category;
use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// Configured categories that exist as directories directly under `search_dir`.
pub fn discover_categories(search_dir: &Path, categories: &[String]) -> Vec<(Category, PathBuf)> {
    categories
        .iter()
        .map(|name| (Category::from_dir_name(name), search_dir.join(name)))
        .filter(|(_, dir)| dir.is_dir())
        .collect()
}

/// Collects candidate media files under the category roots.
///
/// Keeps files with a known extension, drops anything below an excluded
/// path segment or matching an ignore glob. Unreadable directories are
/// logged and skipped.
pub fn enumerate_files(
    roots: &[PathBuf],
    config: &AppConfig,
    cancel: &AtomicBool,
) -> Result<Vec<PathBuf>, Error> {
    let ignore_patterns: Vec<Pattern> = config
        .ignore_patterns
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let mut files = Vec::new();
    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(config.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !is_excluded(entry.path(), &config.excluded_segments)
                    && !ignore_patterns.iter().any(|p| p.matches_path(entry.path()))
            });

        for entry in walker {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    match err.io_error().map(|e| e.kind()) {
                        Some(io::ErrorKind::PermissionDenied) => {
                            error!("Access denied reading {}: {}", path.display(), err)
                        }
                        _ => warn!("Skipping {}: {}", path.display(), err),
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let known = entry
                .path()
                .extension()
                .map(|ext| config.has_extension(&ext.to_string_lossy()))
                .unwrap_or(false);
            if known {
                files.push(entry.into_path());
            }
        }
    }

    debug!("{} candidate files", files.len());
    Ok(files)
}

fn is_excluded(path: &Path, segments: &[String]) -> bool {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|part| segments.iter().any(|s| s == part))
}
