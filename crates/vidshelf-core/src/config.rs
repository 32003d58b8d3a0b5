use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CATEGORIES: &[&str] = &["Séries", "Films", "Animation", "Docs#1", "Docs"];

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mkv", ".avi", ".wmv", ".mpeg", ".mpg", ".m4v", ".mp4", ".flv", ".ts", ".rm", ".rmvb",
    ".mov", ".mp3", ".flac", ".wav", ".wma", ".cbr", ".cbz", ".pdf", ".epub", ".txt", ".odt",
    ".doc",
];

pub const DEFAULT_EXCLUDED_SEGMENTS: &[&str] = &["ISX", "Applications"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ingestion source holding one directory per category.
    pub search_dir: PathBuf,
    /// Physical storage the files are promoted into.
    pub storage_dir: PathBuf,
    /// Existing symlink library whose bucket layout drives placement.
    pub symlinks_dir: PathBuf,
    /// Where the finished work tree is published.
    pub output_dir: PathBuf,
    pub state_db_path: PathBuf,
    pub categories: Vec<String>,
    pub extensions: Vec<String>,
    pub excluded_segments: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub similarity_threshold: f64,
    pub year_tolerance: i32,
    pub max_depth: usize,
    pub parallel_min_batch: usize,
    pub default_days_back: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_dir: PathBuf::from("/Volumes/Downloads/Ready"),
            storage_dir: PathBuf::from("/Volumes/Storage/Videos"),
            symlinks_dir: PathBuf::from("/Volumes/Symlinks/Videos"),
            output_dir: PathBuf::from("/Volumes/Symlinks/Videos/temp"),
            state_db_path: PathBuf::from("cache.db"),
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            excluded_segments: DEFAULT_EXCLUDED_SEGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            similarity_threshold: 80.0,
            year_tolerance: 1,
            max_depth: 20,
            parallel_min_batch: 10,
            default_days_back: 3.0,
        }
    }
}

impl AppConfig {
    pub fn has_extension(&self, ext: &str) -> bool {
        let wanted = format!(".{}", ext.trim_start_matches('.').to_lowercase());
        self.extensions.iter().any(|e| e.to_lowercase() == wanted)
    }
}

/// Per-invocation switches, as opposed to the persistent [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub full_rescan: bool,
    pub days: Option<f64>,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("VIDSHELF").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_known_categories() {
        let config = AppConfig::default();
        assert_eq!(config.categories.len(), 5);
        assert!(config.categories.contains(&"Séries".to_string()));
        assert_eq!(config.similarity_threshold, 80.0);
        assert_eq!(config.max_depth, 20);
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let config = AppConfig::default();
        assert!(config.has_extension("MKV"));
        assert!(config.has_extension(".mp4"));
        assert!(!config.has_extension("exe"));
    }

    #[test]
    fn test_empty_source_deserializes_to_defaults() {
        let config: AppConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.parallel_min_batch, 10);
        assert_eq!(config.state_db_path, PathBuf::from("cache.db"));
    }
}
