use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::text;

/// Top-level content class. The directory names are part of the on-disk
/// layout and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Films,
    Series,
    Animation,
    Docs,
    Other(String),
}

impl Category {
    pub fn from_dir_name(name: &str) -> Self {
        match name {
            "Films" => Category::Films,
            "Séries" => Category::Series,
            "Animation" => Category::Animation,
            "Docs" => Category::Docs,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn dir_name(&self) -> &str {
        match self {
            Category::Films => "Films",
            Category::Series => "Séries",
            Category::Animation => "Animation",
            Category::Docs => "Docs",
            Category::Other(name) => name,
        }
    }

    pub fn is_film_like(&self) -> bool {
        matches!(self, Category::Films | Category::Animation)
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Category::Series)
    }

    pub fn is_not_doc(&self) -> bool {
        matches!(
            self,
            Category::Films | Category::Series | Category::Animation
        )
    }

    /// Name of the hash registry shared by this category.
    pub fn registry_name(&self) -> &str {
        match self {
            Category::Animation => "Films",
            other => other.dir_name(),
        }
    }

    /// Library sub-tree holding this category, relative to the library root.
    /// Films and Animation are bucketed by genre instead.
    pub fn library_subtree(&self) -> PathBuf {
        match self {
            Category::Series => Path::new("Séries").join("Séries TV"),
            other => PathBuf::from(other.dir_name()),
        }
    }

    /// Returns the first category named among the components of `path`.
    pub fn detect(path: &Path, categories: &[String]) -> Option<Self> {
        path.components()
            .filter_map(|c| c.as_os_str().to_str())
            .find(|part| categories.iter().any(|c| c == part))
            .map(Category::from_dir_name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What the classification collaborator knows about a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub title: String,
    pub title_fr: String,
    pub year: i32,
    pub genre: String,
    pub genres: Vec<String>,
    pub season: u32,
    pub episode: u32,
    pub spec: String,
    pub formatted_filename: Option<String>,
}

/// A file travelling through one run of the pipeline.
///
/// Owned by exactly one stage at a time; scanner workers hand it back by
/// value and the migrator phases take it by `&mut`.
#[derive(Debug, Clone)]
pub struct VideoRecord {
    pub original: PathBuf,
    pub category: Category,
    pub size: u64,
    pub title: String,
    pub title_fr: String,
    pub year: i32,
    pub genre: String,
    pub genres: Vec<String>,
    pub season: u32,
    pub episode: u32,
    pub spec: String,
    pub fingerprint: Option<String>,
    pub formatted_filename: String,
    pub staged_path: Option<PathBuf>,
    pub sub_directory: PathBuf,
    pub work_path: Option<PathBuf>,
    pub storage_path: Option<PathBuf>,
}

impl VideoRecord {
    pub fn new(original: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            original: original.into(),
            category,
            size: 0,
            title: String::new(),
            title_fr: String::new(),
            year: 0,
            genre: String::new(),
            genres: Vec::new(),
            season: 0,
            episode: 0,
            spec: String::new(),
            fingerprint: None,
            formatted_filename: String::new(),
            staged_path: None,
            sub_directory: PathBuf::new(),
            work_path: None,
            storage_path: None,
        }
    }

    /// Fills the classification fields. A missing formatted name is built
    /// from the title, year, sequence and spec.
    pub fn apply(&mut self, classification: Classification) {
        self.title = classification.title;
        self.title_fr = classification.title_fr;
        self.year = classification.year;
        self.genre = classification.genre;
        self.genres = classification.genres;
        if self.genres.is_empty() && !self.genre.is_empty() {
            self.genres.push(self.genre.clone());
        }
        self.season = classification.season;
        self.episode = classification.episode;
        self.spec = classification.spec;
        self.formatted_filename = match classification.formatted_filename {
            Some(name) if !name.is_empty() => name,
            _ => text::format_filename(self),
        };
    }

    pub fn file_name(&self) -> String {
        self.original
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> String {
        self.original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }

    /// `S01E05`, or empty when the record is not episodic.
    pub fn sequence(&self) -> String {
        if self.season == 0 && self.episode == 0 {
            return String::new();
        }
        format!("S{:02}E{:02}", self.season, self.episode)
    }

    /// Title used for bucket matching: article removed, accents folded, lowercased.
    pub fn sort_key(&self) -> String {
        text::sort_key(&self.title_fr)
    }

    /// `Title (Year)`, the name of a series leaf directory.
    pub fn show_dir_name(&self) -> String {
        format!("{} ({})", self.title_fr, self.year)
    }
}

/// Outcome of a near-duplicate conflict, decided outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    KeepOld,
    KeepNew,
    KeepBoth,
}

/// Where one file ended up, or would end up in a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub original: PathBuf,
    pub work_path: PathBuf,
    pub storage_path: PathBuf,
}
