//! Seams to the collaborators that live outside the engine: metadata
//! classification and the keep-old/keep-new decision on near duplicates.

use crate::error::Error;
use crate::model::{Category, Classification, ConflictDecision, VideoRecord};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Supplies title, year, genres and naming for an ingested file.
///
/// `Ok(None)` leaves the file untouched for this run.
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &Path, category: &Category)
        -> Result<Option<Classification>, Error>;
}

/// Decides what happens when an incoming film looks like one already stored.
pub trait ConflictResolver {
    fn decide(&self, incoming: &VideoRecord, existing: &Path) -> ConflictDecision;
}

/// Non-interactive default: never relocate anything.
pub struct KeepBothResolver;

impl ConflictResolver for KeepBothResolver {
    fn decide(&self, _incoming: &VideoRecord, _existing: &Path) -> ConflictDecision {
        ConflictDecision::KeepBoth
    }
}

/// Always answers the same way.
pub struct FixedResolver(pub ConflictDecision);

impl ConflictResolver for FixedResolver {
    fn decide(&self, _incoming: &VideoRecord, _existing: &Path) -> ConflictDecision {
        self.0
    }
}

/// Classifications read ahead of time from a JSON object keyed by file name.
#[derive(Debug, Default)]
pub struct ManifestClassifier {
    entries: HashMap<String, Classification>,
}

impl ManifestClassifier {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|e| Error::access(path, e))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let entries: HashMap<String, Classification> = serde_json::from_str(raw)
            .map_err(|e| Error::Classification(format!("invalid manifest: {}", e)))?;
        debug!("Manifest holds {} classifications", entries.len());
        Ok(Self { entries })
    }

    pub fn insert(&mut self, file_name: impl Into<String>, classification: Classification) {
        self.entries.insert(file_name.into(), classification);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Classifier for ManifestClassifier {
    fn classify(
        &self,
        path: &Path,
        _category: &Category,
    ) -> Result<Option<Classification>, Error> {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return Ok(None),
        };
        Ok(self.entries.get(name.as_ref()).cloned())
    }
}
