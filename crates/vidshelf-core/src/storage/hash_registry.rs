use super::models::HashRecord;
use super::sqlite::Database;
use crate::error::Error;
use crate::model::Category;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Per-category set of known fingerprints.
///
/// Writes are insert-or-ignore, so concurrent callers can share one registry
/// without coordinating: the first writer of a hash wins.
pub struct HashRegistry {
    db: Mutex<Database>,
}

impl HashRegistry {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            db: Mutex::new(Database::open(path)?),
        })
    }

    /// Opens an existing registry for lookups only.
    pub fn open_read_only(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            db: Mutex::new(Database::open_read_only(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, Error> {
        self.db
            .lock()
            .map_err(|e| Error::Other(format!("Failed to lock hash registry: {}", e)))
    }

    pub fn exists(&self, hash: &str) -> Result<bool, Error> {
        Ok(self.lock()?.hash_exists(hash)?)
    }

    pub fn add(&self, hash: &str, path: &Path, name: &str, size: u64) -> Result<bool, Error> {
        let record = HashRecord {
            hash: hash.to_string(),
            filepath: path.to_string_lossy().into_owned(),
            filename: name.to_string(),
            file_size: size as i64,
        };
        Ok(self.lock()?.insert_hash(&record)?)
    }

    pub fn remove(&self, hash: &str) -> Result<bool, Error> {
        Ok(self.lock()?.remove_hash(hash)?)
    }

    pub fn lookup(&self, hash: &str) -> Result<Option<HashRecord>, Error> {
        Ok(self.lock()?.get_hash_info(hash)?)
    }

    pub fn count(&self) -> Result<i64, Error> {
        Ok(self.lock()?.count_hashes()?)
    }
}

/// File name of the registry backing `category` inside the storage directory.
pub fn registry_file_name(category: &Category) -> String {
    format!("symlink_video_{}.db", category.registry_name())
}

/// The registries of one run, keyed by registry name.
#[derive(Default)]
pub struct HashRegistries {
    registries: AHashMap<String, HashRegistry>,
}

impl HashRegistries {
    /// Opens one registry per category. A registry that fails to open is
    /// left out and logged; lookups for it then report nothing known.
    /// With `read_only`, missing registry files are not created and existing
    /// ones are never written.
    pub fn open_for(dir: &Path, categories: &[Category], read_only: bool) -> Self {
        let mut registries = AHashMap::new();
        for category in categories {
            let name = category.registry_name().to_string();
            if registries.contains_key(&name) {
                continue;
            }
            let path: PathBuf = dir.join(registry_file_name(category));
            let opened = if read_only {
                if !path.exists() {
                    continue;
                }
                HashRegistry::open_read_only(&path)
            } else {
                HashRegistry::open(&path)
            };
            match opened {
                Ok(registry) => {
                    debug!("Hash registry for {} at {}", name, path.display());
                    registries.insert(name, registry);
                }
                Err(e) => {
                    warn!(
                        "Hash registry {} unavailable, deduplication disabled for {}: {}",
                        path.display(),
                        name,
                        e
                    );
                }
            }
        }
        Self { registries }
    }

    pub fn insert(&mut self, category: &Category, registry: HashRegistry) {
        self.registries
            .insert(category.registry_name().to_string(), registry);
    }

    pub fn for_category(&self, category: &Category) -> Option<&HashRegistry> {
        self.registries.get(category.registry_name())
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
