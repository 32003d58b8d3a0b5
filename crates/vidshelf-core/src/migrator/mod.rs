//! Three-phase move of an ingested file into permanent storage:
//!
//! 1. stage-in: symlink the download into a per-category `tmp` tree
//! 2. materialize: rename that link to its final name under `work`
//! 3. promote: move the real file into storage and repoint the link
//!
//! Every phase works the same in dry-run mode; only [`FileOps`] decides
//! whether the disk is touched. Paths handed out during a run are claimed
//! in memory, so a dry run picks the same collision suffixes a real run
//! finds on disk.

pub mod season;

use crate::error::Error;
use crate::fs_ops::FileOps;
use crate::model::VideoRecord;
use crate::placement::RunOverlay;
use crate::storage::HashRegistry;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory holding quarantined files inside storage.
pub const STORAGE_WAITING: &str = "waiting";

/// Per-run staging directories, all siblings of the output directory.
#[derive(Debug, Clone)]
pub struct StagingDirs {
    pub work: PathBuf,
    pub tmp: PathBuf,
    pub original: PathBuf,
    pub waiting: PathBuf,
}

impl StagingDirs {
    pub fn for_output(output_dir: &Path) -> Self {
        let base = output_dir.parent().unwrap_or(output_dir);
        Self {
            work: base.join("work"),
            tmp: base.join("tmp"),
            original: base.join("original"),
            waiting: base.join("_a_virer"),
        }
    }

    /// Clears `work`, `tmp` and `original` and makes sure the waiting folder exists.
    pub fn prepare(&self, ops: &FileOps) -> Result<(), Error> {
        for dir in [&self.work, &self.tmp, &self.original] {
            ops.clear_dir(dir)?;
        }
        ops.create_dir_all(&self.waiting)
    }
}

/// Result of checking a promote destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Nothing there yet, or a free suffixed name.
    Free(PathBuf),
    /// Same-size file already present; the source is redundant.
    AlreadyPresent(PathBuf),
}

impl Destination {
    pub fn path(&self) -> &Path {
        match self {
            Destination::Free(p) | Destination::AlreadyPresent(p) => p,
        }
    }
}

pub struct StagedMigrator {
    ops: FileOps,
    dirs: StagingDirs,
    storage_dir: PathBuf,
    /// Staged link -> the download it points at.
    staged: DashMap<PathBuf, PathBuf>,
    /// Work-tree links handed out this run.
    work_claims: DashSet<PathBuf>,
    /// Storage paths filled this run, with the size of what landed there.
    storage_claims: DashMap<PathBuf, u64>,
    /// Stored files moved aside this run.
    vacated: DashSet<PathBuf>,
}

impl StagedMigrator {
    pub fn new(ops: FileOps, dirs: StagingDirs, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            ops,
            dirs,
            storage_dir: storage_dir.into(),
            staged: DashMap::new(),
            work_claims: DashSet::new(),
            storage_claims: DashMap::new(),
            vacated: DashSet::new(),
        }
    }

    pub fn dirs(&self) -> &StagingDirs {
        &self.dirs
    }

    pub fn ops(&self) -> &FileOps {
        &self.ops
    }

    /// Links the download into `tmp/<category>/...`. The original file is
    /// never touched and repeated calls replace the same link. Two downloads
    /// sharing a file name get distinct links.
    pub fn stage_in(&self, record: &mut VideoRecord) -> Result<PathBuf, Error> {
        let category = &record.category;
        let dir = match category.dir_name() {
            "Films" => self.dirs.tmp.join("Films"),
            "Animation" => self.dirs.tmp.join("Films").join("Animation"),
            name => {
                let beneath = path_after_category(&record.original, name)
                    .and_then(|rel| rel.parent().map(Path::to_path_buf))
                    .unwrap_or_default();
                self.dirs.tmp.join(name).join(beneath)
            }
        };

        let staged = self.claim_staged(dir.join(record.file_name()), &record.original);
        self.ops.create_dir_all(&dir)?;
        self.ops.symlink(&record.original, &staged)?;
        record.staged_path = Some(staged.clone());
        Ok(staged)
    }

    /// Renames the staged link to `work/<sub_directory>/<final name>`,
    /// adding the show and season folders for episodes. A name already
    /// handed out this run gets a `_N` suffix instead of being replaced.
    pub fn materialize(&self, record: &mut VideoRecord) -> Result<PathBuf, Error> {
        let staged = record
            .staged_path
            .clone()
            .ok_or_else(|| Error::Other(format!("{} was never staged", record.original.display())))?;

        let mut base = self.dirs.work.join(&record.sub_directory);
        if record.category.is_series() {
            let show = record.show_dir_name();
            if base.file_name().map(|n| n.to_string_lossy() != show).unwrap_or(true) {
                base = base.join(show);
            }
        }

        let target = if record.category.is_not_doc() {
            base.join(&record.formatted_filename)
        } else {
            match path_after_category(&record.original, record.category.dir_name()) {
                Some(rel) => base.join(rel),
                None => base.join(record.file_name()),
            }
        };
        let wanted = if record.category.is_series() {
            season::season_target(&target, &record.formatted_filename, record.season)
        } else {
            target
        };

        let placed = if self.work_taken(&wanted) {
            let free = first_free(&wanted, |p| self.work_taken(p));
            warn!(
                "{} already placed in this run, using {}",
                wanted.display(),
                free.display()
            );
            free
        } else {
            wanted
        };
        self.work_claims.insert(placed.clone());

        if let Some(parent) = placed.parent() {
            self.ops.create_dir_all(parent)?;
        }
        if staged.is_symlink() {
            self.ops.rename(&staged, &placed)?;
        } else if !self.ops.is_dry_run() {
            warn!("Staged link missing: {}", staged.display());
        }

        record.work_path = Some(placed.clone());
        Ok(placed)
    }

    /// Storage path mirroring a work-tree path.
    pub fn storage_path_for(&self, work_path: &Path) -> PathBuf {
        match work_path.strip_prefix(&self.dirs.work) {
            Ok(rel) => self.storage_dir.join(rel),
            Err(_) => self
                .storage_dir
                .join(work_path.file_name().unwrap_or_default()),
        }
    }

    /// Moves the real file into storage and repoints the work link at it.
    ///
    /// An existing destination of the same size counts as already stored and
    /// the source is deleted; a different size gets a `_N` suffix instead,
    /// and the work link is renamed to match. Returns `None` when the source
    /// has disappeared.
    pub fn promote(
        &self,
        record: &mut VideoRecord,
        registry: Option<&HashRegistry>,
    ) -> Result<Option<PathBuf>, Error> {
        let work_path = record.work_path.clone().ok_or_else(|| {
            Error::Other(format!("{} was never materialized", record.original.display()))
        })?;
        let source = record.original.clone();

        if !source.exists() {
            warn!("Source vanished before promotion: {}", source.display());
            return Ok(None);
        }

        let source_len = fs::metadata(&source)
            .map_err(|e| Error::access(&source, e))?
            .len();
        let destination = self.destination_for(source_len, &work_path)?;
        if let Some(parent) = destination.path().parent() {
            self.ops.create_dir_all(parent)?;
        }

        let stored = match destination {
            Destination::AlreadyPresent(path) => {
                info!(
                    "Identical file already stored at {}, removing {}",
                    path.display(),
                    source.display()
                );
                self.ops.remove_file(&source)?;
                path
            }
            Destination::Free(path) => {
                self.ops.move_file(&source, &path)?;
                info!("Stored {}", path.display());
                path
            }
        };

        let work_path = self.align_work_link(work_path, &stored)?;
        self.ops.symlink(&stored, &work_path)?;
        self.storage_claims.insert(stored.clone(), source_len);

        if let (Some(registry), Some(hash)) = (registry, record.fingerprint.as_deref()) {
            self.ops.ensure_live("record fingerprint for", &stored)?;
            registry.add(hash, &stored, &record.formatted_filename, record.size)?;
        }

        record.work_path = Some(work_path);
        record.storage_path = Some(stored.clone());
        Ok(Some(stored))
    }

    fn destination_for(&self, source_len: u64, work_path: &Path) -> Result<Destination, Error> {
        let wanted = self.storage_path_for(work_path);
        match self.stored_size(&wanted)? {
            None => Ok(Destination::Free(wanted)),
            Some(len) if len == source_len => Ok(Destination::AlreadyPresent(wanted)),
            Some(_) => {
                warn!("{}", Error::Collision { path: wanted.clone() });
                let free = first_free(&wanted, |candidate| {
                    self.storage_taken(candidate)
                        || candidate
                            .file_name()
                            .map(|name| self.work_taken(&work_path.with_file_name(name)))
                            .unwrap_or(false)
                });
                Ok(Destination::Free(free))
            }
        }
    }

    /// Renames the work link so its name matches the stored file's.
    fn align_work_link(&self, work_path: PathBuf, stored: &Path) -> Result<PathBuf, Error> {
        let name = match stored.file_name() {
            Some(name) if Some(name) != work_path.file_name() => name,
            _ => return Ok(work_path),
        };
        let aligned = work_path.with_file_name(name);
        if work_path.is_symlink() {
            self.ops.rename(&work_path, &aligned)?;
        }
        self.work_claims.remove(&work_path);
        self.work_claims.insert(aligned.clone());
        Ok(aligned)
    }

    /// Keep-old: the incoming file goes to the storage waiting area and is
    /// linked from the waiting folder. The library is not touched.
    pub fn quarantine_new(&self, record: &VideoRecord) -> Result<PathBuf, Error> {
        self.quarantine(&record.original)
    }

    /// Keep-new: the stored look-alike is moved aside the same way.
    pub fn quarantine_existing(&self, existing: &Path) -> Result<PathBuf, Error> {
        self.quarantine(existing)
    }

    fn quarantine(&self, file: &Path) -> Result<PathBuf, Error> {
        let name = file
            .file_name()
            .ok_or_else(|| Error::Other(format!("No file name in {}", file.display())))?;
        let len = fs::metadata(file).map_err(|e| Error::access(file, e))?.len();
        let waiting_storage = self.storage_dir.join(STORAGE_WAITING);
        self.ops.create_dir_all(&waiting_storage)?;
        self.ops.create_dir_all(&self.dirs.waiting)?;

        let wanted = waiting_storage.join(name);
        let target = if self.storage_taken(&wanted) {
            first_free(&wanted, |p| self.storage_taken(p))
        } else {
            wanted
        };

        self.ops.move_file(file, &target)?;
        self.storage_claims.insert(target.clone(), len);
        self.vacated.insert(file.to_path_buf());
        let link_name = target.file_name().unwrap_or(name);
        self.ops.symlink(&target, &self.dirs.waiting.join(link_name))?;
        info!("Quarantined {} at {}", file.display(), target.display());
        Ok(target)
    }

    /// Storage changes made so far this run, for lookups that must see them
    /// even when a dry run left the disk untouched.
    pub fn overlay(&self) -> RunOverlay {
        RunOverlay {
            added: self.storage_claims.iter().map(|e| e.key().clone()).collect(),
            removed: self.vacated.iter().map(|p| p.key().clone()).collect(),
        }
    }

    fn claim_staged(&self, wanted: PathBuf, original: &Path) -> PathBuf {
        let mut candidate = wanted.clone();
        let mut counter = 0;
        loop {
            match self.staged.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(original.to_path_buf());
                    return candidate;
                }
                Entry::Occupied(slot) if slot.get() == original => return candidate,
                Entry::Occupied(_) => {}
            }
            counter += 1;
            candidate = numbered(&wanted, counter);
        }
    }

    /// A real run starts from an empty work tree, so a dry run ignores
    /// whatever an earlier run left there.
    fn work_taken(&self, path: &Path) -> bool {
        self.work_claims.contains(path)
            || (!self.ops.is_dry_run() && (path.is_symlink() || path.exists()))
    }

    fn storage_taken(&self, path: &Path) -> bool {
        self.storage_claims.contains_key(path) || path.is_symlink() || path.exists()
    }

    fn stored_size(&self, path: &Path) -> Result<Option<u64>, Error> {
        if let Some(len) = self.storage_claims.get(path) {
            return Ok(Some(*len));
        }
        if !path.exists() {
            return Ok(None);
        }
        let len = fs::metadata(path).map_err(|e| Error::access(path, e))?.len();
        Ok(Some(len))
    }

    /// Copies the staged links into `original` so they survive a failed run.
    pub fn snapshot_staging(&self) -> Result<usize, Error> {
        if !self.dirs.tmp.exists() {
            return Ok(0);
        }
        self.ops.copy_tree(&self.dirs.tmp, &self.dirs.original)
    }

    /// Replaces `output_dir` with the finished work tree.
    pub fn publish(&self, output_dir: &Path) -> Result<usize, Error> {
        let has_entries = fs::read_dir(&self.dirs.work)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !has_entries {
            warn!("Nothing to publish from {}", self.dirs.work.display());
            return Ok(0);
        }
        self.ops.copy_tree(&self.dirs.work, output_dir)
    }
}

/// Path of `path` beneath its first `category` component.
pub fn path_after_category(path: &Path, category: &str) -> Option<PathBuf> {
    let mut components = path.components();
    components
        .by_ref()
        .find(|c| c.as_os_str().to_str() == Some(category))?;
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest.to_path_buf())
    }
}

/// `<stem>_<n><ext>` next to `path`.
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}_{}{}", stem, n, ext))
}

/// First numbered variant of `path` that `taken` rejects.
pub fn first_free(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let mut counter = 1;
    loop {
        let candidate = numbered(path, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use tempfile::tempdir;

    #[test]
    fn test_staging_dirs_are_siblings_of_output() {
        let dirs = StagingDirs::for_output(Path::new("/lib/Videos/temp"));
        assert_eq!(dirs.work, PathBuf::from("/lib/Videos/work"));
        assert_eq!(dirs.tmp, PathBuf::from("/lib/Videos/tmp"));
        assert_eq!(dirs.original, PathBuf::from("/lib/Videos/original"));
        assert_eq!(dirs.waiting, PathBuf::from("/lib/Videos/_a_virer"));
    }

    #[test]
    fn test_path_after_category() {
        assert_eq!(
            path_after_category(Path::new("/dl/Docs/science/a.pdf"), "Docs"),
            Some(PathBuf::from("science/a.pdf"))
        );
        assert_eq!(path_after_category(Path::new("/dl/Docs"), "Docs"), None);
        assert_eq!(path_after_category(Path::new("/dl/x/a.pdf"), "Docs"), None);
    }

    #[test]
    fn test_first_free_skips_taken_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mkv"), "1").unwrap();
        fs::write(dir.path().join("a_1.mkv"), "2").unwrap();
        assert_eq!(
            first_free(&dir.path().join("a.mkv"), |p| p.exists()),
            dir.path().join("a_2.mkv")
        );
        let claimed = dir.path().join("a_2.mkv");
        assert_eq!(
            first_free(&dir.path().join("a.mkv"), |p| p.exists() || p == claimed),
            dir.path().join("a_3.mkv")
        );
    }

    #[test]
    fn test_same_name_downloads_stage_to_distinct_links() {
        let migrator = StagedMigrator::new(
            FileOps::new(true),
            StagingDirs::for_output(Path::new("/lib/Videos/temp")),
            "/storage",
        );
        let mut first = VideoRecord::new("/dl/Films/a/movie.mkv", Category::Films);
        let mut second = VideoRecord::new("/dl/Films/b/movie.mkv", Category::Films);

        let a = migrator.stage_in(&mut first).unwrap();
        let b = migrator.stage_in(&mut second).unwrap();
        assert_eq!(a, PathBuf::from("/lib/Videos/tmp/Films/movie.mkv"));
        assert_eq!(b, PathBuf::from("/lib/Videos/tmp/Films/movie_1.mkv"));
        assert_eq!(migrator.stage_in(&mut first).unwrap(), a);
    }
}
