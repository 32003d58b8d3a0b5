//! The only place that mutates the filesystem. In dry-run mode every
//! operation logs what it would do and returns without touching disk.

use crate::error::Error;
use crate::platform;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy)]
pub struct FileOps {
    dry_run: bool,
}

impl FileOps {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Fails for operations that cannot be simulated.
    pub fn ensure_live(&self, operation: &'static str, path: &Path) -> Result<(), Error> {
        if self.dry_run {
            return Err(Error::DryRunViolation {
                operation,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - create directory {}", path.display());
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| Error::access(path, e))
    }

    /// Removes a directory tree if present.
    pub fn clear_dir(&self, path: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - clear {}", path.display());
            return Ok(());
        }
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::access(path, e)),
        }
    }

    pub fn remove_file(&self, path: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - remove {}", path.display());
            return Ok(());
        }
        fs::remove_file(path).map_err(|e| Error::access(path, e))
    }

    /// Removes an empty directory.
    pub fn remove_dir(&self, path: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - remove directory {}", path.display());
            return Ok(());
        }
        fs::remove_dir(path).map_err(|e| Error::access(path, e))
    }

    pub fn rename(&self, from: &Path, to: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - rename {} -> {}", from.display(), to.display());
            return Ok(());
        }
        fs::rename(from, to).map_err(|e| Error::access(from, e))
    }

    /// Moves a file, copying across filesystems when a rename is not possible.
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<(), Error> {
        if self.dry_run {
            info!("SIMULATION - move {} -> {}", from.display(), to.display());
            return Ok(());
        }
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        fs::copy(from, to).map_err(|e| Error::access(from, e))?;
        fs::remove_file(from).map_err(|e| Error::access(from, e))
    }

    /// Points `link` at `target`, replacing whatever is at `link`. A target
    /// that is itself a symlink is resolved first so links never chain.
    pub fn symlink(&self, target: &Path, link: &Path) -> Result<(), Error> {
        if self.dry_run {
            debug!("SIMULATION - link {} -> {}", link.display(), target.display());
            return Ok(());
        }

        let target: PathBuf = if target.is_symlink() {
            fs::canonicalize(target).map_err(|e| Error::access(target, e))?
        } else {
            target.to_path_buf()
        };

        if link.is_symlink() || link.exists() {
            fs::remove_file(link).map_err(|e| Error::access(link, e))?;
        }
        platform::symlink(&target, link).map_err(|e| Error::access(link, e))?;
        debug!("Link {} -> {}", link.display(), target.display());
        Ok(())
    }

    /// Replaces `dst` with a copy of `src`, recreating symlinks as symlinks.
    /// Returns the number of entries written.
    pub fn copy_tree(&self, src: &Path, dst: &Path) -> Result<usize, Error> {
        if self.dry_run {
            info!("SIMULATION - copy {} -> {}", src.display(), dst.display());
            return Ok(0);
        }

        self.clear_dir(dst)?;
        fs::create_dir_all(dst).map_err(|e| Error::access(dst, e))?;

        let mut written = 0;
        for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| Error::Other(e.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| Error::Other(e.to_string()))?;
            let target = dst.join(rel);
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                let pointee = fs::read_link(entry.path()).map_err(|e| Error::access(entry.path(), e))?;
                platform::symlink(&pointee, &target).map_err(|e| Error::access(&target, e))?;
            } else if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| Error::access(&target, e))?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| Error::access(entry.path(), e))?;
            }
            written += 1;
        }
        info!("Copied {} -> {} ({} entries)", src.display(), dst.display(), written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let ops = FileOps::new(true);
        let file = dir.path().join("a.mkv");
        fs::write(&file, "x").unwrap();

        ops.create_dir_all(&dir.path().join("new/dir")).unwrap();
        ops.remove_file(&file).unwrap();
        ops.symlink(&file, &dir.path().join("link")).unwrap();
        ops.move_file(&file, &dir.path().join("b.mkv")).unwrap();

        assert!(file.exists());
        assert!(!dir.path().join("new").exists());
        assert!(!dir.path().join("link").exists());
        assert!(!dir.path().join("b.mkv").exists());
        assert!(matches!(
            ops.ensure_live("open", &file),
            Err(Error::DryRunViolation { .. })
        ));
    }

    #[test]
    fn test_symlink_replaces_existing_link() {
        let dir = tempdir().unwrap();
        let ops = FileOps::new(false);
        let a = dir.path().join("a.mkv");
        let b = dir.path().join("b.mkv");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let link = dir.path().join("link.mkv");

        ops.symlink(&a, &link).unwrap();
        ops.symlink(&b, &link).unwrap();
        assert_eq!(fs::read_to_string(&link).unwrap(), "b");
    }

    #[test]
    fn test_symlink_to_link_points_at_final_target() {
        let dir = tempdir().unwrap();
        let ops = FileOps::new(false);
        let real = dir.path().join("real.mkv");
        fs::write(&real, "data").unwrap();
        let first = dir.path().join("first.mkv");
        let second = dir.path().join("second.mkv");
        ops.symlink(&real, &first).unwrap();
        ops.symlink(&first, &second).unwrap();
        assert_eq!(
            fs::read_link(&second).unwrap(),
            fs::canonicalize(&real).unwrap()
        );
    }

    #[test]
    fn test_copy_tree_keeps_symlinks() {
        let dir = tempdir().unwrap();
        let ops = FileOps::new(false);
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).unwrap();
        let real = dir.path().join("real.mkv");
        fs::write(&real, "data").unwrap();
        platform::symlink(&real, &src.join("sub/link.mkv")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale.txt"), "old").unwrap();

        ops.copy_tree(&src, &dst).unwrap();

        let copied = dst.join("sub/link.mkv");
        assert!(copied.is_symlink());
        assert_eq!(fs::read_link(&copied).unwrap(), real);
        assert!(!dst.join("stale.txt").exists());
    }
}
