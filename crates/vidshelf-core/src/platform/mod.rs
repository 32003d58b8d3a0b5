#[cfg(target_os = "windows")]
pub mod windows;

use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

#[cfg(target_os = "windows")]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    windows::symlink(target, link)
}

#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Seconds since the epoch of the inode change time, which also moves when a
/// file is renamed or linked into the download folder.
#[cfg(unix)]
pub fn change_time(metadata: &Metadata) -> f64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ctime() as f64 + metadata.ctime_nsec() as f64 / 1e9
}

/// Windows has no inode change time; the modification time stands in.
#[cfg(not(unix))]
pub fn change_time(metadata: &Metadata) -> f64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
