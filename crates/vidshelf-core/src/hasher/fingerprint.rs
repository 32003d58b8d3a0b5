use crate::error::Error;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use twox_hash::XxHash64;

/// Files below this size are hashed in full.
pub const FULL_HASH_LIMIT: u64 = 650_000;

/// Size of the sampled window for larger files.
pub const WINDOW_LENGTH: usize = 512 * 1024;

/// Cheap content fingerprint for re-ingestion detection.
///
/// Small files are hashed whole. Larger ones are sampled on a fixed window
/// starting at `size / 8`, so edits outside that window go unnoticed.
/// Not a cryptographic hash.
pub fn fingerprint(path: &Path) -> Result<String, Error> {
    let data = read_sample(path).map_err(|source| Error::Fingerprint {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!("{:016x}", hash_data(&data)))
}

fn read_sample(path: &Path) -> io::Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let size = f.metadata()?.len();

    if size < FULL_HASH_LIMIT {
        let mut buffer = Vec::with_capacity(size as usize);
        f.read_to_end(&mut buffer)?;
        return Ok(buffer);
    }

    f.seek(SeekFrom::Start(size / 8))?;
    let mut buffer = Vec::with_capacity(WINDOW_LENGTH);
    f.take(WINDOW_LENGTH as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

pub fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_small_file_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mkv");
        fs::write(&path, b"some small content").unwrap();
        let first = fingerprint(&path).unwrap();
        assert_eq!(first, fingerprint(&path).unwrap());
        assert_eq!(first.len(), 16);
    }

    #[test]
    fn test_small_file_sees_every_byte() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.mkv");
        let b = dir.path().join("b.mkv");
        fs::write(&a, b"content-1").unwrap();
        fs::write(&b, b"content-2").unwrap();
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_large_file_ignores_edits_outside_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.mkv");
        let size = 2_000_000usize;
        let mut data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();
        let original = fingerprint(&path).unwrap();

        let start = size / 8;
        let end = start + WINDOW_LENGTH;
        data[0] ^= 0xFF;
        data[start - 1] ^= 0xFF;
        data[end] ^= 0xFF;
        data[size - 1] ^= 0xFF;
        fs::write(&path, &data).unwrap();
        assert_eq!(original, fingerprint(&path).unwrap());

        data[start] ^= 0xFF;
        fs::write(&path, &data).unwrap();
        assert_ne!(original, fingerprint(&path).unwrap());
    }

    #[test]
    fn test_missing_file_is_fingerprint_error() {
        let dir = tempdir().unwrap();
        let err = fingerprint(&dir.path().join("missing.mkv")).unwrap_err();
        assert!(matches!(err, Error::Fingerprint { .. }));
    }
}
