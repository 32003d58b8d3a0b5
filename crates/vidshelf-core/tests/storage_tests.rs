use std::fs;
use std::path::Path;
use tempfile::tempdir;

use vidshelf_core::storage::hash_registry::registry_file_name;
use vidshelf_core::storage::{Database, HashRecord, HashRegistries, HashRegistry, WatermarkStore};
use vidshelf_core::Category;

fn make_record(hash: &str, path: &str, size: i64) -> HashRecord {
    HashRecord {
        hash: hash.to_string(),
        filepath: path.to_string(),
        filename: path.rsplit('/').next().unwrap_or(path).to_string(),
        file_size: size,
    }
}

#[test]
fn test_first_writer_wins() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.insert_hash(&make_record("aa", "/a/first.mkv", 10)).unwrap());
    assert!(!db.insert_hash(&make_record("aa", "/b/second.mkv", 20)).unwrap());

    let stored = db.get_hash_info("aa").unwrap().unwrap();
    assert_eq!(stored.filepath, "/a/first.mkv", "later insert must not overwrite");
    assert_eq!(stored.file_size, 10);
    assert_eq!(db.count_hashes().unwrap(), 1);
}

#[test]
fn test_remove_and_lookup_missing() {
    let db = Database::open_in_memory().unwrap();
    db.insert_hash(&make_record("aa", "/a.mkv", 1)).unwrap();
    assert!(db.remove_hash("aa").unwrap());
    assert!(!db.remove_hash("aa").unwrap());
    assert_eq!(db.get_hash_info("aa").unwrap(), None);
    assert!(!db.hash_exists("aa").unwrap());
}

#[test]
fn test_registry_persists_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(registry_file_name(&Category::Films));
    {
        let registry = HashRegistry::open(&path).unwrap();
        registry
            .add("0123456789abcdef", Path::new("/s/Films/a.mkv"), "a.mkv", 42)
            .unwrap();
    }
    let registry = HashRegistry::open(&path).unwrap();
    assert!(registry.exists("0123456789abcdef").unwrap());
    let record = registry.lookup("0123456789abcdef").unwrap().unwrap();
    assert_eq!(record.filename, "a.mkv");
    assert_eq!(record.file_size, 42);
}

#[test]
fn test_concurrent_adds_keep_one_row_per_hash() {
    let registry = HashRegistry::open_in_memory().unwrap();
    std::thread::scope(|scope| {
        for worker in 0..8 {
            let registry = &registry;
            scope.spawn(move || {
                for i in 0..50 {
                    let hash = format!("{:016x}", i);
                    let path = format!("/w{}/{}.mkv", worker, i);
                    registry.add(&hash, Path::new(&path), "x.mkv", i).unwrap();
                }
            });
        }
    });
    assert_eq!(registry.count().unwrap(), 50);
}

#[test]
fn test_registries_skip_missing_files_when_read_only() {
    let dir = tempdir().unwrap();
    let registries =
        HashRegistries::open_for(dir.path(), &[Category::Films, Category::Series], true);
    assert!(registries.is_empty());
    assert!(!dir.path().join("symlink_video_Films.db").exists());

    let registries =
        HashRegistries::open_for(dir.path(), &[Category::Films, Category::Animation], false);
    assert!(registries.for_category(&Category::Animation).is_some());
    assert!(dir.path().join("symlink_video_Films.db").exists());
}

#[test]
fn test_watermark_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    {
        let store = WatermarkStore::open(&path).unwrap();
        assert_eq!(store.get_last_exec_and_update(1234.5, 99.0).unwrap(), 99.0);
    }
    let store = WatermarkStore::open(&path).unwrap();
    assert_eq!(store.last_exec().unwrap(), Some(1234.5));
    assert_eq!(store.get_last_exec_and_update(2000.0, 99.0).unwrap(), 1234.5);
}

fn dir_snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&path).unwrap())
        })
        .collect();
    entries.sort();
    entries
}

#[test]
fn test_read_only_open_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    let registry_path = dir.path().join(registry_file_name(&Category::Films));
    let state_path = dir.path().join("state.db");
    {
        HashRegistry::open(&registry_path)
            .unwrap()
            .add("aa", Path::new("/s/a.mkv"), "a.mkv", 1)
            .unwrap();
        WatermarkStore::open(&state_path)
            .unwrap()
            .get_last_exec_and_update(500.0, 0.0)
            .unwrap();
    }
    let before = dir_snapshot(dir.path());

    {
        let registry = HashRegistry::open_read_only(&registry_path).unwrap();
        assert!(registry.exists("aa").unwrap());
        assert!(registry.add("bb", Path::new("/s/b.mkv"), "b.mkv", 2).is_err());
        let store = WatermarkStore::open_read_only(&state_path).unwrap();
        assert_eq!(store.last_exec().unwrap(), Some(500.0));
    }

    assert_eq!(dir_snapshot(dir.path()), before);
}
