// tests/integration/fs_abstraction.rs

use std::path::Path;

use tempfile::TempDir;

use pmdispatch::fs::mock::MockFileSystem;
use pmdispatch::fs::{FileSystem, RealFileSystem};

#[test]
fn test_mock_fs_basics() {
    let fs = MockFileSystem::new();
    let path = Path::new("/state/a.status");

    assert_eq!(fs.read_optional(path).unwrap(), None);
    assert!(fs.read_to_string(path).is_err());

    assert!(fs.create_new(path, b"first").unwrap());
    assert!(!fs.create_new(path, b"second").unwrap());
    assert_eq!(fs.read_to_string(path).unwrap(), "first");

    fs.write_atomic(path, b"third").unwrap();
    assert_eq!(fs.contents(path).as_deref(), Some("third"));

    fs.remove_file(path).unwrap();
    fs.remove_file(path).unwrap();
    assert!(!fs.exists(path));
}

#[test]
fn test_mock_fs_unreadable_paths() {
    let fs = MockFileSystem::new();
    let path = Path::new("/state/b.status");
    fs.add_file(path, "{}");
    fs.fail_reads_of(path);

    assert!(fs.read_optional(path).is_err());
    assert!(fs.exists(path));
}

#[test]
fn test_real_fs_atomic_write_and_create_new() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("registry.json");
    let fs = RealFileSystem;

    fs.write_atomic(&path, b"[]").unwrap();
    assert_eq!(fs.read_to_string(&path).unwrap(), "[]");
    assert!(!dir.path().join("nested").join("registry.json.tmp").exists());

    let lock = dir.path().join("nested").join("registry.json.lock");
    assert!(fs.create_new(&lock, b"1").unwrap());
    assert!(!fs.create_new(&lock, b"2").unwrap());
    assert_eq!(fs.read_optional(&lock).unwrap().as_deref(), Some("1"));

    fs.remove_file(&lock).unwrap();
    fs.remove_file(&lock).unwrap();
    assert_eq!(fs.read_optional(&lock).unwrap(), None);
}
