//! Change-detector behaviour over a real cache directory.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use ja_cache::{
    CacheConfig, ChangeDetector, ChangeReason, HashAlgorithm, ORIGINAL_POINTER_FILE,
    hash_reader,
};
use proptest::prelude::*;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    detector: ChangeDetector,
    original: PathBuf,
    slim: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("DATABASE.sqlite3");
    fs::write(&original, b"original database bytes").unwrap();
    let slim = dir.path().join("DATABASE.jasqlite3");
    let detector = ChangeDetector::new(CacheConfig::new(dir.path().join("cache")));
    detector.set_original_database_path(&original).unwrap();
    Fixture {
        _dir: dir,
        detector,
        original,
        slim,
    }
}

fn append(path: &Path, bytes: &[u8]) {
    let mut content = fs::read(path).unwrap();
    content.extend_from_slice(bytes);
    fs::write(path, content).unwrap();
}

#[test]
fn test_hash_file_deterministic_and_sensitive() {
    let f = fixture();
    let first = f.detector.hash_file(&f.original).unwrap();
    let second = f.detector.hash_file(&f.original).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);

    append(&f.original, b"x");
    assert_ne!(f.detector.hash_file(&f.original).unwrap(), first);
}

#[test]
fn test_original_change_lifecycle() {
    let f = fixture();
    f.detector.invalidate().unwrap();
    assert!(f.detector.has_original_changed().unwrap());

    // Invalidation also dropped the pointer
    f.detector.set_original_database_path(&f.original).unwrap();
    assert!(f.detector.has_original_changed().unwrap());

    let digest = f.detector.hash_file(&f.original).unwrap();
    f.detector.write_original_hash(&digest).unwrap();
    assert!(!f.detector.has_original_changed().unwrap());

    append(&f.original, b"more rows");
    assert!(f.detector.has_original_changed().unwrap());
}

#[test]
fn test_missing_slim_file_is_changed() {
    let f = fixture();
    fs::write(&f.slim, b"slim").unwrap();
    let digest = f.detector.hash_file(&f.slim).unwrap();
    f.detector.write_slim_hash(&digest).unwrap();
    assert!(!f.detector.has_slim_changed().unwrap());

    fs::remove_file(&f.slim).unwrap();
    assert!(f.detector.has_slim_changed().unwrap());
}

#[test]
fn test_pointer_is_absolute_and_slim_path_derived() {
    let f = fixture();
    let pointer = f.detector.original_database_path().unwrap().unwrap();
    assert!(pointer.is_absolute());
    assert_eq!(pointer, f.original);
    assert_eq!(f.detector.slim_database_path().unwrap(), Some(f.slim.clone()));

    let raw = fs::read_to_string(f.detector.config().root().join(ORIGINAL_POINTER_FILE)).unwrap();
    assert!(!raw.ends_with('\n'));
}

#[test]
fn test_unregistered_detector_reports_changed() {
    let dir = tempfile::tempdir().unwrap();
    let detector = ChangeDetector::new(CacheConfig::new(dir.path().join("cache")));
    assert_eq!(detector.original_database_path().unwrap(), None);
    assert!(detector.has_original_changed().unwrap());
    assert!(detector.has_slim_changed().unwrap());

    // Records exist, pointer does not
    detector.write_original_hash("abc").unwrap();
    assert!(detector.has_original_changed().unwrap());
}

#[test]
fn test_assess_reasons() {
    let f = fixture();
    assert_eq!(f.detector.assess().unwrap().reason(), ChangeReason::SlimMissing);

    fs::write(&f.slim, b"slim").unwrap();
    let assessment = f.detector.assess().unwrap();
    assert_eq!(assessment.reason(), ChangeReason::BothChanged);
    assert!(assessment.needs_reprocessing());

    f.detector.record_original_hash().unwrap();
    f.detector.record_slim_hash().unwrap();
    let assessment = f.detector.assess().unwrap();
    assert_eq!(assessment.reason(), ChangeReason::UpToDate);
    assert!(!assessment.needs_reprocessing());

    append(&f.slim, b"!");
    assert_eq!(f.detector.assess().unwrap().reason(), ChangeReason::SlimChanged);
    f.detector.record_slim_hash().unwrap();

    append(&f.original, b"!");
    assert_eq!(
        f.detector.assess().unwrap().reason(),
        ChangeReason::OriginalChanged
    );
}

#[test]
fn test_invalidate_twice_is_ok() {
    let f = fixture();
    f.detector.record_original_hash().unwrap();
    f.detector.invalidate().unwrap();
    assert!(!f.detector.config().root().exists());
    f.detector.invalidate().unwrap();
}

#[test]
fn test_blake3_detector() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.sqlite3");
    fs::write(&db, b"content").unwrap();
    let detector = ChangeDetector::new(
        CacheConfig::new(dir.path().join("cache")).with_algorithm(HashAlgorithm::Blake3),
    );
    detector.set_original_database_path(&db).unwrap();
    let digest = detector.record_original_hash().unwrap();
    assert_eq!(digest, blake3::hash(b"content").to_hex().to_string());
    assert!(!detector.has_original_changed().unwrap());
}

proptest! {
    #[test]
    fn prop_digest_independent_of_block_size(
        content in proptest::collection::vec(any::<u8>(), 0..4096),
        block_a in 1usize..512,
        block_b in 1usize..8192,
    ) {
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let a = hash_reader(Cursor::new(&content), algorithm, block_a).unwrap();
            let b = hash_reader(Cursor::new(&content), algorithm, block_b).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
