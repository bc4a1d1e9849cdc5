use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use audio_enhancer::cleanup::{sweep_once, SweepReport};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Write a file and set its modification time `age` into the past
fn write_aged(dir: &Path, name: &str, len: usize, age: Duration) {
    let path = dir.join(name);
    std::fs::write(&path, vec![7u8; len]).unwrap();
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_sweep_removes_only_old_enhanced_files() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(dir.path(), "enhanced_20260101000000_old.mp3", 1000, DAY * 10);
    write_aged(dir.path(), "enhanced_20260102000000_old.wav", 500, DAY * 8);
    write_aged(dir.path(), "enhanced_20261014000000_new.mp3", 300, DAY * 2);
    // Old, but not an output file
    write_aged(dir.path(), "temp_abcdef012345", 100, DAY * 30);
    write_aged(dir.path(), "notes.txt", 100, DAY * 30);
    // Directories are never touched
    std::fs::create_dir(dir.path().join("enhanced_dir")).unwrap();

    let report = sweep_once(dir.path(), DAY * 7, SystemTime::now())
        .await
        .unwrap();

    assert_eq!(
        report,
        SweepReport {
            removed_count: 2,
            removed_bytes: 1500,
        }
    );
    assert!(!dir.path().join("enhanced_20260101000000_old.mp3").exists());
    assert!(!dir.path().join("enhanced_20260102000000_old.wav").exists());
    assert!(dir.path().join("enhanced_20261014000000_new.mp3").exists());
    assert!(dir.path().join("temp_abcdef012345").exists());
    assert!(dir.path().join("notes.txt").exists());
    assert!(dir.path().join("enhanced_dir").is_dir());
}

#[tokio::test]
async fn test_sweep_respects_reference_time() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(dir.path(), "enhanced_20261013000000_a.mp3", 10, DAY * 2);

    // Nothing is old enough now
    let report = sweep_once(dir.path(), DAY * 7, SystemTime::now())
        .await
        .unwrap();
    assert_eq!(report.removed_count, 0);

    // Six days later it is
    let report = sweep_once(dir.path(), DAY * 7, SystemTime::now() + DAY * 6)
        .await
        .unwrap();
    assert_eq!(report.removed_count, 1);
    assert_eq!(report.removed_bytes, 10);
}

#[tokio::test]
async fn test_sweep_empty_directory_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let report = sweep_once(dir.path(), DAY * 7, SystemTime::now())
        .await
        .unwrap();
    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn test_sweep_missing_directory_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let report = sweep_once(&dir.path().join("does-not-exist"), DAY * 7, SystemTime::now())
        .await
        .unwrap();
    assert_eq!(report.removed_count, 0);
}
