//! Tests for Index
//!
//! These tests verify:
//! - Pre-allocation on open and truncation on close
//! - Reading entries by position and the last entry
//! - Distinct errors for empty and out-of-bounds reads
//! - Capacity limit on writes
//! - Recovery of the logical size after an unclean shutdown

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use seglog::encoding::{put_entry, ENTRY_WIDTH};
use seglog::storage::Index;
use seglog::LogError;
use tempfile::TempDir;

const MAX_BYTES: u64 = 1024;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("0.index");
    (temp_dir, path)
}

/// Write a pre-allocated index file the way an unclean shutdown leaves it
fn write_preallocated_index(path: &PathBuf, entries: &[(u32, u64)], total_len: u64) {
    let mut bytes = vec![0u8; total_len as usize];
    for (i, (relative_offset, position)) in entries.iter().enumerate() {
        let start = i * ENTRY_WIDTH as usize;
        put_entry(
            &mut bytes[start..start + ENTRY_WIDTH as usize],
            *relative_offset,
            *position,
        );
    }
    let mut file = File::create(path).unwrap();
    file.write_all(&bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Open / Close Tests
// =============================================================================

#[test]
fn test_open_preallocates_file() {
    let (_temp, path) = setup_temp_index();

    let index = Index::open(&path, MAX_BYTES).unwrap();

    assert_eq!(index.size(), 0);
    assert_eq!(index.entries(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), MAX_BYTES);
}

#[test]
fn test_close_truncates_to_logical_size() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, MAX_BYTES).unwrap();

    index.write(0, 0).unwrap();
    index.write(1, 19).unwrap();
    index.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 2 * ENTRY_WIDTH);
}

#[test]
fn test_drop_truncates_to_logical_size() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = Index::open(&path, MAX_BYTES).unwrap();
        index.write(0, 0).unwrap();
    }

    assert_eq!(fs::metadata(&path).unwrap().len(), ENTRY_WIDTH);
}

#[test]
fn test_reopen_preserves_entries() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = Index::open(&path, MAX_BYTES).unwrap();
        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();
        index.write(2, 38).unwrap();
        index.close().unwrap();
    }

    let index = Index::open(&path, MAX_BYTES).unwrap();
    assert_eq!(index.entries(), 3);
    assert_eq!(index.read(-1).unwrap(), (2, 38));
    assert_eq!(index.read(1).unwrap(), (1, 19));
}

#[test]
fn test_operations_after_close_fail() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    index.write(0, 0).unwrap();
    index.close().unwrap();

    assert!(matches!(index.read(0), Err(LogError::Closed(_))));
    assert!(matches!(index.write(1, 19), Err(LogError::Closed(_))));

    index.close().unwrap();
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_read_empty_index() {
    let (_temp, path) = setup_temp_index();
    let index = Index::open(&path, MAX_BYTES).unwrap();

    assert!(matches!(index.read(-1), Err(LogError::IndexEmpty)));
    assert!(matches!(index.read(0), Err(LogError::IndexEmpty)));
}

#[test]
fn test_write_and_read_entries() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, MAX_BYTES).unwrap();

    let entries = [(0u32, 0u64), (1, 10), (2, 25)];
    for (relative_offset, position) in entries {
        index.write(relative_offset, position).unwrap();
    }

    assert_eq!(index.size(), 3 * ENTRY_WIDTH);
    for (i, expected) in entries.iter().enumerate() {
        assert_eq!(index.read(i as i64).unwrap(), *expected);
    }
    assert_eq!(index.read(-1).unwrap(), (2, 25));
}

#[test]
fn test_read_past_last_entry() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    index.write(0, 0).unwrap();
    index.write(1, 10).unwrap();

    match index.read(2) {
        Err(LogError::IndexOutOfBounds { entry, entries }) => {
            assert_eq!(entry, 2);
            assert_eq!(entries, 2);
        }
        other => panic!("expected IndexOutOfBounds, got {:?}", other),
    }

    assert!(matches!(
        index.read(-5),
        Err(LogError::IndexOutOfBounds { entry: 5, .. })
    ));
}

#[test]
fn test_write_beyond_capacity() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, 2 * ENTRY_WIDTH).unwrap();

    index.write(0, 0).unwrap();
    index.write(1, 10).unwrap();

    match index.write(2, 20) {
        Err(LogError::IndexFull { capacity }) => assert_eq!(capacity, 2 * ENTRY_WIDTH),
        other => panic!("expected IndexFull, got {:?}", other),
    }

    // Existing entries are untouched
    assert_eq!(index.entries(), 2);
    assert_eq!(index.read(0).unwrap(), (0, 0));
    assert_eq!(index.read(-1).unwrap(), (1, 10));
}

#[test]
fn test_truncate_forgets_tail_entries() {
    let (_temp, path) = setup_temp_index();
    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    index.write(0, 0).unwrap();
    index.write(1, 10).unwrap();

    index.truncate(1);

    assert_eq!(index.entries(), 1);
    assert_eq!(index.read(-1).unwrap(), (0, 0));

    // Truncating above the current size is a no-op
    index.truncate(10);
    assert_eq!(index.entries(), 1);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_preallocated_file() {
    let (_temp, path) = setup_temp_index();
    write_preallocated_index(&path, &[(0, 0), (1, 30)], MAX_BYTES);

    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    // The whole pre-allocated file looks used before recovery
    assert_eq!(index.entries(), MAX_BYTES / ENTRY_WIDTH);

    let dropped = index.recover(100).unwrap();

    assert_eq!(index.entries(), 2);
    assert_eq!(dropped, MAX_BYTES / ENTRY_WIDTH - 2);
    assert_eq!(index.read(-1).unwrap(), (1, 30));
}

#[test]
fn test_recover_drops_entries_past_store_end() {
    let (_temp, path) = setup_temp_index();
    write_preallocated_index(&path, &[(0, 0), (1, 30)], MAX_BYTES);

    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    index.recover(20).unwrap();

    assert_eq!(index.entries(), 1);
    assert_eq!(index.read(-1).unwrap(), (0, 0));
}

#[test]
fn test_recover_empty_store_drops_everything() {
    let (_temp, path) = setup_temp_index();
    write_preallocated_index(&path, &[], MAX_BYTES);

    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    index.recover(0).unwrap();

    assert!(matches!(index.read(-1), Err(LogError::IndexEmpty)));
}

#[test]
fn test_recover_keeps_clean_index() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = Index::open(&path, MAX_BYTES).unwrap();
        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();
        index.close().unwrap();
    }

    let mut index = Index::open(&path, MAX_BYTES).unwrap();
    let dropped = index.recover(38).unwrap();

    assert_eq!(dropped, 0);
    assert_eq!(index.entries(), 2);
}
