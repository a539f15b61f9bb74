//! Tests for snapshot durability
//!
//! These tests verify:
//! - Round-trip of every value type through save + reopen
//! - Missing file = empty store; corrupt file = loud failure
//! - Start-fresh policy moves the corrupt file aside
//! - Interrupted saves never replace the last good snapshot
//! - Failed saves leave memory authoritative and are retried

use std::fs;
use std::path::Path;

use nanostore::config::{Config, CorruptPolicy};
use nanostore::storage;
use nanostore::store::Store;
use nanostore::{Number, StoreError, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(dir: &Path) -> Config {
    Config::builder().data_dir(dir).sync_writes(false).build()
}

fn open(dir: &Path) -> Store {
    Store::open(config_for(dir)).unwrap()
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_round_trip_all_value_types() {
    let temp = TempDir::new().unwrap();

    {
        let store = open(temp.path());
        store.set("bal.Steve", 1200).unwrap();
        store.set("bal.Alex", 87.5).unwrap();
        store.set("bal.Whole", 10.0).unwrap();
        store.set("afk.Steve", true).unwrap();
        store.set("motd", "welcome back").unwrap();
        store.set("mod.words", vec!["foo", "bar"]).unwrap();
        store.set("mod.empty", Vec::<String>::new()).unwrap();
        store.save().unwrap();
    }

    let store = open(temp.path());

    assert_eq!(store.len(), 7);
    assert_eq!(store.get_opt("bal.Steve"), Some(Value::from(1200)));
    assert_eq!(store.get_opt("bal.Alex"), Some(Value::from(87.5)));
    // Floats stay floats even when whole
    assert_eq!(
        store.get_opt("bal.Whole"),
        Some(Value::Number(Number::Float(10.0)))
    );
    assert_eq!(store.get_opt("afk.Steve"), Some(Value::Bool(true)));
    assert_eq!(store.get_opt("motd"), Some(Value::from("welcome back")));
    assert_eq!(store.get_array("mod.words"), vec!["foo", "bar"]);
    assert_eq!(store.get_opt("mod.empty"), Some(Value::List(Vec::new())));
}

#[test]
fn test_round_trip_many_keys() {
    let temp = TempDir::new().unwrap();
    let n = 500;

    {
        let store = open(temp.path());
        for i in 0..n {
            store.set(&format!("stat.p{}", i), i * 3).unwrap();
        }
        store.save().unwrap();
    }

    let store = open(temp.path());
    assert_eq!(store.len(), n as usize);
    for i in 0..n {
        assert_eq!(store.get(&format!("stat.p{}", i), -1), Value::from(i * 3));
    }
}

#[test]
fn test_unsaved_changes_flushed_on_drop() {
    let temp = TempDir::new().unwrap();

    {
        let store = open(temp.path());
        store.set("k", 1).unwrap();
        assert!(store.is_dirty());
    }

    assert_eq!(open(temp.path()).get("k", 0), Value::from(1));
}

#[test]
fn test_close_saves() {
    let temp = TempDir::new().unwrap();

    let store = open(temp.path());
    store.increment("deaths.Alex", 2).unwrap();
    store.close().unwrap();

    assert_eq!(open(temp.path()).get("deaths.Alex", 0), Value::from(2));
}

#[test]
fn test_save_clears_dirty() {
    let temp = TempDir::new().unwrap();
    let store = open(temp.path());

    store.set("k", 1).unwrap();
    assert!(store.is_dirty());

    store.save().unwrap();
    assert!(!store.is_dirty());

    // Idempotent
    store.save().unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn test_hand_edited_file_loads() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("store.json"),
        r#"{ "bal.Steve": 500, "afk.Alex": false, "mod.words": ["a"] }"#,
    )
    .unwrap();

    let store = open(temp.path());

    assert_eq!(store.get("bal.Steve", 0), Value::from(500));
    assert_eq!(store.get("afk.Alex", true), Value::Bool(false));
    assert_eq!(store.get_array("mod.words"), vec!["a"]);
}

#[test]
fn test_snapshot_file_is_sorted_json() {
    let temp = TempDir::new().unwrap();
    let store = open(temp.path());
    store.set("b", 2).unwrap();
    store.set("a", 1).unwrap();
    store.save().unwrap();

    let text = fs::read_to_string(store.path()).unwrap();

    assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    assert!(text.ends_with('\n'));
}

// =============================================================================
// Load Failure Tests
// =============================================================================

#[test]
fn test_missing_file_is_empty_store() {
    let temp = TempDir::new().unwrap();

    let store = open(temp.path());

    assert!(store.is_empty());
}

#[test]
fn test_corrupt_file_fails_loudly() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    fs::write(&path, "{ \"bal.Steve\": 12").unwrap();

    let err = Store::open(config_for(temp.path())).err().unwrap();

    assert!(matches!(err, StoreError::Corrupt { .. }));
    // The file is left alone for the operator
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ \"bal.Steve\": 12");
}

#[test]
fn test_empty_file_is_corrupt() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("store.json"), "").unwrap();

    let err = Store::open(config_for(temp.path())).err().unwrap();

    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[test]
fn test_unsupported_value_is_corrupt() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("store.json"), r#"{ "k": null }"#).unwrap();

    let err = Store::open(config_for(temp.path())).err().unwrap();

    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[test]
fn test_start_fresh_quarantines_corrupt_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    fs::write(&path, "not json").unwrap();

    let config = Config::builder()
        .data_dir(temp.path())
        .sync_writes(false)
        .on_corrupt(CorruptPolicy::StartFresh)
        .build();
    let store = Store::open(config).unwrap();

    assert!(store.is_empty());
    assert!(!path.exists());

    let quarantined: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("store.json.corrupt-"))
        .collect();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(
        fs::read_to_string(temp.path().join(&quarantined[0])).unwrap(),
        "not json"
    );
}

// =============================================================================
// Atomic Replace Tests
// =============================================================================

#[test]
fn test_interrupted_save_keeps_previous_snapshot() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");

    {
        let store = open(temp.path());
        store.set("bal.Steve", 500).unwrap();
        store.save().unwrap();
    }

    // A crash mid-save leaves a truncated temp file next to the snapshot
    fs::write(storage::temp_path(&path), "{ \"bal.Steve\": 9").unwrap();

    let store = open(temp.path());

    assert_eq!(store.get("bal.Steve", 0), Value::from(500));
    assert!(!storage::temp_path(&path).exists());
}

#[test]
fn test_failed_save_keeps_file_and_memory_then_retries() {
    let temp = TempDir::new().unwrap();
    let store = open(temp.path());
    let tmp_path = storage::temp_path(store.path());

    store.set("bal.Steve", 500).unwrap();
    store.save().unwrap();

    // Block the temp file so the next save cannot be written
    fs::create_dir(&tmp_path).unwrap();
    store.set("bal.Steve", 900).unwrap();

    assert!(store.save().is_err());
    assert!(store.is_dirty());
    assert_eq!(store.get("bal.Steve", 0), Value::from(900));
    let on_disk = storage::load(store.path()).unwrap().unwrap();
    assert_eq!(on_disk.get("bal.Steve"), Some(&Value::from(500)));

    // Unblock: the retry lands
    fs::remove_dir(&tmp_path).unwrap();
    store.save().unwrap();
    assert!(!store.is_dirty());
    let on_disk = storage::load(store.path()).unwrap().unwrap();
    assert_eq!(on_disk.get("bal.Steve"), Some(&Value::from(900)));
}

#[test]
fn test_write_atomic_replaces_whole_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("f.json");

    storage::write_atomic(&path, b"{\"a\": 1, \"padding\": \"xxxxxxxxxx\"}", false).unwrap();
    storage::write_atomic(&path, b"{\"a\": 2}", false).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\": 2}");
    assert!(!storage::temp_path(&path).exists());
}

#[test]
fn test_decode_reports_reason() {
    assert!(storage::decode("").unwrap_err().contains("empty"));
    assert!(storage::decode("{\"\": 1}").unwrap_err().contains("empty key"));
    assert_eq!(storage::decode("{}").unwrap().len(), 0);
}
