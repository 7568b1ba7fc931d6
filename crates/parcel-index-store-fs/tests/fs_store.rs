// crates/parcel-index-store-fs/tests/fs_store.rs
// ============================================================================
// Module: Filesystem Store Tests
// Description: Rotation, fallback, writes, and audit appends on a temp directory.
// Purpose: Validate the two-slot artifact contract against the real filesystem.
// Dependencies: parcel-index-store-fs, parcel-index-core, tempfile
// ============================================================================
//! ## Overview
//! Exercises [`FsArtifactStore`] in isolated temporary directories.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use parcel_index_core::ArtifactLocation;
use parcel_index_core::ArtifactSlot;
use parcel_index_core::ArtifactStore;
use parcel_index_core::StoreError;
use parcel_index_store_fs::FsArtifactStore;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Returns a temp dir and a location for `master-index.json` inside it.
fn fixture() -> (TempDir, ArtifactLocation) {
    let dir = TempDir::new().expect("temp dir");
    let location = ArtifactLocation::new(dir.path(), "master-index.json");
    (dir, location)
}

/// Verifies a primary load rotates it into the backup slot, replacing the old backup.
#[test]
fn load_rotates_primary_and_replaces_backup() {
    let (_dir, location) = fixture();
    fs::write(location.path(), br#"{"id":"current"}"#).unwrap();
    fs::write(location.backup_path(), br#"{"id":"stale"}"#).unwrap();

    let loaded = FsArtifactStore::new().load_with_fallback(&location).unwrap();
    assert_eq!(loaded.slot, ArtifactSlot::Primary);
    assert_eq!(loaded.value, json!({"id": "current"}));
    assert!(!location.path().exists());
    assert_eq!(fs::read(location.backup_path()).unwrap(), br#"{"id":"current"}"#);
}

/// Verifies a missing primary falls back to the backup without rotation.
#[test]
fn missing_primary_reads_backup() {
    let (_dir, location) = fixture();
    fs::write(location.backup_path(), br#"{"id":"backup"}"#).unwrap();

    let store = FsArtifactStore::new();
    let loaded = store.load_with_fallback(&location).unwrap();
    assert_eq!(loaded.slot, ArtifactSlot::Backup);
    assert_eq!(loaded.value, json!({"id": "backup"}));
    assert!(location.backup_path().exists());
    assert!(!store.exists(&location));
}

/// Verifies a missing primary and backup is reported as not found.
#[test]
fn missing_both_slots_is_not_found() {
    let (_dir, location) = fixture();
    let err = FsArtifactStore::new().load_with_fallback(&location).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

/// Verifies unparseable primaries fail without rotating.
#[test]
fn corrupt_primary_is_a_parse_error_and_stays_put() {
    let (_dir, location) = fixture();
    fs::write(location.path(), b"{not json").unwrap();
    fs::write(location.backup_path(), br#"{"id":"backup"}"#).unwrap();

    let err = FsArtifactStore::new().load_with_fallback(&location).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }));
    assert!(location.path().exists());
    assert_eq!(fs::read(location.backup_path()).unwrap(), br#"{"id":"backup"}"#);
}

/// Verifies a primary that fails its content check keeps the backup intact.
#[test]
fn rejected_primary_keeps_backup() {
    let (_dir, location) = fixture();
    fs::write(location.path(), br#"{"id":"master-index","features":[]}"#).unwrap();
    fs::write(location.backup_path(), br#"{"id":"master-index","features":{}}"#).unwrap();

    let store = FsArtifactStore::new();
    let mut require_map = |value: &Value| {
        if value["features"].is_object() {
            Ok(())
        } else {
            Err("features must be a map".to_string())
        }
    };
    let err = store.load_checked(&location, &mut require_map).unwrap_err();
    assert!(matches!(err, StoreError::Rejected { .. }), "unexpected error: {err}");
    assert!(location.path().exists());
    assert_eq!(
        fs::read(location.backup_path()).unwrap(),
        br#"{"id":"master-index","features":{}}"#
    );

    fs::remove_file(location.path()).unwrap();
    let loaded = store.load_checked(&location, &mut require_map).unwrap();
    assert_eq!(loaded.slot, ArtifactSlot::Backup);
}

/// Verifies oversized artifacts are refused.
#[test]
fn oversized_artifact_is_rejected() {
    let (_dir, location) = fixture();
    fs::write(location.path(), br#"{"id":"0123456789"}"#).unwrap();
    let err = FsArtifactStore::with_max_bytes(8).load_with_fallback(&location).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(location.path().exists());
}

/// Verifies writes create the directory and overwrite existing files.
#[test]
fn write_overwrites_and_creates_directories() {
    let dir = TempDir::new().unwrap();
    let location = ArtifactLocation::new(dir.path().join("src").join("map"), "base-source.json");
    let store = FsArtifactStore::new();
    store.write(&location, b"first").unwrap();
    store.write(&location, b"second").unwrap();
    assert_eq!(fs::read(location.path()).unwrap(), b"second");
    assert!(store.exists(&location));
}

/// Verifies audit appends add one newline-terminated line per call.
#[test]
fn append_line_is_append_only() {
    let dir = TempDir::new().unwrap();
    let location = ArtifactLocation::new(dir.path().join("history"), "history.jsonl");
    let store = FsArtifactStore::new();
    store.append_line(&location, br#"{"run":1}"#).unwrap();
    store.append_line(&location, br#"{"run":2}"#).unwrap();
    let text = fs::read_to_string(location.path()).unwrap();
    assert_eq!(text, "{\"run\":1}\n{\"run\":2}\n");
}

/// Verifies over-long path components are refused before touching disk.
#[test]
fn overlong_path_component_is_rejected() {
    let dir = TempDir::new().unwrap();
    let location = ArtifactLocation::new(dir.path(), format!("{}.json", "a".repeat(300)));
    let err = FsArtifactStore::new().write(&location, b"{}").unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(!location.path().exists());
}
