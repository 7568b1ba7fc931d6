// crates/parcel-index-core/src/runtime/store.rs
// ============================================================================
// Module: Parcel Index In-Memory Store
// Description: In-memory two-slot artifact store for tests and demos.
// Purpose: Provide a deterministic store implementation without filesystem access.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`ArtifactStore`] with
//! the same rotation semantics as the filesystem store, plus fault injection
//! for writes and appends. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use crate::interfaces::ArtifactCheck;
use crate::interfaces::ArtifactLocation;
use crate::interfaces::ArtifactSlot;
use crate::interfaces::ArtifactStore;
use crate::interfaces::LoadedArtifact;
use crate::interfaces::StoreError;
use crate::interfaces::display_path;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable store contents.
#[derive(Debug, Default)]
struct StoreState {
    /// File contents keyed by path.
    files: BTreeMap<PathBuf, Vec<u8>>,
    /// Paths whose writes fail.
    failing_writes: BTreeSet<PathBuf>,
    /// Whether every append fails.
    fail_appends: bool,
    /// Successful writes.
    write_count: usize,
    /// Successful appends.
    append_count: usize,
}

/// In-memory artifact store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifactStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Io {
            path: String::new(),
            message: "artifact store mutex poisoned".to_string(),
        })
    }

    /// Seeds a file with the pretty JSON form of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when serialization fails or the store is poisoned.
    pub fn insert_json(&self, path: impl Into<PathBuf>, value: &Value) -> Result<(), StoreError> {
        let path = path.into();
        let bytes = serde_json::to_vec_pretty(value).map_err(|err| StoreError::Parse {
            path: display_path(&path),
            message: err.to_string(),
        })?;
        self.lock()?.files.insert(path, bytes);
        Ok(())
    }

    /// Returns a copy of the bytes stored at `path`.
    #[must_use]
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().ok().and_then(|state| state.files.get(path).cloned())
    }

    /// Returns the parsed JSON stored at `path`.
    #[must_use]
    pub fn read_json(&self, path: &Path) -> Option<Value> {
        self.read(path).and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    /// Returns true when a file exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().is_ok_and(|state| state.files.contains_key(path))
    }

    /// Removes the file at `path`.
    pub fn remove(&self, path: &Path) {
        if let Ok(mut state) = self.lock() {
            state.files.remove(path);
        }
    }

    /// Makes every later write to `path` fail.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        if let Ok(mut state) = self.lock() {
            state.failing_writes.insert(path.into());
        }
    }

    /// Makes every later append fail.
    pub fn fail_appends(&self) {
        if let Ok(mut state) = self.lock() {
            state.fail_appends = true;
        }
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().map_or(0, |state| state.write_count)
    }

    /// Returns the number of successful appends.
    #[must_use]
    pub fn append_count(&self) -> usize {
        self.lock().map_or(0, |state| state.append_count)
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn load_checked(
        &self,
        location: &ArtifactLocation,
        check: &mut ArtifactCheck<'_>,
    ) -> Result<LoadedArtifact, StoreError> {
        let primary = location.path();
        let backup = location.backup_path();
        let mut state = self.lock()?;
        if let Some(bytes) = state.files.get(&primary) {
            let value = parse(&primary, bytes)?;
            apply_check(&primary, &value, check)?;
            if let Some(bytes) = state.files.remove(&primary) {
                state.files.insert(backup, bytes);
            }
            drop(state);
            return Ok(LoadedArtifact {
                value,
                slot: ArtifactSlot::Primary,
            });
        }
        let bytes = state.files.get(&backup).ok_or_else(|| StoreError::NotFound {
            path: display_path(&backup),
        })?;
        let value = parse(&backup, bytes)?;
        drop(state);
        apply_check(&backup, &value, check)?;
        tracing::warn!(
            path = %display_path(&primary),
            "primary artifact missing; loaded backup"
        );
        Ok(LoadedArtifact {
            value,
            slot: ArtifactSlot::Backup,
        })
    }

    fn write(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<(), StoreError> {
        let path = location.path();
        let mut state = self.lock()?;
        if state.failing_writes.contains(&path) {
            return Err(StoreError::Io {
                path: display_path(&path),
                message: "injected write failure".to_string(),
            });
        }
        state.files.insert(path, bytes.to_vec());
        state.write_count += 1;
        drop(state);
        Ok(())
    }

    fn append_line(&self, location: &ArtifactLocation, line: &[u8]) -> Result<(), StoreError> {
        let path = location.path();
        let mut state = self.lock()?;
        if state.fail_appends {
            return Err(StoreError::Io {
                path: display_path(&path),
                message: "injected append failure".to_string(),
            });
        }
        let file = state.files.entry(path).or_default();
        file.extend_from_slice(line);
        file.push(b'\n');
        state.append_count += 1;
        drop(state);
        Ok(())
    }

    fn exists(&self, location: &ArtifactLocation) -> bool {
        self.contains(&location.path())
    }
}

/// Runs the caller's content check against a parsed slot.
fn apply_check(path: &Path, value: &Value, check: &mut ArtifactCheck<'_>) -> Result<(), StoreError> {
    check(value).map_err(|message| StoreError::Rejected {
        path: display_path(path),
        message,
    })
}

/// Parses stored bytes as JSON.
fn parse(path: &Path, bytes: &[u8]) -> Result<Value, StoreError> {
    serde_json::from_slice(bytes).map_err(|err| StoreError::Parse {
        path: display_path(path),
        message: err.to_string(),
    })
}
