// crates/parcel-index-store-fs/src/store.rs
// ============================================================================
// Module: Filesystem Artifact Store
// Description: Rotate-on-load JSON artifacts and append-only JSONL audit log.
// Purpose: Implement the two-slot ArtifactStore contract over std::fs.
// Dependencies: parcel-index-core, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! A successful primary load deletes any prior backup and renames the primary
//! into the backup slot, so exactly one last-known-good copy exists before the
//! run writes anything. A missing primary falls back to the backup without
//! rotating. Writes are plain overwrites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use parcel_index_core::ArtifactCheck;
use parcel_index_core::ArtifactLocation;
use parcel_index_core::ArtifactSlot;
use parcel_index_core::ArtifactStore;
use parcel_index_core::LoadedArtifact;
use parcel_index_core::StoreError;
use parcel_index_core::display_path;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum artifact size accepted on load (bytes).
pub const DEFAULT_MAX_ARTIFACT_BYTES: usize = 512 * 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Filesystem store errors.
#[derive(Debug, Error)]
pub enum FsStoreError {
    /// Path violates length limits.
    #[error("invalid artifact path {path}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Violated limit.
        reason: String,
    },
    /// Artifact exceeds the configured size limit.
    #[error("artifact too large at {path}: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Offending path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Bytes read before giving up.
        actual_bytes: usize,
    },
}

impl From<FsStoreError> for StoreError {
    fn from(error: FsStoreError) -> Self {
        match &error {
            FsStoreError::InvalidPath {
                path, ..
            }
            | FsStoreError::TooLarge {
                path, ..
            } => Self::Io {
                path: path.clone(),
                message: error.to_string(),
            },
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed two-slot artifact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsArtifactStore {
    /// Maximum artifact size accepted on load.
    max_artifact_bytes: usize,
}

impl Default for FsArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FsArtifactStore {
    /// Creates a store with the default size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_ARTIFACT_BYTES)
    }

    /// Creates a store with an explicit size limit.
    #[must_use]
    pub const fn with_max_bytes(max_artifact_bytes: usize) -> Self {
        Self {
            max_artifact_bytes,
        }
    }

    /// Reads and parses a JSON file; `Ok(None)` when it does not exist.
    fn read_json(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(path, &err)),
        };
        let limit = u64::try_from(self.max_artifact_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).map_err(|err| io_error(path, &err))?;
        if bytes.len() > self.max_artifact_bytes {
            return Err(FsStoreError::TooLarge {
                path: display_path(path),
                max_bytes: self.max_artifact_bytes,
                actual_bytes: bytes.len(),
            }
            .into());
        }
        serde_json::from_slice(&bytes).map(Some).map_err(|err| StoreError::Parse {
            path: display_path(path),
            message: err.to_string(),
        })
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load_checked(
        &self,
        location: &ArtifactLocation,
        check: &mut ArtifactCheck<'_>,
    ) -> Result<LoadedArtifact, StoreError> {
        let primary = location.path();
        let backup = location.backup_path();
        validate_path(&primary)?;
        validate_path(&backup)?;

        if let Some(value) = self.read_json(&primary)? {
            apply_check(&primary, &value, check)?;
            match fs::remove_file(&backup) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(io_error(&backup, &err)),
            }
            fs::rename(&primary, &backup).map_err(|err| io_error(&primary, &err))?;
            tracing::debug!(path = %display_path(&primary), "artifact rotated into backup slot");
            return Ok(LoadedArtifact {
                value,
                slot: ArtifactSlot::Primary,
            });
        }

        tracing::warn!(
            path = %display_path(&primary),
            backup = %display_path(&backup),
            "primary artifact not found; loading backup"
        );
        let value = self.read_json(&backup)?.ok_or_else(|| StoreError::NotFound {
            path: display_path(&backup),
        })?;
        apply_check(&backup, &value, check)?;
        Ok(LoadedArtifact {
            value,
            slot: ArtifactSlot::Backup,
        })
    }

    fn write(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<(), StoreError> {
        let path = location.path();
        validate_path(&path)?;
        fs::create_dir_all(&location.directory)
            .map_err(|err| io_error(&location.directory, &err))?;
        fs::write(&path, bytes).map_err(|err| io_error(&path, &err))
    }

    fn append_line(&self, location: &ArtifactLocation, line: &[u8]) -> Result<(), StoreError> {
        let path = location.path();
        validate_path(&path)?;
        fs::create_dir_all(&location.directory)
            .map_err(|err| io_error(&location.directory, &err))?;
        let mut buffer = Vec::with_capacity(line.len() + 1);
        buffer.extend_from_slice(line);
        buffer.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error(&path, &err))?;
        file.write_all(&buffer).map_err(|err| io_error(&path, &err))
    }

    fn exists(&self, location: &ArtifactLocation) -> bool {
        location.path().is_file()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs the caller's content check against a parsed slot.
fn apply_check(path: &Path, value: &Value, check: &mut ArtifactCheck<'_>) -> Result<(), StoreError> {
    check(value).map_err(|message| StoreError::Rejected {
        path: display_path(path),
        message,
    })
}

/// Maps an I/O error to a store error.
fn io_error(path: &Path, err: &io::Error) -> StoreError {
    StoreError::Io {
        path: display_path(path),
        message: err.to_string(),
    }
}

/// Validates a path against length constraints.
fn validate_path(path: &Path) -> Result<(), FsStoreError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(FsStoreError::InvalidPath {
            path: text.to_string(),
            reason: "path exceeds length limit".to_string(),
        });
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(FsStoreError::InvalidPath {
                path: text.to_string(),
                reason: "path component too long".to_string(),
            });
        }
    }
    Ok(())
}
