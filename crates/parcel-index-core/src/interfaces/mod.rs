// crates/parcel-index-core/src/interfaces/mod.rs
// ============================================================================
// Module: Parcel Index Interfaces
// Description: Backend-agnostic interfaces for validation, layers, and storage.
// Purpose: Define the collaborator surfaces consumed by the update pipeline.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline consumes four collaborators: an update validator, a layer
//! catalog declaring each collection variant, a bin/formula generator, and a
//! two-slot artifact store. Implementations must be deterministic; the
//! pipeline relies on that for idempotent regeneration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::CollectionVariant;
use crate::core::Layer;
use crate::core::LayerDescriptor;
use crate::core::RangeBins;

// ============================================================================
// SECTION: Update Validator
// ============================================================================

/// Structured reason an update failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRejection {
    /// Validation error messages.
    pub errors: Vec<String>,
}

impl UpdateRejection {
    /// Creates a rejection from a single message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

/// Schema validator applied to every incoming update.
pub trait UpdateValidator {
    /// Validates a raw update object.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateRejection`] describing why the update is invalid.
    fn validate(&self, update: &Value) -> Result<(), UpdateRejection>;
}

// ============================================================================
// SECTION: Layer Catalog
// ============================================================================

/// Declares the layers and property schema of each collection variant.
pub trait LayerCatalog {
    /// Returns the ordered layer declarations for a variant.
    fn declared_layers(&self, variant: CollectionVariant) -> Vec<LayerDescriptor>;

    /// Returns the ordered feature property names for a variant.
    fn declared_properties(&self, variant: CollectionVariant) -> Vec<String>;
}

// ============================================================================
// SECTION: Layer Formula
// ============================================================================

/// Bin and display formula generator.
pub trait LayerFormula {
    /// Partitions an ascending numeric sequence into contiguous bins.
    ///
    /// Every element must land in exactly one bin.
    fn generate_bins(&self, sorted: &[f64]) -> RangeBins;

    /// Builds display formulas from a layer's final bins and counts.
    fn build_formulas(&self, layer: &Layer) -> Value;
}

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// Suffix replacing `.json` for the backup slot of an artifact.
pub const BACKUP_SUFFIX: &str = ".backup.json";

/// Directory and file name of one persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLocation {
    /// Containing directory.
    pub directory: PathBuf,
    /// File name within the directory.
    pub file_name: String,
}

impl ArtifactLocation {
    /// Creates a location from a directory and file name.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    /// Returns the primary slot path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Returns the backup slot path at the fixed sibling location.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.directory.join(backup_file_name(&self.file_name))
    }

    /// Returns true when both locations resolve to the same primary path.
    #[must_use]
    pub fn same_path(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

/// Returns the backup file name for an artifact file name.
#[must_use]
pub fn backup_file_name(file_name: &str) -> String {
    file_name.strip_suffix(".json").map_or_else(
        || format!("{file_name}{BACKUP_SUFFIX}"),
        |stem| format!("{stem}{BACKUP_SUFFIX}"),
    )
}

/// Slot an artifact was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSlot {
    /// Live file; it has been rotated into the backup slot.
    Primary,
    /// Backup file; used because the primary was absent.
    Backup,
}

/// Parsed artifact returned by [`ArtifactStore::load_with_fallback`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArtifact {
    /// Parsed JSON document.
    pub value: Value,
    /// Slot the document came from.
    pub slot: ArtifactSlot,
}

/// Artifact store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Neither slot exists.
    #[error("artifact not found: {path}")]
    NotFound {
        /// Path that was checked last.
        path: String,
    },
    /// I/O failure.
    #[error("artifact io error at {path}: {message}")]
    Io {
        /// Path involved in the failure.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// Artifact content is not valid JSON.
    #[error("artifact parse error at {path}: {message}")]
    Parse {
        /// Path involved in the failure.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// Artifact content failed the caller's content check.
    #[error("artifact rejected at {path}: {message}")]
    Rejected {
        /// Path of the rejected slot.
        path: String,
        /// Check failure message.
        message: String,
    },
}

/// Content check applied to a slot before it is rotated or returned.
pub type ArtifactCheck<'a> = dyn FnMut(&Value) -> Result<(), String> + 'a;

/// Two-slot (primary/backup) artifact storage.
///
/// # Invariants
/// - A successful primary load leaves exactly one backup equal to the
///   primary's prior content, and no primary.
/// - A backup load never rotates.
/// - A primary that fails to parse or fails its check is never rotated, so
///   the backup slot keeps its content.
pub trait ArtifactStore {
    /// Loads an artifact, rotating the primary into the backup slot once
    /// `check` accepts its content.
    ///
    /// Falls back to the backup slot without rotation when the primary is
    /// absent. `check` is applied to whichever slot is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when neither slot exists,
    /// [`StoreError::Rejected`] when `check` fails, and [`StoreError::Io`] or
    /// [`StoreError::Parse`] for any other failure.
    fn load_checked(
        &self,
        location: &ArtifactLocation,
        check: &mut ArtifactCheck<'_>,
    ) -> Result<LoadedArtifact, StoreError>;

    /// Loads an artifact accepting any JSON content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] as [`ArtifactStore::load_checked`] does.
    fn load_with_fallback(
        &self,
        location: &ArtifactLocation,
    ) -> Result<LoadedArtifact, StoreError> {
        self.load_checked(location, &mut |_: &Value| Ok(()))
    }

    /// Writes bytes to the primary slot, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the write fails.
    fn write(&self, location: &ArtifactLocation, bytes: &[u8]) -> Result<(), StoreError>;

    /// Appends one line (a trailing newline is added) creating the directory
    /// when needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the append fails.
    fn append_line(&self, location: &ArtifactLocation, line: &[u8]) -> Result<(), StoreError>;

    /// Returns true when the primary slot exists.
    fn exists(&self, location: &ArtifactLocation) -> bool;
}

/// Returns a display string for a path.
#[must_use]
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
