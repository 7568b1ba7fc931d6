// crates/parcel-index-store-fs/src/lib.rs
// ============================================================================
// Module: Filesystem Artifact Store
// Description: Two-slot artifact store and audit log on the local filesystem.
// Purpose: Persist parcel index artifacts with rotate-on-load backups.
// Dependencies: parcel-index-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! This crate provides a filesystem-backed [`ArtifactStore`]: loads rotate
//! the primary file into a single sibling backup slot, writes overwrite the
//! primary, and audit lines are appended to a JSONL file. Security posture:
//! configured paths are untrusted and are checked against length limits.
//!
//! [`ArtifactStore`]: parcel_index_core::ArtifactStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_MAX_ARTIFACT_BYTES;
pub use store::FsArtifactStore;
pub use store::FsStoreError;
