// crates/parcel-index-core/src/lib.rs
// ============================================================================
// Module: Parcel Index Core Library
// Description: Public API surface for the parcel index core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Parcel index core maintains a canonical parcel property index and
//! regenerates the derived map feature collections, with rotating backups and
//! an append-only audit trail. It is storage-agnostic and integrates through
//! explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ArtifactCheck;
pub use interfaces::ArtifactLocation;
pub use interfaces::ArtifactSlot;
pub use interfaces::ArtifactStore;
pub use interfaces::BACKUP_SUFFIX;
pub use interfaces::LayerCatalog;
pub use interfaces::LayerFormula;
pub use interfaces::LoadedArtifact;
pub use interfaces::StoreError;
pub use interfaces::UpdateRejection;
pub use interfaces::UpdateValidator;
pub use interfaces::backup_file_name;
pub use interfaces::display_path;
pub use runtime::AcceptAllValidator;
pub use runtime::BackupDirectories;
pub use runtime::CollectionSchema;
pub use runtime::DEFAULT_MAX_BINS;
pub use runtime::HISTORY_FILE;
pub use runtime::InMemoryArtifactStore;
pub use runtime::LayerAccumulator;
pub use runtime::MAX_BINS_LIMIT;
pub use runtime::MASTER_INDEX_FILE;
pub use runtime::MapboxLayerFormula;
pub use runtime::PipelineConfig;
pub use runtime::PipelineError;
pub use runtime::PipelineLayout;
pub use runtime::PipelineStage;
pub use runtime::ProductionDirectories;
pub use runtime::RegeneratedArtifacts;
pub use runtime::RunOutcome;
pub use runtime::RunReport;
pub use runtime::StaticLayerCatalog;
pub use runtime::UpdatePipeline;
pub use runtime::compute_layer_statistics;
pub use runtime::diff_feature_properties;
pub use runtime::diff_layers;
pub use runtime::regenerate;
