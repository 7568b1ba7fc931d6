// crates/parcel-index-core/src/runtime/mod.rs
// ============================================================================
// Module: Parcel Index Runtime
// Description: Update pipeline, layer statistics, regeneration, and helpers.
// Purpose: Apply parcel update batches and regenerate the map artifacts.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the update pipeline and the pure functions it
//! sequences: schema diffs, layer statistics, binning, and regeneration. The
//! in-memory store and accept-all validator back tests and demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod diff;
pub mod formula;
pub mod pipeline;
pub mod regenerate;
pub mod statistics;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CollectionSchema;
pub use catalog::StaticLayerCatalog;
pub use diff::KeyedLayer;
pub use diff::diff_feature_properties;
pub use diff::diff_layers;
pub use formula::DEFAULT_MAX_BINS;
pub use formula::MAX_BINS_LIMIT;
pub use formula::MapboxLayerFormula;
pub use pipeline::BackupDirectories;
pub use pipeline::HISTORY_FILE;
pub use pipeline::MASTER_INDEX_FILE;
pub use pipeline::PipelineConfig;
pub use pipeline::PipelineError;
pub use pipeline::PipelineLayout;
pub use pipeline::PipelineStage;
pub use pipeline::ProductionDirectories;
pub use pipeline::RunOutcome;
pub use pipeline::RunReport;
pub use pipeline::UpdatePipeline;
pub use regenerate::RegeneratedArtifacts;
pub use regenerate::regenerate;
pub use regenerate::regenerate_collection;
pub use statistics::LayerAccumulator;
pub use statistics::compute_layer_statistics;
pub use store::InMemoryArtifactStore;
pub use validator::AcceptAllValidator;
