// crates/parcel-index/src/lib.rs
// ============================================================================
// Module: Parcel Index
// Description: Entry point for applying parcel update batches.
// Purpose: Wire configuration, storage, and validation into one pipeline.
// Dependencies: parcel-index-{core, config, store-fs, validation}
// ============================================================================

//! ## Overview
//! `parcel-index` is the facade over the workspace crates. [`update_map`]
//! applies one batch of parcel updates using a validated
//! [`ParcelIndexConfig`]; [`ParcelIndexUpdater`] keeps the assembled pipeline
//! around for callers that apply several batches.
//!
//! Security posture: update batches and config are untrusted inputs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod updater;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use parcel_index_config::ConfigError;
pub use parcel_index_config::ParcelIndexConfig;
pub use parcel_index_core::HistoryEntry;
pub use parcel_index_core::PipelineError;
pub use parcel_index_core::RunOutcome;
pub use parcel_index_core::RunReport;
pub use updater::ConfiguredValidator;
pub use updater::MAX_BATCH_BYTES;
pub use updater::ParcelIndexUpdater;
pub use updater::UpdateMapError;
pub use updater::read_update_batch;
pub use updater::update_map;
