// crates/parcel-index-config/src/lib.rs
// ============================================================================
// Module: Parcel Index Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for parcel-index.toml semantics.
// Dependencies: parcel-index-core, serde, toml
// ============================================================================

//! ## Overview
//! `parcel-index-config` defines the configuration model for the parcel index
//! pipeline: directory layout, collection declarations, binning, and the
//! optional update schema. Validation is strict and fails closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
