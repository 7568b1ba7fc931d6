// crates/parcel-index-core/src/core/mod.rs
// ============================================================================
// Module: Parcel Index Core Types
// Description: Canonical parcel, collection, layer, and history structures.
// Purpose: Provide stable, serializable types for every persisted artifact.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types define the master index, the derived feature collections, the
//! layer statistics they carry, and the audit history. Their serialized forms
//! are the on-disk artifact formats consumed by the map front end.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod collection;
pub mod hashing;
pub mod history;
pub mod identifiers;
pub mod layer;
pub mod parcel;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use collection::CollectionVariant;
pub use collection::FeatureCollection;
pub use collection::feature_template;
pub use collection::project_feature;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use history::FailureError;
pub use history::FailureReport;
pub use history::FallbackCheck;
pub use history::HistoryAction;
pub use history::HistoryEntry;
pub use history::HistoryItem;
pub use history::HistoryItemKind;
pub use history::MissingArtifact;
pub use history::WrittenArtifact;
pub use identifiers::ArtifactId;
pub use identifiers::ParcelNum;
pub use layer::BinCount;
pub use layer::BinValues;
pub use layer::Layer;
pub use layer::LayerDataType;
pub use layer::LayerDescriptor;
pub use layer::OUTLINE_LAYER_KEY;
pub use layer::PARCELS_LAYER_KEY;
pub use layer::RangeBins;
pub use layer::is_structural_layer;
pub use layer::is_valid_layer_value;
pub use parcel::FeatureKind;
pub use parcel::MASTER_INDEX_ID;
pub use parcel::MasterIndex;
pub use parcel::PARCEL_NUM_KEY;
pub use parcel::ParcelFeature;
pub use parcel::PropertyMap;
pub use parcel::is_truthy;
pub use parcel::merge_parcel_properties;
