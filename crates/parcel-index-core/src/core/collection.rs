// crates/parcel-index-core/src/core/collection.rs
// ============================================================================
// Module: Feature Collections and Projection
// Description: Base/master collection variants and parcel projection.
// Purpose: Derive display datasets from master index records.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Feature collections are regenerated from scratch every run. A projection
//! copies the declared property set of a variant out of one parcel; keys the
//! parcel lacks are emitted as `null` so every feature in a collection shares
//! one property schema.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ArtifactId;
use crate::core::layer::Layer;
use crate::core::parcel::ParcelFeature;
use crate::core::parcel::PropertyMap;

// ============================================================================
// SECTION: Collection Variant
// ============================================================================

/// Derived collection variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionVariant {
    /// Reduced property subset for lightweight rendering.
    Base,
    /// Full property set.
    Master,
}

impl CollectionVariant {
    /// Both variants in regeneration order.
    pub const ALL: [Self; 2] = [Self::Base, Self::Master];

    /// Returns the artifact identifier for the variant.
    #[must_use]
    pub const fn artifact_id(self) -> &'static str {
        match self {
            Self::Base => "base-source",
            Self::Master => "master-source",
        }
    }

    /// Returns the artifact file name for the variant.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Base => "base-source.json",
            Self::Master => "master-source.json",
        }
    }

    /// Returns the human label used in history records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Master => "Master",
        }
    }
}

impl fmt::Display for CollectionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact_id())
    }
}

// ============================================================================
// SECTION: Feature Collection
// ============================================================================

/// Regenerated display dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Projected features in master index order.
    #[serde(default)]
    pub features: Vec<ParcelFeature>,
    /// Layer statistics.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Projects one parcel onto a declared property set.
///
/// Geometry and the other top-level members are copied verbatim; missing
/// properties become `null`.
#[must_use]
pub fn project_feature(parcel: &ParcelFeature, declared: &[String]) -> ParcelFeature {
    let properties: PropertyMap = declared
        .iter()
        .map(|key| (key.clone(), parcel.properties.get(key).cloned().unwrap_or(Value::Null)))
        .collect();
    ParcelFeature {
        kind: parcel.kind,
        geometry: parcel.geometry.clone(),
        properties,
        extra: parcel.extra.clone(),
    }
}

/// Returns an empty feature carrying the declared property schema.
#[must_use]
pub fn feature_template(declared: &[String]) -> ParcelFeature {
    project_feature(&ParcelFeature::default(), declared)
}
