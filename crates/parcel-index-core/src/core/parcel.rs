// crates/parcel-index-core/src/core/parcel.rs
// ============================================================================
// Module: Parcel Records and Master Index
// Description: Canonical parcel feature records and the keyed master index.
// Purpose: Hold the source of truth that every derived collection is rebuilt from.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A parcel is a GeoJSON-like feature whose `properties` map is the only part
//! this crate interprets; geometry travels through untouched. The master index
//! keys parcels by [`ParcelNum`] and is the only container mutated by a run,
//! and only through [`merge_parcel_properties`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::ParcelNum;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Property name carrying the parcel number on updates and records.
pub const PARCEL_NUM_KEY: &str = "parcelNum";

/// Conventional identifier of a master index.
///
/// Regeneration keeps whatever identifier the loaded index carries; this
/// value is only used when a master index is created from scratch.
pub const MASTER_INDEX_ID: &str = "master-index";

// ============================================================================
// SECTION: Parcel Feature
// ============================================================================

/// Property name to scalar value mapping for one parcel.
pub type PropertyMap = Map<String, Value>;

/// GeoJSON feature type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// The only feature kind emitted by this crate.
    #[default]
    Feature,
}

/// One parcel as stored in the master index or a projected collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelFeature {
    /// GeoJSON type tag.
    #[serde(rename = "type", default)]
    pub kind: FeatureKind,
    /// Opaque geometry payload.
    #[serde(default)]
    pub geometry: Value,
    /// Parcel properties.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Other top-level members (feature `id`, `bbox`, ...), kept opaque.
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl ParcelFeature {
    /// Creates a feature with no geometry from a property map.
    #[must_use]
    pub fn from_properties(properties: PropertyMap) -> Self {
        Self {
            kind: FeatureKind::Feature,
            geometry: Value::Null,
            properties,
            extra: PropertyMap::new(),
        }
    }

    /// Returns the property value for `key`, if present.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

// ============================================================================
// SECTION: Master Index
// ============================================================================

/// Canonical keyed store of all parcels.
///
/// # Invariants
/// - `length` equals `features.len()` for indexes built by [`MasterIndex::from_parcels`].
/// - Merges never add keys; updates for unknown parcels are rejected upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterIndex {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Parcels keyed by parcel number.
    #[serde(default)]
    pub features: BTreeMap<ParcelNum, ParcelFeature>,
    /// Running parcel count.
    #[serde(default)]
    pub length: usize,
}

impl MasterIndex {
    /// Creates an empty master index.
    #[must_use]
    pub fn new(id: impl Into<ArtifactId>) -> Self {
        Self {
            id: id.into(),
            features: BTreeMap::new(),
            length: 0,
        }
    }

    /// Builds a fresh index from scratch, cloning each parcel record.
    #[must_use]
    pub fn from_parcels<'a>(
        id: impl Into<ArtifactId>,
        parcels: impl IntoIterator<Item = (&'a ParcelNum, &'a ParcelFeature)>,
    ) -> Self {
        let mut index = Self::new(id);
        for (parcel_num, parcel) in parcels {
            index.features.insert(parcel_num.clone(), parcel.clone());
            index.length += 1;
        }
        index
    }

    /// Returns true when the parcel number exists in the index.
    #[must_use]
    pub fn contains(&self, parcel_num: &ParcelNum) -> bool {
        self.features.contains_key(parcel_num)
    }

    /// Returns the parcel for a parcel number.
    #[must_use]
    pub fn get(&self, parcel_num: &ParcelNum) -> Option<&ParcelFeature> {
        self.features.get(parcel_num)
    }

    /// Merges an update into an existing parcel in place.
    ///
    /// Returns false (leaving the index untouched) when the parcel is unknown.
    pub fn apply_update(&mut self, parcel_num: &ParcelNum, update: &PropertyMap) -> bool {
        let Some(feature) = self.features.get_mut(parcel_num) else {
            return false;
        };
        feature.properties = merge_parcel_properties(&feature.properties, update);
        true
    }
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges new parcel properties over old ones.
///
/// For every key in either map the result takes the new value when truthy,
/// else the old value when truthy, else `null`. Falsy values (`null`, `false`,
/// `0`, `""`) in an update therefore never clear a field.
#[must_use]
pub fn merge_parcel_properties(old: &PropertyMap, new: &PropertyMap) -> PropertyMap {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut merged = PropertyMap::new();
    for key in keys {
        let value = match (new.get(key), old.get(key)) {
            (Some(value), _) if is_truthy(value) => value.clone(),
            (_, Some(value)) if is_truthy(value) => value.clone(),
            _ => Value::Null,
        };
        merged.insert(key.clone(), value);
    }
    merged
}

/// Returns true when a JSON value is truthy under JavaScript rules.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
