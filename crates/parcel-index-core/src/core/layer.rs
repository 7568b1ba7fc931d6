// crates/parcel-index-core/src/core/layer.rs
// ============================================================================
// Module: Layer Model
// Description: Layer declarations, finished layer statistics, and value validity.
// Purpose: Describe per-property binning metadata shipped with each collection.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`LayerDescriptor`] is what a catalog declares; a [`Layer`] is what a run
//! produces after every parcel has been observed. Category layers carry their
//! distinct values in first-seen order plus a tally. Range layers carry
//! contiguous ascending `[min, max]` bins plus per-bin counts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Structural layer key counting every parcel.
pub const PARCELS_LAYER_KEY: &str = "parcels";
/// Structural layer key for parcel outlines.
pub const OUTLINE_LAYER_KEY: &str = "outline";

/// Returns true for layers exempt from value-based binning.
#[must_use]
pub fn is_structural_layer(key: &str) -> bool {
    key == PARCELS_LAYER_KEY || key == OUTLINE_LAYER_KEY
}

// ============================================================================
// SECTION: Layer Types
// ============================================================================

/// Binning strategy for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerDataType {
    /// Distinct values tallied individually.
    Category,
    /// Numeric values partitioned into ranges.
    Range,
}

/// Layer declaration supplied by a layer catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Property name the layer reads.
    pub key: String,
    /// Display name; defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Binning strategy.
    pub data_type: LayerDataType,
}

impl LayerDescriptor {
    /// Creates a descriptor whose display name is its key.
    #[must_use]
    pub fn new(key: impl Into<String>, data_type: LayerDataType) -> Self {
        Self {
            key: key.into(),
            name: None,
            data_type,
        }
    }

    /// Returns the display name, falling back to the key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

/// Final bin values for a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinValues {
    /// Range bins as `[min, max]` pairs.
    Ranges(Vec<[f64; 2]>),
    /// Distinct category values in first-seen order.
    Categories(Vec<Value>),
}

impl Default for BinValues {
    fn default() -> Self {
        Self::Categories(Vec::new())
    }
}

/// Final bin counts for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinCount {
    /// Occurrences per category (or per structural layer key).
    Tally(BTreeMap<String, u64>),
    /// Occurrences per range bin, aligned with [`BinValues::Ranges`].
    Histogram(Vec<u64>),
}

impl Default for BinCount {
    fn default() -> Self {
        Self::Tally(BTreeMap::new())
    }
}

impl BinCount {
    /// Returns the sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Tally(tally) => tally.values().sum(),
            Self::Histogram(counts) => counts.iter().sum(),
        }
    }
}

/// Layer statistics shipped inside a feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Property name the layer reads.
    pub key: String,
    /// Display name; defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Binning strategy.
    pub data_type: LayerDataType,
    /// Final bin values.
    #[serde(default)]
    pub bin_values: BinValues,
    /// Final bin counts.
    #[serde(default)]
    pub bin_count: BinCount,
    /// Display formulas derived from the final bins.
    #[serde(default)]
    pub formulas: Value,
}

impl Layer {
    /// Returns the display name, falling back to the key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

/// Output of range bin generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBins {
    /// Contiguous ascending `[min, max]` bins.
    pub bins: Vec<[f64; 2]>,
    /// Element count per bin.
    pub counts: Vec<u64>,
}

// ============================================================================
// SECTION: Value Validity
// ============================================================================

/// Returns true when a value may participate in binning.
///
/// Strings are valid when non-empty after trimming; numbers when not NaN.
#[must_use]
pub fn is_valid_layer_value(value: &Value) -> bool {
    match value {
        Value::String(text) => !text.trim().is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| !n.is_nan()),
        _ => false,
    }
}

/// Returns the numeric reading of a value for range binning.
///
/// Numbers pass through; strings are accepted when their trimmed form parses
/// as a finite number. Negative zero is normalized to zero.
#[must_use]
pub fn range_value(value: &Value) -> Option<f64> {
    if !is_valid_layer_value(value) {
        return None;
    }
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.is_finite() { Some(number + 0.0) } else { None }
}

/// Returns the tally key for a category value.
#[must_use]
pub fn category_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
