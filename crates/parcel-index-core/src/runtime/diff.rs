// crates/parcel-index-core/src/runtime/diff.rs
// ============================================================================
// Module: Schema Drift Detection
// Description: Structural diffs of layer sets and feature property sets.
// Purpose: Detect schema drift between persisted and freshly declared collections.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Diffs compare structure, not values: layers by `key`, features by property
//! names of one representative feature. Results keep the input order of the
//! side they were taken from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use crate::core::Layer;
use crate::core::LayerDescriptor;
use crate::core::ParcelFeature;

// ============================================================================
// SECTION: Keyed Layers
// ============================================================================

/// Anything identified by a layer key.
pub trait KeyedLayer {
    /// Returns the layer key.
    fn layer_key(&self) -> &str;

    /// Returns the display name recorded in history.
    fn layer_name(&self) -> &str;
}

impl KeyedLayer for Layer {
    fn layer_key(&self) -> &str {
        &self.key
    }

    fn layer_name(&self) -> &str {
        self.display_name()
    }
}

impl KeyedLayer for LayerDescriptor {
    fn layer_key(&self) -> &str {
        &self.key
    }

    fn layer_name(&self) -> &str {
        self.display_name()
    }
}

// ============================================================================
// SECTION: Diffs
// ============================================================================

/// Returns `(removed, added)` layers by set difference on `key`.
#[must_use]
pub fn diff_layers<'a, O, N>(old: &'a [O], new: &'a [N]) -> (Vec<&'a O>, Vec<&'a N>)
where
    O: KeyedLayer,
    N: KeyedLayer,
{
    let old_keys: HashSet<&str> = old.iter().map(KeyedLayer::layer_key).collect();
    let new_keys: HashSet<&str> = new.iter().map(KeyedLayer::layer_key).collect();
    let removed = old.iter().filter(|layer| !new_keys.contains(layer.layer_key())).collect();
    let added = new.iter().filter(|layer| !old_keys.contains(layer.layer_key())).collect();
    (removed, added)
}

/// Returns `(removed, added)` property names between two sample features.
///
/// A missing sample on either side yields no drift.
#[must_use]
pub fn diff_feature_properties(
    old: Option<&ParcelFeature>,
    new: Option<&ParcelFeature>,
) -> (Vec<String>, Vec<String>) {
    let (Some(old), Some(new)) = (old, new) else {
        return (Vec::new(), Vec::new());
    };
    let removed =
        old.properties.keys().filter(|key| !new.properties.contains_key(*key)).cloned().collect();
    let added =
        new.properties.keys().filter(|key| !old.properties.contains_key(*key)).cloned().collect();
    (removed, added)
}
