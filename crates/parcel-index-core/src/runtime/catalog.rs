// crates/parcel-index-core/src/runtime/catalog.rs
// ============================================================================
// Module: Static Layer Catalog
// Description: Fixed per-variant property and layer declarations.
// Purpose: Provide a LayerCatalog built once from configuration or tests.
// Dependencies: crate::{core, interfaces}, serde
// ============================================================================

//! ## Overview
//! [`StaticLayerCatalog`] answers [`LayerCatalog`] queries from two fixed
//! [`CollectionSchema`] values, one per collection variant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::CollectionVariant;
use crate::core::LayerDescriptor;
use crate::interfaces::LayerCatalog;

// ============================================================================
// SECTION: Collection Schema
// ============================================================================

/// Declared property subset and layers of one collection variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Feature property names, in output order.
    #[serde(default)]
    pub properties: Vec<String>,
    /// Layer declarations, in output order.
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

impl CollectionSchema {
    /// Creates a schema from property names and layer declarations.
    #[must_use]
    pub fn new<P, S>(properties: P, layers: Vec<LayerDescriptor>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
            layers,
        }
    }
}

/// Layer catalog backed by fixed declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticLayerCatalog {
    /// Base collection declarations.
    pub base: CollectionSchema,
    /// Master collection declarations.
    pub master: CollectionSchema,
}

impl StaticLayerCatalog {
    /// Creates a catalog from both variants' schemas.
    #[must_use]
    pub const fn new(base: CollectionSchema, master: CollectionSchema) -> Self {
        Self {
            base,
            master,
        }
    }

    /// Returns the schema for a variant.
    #[must_use]
    pub const fn schema(&self, variant: CollectionVariant) -> &CollectionSchema {
        match variant {
            CollectionVariant::Base => &self.base,
            CollectionVariant::Master => &self.master,
        }
    }
}

impl LayerCatalog for StaticLayerCatalog {
    fn declared_layers(&self, variant: CollectionVariant) -> Vec<LayerDescriptor> {
        self.schema(variant).layers.clone()
    }

    fn declared_properties(&self, variant: CollectionVariant) -> Vec<String> {
        self.schema(variant).properties.clone()
    }
}
