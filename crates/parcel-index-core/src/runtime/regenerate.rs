// crates/parcel-index-core/src/runtime/regenerate.rs
// ============================================================================
// Module: Artifact Regeneration
// Description: Rebuilds the master index and both feature collections.
// Purpose: Derive every output artifact from a merged master index.
// Dependencies: crate::{core, interfaces, runtime::statistics}
// ============================================================================

//! ## Overview
//! Regeneration is a pure function of the merged master index and the
//! declarations: the new index, both collections, and all layer statistics
//! are built from scratch. Parcels are visited in `parcelNum` order, so two
//! runs over the same index produce identical output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ArtifactId;
use crate::core::CollectionVariant;
use crate::core::FeatureCollection;
use crate::core::MasterIndex;
use crate::core::project_feature;
use crate::interfaces::LayerCatalog;
use crate::interfaces::LayerFormula;
use crate::runtime::statistics::compute_layer_statistics;

// ============================================================================
// SECTION: Regenerated Artifacts
// ============================================================================

/// Output of one regeneration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RegeneratedArtifacts {
    /// Freshly constructed master index.
    pub master_index: MasterIndex,
    /// Base collection with reduced properties.
    pub base: FeatureCollection,
    /// Master collection with the full declared property set.
    pub master: FeatureCollection,
}

impl RegeneratedArtifacts {
    /// Returns the collection for a variant.
    #[must_use]
    pub const fn collection(&self, variant: CollectionVariant) -> &FeatureCollection {
        match variant {
            CollectionVariant::Base => &self.base,
            CollectionVariant::Master => &self.master,
        }
    }
}

/// Rebuilds one feature collection and its layer statistics.
#[must_use]
pub fn regenerate_collection(
    variant: CollectionVariant,
    index: &MasterIndex,
    catalog: &dyn LayerCatalog,
    formula: &dyn LayerFormula,
) -> FeatureCollection {
    let declared = catalog.declared_properties(variant);
    let features = index.features.values().map(|parcel| project_feature(parcel, &declared)).collect();
    let layers =
        compute_layer_statistics(&catalog.declared_layers(variant), index.features.values(), formula);
    FeatureCollection {
        id: ArtifactId::new(variant.artifact_id()),
        features,
        layers,
    }
}

/// Rebuilds the master index and both collections from a merged index.
#[must_use]
pub fn regenerate(
    index: &MasterIndex,
    catalog: &dyn LayerCatalog,
    formula: &dyn LayerFormula,
) -> RegeneratedArtifacts {
    RegeneratedArtifacts {
        master_index: MasterIndex::from_parcels(index.id.clone(), &index.features),
        base: regenerate_collection(CollectionVariant::Base, index, catalog, formula),
        master: regenerate_collection(CollectionVariant::Master, index, catalog, formula),
    }
}
