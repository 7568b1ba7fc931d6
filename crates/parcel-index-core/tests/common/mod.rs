// crates/parcel-index-core/tests/common/mod.rs
// =============================================================================
// Module: Pipeline Test Helpers
// Description: Shared fixtures for parcel index core integration tests.
// Purpose: Seed an in-memory store with a consistent master index and collections.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use parcel_index_core::AcceptAllValidator;
use parcel_index_core::BackupDirectories;
use parcel_index_core::CollectionSchema;
use parcel_index_core::CollectionVariant;
use parcel_index_core::InMemoryArtifactStore;
use parcel_index_core::LayerDataType;
use parcel_index_core::LayerDescriptor;
use parcel_index_core::MASTER_INDEX_ID;
use parcel_index_core::MapboxLayerFormula;
use parcel_index_core::MasterIndex;
use parcel_index_core::ParcelFeature;
use parcel_index_core::ParcelNum;
use parcel_index_core::PipelineConfig;
use parcel_index_core::PipelineLayout;
use parcel_index_core::ProductionDirectories;
use parcel_index_core::PropertyMap;
use parcel_index_core::StaticLayerCatalog;
use parcel_index_core::UpdatePipeline;
use parcel_index_core::regenerate;
use serde_json::Value;
use serde_json::json;

/// Pipeline type used across core suites.
pub type TestPipeline =
    UpdatePipeline<InMemoryArtifactStore, AcceptAllValidator, StaticLayerCatalog, MapboxLayerFormula>;

/// Returns a layout where the master index backup and production directories coincide.
pub fn layout() -> PipelineLayout {
    PipelineLayout {
        backup: BackupDirectories {
            master_index: "/data/map/master_index".into(),
            base_source: "/data/map/base_source".into(),
            master_source: "/data/map/master_source".into(),
            history: "/data/map/history".into(),
        },
        production: ProductionDirectories {
            master_index: "/data/map/master_index".into(),
            map_source: "/data/src/map".into(),
        },
    }
}

/// Returns the declarations used by the seeded collections.
pub fn catalog() -> StaticLayerCatalog {
    StaticLayerCatalog::new(
        CollectionSchema::new(
            ["parcelNum", "zoning", "acres"],
            vec![
                LayerDescriptor::new("parcels", LayerDataType::Category),
                LayerDescriptor::new("zoning", LayerDataType::Category),
                LayerDescriptor::new("acres", LayerDataType::Range),
            ],
        ),
        CollectionSchema::new(
            ["parcelNum", "owner", "zoning", "acres", "damage"],
            vec![
                LayerDescriptor::new("zoning", LayerDataType::Category),
                LayerDescriptor::new("acres", LayerDataType::Range),
                LayerDescriptor::new("damage", LayerDataType::Category),
            ],
        ),
    )
}

/// Builds a parcel feature from a JSON object of properties.
pub fn parcel(properties: &Value) -> ParcelFeature {
    let properties: PropertyMap = properties.as_object().cloned().unwrap_or_default();
    ParcelFeature {
        geometry: json!({"type": "Point", "coordinates": [0.0, 0.0]}),
        ..ParcelFeature::from_properties(properties)
    }
}

/// Returns the seeded master index.
pub fn seed_index() -> MasterIndex {
    let parcels = [
        json!({"parcelNum": "123", "owner": "Doe", "zoning": "R1", "acres": 1.5, "damage": "none"}),
        json!({"parcelNum": "456", "owner": "Roe", "zoning": "C2", "acres": 3, "damage": "minor"}),
        json!({"parcelNum": "789", "owner": "Poe", "zoning": "R1", "acres": 12, "damage": ""}),
    ];
    let mut index = MasterIndex::new(MASTER_INDEX_ID);
    for properties in &parcels {
        let num = ParcelNum::from_value(&properties["parcelNum"]).expect("parcel number");
        index.features.insert(num, parcel(properties));
        index.length += 1;
    }
    index
}

/// Seeds the store's load slots with a consistent index and collections.
pub fn seed_store(store: &InMemoryArtifactStore, catalog: &StaticLayerCatalog) {
    let layout = layout();
    let regenerated = regenerate(&seed_index(), catalog, &MapboxLayerFormula::default());
    store
        .insert_json(
            layout.master_index_backup().path(),
            &serde_json::to_value(&regenerated.master_index).expect("index json"),
        )
        .expect("seed index");
    for variant in CollectionVariant::ALL {
        store
            .insert_json(
                layout.collection_backup(variant).path(),
                &serde_json::to_value(regenerated.collection(variant)).expect("collection json"),
            )
            .expect("seed collection");
    }
}

/// Returns a seeded store and a pipeline over it.
pub fn seeded_pipeline() -> (InMemoryArtifactStore, TestPipeline) {
    let store = InMemoryArtifactStore::new();
    let catalog = catalog();
    seed_store(&store, &catalog);
    let pipeline = UpdatePipeline::new(
        store.clone(),
        AcceptAllValidator,
        catalog,
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout()),
    );
    (store, pipeline)
}

/// Reads the master index written to production.
pub fn written_index(store: &InMemoryArtifactStore) -> MasterIndex {
    let value =
        store.read_json(&layout().master_index_production().path()).expect("written master index");
    serde_json::from_value(value).expect("master index shape")
}
