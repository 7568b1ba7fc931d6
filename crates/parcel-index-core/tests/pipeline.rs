// crates/parcel-index-core/tests/pipeline.rs
// ============================================================================
// Module: Update Pipeline Tests
// Description: End-to-end pipeline runs against the in-memory store.
// Purpose: Validate classification, no-op halts, writes, rotation, and failures.
// Dependencies: parcel-index-core, proptest, serde_json
// ============================================================================
//! ## Overview
//! Drives [`UpdatePipeline::run`] through every terminal outcome and checks
//! the artifacts and audit lines it leaves behind.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use parcel_index_core::AcceptAllValidator;
use parcel_index_core::ArtifactStore;
use parcel_index_core::CollectionSchema;
use parcel_index_core::CollectionVariant;
use parcel_index_core::DEFAULT_HASH_ALGORITHM;
use parcel_index_core::FeatureCollection;
use parcel_index_core::HistoryAction;
use parcel_index_core::HistoryEntry;
use parcel_index_core::HistoryItemKind;
use parcel_index_core::InMemoryArtifactStore;
use parcel_index_core::LayerDataType;
use parcel_index_core::LayerDescriptor;
use parcel_index_core::MapboxLayerFormula;
use parcel_index_core::ParcelNum;
use parcel_index_core::PipelineConfig;
use parcel_index_core::PipelineError;
use parcel_index_core::RunOutcome;
use parcel_index_core::StoreError;
use parcel_index_core::UpdatePipeline;
use parcel_index_core::hash_bytes;
use parcel_index_core::hash_canonical_json;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

use crate::common::catalog;
use crate::common::layout;
use crate::common::seed_index;
use crate::common::seed_store;
use crate::common::seeded_pipeline;
use crate::common::written_index;

/// Parses every line of the audit log.
fn history_lines(store: &InMemoryArtifactStore) -> Vec<HistoryEntry> {
    let bytes = store.read(&layout().history().path()).unwrap_or_default();
    String::from_utf8(bytes)
        .expect("utf8 history")
        .lines()
        .map(|line| serde_json::from_str(line).expect("history entry"))
        .collect()
}

/// Verifies a known parcel update is merged, written, and audited.
#[test]
fn verified_update_merges_and_writes_all_artifacts() {
    let (store, pipeline) = seeded_pipeline();
    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    let entry = report.entry.expect("entry");
    assert_eq!(entry.verified_props.len(), 1);
    assert_eq!(entry.verified_props[0].name, "Parcel: 123");
    assert!(entry.rejected_props.is_empty());

    let index = written_index(&store);
    let parcel = index.get(&ParcelNum::new("123")).expect("parcel 123");
    assert_eq!(parcel.properties["owner"], json!("Smith"));
    assert_eq!(parcel.properties["zoning"], json!("R1"));
    assert_eq!(index.length, 3);

    let layout = layout();
    for variant in CollectionVariant::ALL {
        assert!(store.contains(&layout.collection_backup(variant).path()));
        assert!(store.contains(&layout.collection_production(variant).path()));
    }
    assert_eq!(history_lines(&store), vec![entry]);
}

/// Verifies an unknown parcel is rejected and causes no writes or appends.
#[test]
fn unknown_parcel_is_rejected_without_writes() {
    let (store, pipeline) = seeded_pipeline();
    let report = pipeline.run(&[json!({"parcelNum": "999", "owner": "X"})]).unwrap();

    assert_eq!(report.outcome, RunOutcome::NoChanges);
    let entry = report.entry.expect("entry");
    assert_eq!(entry.rejected_props.len(), 1);
    assert_eq!(entry.rejected_props[0].name, "Parcel: 999");
    assert_eq!(entry.rejected_props[0].action, HistoryAction::Rejected);
    assert!(entry.rejected_props[0].details.is_some());
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.append_count(), 0);

    let rotated = store.read_json(&layout().master_index_backup().backup_path()).expect("backup");
    let index: parcel_index_core::MasterIndex = serde_json::from_value(rotated).unwrap();
    assert_eq!(index, seed_index());
}

/// Verifies every update lands in exactly one of the verified/rejected lists.
#[test]
fn mixed_batch_partitions_updates() {
    let (store, pipeline) = seeded_pipeline();
    let updates = [
        json!({"parcelNum": "123", "owner": "Smith"}),
        json!({"parcelNum": "999", "owner": "X"}),
        json!({"owner": "nobody"}),
        json!("not an object"),
        json!({"parcelNum": 456, "damage": "major"}),
    ];
    let report = pipeline.run(&updates).unwrap();
    let entry = report.entry.expect("entry");

    assert_eq!(entry.verified_props.len() + entry.rejected_props.len(), updates.len());
    assert_eq!(entry.verified_props.len(), 2);
    let rejected: Vec<&str> = entry.rejected_props.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(rejected, ["Parcel: 999", "Parcel: unknown", "Parcel: unknown"]);

    let index = written_index(&store);
    assert_eq!(index.get(&ParcelNum::new("456")).unwrap().properties["damage"], json!("major"));
}

/// Verifies rejected updates never touch the master index even alongside verified ones.
#[test]
fn rejected_updates_do_not_mutate_index() {
    let store = InMemoryArtifactStore::new();
    let catalog = catalog();
    seed_store(&store, &catalog);
    let validator = RejectOwnerChanges;
    let pipeline = UpdatePipeline::new(
        store.clone(),
        validator,
        catalog,
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout()),
    );
    let report = pipeline
        .run(&[
            json!({"parcelNum": "123", "owner": "Mallory"}),
            json!({"parcelNum": "456", "zoning": "R2"}),
        ])
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let index = written_index(&store);
    assert_eq!(index.get(&ParcelNum::new("123")).unwrap().properties["owner"], json!("Doe"));
    assert_eq!(index.get(&ParcelNum::new("456")).unwrap().properties["zoning"], json!("R2"));
    let entry = report.entry.unwrap();
    assert_eq!(entry.rejected_props[0].details, Some(json!({"errors": ["owner is read-only"]})));
}

/// Validator that rejects updates carrying an `owner` field.
struct RejectOwnerChanges;

impl parcel_index_core::UpdateValidator for RejectOwnerChanges {
    fn validate(&self, update: &Value) -> Result<(), parcel_index_core::UpdateRejection> {
        if update.get("owner").is_some() {
            return Err(parcel_index_core::UpdateRejection::message("owner is read-only"));
        }
        Ok(())
    }
}

/// Verifies an empty batch loads nothing and reports an empty batch.
#[test]
fn empty_batch_skips_load() {
    let store = InMemoryArtifactStore::new();
    let pipeline = UpdatePipeline::new(
        store.clone(),
        AcceptAllValidator,
        catalog(),
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout()),
    );
    let report = pipeline.run(&[]).unwrap();
    assert_eq!(report.outcome, RunOutcome::EmptyBatch);
    assert!(report.entry.is_none());
}

/// Verifies a missing artifact in both slots is returned to the caller.
#[test]
fn missing_artifact_fails_load() {
    let store = InMemoryArtifactStore::new();
    let pipeline = UpdatePipeline::new(
        store,
        AcceptAllValidator,
        catalog(),
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout()),
    );
    let err = pipeline.run(&[json!({"parcelNum": "123"})]).unwrap_err();
    match err {
        PipelineError::Load {
            artifact,
            source: StoreError::NotFound {
                ..
            },
        } => assert_eq!(artifact, "master-index.json"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Verifies loading rotates every primary into its backup slot.
#[test]
fn load_rotates_primaries_into_backups() {
    let (store, pipeline) = seeded_pipeline();
    let layout = layout();
    let before =
        store.read(&layout.collection_backup(CollectionVariant::Base).path()).expect("seeded");

    pipeline.run(&[json!({"parcelNum": "999"})]).unwrap();

    let base = layout.collection_backup(CollectionVariant::Base);
    assert!(!store.contains(&base.path()));
    assert_eq!(store.read(&base.backup_path()), Some(before));

    let rerun = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(rerun.outcome, RunOutcome::Completed);
    assert!(store.contains(&base.path()));
}

/// Verifies layer and property drift is recorded and forces a write.
#[test]
fn schema_drift_is_recorded_and_written() {
    let store = InMemoryArtifactStore::new();
    seed_store(&store, &catalog());
    let mut drifted = catalog();
    drifted.master = CollectionSchema::new(
        ["parcelNum", "owner", "zoning", "acres", "flood"],
        vec![
            LayerDescriptor::new("zoning", LayerDataType::Category),
            LayerDescriptor::new("acres", LayerDataType::Range),
            LayerDescriptor::new("flood", LayerDataType::Category),
        ],
    );
    let pipeline = UpdatePipeline::new(
        store.clone(),
        AcceptAllValidator,
        drifted,
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout()),
    );
    let report = pipeline.run(&[json!({"parcelNum": "999"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let entry = report.entry.unwrap();
    let layer_changes: Vec<(HistoryItemKind, HistoryAction, Value)> = entry
        .layer_changes
        .iter()
        .map(|item| (item.kind, item.action, item.item.clone()))
        .collect();
    assert_eq!(
        layer_changes,
        vec![
            (HistoryItemKind::MasterLayers, HistoryAction::Removed, json!(["damage"])),
            (HistoryItemKind::MasterLayers, HistoryAction::Added, json!(["flood"])),
        ]
    );
    assert_eq!(entry.feature_prop_changes.len(), 2);
    assert_eq!(entry.feature_prop_changes[0].name, "Master Layer Properties");

    let written = store
        .read_json(&layout().collection_production(CollectionVariant::Master).path())
        .unwrap();
    let master: FeatureCollection = serde_json::from_value(written).unwrap();
    assert!(master.layers.iter().any(|layer| layer.key == "flood"));
    assert!(master.features.iter().all(|feature| feature.properties["flood"].is_null()));
}

/// Verifies a write failure is captured in history instead of returned.
#[test]
fn write_failure_is_logged_with_fallback_check() {
    let (store, pipeline) = seeded_pipeline();
    let layout = layout();
    store.fail_writes_to(layout.collection_production(CollectionVariant::Master).path());

    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Failed);

    let entry = report.entry.expect("entry");
    assert_eq!(entry.failure.len(), 1);
    let failure = &entry.failure[0];
    assert_eq!(failure.name, "FAIL");
    assert_eq!(failure.kind, HistoryItemKind::Failure);
    assert_eq!(failure.item["error"]["stage"], json!("write"));
    assert_eq!(failure.item["fallbackCheck"]["missingFiles"], json!([]));
    assert_eq!(entry.written_artifacts.len(), 1);
    assert_eq!(history_lines(&store), vec![entry]);
}

/// Store that reports one artifact as absent from every slot.
struct LossyStore {
    /// Backing store.
    inner: InMemoryArtifactStore,
    /// File name prefix reported as missing.
    lost: &'static str,
}

impl ArtifactStore for LossyStore {
    fn load_checked(
        &self,
        location: &parcel_index_core::ArtifactLocation,
        check: &mut parcel_index_core::ArtifactCheck<'_>,
    ) -> Result<parcel_index_core::LoadedArtifact, StoreError> {
        self.inner.load_checked(location, check)
    }

    fn write(
        &self,
        location: &parcel_index_core::ArtifactLocation,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.inner.write(location, bytes)
    }

    fn append_line(
        &self,
        location: &parcel_index_core::ArtifactLocation,
        line: &[u8],
    ) -> Result<(), StoreError> {
        self.inner.append_line(location, line)
    }

    fn exists(&self, location: &parcel_index_core::ArtifactLocation) -> bool {
        !location.file_name.starts_with(self.lost) && self.inner.exists(location)
    }
}

/// Verifies artifacts lost from every slot are reported as missing.
#[test]
fn fallback_check_lists_artifacts_missing_everywhere() {
    let inner = InMemoryArtifactStore::new();
    let catalog = catalog();
    seed_store(&inner, &catalog);
    let layout = layout();
    inner.fail_writes_to(layout.master_index_production().path());
    let pipeline = UpdatePipeline::new(
        LossyStore {
            inner: inner.clone(),
            lost: "base-source",
        },
        AcceptAllValidator,
        catalog,
        MapboxLayerFormula::default(),
        PipelineConfig::new(layout),
    );

    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Failed);
    let entry = report.entry.unwrap();
    assert!(entry.written_artifacts.is_empty());
    assert_eq!(
        entry.failure[0].item["fallbackCheck"]["missingFiles"],
        json!([{
            "file": "base-source.json",
            "checkedPaths": ["/data/src/map", "/data/map/base_source"],
        }])
    );
    assert_eq!(inner.append_count(), 1);
}

/// Verifies audit append failures never change the outcome.
#[test]
fn audit_failure_is_swallowed() {
    let (store, pipeline) = seeded_pipeline();
    store.fail_appends();
    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(store.append_count(), 0);
    let index = written_index(&store);
    assert_eq!(index.get(&ParcelNum::new("123")).unwrap().properties["owner"], json!("Smith"));
}

/// Verifies audit digests match the bytes on disk.
#[test]
fn written_artifact_digests_match_disk() {
    let (store, pipeline) = seeded_pipeline();
    let entry = pipeline
        .run(&[json!({"parcelNum": "456", "owner": "Smith"})])
        .unwrap()
        .entry
        .unwrap();
    assert_eq!(entry.written_artifacts.len(), 3);
    let index_record = &entry.written_artifacts[0];
    assert_eq!(index_record.file, "master-index.json");
    assert_eq!(index_record.paths.len(), 1);
    let bytes = store.read(&layout().master_index_production().path()).unwrap();
    assert_eq!(index_record.digest, hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes));
    for record in &entry.written_artifacts[1 ..] {
        assert_eq!(record.paths.len(), 2);
    }
}

/// Verifies two runs over the same index regenerate identical collections.
#[test]
fn regeneration_is_deterministic_across_runs() {
    let run_once = || {
        let (store, pipeline) = seeded_pipeline();
        pipeline.run(&[json!({"parcelNum": "789", "acres": 14})]).unwrap();
        let layout = layout();
        CollectionVariant::ALL.map(|variant| {
            store.read(&layout.collection_production(variant).path()).expect("collection bytes")
        })
    };
    let first = run_once();
    let second = run_once();
    assert_eq!(first, second);
    let base: Value = serde_json::from_slice(&first[0]).unwrap();
    let again: Value = serde_json::from_slice(&second[0]).unwrap();
    assert_eq!(
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &base).unwrap(),
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &again).unwrap()
    );
}

/// Verifies a run against backup-only state still completes.
#[test]
fn backup_only_state_is_used_without_rotation() {
    let (store, pipeline) = seeded_pipeline();
    let layout = layout();
    pipeline.run(&[json!({"parcelNum": "999"})]).unwrap();
    assert!(!store.contains(&layout.master_index_backup().path()));

    let report = pipeline.run(&[json!({"parcelNum": "789", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(store.contains(&layout.master_index_backup().backup_path()));
    assert_eq!(
        written_index(&store).get(&ParcelNum::new("789")).unwrap().properties["owner"],
        json!("Smith")
    );
}

/// Verifies a primary of the wrong shape is refused without displacing the backup.
#[test]
fn wrong_shape_primary_keeps_good_backup() {
    let (store, pipeline) = seeded_pipeline();
    let location = layout().master_index_backup();
    pipeline.run(&[json!({"parcelNum": "999"})]).unwrap();
    let good = store.read(&location.backup_path()).expect("rotated index");
    store.insert_json(location.path(), &json!({"id": "master-index", "features": []})).unwrap();

    for _ in 0 .. 2 {
        let err = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap_err();
        match err {
            PipelineError::Decode {
                artifact,
                ..
            } => assert_eq!(artifact, "master-index.json"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.read(&location.backup_path()), Some(good.clone()));
        assert!(store.contains(&location.path()));
    }

    store.remove(&location.path());
    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(
        written_index(&store).get(&ParcelNum::new("123")).unwrap().properties["owner"],
        json!("Smith")
    );
}

/// Verifies top-level feature members such as `id` and `bbox` survive a run.
#[test]
fn opaque_feature_members_survive_regeneration() {
    let (store, pipeline) = seeded_pipeline();
    let location = layout().master_index_backup();
    let mut seeded = store.read_json(&location.path()).expect("seeded index");
    seeded["features"]["123"]["id"] = json!(42);
    seeded["features"]["123"]["bbox"] = json!([0, 0, 1, 1]);
    store.insert_json(location.path(), &seeded).unwrap();

    let report = pipeline.run(&[json!({"parcelNum": "123", "owner": "Smith"})]).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let written = store.read_json(&layout().master_index_production().path()).unwrap();
    assert_eq!(written["features"]["123"]["id"], json!(42));
    assert_eq!(written["features"]["123"]["bbox"], json!([0, 0, 1, 1]));
    assert_eq!(written["features"]["123"]["properties"]["owner"], json!("Smith"));

    let master = store
        .read_json(&layout().collection_production(CollectionVariant::Master).path())
        .unwrap();
    assert_eq!(master["features"][0]["id"], json!(42));
}

/// Generates one update tagged with whether it should be verified.
fn tagged_update() -> impl Strategy<Value = (Value, bool)> {
    let known = proptest::sample::select(vec!["123", "456", "789"]);
    prop_oneof![
        (known.clone(), "[A-Z][0-9]{2}")
            .prop_map(|(num, zoning)| (json!({"parcelNum": num, "zoning": zoning}), true)),
        known.prop_map(|num| (json!({"parcelNum": num, "owner": "Mallory"}), false)),
        Just((json!({"parcelNum": 456, "damage": "major"}), true)),
        "[1-9][0-9]{3}".prop_map(|num| (json!({"parcelNum": num, "zoning": "X1"}), false)),
        any::<i64>().prop_map(|number| (json!(number), false)),
        Just((json!({"zoning": "R9"}), false)),
        Just((json!({"parcelNum": true, "zoning": "R9"}), false)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_update_is_classified_exactly_once(
        batch in proptest::collection::vec(tagged_update(), 1 .. 12)
    ) {
        let store = InMemoryArtifactStore::new();
        let catalog = catalog();
        seed_store(&store, &catalog);
        let pipeline = UpdatePipeline::new(
            store.clone(),
            RejectOwnerChanges,
            catalog,
            MapboxLayerFormula::default(),
            PipelineConfig::new(layout()),
        );
        let updates: Vec<Value> = batch.iter().map(|(update, _)| update.clone()).collect();
        let expected_verified = batch.iter().filter(|(_, verified)| *verified).count();

        let report = pipeline.run(&updates).unwrap();
        let entry = report.entry.expect("entry");
        prop_assert_eq!(entry.verified_props.len() + entry.rejected_props.len(), updates.len());
        prop_assert_eq!(entry.verified_props.len(), expected_verified);

        let index = if expected_verified == 0 {
            prop_assert_eq!(report.outcome, RunOutcome::NoChanges);
            prop_assert_eq!(store.write_count(), 0);
            let rotated = store.read_json(&layout().master_index_backup().backup_path()).expect("backup");
            serde_json::from_value::<parcel_index_core::MasterIndex>(rotated).unwrap()
        } else {
            prop_assert_eq!(report.outcome, RunOutcome::Completed);
            written_index(&store)
        };
        let seeded = seed_index();
        prop_assert_eq!(index.length, seeded.length);
        for (num, parcel) in &seeded.features {
            let current = index.get(num).expect("seeded parcel");
            prop_assert_eq!(&current.properties["owner"], &parcel.properties["owner"]);
        }
    }
}
