// crates/parcel-index-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Parcel Index Update Pipeline
// Description: Load, validate, diff, merge, regenerate, write, and log.
// Purpose: Apply one batch of parcel updates and keep the audit trail in sync with disk.
// Dependencies: crate::{core, interfaces, runtime}, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`UpdatePipeline::run`] executes one batch as a state machine:
//! `LOAD → VALIDATE → DIFF → MERGE → REGENERATE → WRITE → LOG`. A run halts
//! after `DIFF` when nothing was verified and no schema drifted. Any error
//! after `LOAD` moves the run to `FAILURE`, which records which artifacts
//! survived and still attempts the audit append.
//!
//! Security posture: update payloads are untrusted and are only ever merged
//! into parcels that already exist in the master index.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::core::ArtifactId;
use crate::core::CollectionVariant;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::FailureError;
use crate::core::FailureReport;
use crate::core::FallbackCheck;
use crate::core::FeatureCollection;
use crate::core::HashAlgorithm;
use crate::core::HistoryAction;
use crate::core::HistoryEntry;
use crate::core::HistoryItem;
use crate::core::MasterIndex;
use crate::core::MissingArtifact;
use crate::core::PARCEL_NUM_KEY;
use crate::core::ParcelNum;
use crate::core::PropertyMap;
use crate::core::WrittenArtifact;
use crate::core::feature_template;
use crate::core::hash_bytes;
use crate::interfaces::ArtifactLocation;
use crate::interfaces::ArtifactStore;
use crate::interfaces::LayerCatalog;
use crate::interfaces::LayerFormula;
use crate::interfaces::StoreError;
use crate::interfaces::UpdateRejection;
use crate::interfaces::UpdateValidator;
use crate::interfaces::backup_file_name;
use crate::interfaces::display_path;
use crate::runtime::diff::KeyedLayer;
use crate::runtime::diff::diff_feature_properties;
use crate::runtime::diff::diff_layers;
use crate::runtime::regenerate::regenerate;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Master index artifact file name.
pub const MASTER_INDEX_FILE: &str = "master-index.json";
/// Audit log file name.
pub const HISTORY_FILE: &str = "history.jsonl";

/// Directories holding the rotating backup slots and the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDirectories {
    /// Master index backup directory; loads read from here.
    pub master_index: PathBuf,
    /// Base collection backup directory; loads read from here.
    pub base_source: PathBuf,
    /// Master collection backup directory; loads read from here.
    pub master_source: PathBuf,
    /// Audit log directory.
    pub history: PathBuf,
}

/// Directories read by the map front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionDirectories {
    /// Production master index directory.
    pub master_index: PathBuf,
    /// Production directory for both feature collections.
    pub map_source: PathBuf,
}

/// Complete artifact layout for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLayout {
    /// Backup and audit directories.
    pub backup: BackupDirectories,
    /// Production directories.
    pub production: ProductionDirectories,
}

impl PipelineLayout {
    /// Returns the master index location in the backup directory.
    #[must_use]
    pub fn master_index_backup(&self) -> ArtifactLocation {
        ArtifactLocation::new(&self.backup.master_index, MASTER_INDEX_FILE)
    }

    /// Returns the master index location in the production directory.
    #[must_use]
    pub fn master_index_production(&self) -> ArtifactLocation {
        ArtifactLocation::new(&self.production.master_index, MASTER_INDEX_FILE)
    }

    /// Returns a collection's location in its backup directory.
    #[must_use]
    pub fn collection_backup(&self, variant: CollectionVariant) -> ArtifactLocation {
        let directory = match variant {
            CollectionVariant::Base => &self.backup.base_source,
            CollectionVariant::Master => &self.backup.master_source,
        };
        ArtifactLocation::new(directory, variant.file_name())
    }

    /// Returns a collection's location in the production map directory.
    #[must_use]
    pub fn collection_production(&self, variant: CollectionVariant) -> ArtifactLocation {
        ArtifactLocation::new(&self.production.map_source, variant.file_name())
    }

    /// Returns the audit log location.
    #[must_use]
    pub fn history(&self) -> ArtifactLocation {
        ArtifactLocation::new(&self.backup.history, HISTORY_FILE)
    }

    /// Returns the `(production, backup)` locations of every required artifact.
    #[must_use]
    pub fn required_artifacts(&self) -> [(ArtifactLocation, ArtifactLocation); 3] {
        [
            (self.master_index_production(), self.master_index_backup()),
            (
                self.collection_production(CollectionVariant::Master),
                self.collection_backup(CollectionVariant::Master),
            ),
            (
                self.collection_production(CollectionVariant::Base),
                self.collection_backup(CollectionVariant::Base),
            ),
        ]
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Artifact layout.
    pub layout: PipelineLayout,
    /// Hash algorithm for written-artifact digests.
    pub hash_algorithm: HashAlgorithm,
}

impl PipelineConfig {
    /// Creates a configuration with the default hash algorithm.
    #[must_use]
    pub const fn new(layout: PipelineLayout) -> Self {
        Self {
            layout,
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

// ============================================================================
// SECTION: Run Results
// ============================================================================

/// Pipeline states that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Loading and rotating persisted artifacts.
    Load,
    /// Classifying updates.
    Validate,
    /// Computing schema drift.
    Diff,
    /// Merging verified updates.
    Merge,
    /// Rebuilding artifacts and statistics.
    Regenerate,
    /// Persisting artifacts.
    Write,
    /// Appending the audit line.
    Log,
}

impl PipelineStage {
    /// Returns the stable stage label recorded in history.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Validate => "validate",
            Self::Diff => "diff",
            Self::Merge => "merge",
            Self::Regenerate => "regenerate",
            Self::Write => "write",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The batch was empty; nothing was loaded.
    EmptyBatch,
    /// Nothing was verified and no schema drifted; nothing was written.
    NoChanges,
    /// All artifacts were written.
    Completed,
    /// A stage after `LOAD` failed; the failure was recorded in history.
    Failed,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// History entry built by the run; absent for empty batches.
    pub entry: Option<HistoryEntry>,
}

impl RunReport {
    /// Returns the report for an empty batch.
    #[must_use]
    pub const fn empty_batch() -> Self {
        Self {
            outcome: RunOutcome::EmptyBatch,
            entry: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned to the caller; only `LOAD` failures escape a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An artifact could not be loaded from either slot.
    #[error("failed to load {artifact}: {source}")]
    Load {
        /// Artifact file name.
        artifact: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
    /// A loaded artifact does not match its expected shape; no slot was rotated.
    #[error("failed to decode {artifact}: {message}")]
    Decode {
        /// Artifact file name.
        artifact: String,
        /// Decoder error message.
        message: String,
    },
}

/// Error raised inside a stage after `LOAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StageFailure {
    /// Stage that failed.
    stage: PipelineStage,
    /// Error message.
    message: String,
}

impl StageFailure {
    /// Creates a failure for a stage.
    fn new(stage: PipelineStage, message: impl fmt::Display) -> Self {
        Self {
            stage,
            message: message.to_string(),
        }
    }
}

/// Where a successful `execute` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// Halted after `DIFF`.
    NoChanges,
    /// Finished `WRITE`.
    Written,
}

// ============================================================================
// SECTION: Loaded State
// ============================================================================

/// Artifacts loaded at the start of a run.
#[derive(Debug, Clone)]
struct LoadedState {
    /// Current master index; mutated in place by `MERGE`.
    index: MasterIndex,
    /// Previous base collection.
    base: FeatureCollection,
    /// Previous master collection.
    master: FeatureCollection,
}

impl LoadedState {
    /// Returns the previous collection for a variant.
    const fn collection(&self, variant: CollectionVariant) -> &FeatureCollection {
        match variant {
            CollectionVariant::Base => &self.base,
            CollectionVariant::Master => &self.master,
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Update pipeline over an artifact store and its collaborators.
pub struct UpdatePipeline<S, V, C, F> {
    /// Two-slot artifact store.
    store: S,
    /// Update validator.
    validator: V,
    /// Layer and property declarations.
    catalog: C,
    /// Bin and formula generator.
    formula: F,
    /// Pipeline configuration.
    config: PipelineConfig,
}

impl<S, V, C, F> UpdatePipeline<S, V, C, F>
where
    S: ArtifactStore,
    V: UpdateValidator,
    C: LayerCatalog,
    F: LayerFormula,
{
    /// Creates a pipeline.
    pub const fn new(store: S, validator: V, catalog: C, formula: F, config: PipelineConfig) -> Self {
        Self {
            store,
            validator,
            catalog,
            formula,
            config,
        }
    }

    /// Returns the artifact store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the pipeline configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Applies one batch of updates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when an artifact cannot be loaded or decoded.
    /// Failures in later stages are recorded in the history entry and
    /// reported as [`RunOutcome::Failed`].
    pub fn run(&self, updates: &[Value]) -> Result<RunReport, PipelineError> {
        if updates.is_empty() {
            tracing::info!("empty update batch; skipping run");
            return Ok(RunReport::empty_batch());
        }
        let mut state = self.load()?;
        let mut entry = HistoryEntry::new(
            state.index.id.clone(),
            state.base.id.clone(),
            state.master.id.clone(),
            now_ms(),
        );
        match self.execute(&mut state, updates, &mut entry) {
            Ok(Progress::NoChanges) => {
                tracing::info!(
                    rejected = entry.rejected_props.len(),
                    "no verified updates or schema drift; nothing written"
                );
                Ok(RunReport {
                    outcome: RunOutcome::NoChanges,
                    entry: Some(entry),
                })
            }
            Ok(Progress::Written) => {
                self.append_history(&entry);
                tracing::info!(
                    verified = entry.verified_props.len(),
                    rejected = entry.rejected_props.len(),
                    layer_changes = entry.layer_changes.len(),
                    property_changes = entry.feature_prop_changes.len(),
                    "parcel index update completed"
                );
                Ok(RunReport {
                    outcome: RunOutcome::Completed,
                    entry: Some(entry),
                })
            }
            Err(failure) => {
                tracing::warn!(
                    stage = %failure.stage,
                    error = %failure.message,
                    "parcel index update failed"
                );
                let report = self.failure_report(&failure);
                entry.failure.push(HistoryItem::failure(&report));
                self.append_history(&entry);
                Ok(RunReport {
                    outcome: RunOutcome::Failed,
                    entry: Some(entry),
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // LOAD
    // ------------------------------------------------------------------------

    /// Loads and rotates the three persisted artifacts.
    fn load(&self) -> Result<LoadedState, PipelineError> {
        let layout = &self.config.layout;
        let index = self.load_artifact(&layout.master_index_backup())?;
        let base = self.load_artifact(&layout.collection_backup(CollectionVariant::Base))?;
        let master = self.load_artifact(&layout.collection_backup(CollectionVariant::Master))?;
        Ok(LoadedState {
            index,
            base,
            master,
        })
    }

    /// Loads one artifact, decoding it before the store rotates it.
    fn load_artifact<T: DeserializeOwned>(
        &self,
        location: &ArtifactLocation,
    ) -> Result<T, PipelineError> {
        let artifact = location.file_name.clone();
        let mut decoded: Option<T> = None;
        let mut decode = |value: &Value| {
            T::deserialize(value).map(|typed| decoded = Some(typed)).map_err(|err| err.to_string())
        };
        let loaded = self.store.load_checked(location, &mut decode).map_err(|source| match source {
            StoreError::Rejected {
                message,
                ..
            } => PipelineError::Decode {
                artifact: artifact.clone(),
                message,
            },
            source => PipelineError::Load {
                artifact: artifact.clone(),
                source,
            },
        })?;
        match decoded {
            Some(typed) => Ok(typed),
            None => serde_json::from_value(loaded.value).map_err(|err| PipelineError::Decode {
                artifact,
                message: err.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // VALIDATE → DIFF → MERGE → REGENERATE → WRITE
    // ------------------------------------------------------------------------

    /// Runs every stage after `LOAD` except the audit append.
    fn execute(
        &self,
        state: &mut LoadedState,
        updates: &[Value],
        entry: &mut HistoryEntry,
    ) -> Result<Progress, StageFailure> {
        let verified = self.classify_updates(&state.index, updates, entry);
        self.record_schema_drift(state, entry);
        if entry.is_no_op() {
            return Ok(Progress::NoChanges);
        }

        for (parcel_num, properties) in &verified {
            if !state.index.apply_update(parcel_num, properties) {
                return Err(StageFailure::new(
                    PipelineStage::Merge,
                    format!("verified parcel {parcel_num} vanished from master index"),
                ));
            }
        }

        let regenerated = regenerate(&state.index, &self.catalog, &self.formula);
        let index_bytes = encode(&regenerated.master_index)?;
        let master_bytes = encode(&regenerated.master)?;
        let base_bytes = encode(&regenerated.base)?;

        let layout = &self.config.layout;
        self.write_artifact(
            &regenerated.master_index.id,
            &index_bytes,
            &[layout.master_index_production(), layout.master_index_backup()],
            entry,
        )?;
        for (variant, bytes) in
            [(CollectionVariant::Master, &master_bytes), (CollectionVariant::Base, &base_bytes)]
        {
            self.write_artifact(
                &regenerated.collection(variant).id,
                bytes,
                &[layout.collection_backup(variant), layout.collection_production(variant)],
                entry,
            )?;
        }
        Ok(Progress::Written)
    }

    /// Classifies every update; returns the verified merges in batch order.
    fn classify_updates<'a>(
        &self,
        index: &MasterIndex,
        updates: &'a [Value],
        entry: &mut HistoryEntry,
    ) -> Vec<(ParcelNum, &'a PropertyMap)> {
        let mut verified = Vec::new();
        for update in updates {
            let parcel_num = update.get(PARCEL_NUM_KEY).and_then(ParcelNum::from_value);
            match self.check_update(index, update, parcel_num.as_ref()) {
                Ok((num, properties)) => {
                    entry.verified_props.push(HistoryItem::verified(Some(&num), update));
                    verified.push((num, properties));
                }
                Err(rejection) => {
                    entry.rejected_props.push(HistoryItem::rejected(
                        parcel_num.as_ref(),
                        update,
                        Value::from(rejection.errors),
                    ));
                }
            }
        }
        verified
    }

    /// Accepts an update only if it validates and its parcel exists.
    fn check_update<'a>(
        &self,
        index: &MasterIndex,
        update: &'a Value,
        parcel_num: Option<&ParcelNum>,
    ) -> Result<(ParcelNum, &'a PropertyMap), UpdateRejection> {
        self.validator.validate(update)?;
        let properties = update
            .as_object()
            .ok_or_else(|| UpdateRejection::message("update must be a JSON object"))?;
        let parcel_num = parcel_num.ok_or_else(|| {
            UpdateRejection::message("parcelNum must be a string or an integer")
        })?;
        if !index.contains(parcel_num) {
            return Err(UpdateRejection::message(format!(
                "parcel {parcel_num} not in master index"
            )));
        }
        Ok((parcel_num.clone(), properties))
    }

    /// Records layer and feature-property drift for both variants.
    fn record_schema_drift(&self, state: &LoadedState, entry: &mut HistoryEntry) {
        for variant in CollectionVariant::ALL {
            let previous = state.collection(variant);
            let declared = self.catalog.declared_layers(variant);
            let (removed, added) = diff_layers(&previous.layers, &declared);
            for (action, names) in [
                (HistoryAction::Removed, layer_names(&removed)),
                (HistoryAction::Added, layer_names(&added)),
            ] {
                if !names.is_empty() {
                    entry.layer_changes.push(HistoryItem::layer_change(variant, action, names));
                }
            }
        }
        for variant in CollectionVariant::ALL {
            let template = feature_template(&self.catalog.declared_properties(variant));
            let (removed, added) = diff_feature_properties(
                state.collection(variant).features.first(),
                Some(&template),
            );
            for (action, keys) in [(HistoryAction::Removed, removed), (HistoryAction::Added, added)]
            {
                if !keys.is_empty() {
                    entry.feature_prop_changes.push(HistoryItem::property_change(
                        variant, action, keys,
                    ));
                }
            }
        }
    }

    /// Writes identical bytes to each distinct location, in order.
    fn write_artifact(
        &self,
        id: &ArtifactId,
        bytes: &[u8],
        locations: &[ArtifactLocation],
        entry: &mut HistoryEntry,
    ) -> Result<(), StageFailure> {
        let mut paths: Vec<String> = Vec::with_capacity(locations.len());
        let mut file = String::new();
        for (position, location) in locations.iter().enumerate() {
            if locations[.. position].iter().any(|earlier| earlier.same_path(location)) {
                continue;
            }
            self.store
                .write(location, bytes)
                .map_err(|err| StageFailure::new(PipelineStage::Write, err))?;
            tracing::debug!(artifact = %id, path = %display_path(&location.path()), "artifact written");
            paths.push(display_path(&location.path()));
            file.clone_from(&location.file_name);
        }
        entry.written_artifacts.push(WrittenArtifact {
            id: id.clone(),
            file,
            paths,
            digest: hash_bytes(self.config.hash_algorithm, bytes),
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // LOG / FAILURE
    // ------------------------------------------------------------------------

    /// Appends the history entry; failures are logged and swallowed.
    fn append_history(&self, entry: &HistoryEntry) {
        let location = self.config.layout.history();
        let result = serde_json::to_vec(entry)
            .map_err(|err| StoreError::Parse {
                path: display_path(&location.path()),
                message: err.to_string(),
            })
            .and_then(|line| self.store.append_line(&location, &line));
        if let Err(err) = result {
            tracing::warn!(
                stage = %PipelineStage::Log,
                error = %err,
                "failed to append history entry"
            );
        }
    }

    /// Builds the failure report, listing artifacts absent from every slot.
    fn failure_report(&self, failure: &StageFailure) -> FailureReport {
        let mut missing_files = Vec::new();
        for (production, backup) in self.config.layout.required_artifacts() {
            let candidates = [
                production.clone(),
                backup_slot(&production),
                backup.clone(),
                backup_slot(&backup),
            ];
            if candidates.iter().any(|candidate| self.store.exists(candidate)) {
                continue;
            }
            missing_files.push(MissingArtifact {
                file: production.file_name.clone(),
                checked_paths: vec![
                    display_path(&production.directory),
                    display_path(&backup.directory),
                ],
            });
        }
        FailureReport {
            error: FailureError {
                stage: failure.stage.as_str().to_string(),
                message: failure.message.clone(),
            },
            fallback_check: FallbackCheck {
                missing_files,
            },
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes an artifact as pretty JSON.
fn encode<T: Serialize>(artifact: &T) -> Result<Vec<u8>, StageFailure> {
    serde_json::to_vec_pretty(artifact).map_err(|err| StageFailure::new(PipelineStage::Write, err))
}

/// Returns display names of diffed layers.
fn layer_names<L: KeyedLayer>(layers: &[&L]) -> Vec<String> {
    layers.iter().map(|layer| layer.layer_name().to_string()).collect()
}

/// Returns the backup slot of a location as a location of its own.
fn backup_slot(location: &ArtifactLocation) -> ArtifactLocation {
    ArtifactLocation::new(&location.directory, backup_file_name(&location.file_name))
}

/// Returns the current wall-clock time in milliseconds since the epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
