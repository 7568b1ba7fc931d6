// crates/parcel-index-core/src/core/history.rs
// ============================================================================
// Module: Run History
// Description: Audit records describing every decision made by one run.
// Purpose: Provide the append-only history line written once per pipeline run.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`HistoryEntry`] is built per run and appended to the audit log as a
//! single JSON line. It lists accepted and rejected updates, layer and
//! property schema drift, the artifacts written (with digests), and on failure
//! the error plus a report of artifacts missing from every location.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::core::collection::CollectionVariant;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::ParcelNum;

// ============================================================================
// SECTION: Item Classification
// ============================================================================

/// Category of a history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryItemKind {
    /// A parcel update.
    #[serde(rename = "Property")]
    Property,
    /// Base collection layer set.
    #[serde(rename = "Base Layers")]
    BaseLayers,
    /// Master collection layer set.
    #[serde(rename = "Master Layers")]
    MasterLayers,
    /// Base collection feature property set.
    #[serde(rename = "Base Layer Properties")]
    BaseLayerProperties,
    /// Master collection feature property set.
    #[serde(rename = "Master Layer Properties")]
    MasterLayerProperties,
    /// Pipeline failure.
    #[serde(rename = "FAILURE IN UPDATE PROCESS")]
    Failure,
}

/// Decision recorded by a history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    /// Update accepted.
    #[serde(rename = "verified")]
    Verified,
    /// Update rejected.
    #[serde(rename = "rejected")]
    Rejected,
    /// Schema element added.
    #[serde(rename = "added")]
    Added,
    /// Schema element removed.
    #[serde(rename = "removed")]
    Removed,
    /// Failure logged and backups checked.
    #[serde(rename = "LOG FAILURE, ENSURE BACKUPS")]
    LogFailure,
}

// ============================================================================
// SECTION: History Item
// ============================================================================

/// Typed log item inside a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Human-readable subject.
    pub name: String,
    /// Item category.
    #[serde(rename = "type")]
    pub kind: HistoryItemKind,
    /// Recorded decision.
    pub action: HistoryAction,
    /// Subject payload.
    pub item: Value,
    /// Optional supporting detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl HistoryItem {
    /// Records an accepted parcel update.
    #[must_use]
    pub fn verified(parcel_num: Option<&ParcelNum>, update: &Value) -> Self {
        Self {
            name: parcel_label(parcel_num),
            kind: HistoryItemKind::Property,
            action: HistoryAction::Verified,
            item: update.clone(),
            details: None,
        }
    }

    /// Records a rejected parcel update with its rejection detail.
    #[must_use]
    pub fn rejected(parcel_num: Option<&ParcelNum>, update: &Value, errors: Value) -> Self {
        Self {
            name: parcel_label(parcel_num),
            kind: HistoryItemKind::Property,
            action: HistoryAction::Rejected,
            item: update.clone(),
            details: Some(json!({ "errors": errors })),
        }
    }

    /// Records layers added to or removed from a collection.
    #[must_use]
    pub fn layer_change(
        variant: CollectionVariant,
        action: HistoryAction,
        names: Vec<String>,
    ) -> Self {
        let kind = match variant {
            CollectionVariant::Base => HistoryItemKind::BaseLayers,
            CollectionVariant::Master => HistoryItemKind::MasterLayers,
        };
        Self {
            name: format!("All {} Layers", variant.label()),
            kind,
            action,
            item: Value::from(names),
            details: None,
        }
    }

    /// Records feature property keys added to or removed from a collection.
    #[must_use]
    pub fn property_change(
        variant: CollectionVariant,
        action: HistoryAction,
        keys: Vec<String>,
    ) -> Self {
        let kind = match variant {
            CollectionVariant::Base => HistoryItemKind::BaseLayerProperties,
            CollectionVariant::Master => HistoryItemKind::MasterLayerProperties,
        };
        Self {
            name: format!("{} Layer Properties", variant.label()),
            kind,
            action,
            item: Value::from(keys),
            details: None,
        }
    }

    /// Records a pipeline failure.
    #[must_use]
    pub fn failure(report: &FailureReport) -> Self {
        Self {
            name: "FAIL".to_string(),
            kind: HistoryItemKind::Failure,
            action: HistoryAction::LogFailure,
            item: report.to_json(),
            details: None,
        }
    }
}

/// Builds the `Parcel: <num>` label used for update items.
fn parcel_label(parcel_num: Option<&ParcelNum>) -> String {
    parcel_num.map_or_else(|| "Parcel: unknown".to_string(), |num| format!("Parcel: {num}"))
}

// ============================================================================
// SECTION: Failure Report
// ============================================================================

/// Error summary attached to a failure item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureError {
    /// Stage in which the failure occurred.
    pub stage: String,
    /// Error message.
    pub message: String,
}

/// Artifact absent from every checked location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArtifact {
    /// Artifact file name.
    pub file: String,
    /// Directories that were checked.
    pub checked_paths: Vec<String>,
}

/// Survival check of required artifacts after a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackCheck {
    /// Artifacts missing from both production and backup locations.
    pub missing_files: Vec<MissingArtifact>,
}

/// Failure payload stored in the history `failure` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    /// Original error.
    pub error: FailureError,
    /// Artifact survival report.
    pub fallback_check: FallbackCheck,
}

impl FailureReport {
    /// Returns the report in its audit log form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let missing_files: Vec<Value> = self
            .fallback_check
            .missing_files
            .iter()
            .map(|missing| {
                json!({
                    "file": missing.file,
                    "checkedPaths": missing.checked_paths,
                })
            })
            .collect();
        json!({
            "error": {
                "stage": self.error.stage,
                "message": self.error.message,
            },
            "fallbackCheck": {
                "missingFiles": missing_files,
            },
        })
    }
}

// ============================================================================
// SECTION: Written Artifacts
// ============================================================================

/// Record of one artifact written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenArtifact {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Artifact file name.
    pub file: String,
    /// Full paths written, in write order.
    pub paths: Vec<String>,
    /// Digest of the bytes written to every path.
    pub digest: HashDigest,
}

// ============================================================================
// SECTION: History Entry
// ============================================================================

/// Audit record for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Identifier of the master index the run loaded.
    pub master_index_id: ArtifactId,
    /// Identifier of the base collection the run loaded.
    pub base_source_id: ArtifactId,
    /// Identifier of the master collection the run loaded.
    pub master_source_id: ArtifactId,
    /// Record time in milliseconds since the Unix epoch.
    pub recorded_at_ms: u64,
    /// Accepted updates.
    pub verified_props: Vec<HistoryItem>,
    /// Rejected updates.
    pub rejected_props: Vec<HistoryItem>,
    /// Layer set drift.
    pub layer_changes: Vec<HistoryItem>,
    /// Feature property drift.
    pub feature_prop_changes: Vec<HistoryItem>,
    /// Failures; populated only on the failure path.
    pub failure: Vec<HistoryItem>,
    /// Artifacts written by the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub written_artifacts: Vec<WrittenArtifact>,
}

impl HistoryEntry {
    /// Creates an empty entry for the loaded artifact identifiers.
    #[must_use]
    pub const fn new(
        master_index_id: ArtifactId,
        base_source_id: ArtifactId,
        master_source_id: ArtifactId,
        recorded_at_ms: u64,
    ) -> Self {
        Self {
            master_index_id,
            base_source_id,
            master_source_id,
            recorded_at_ms,
            verified_props: Vec::new(),
            rejected_props: Vec::new(),
            layer_changes: Vec::new(),
            feature_prop_changes: Vec::new(),
            failure: Vec::new(),
            written_artifacts: Vec::new(),
        }
    }

    /// Returns true when the run has nothing to write.
    ///
    /// Rejections alone change no artifact, so a batch whose updates were all
    /// rejected is still a no-op.
    #[must_use]
    pub fn is_no_op(&self) -> bool {
        self.verified_props.is_empty()
            && self.layer_changes.is_empty()
            && self.feature_prop_changes.is_empty()
    }
}
