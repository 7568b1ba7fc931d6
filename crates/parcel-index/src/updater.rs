// crates/parcel-index/src/updater.rs
// ============================================================================
// Module: Parcel Index Updater
// Description: Config-driven construction of the update pipeline.
// Purpose: Expose the `update_map` entry point over the filesystem store.
// Dependencies: parcel-index-{core, config, store-fs, validation}, serde_json
// ============================================================================

//! ## Overview
//! [`ParcelIndexUpdater::from_config`] validates configuration, compiles the
//! optional update schema, and assembles an [`UpdatePipeline`] over the
//! filesystem store. Load failures are returned; failures after load are
//! recorded in the audit log and reported through [`RunReport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::Path;

use parcel_index_config::ParcelIndexConfig;
use parcel_index_core::AcceptAllValidator;
use parcel_index_core::MapboxLayerFormula;
use parcel_index_core::PipelineError;
use parcel_index_core::RunReport;
use parcel_index_core::StaticLayerCatalog;
use parcel_index_core::UpdatePipeline;
use parcel_index_core::UpdateRejection;
use parcel_index_core::UpdateValidator;
use parcel_index_store_fs::FsArtifactStore;
use parcel_index_validation::JsonSchemaUpdateValidator;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of an update batch file in bytes.
pub const MAX_BATCH_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the entry point.
#[derive(Debug, Error)]
pub enum UpdateMapError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// The update schema could not be loaded or compiled.
    #[error("update schema error: {0}")]
    Validator(String),
    /// An update batch file could not be read or parsed.
    #[error("update batch error: {0}")]
    Batch(String),
    /// An artifact could not be loaded.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ============================================================================
// SECTION: Validator Selection
// ============================================================================

/// Validator chosen by configuration.
pub enum ConfiguredValidator {
    /// No schema configured; only object shape is checked.
    AcceptAll(AcceptAllValidator),
    /// Updates are checked against a compiled JSON Schema.
    Schema(Box<JsonSchemaUpdateValidator>),
}

impl ConfiguredValidator {
    /// Builds the validator named by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateMapError::Validator`] when the schema cannot be loaded.
    pub fn from_config(config: &ParcelIndexConfig) -> Result<Self, UpdateMapError> {
        match &config.validation.update_schema {
            None => Ok(Self::AcceptAll(AcceptAllValidator)),
            Some(path) => {
                let validator = JsonSchemaUpdateValidator::from_path(path)
                    .map_err(|err| UpdateMapError::Validator(err.to_string()))?;
                tracing::debug!(schema = %path.display(), "compiled update schema");
                Ok(Self::Schema(Box::new(validator)))
            }
        }
    }
}

impl UpdateValidator for ConfiguredValidator {
    fn validate(&self, update: &Value) -> Result<(), UpdateRejection> {
        match self {
            Self::AcceptAll(validator) => validator.validate(update),
            Self::Schema(validator) => {
                AcceptAllValidator.validate(update)?;
                validator.validate(update)
            }
        }
    }
}

// ============================================================================
// SECTION: Updater
// ============================================================================

/// Pipeline type assembled from configuration.
type ConfiguredPipeline =
    UpdatePipeline<FsArtifactStore, ConfiguredValidator, StaticLayerCatalog, MapboxLayerFormula>;

/// Update pipeline built from a [`ParcelIndexConfig`].
pub struct ParcelIndexUpdater {
    /// Assembled pipeline.
    pipeline: ConfiguredPipeline,
}

impl ParcelIndexUpdater {
    /// Builds an updater from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateMapError`] when the config or schema is invalid.
    pub fn from_config(config: &ParcelIndexConfig) -> Result<Self, UpdateMapError> {
        config.validate().map_err(|err| UpdateMapError::Config(err.to_string()))?;
        let validator = ConfiguredValidator::from_config(config)?;
        let pipeline = UpdatePipeline::new(
            FsArtifactStore::new(),
            validator,
            config.layer_catalog(),
            config.layer_formula(),
            config.pipeline_config(),
        );
        Ok(Self {
            pipeline,
        })
    }

    /// Applies one batch of updates.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateMapError::Pipeline`] when an artifact cannot be loaded.
    pub fn apply(&self, updates: &[Value]) -> Result<RunReport, UpdateMapError> {
        Ok(self.pipeline.run(updates)?)
    }
}

/// Applies one batch of parcel updates using `config`.
///
/// An empty batch returns immediately without touching the filesystem.
///
/// # Errors
///
/// Returns [`UpdateMapError`] when configuration is invalid or an artifact
/// cannot be loaded. Failures after loading are reported through the
/// returned [`RunReport`].
pub fn update_map(
    config: &ParcelIndexConfig,
    updates: &[Value],
) -> Result<RunReport, UpdateMapError> {
    ParcelIndexUpdater::from_config(config)?.apply(updates)
}

/// Reads an update batch: a JSON array of update objects.
///
/// # Errors
///
/// Returns [`UpdateMapError::Batch`] when the file is unreadable, too large,
/// or not a JSON array.
pub fn read_update_batch(path: &Path) -> Result<Vec<Value>, UpdateMapError> {
    let file = fs::File::open(path).map_err(|err| UpdateMapError::Batch(err.to_string()))?;
    let limit = u64::try_from(MAX_BATCH_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| UpdateMapError::Batch(err.to_string()))?;
    if bytes.len() > MAX_BATCH_BYTES {
        return Err(UpdateMapError::Batch(format!(
            "update batch exceeds {MAX_BATCH_BYTES} bytes"
        )));
    }
    serde_json::from_slice(&bytes).map_err(|err| UpdateMapError::Batch(err.to_string()))
}
