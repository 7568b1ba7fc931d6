// crates/parcel-index-config/src/config.rs
// ============================================================================
// Module: Parcel Index Configuration
// Description: Configuration loading and validation for the update pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: parcel-index-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Relative directories are
//! resolved against the process working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use parcel_index_core::CollectionSchema;
use parcel_index_core::CollectionVariant;
use parcel_index_core::DEFAULT_MAX_BINS;
use parcel_index_core::LayerDataType;
use parcel_index_core::MAX_BINS_LIMIT;
use parcel_index_core::MapboxLayerFormula;
use parcel_index_core::PipelineConfig;
use parcel_index_core::PipelineLayout;
use parcel_index_core::StaticLayerCatalog;
use parcel_index_core::is_structural_layer;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "parcel-index.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PARCEL_INDEX_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of declared properties or layers per collection.
pub(crate) const MAX_DECLARATIONS: usize = 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Parcel index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParcelIndexConfig {
    /// Backup and production directories.
    pub directories: PipelineLayout,
    /// Per-variant property and layer declarations.
    pub collections: CollectionsConfig,
    /// Range binning settings.
    #[serde(default)]
    pub binning: BinningConfig,
    /// Update validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Declarations for both collection variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionsConfig {
    /// Base collection declarations.
    pub base: CollectionSchema,
    /// Master collection declarations.
    pub master: CollectionSchema,
}

impl CollectionsConfig {
    /// Returns the declarations for a variant.
    #[must_use]
    pub const fn schema(&self, variant: CollectionVariant) -> &CollectionSchema {
        match variant {
            CollectionVariant::Base => &self.base,
            CollectionVariant::Master => &self.master,
        }
    }
}

/// Range binning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningConfig {
    /// Upper bound on range bins per layer.
    #[serde(default = "default_max_bins")]
    pub max_bins: u32,
    /// Optional palette replacing the default colors.
    #[serde(default)]
    pub palette: Vec<String>,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            max_bins: DEFAULT_MAX_BINS,
            palette: Vec::new(),
        }
    }
}

/// Update validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Optional JSON Schema file applied to every update.
    #[serde(default)]
    pub update_schema: Option<PathBuf>,
}

/// Serde default for `binning.max_bins`.
const fn default_max_bins() -> u32 {
    DEFAULT_MAX_BINS
}

impl ParcelIndexConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_layout(&self.directories)?;
        for variant in CollectionVariant::ALL {
            validate_collection(variant, self.collections.schema(variant))?;
        }
        self.binning.validate()?;
        self.validation.validate()?;
        Ok(())
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.directories.clone())
    }

    /// Returns the layer catalog built from the collection declarations.
    #[must_use]
    pub fn layer_catalog(&self) -> StaticLayerCatalog {
        StaticLayerCatalog::new(self.collections.base.clone(), self.collections.master.clone())
    }

    /// Returns the bin/formula generator for the binning settings.
    #[must_use]
    pub fn layer_formula(&self) -> MapboxLayerFormula {
        MapboxLayerFormula::new(self.binning.max_bins).with_palette(self.binning.palette.clone())
    }
}

impl BinningConfig {
    /// Validates binning settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_BINS_LIMIT).contains(&self.max_bins) {
            return Err(ConfigError::Invalid(format!(
                "binning.max_bins must be between 1 and {MAX_BINS_LIMIT}"
            )));
        }
        if self.palette.iter().any(|color| color.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "binning.palette entries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ValidationConfig {
    /// Validates update validation settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.update_schema {
            validate_path_string("validation.update_schema", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates every configured directory.
fn validate_layout(layout: &PipelineLayout) -> Result<(), ConfigError> {
    let directories = [
        ("directories.backup.master_index", &layout.backup.master_index),
        ("directories.backup.base_source", &layout.backup.base_source),
        ("directories.backup.master_source", &layout.backup.master_source),
        ("directories.backup.history", &layout.backup.history),
        ("directories.production.master_index", &layout.production.master_index),
        ("directories.production.map_source", &layout.production.map_source),
    ];
    for (field, path) in directories {
        validate_path_string(field, &path.to_string_lossy())?;
    }
    Ok(())
}

/// Validates one collection's property and layer declarations.
fn validate_collection(
    variant: CollectionVariant,
    schema: &CollectionSchema,
) -> Result<(), ConfigError> {
    let prefix = format!("collections.{}", variant_field(variant));
    if schema.properties.len() > MAX_DECLARATIONS || schema.layers.len() > MAX_DECLARATIONS {
        return Err(ConfigError::Invalid(format!(
            "{prefix} exceeds {MAX_DECLARATIONS} declarations"
        )));
    }
    let mut properties = BTreeSet::new();
    for property in &schema.properties {
        if property.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{prefix}.properties entries must be non-empty")));
        }
        if !properties.insert(property.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{prefix}.properties contains duplicate {property}"
            )));
        }
    }
    let mut keys = BTreeSet::new();
    for layer in &schema.layers {
        if layer.key.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{prefix}.layers key must be non-empty")));
        }
        if !keys.insert(layer.key.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{prefix}.layers contains duplicate key {}",
                layer.key
            )));
        }
        if is_structural_layer(&layer.key) && layer.data_type != LayerDataType::Category {
            return Err(ConfigError::Invalid(format!(
                "{prefix}.layers {} must use dataType category",
                layer.key
            )));
        }
        if layer.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "{prefix}.layers {} name must be non-empty when set",
                layer.key
            )));
        }
    }
    Ok(())
}

/// Returns the config field name of a variant.
const fn variant_field(variant: CollectionVariant) -> &'static str {
    match variant {
        CollectionVariant::Base => "base",
        CollectionVariant::Master => "master",
    }
}

/// Resolves the config path from arguments or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
