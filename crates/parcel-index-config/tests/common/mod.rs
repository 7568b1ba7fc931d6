// crates/parcel-index-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Build minimal valid configs for targeted mutation.
// Dependencies: parcel-index-config
// ============================================================================

//! ## Overview
//! Helpers return a minimal valid config; tests mutate one field at a time.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use parcel_index_config::ConfigError;
use parcel_index_config::ParcelIndexConfig;

/// Test result alias for config suites.
pub type TestResult = Result<(), String>;

/// Minimal valid configuration in TOML form.
pub const MINIMAL_TOML: &str = r#"
[directories.backup]
master_index = "backup/master_index"
base_source = "backup/base_source"
master_source = "backup/master_source"
history = "backup/history"

[directories.production]
master_index = "www/master_index"
map_source = "www/map"

[collections.base]
properties = ["parcelNum", "zoning"]
layers = [{ key = "zoning", dataType = "category" }]

[collections.master]
properties = ["parcelNum", "owner", "acres"]
layers = [{ key = "acres", dataType = "range" }]
"#;

/// Parses a config from TOML, validating it.
pub fn config_from_toml(toml: &str) -> Result<ParcelIndexConfig, ConfigError> {
    ParcelIndexConfig::from_toml(toml)
}

/// Returns the minimal valid configuration.
pub fn minimal_config() -> Result<ParcelIndexConfig, String> {
    config_from_toml(MINIMAL_TOML).map_err(|err| err.to_string())
}

/// Asserts that validation fails with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(err) => {
            let message = err.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("expected error containing {needle:?}, got {message}"))
            }
        }
        Ok(()) => Err(format!("expected invalid config containing {needle:?}")),
    }
}
